use crate::error::{ClientError, Result};
use crate::models::{NewTodo, Todo, TodoChanges};
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn email(value: &str) -> Result<String> {
    let value = required(value, "Email")?;
    if !email_re().is_match(&value) {
        return Err(ClientError::Validation(
            "Email address is not valid".to_string(),
        ));
    }
    Ok(value)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Trimmed email and untouched password.
    pub fn validate(&self) -> Result<(String, String)> {
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ClientError::Validation("Password is required".to_string()));
        }
        Ok((email, self.password.clone()))
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(String, String, String)> {
        let name = required(&self.name, "Name")?;
        let email = email(&self.email)?;
        if self.password.is_empty() {
            return Err(ClientError::Validation("Password is required".to_string()));
        }
        Ok((email, self.password.clone(), name))
    }
}

/// Title and description as typed into the create or edit form.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
}

impl TodoDraft {
    pub fn from_todo(todo: &Todo) -> Self {
        TodoDraft {
            title: todo.title.clone(),
            description: todo.description.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }

    pub fn to_new_todo(&self) -> Result<NewTodo> {
        let title = required(&self.title, "Title")?;
        let description = self.description.trim();
        Ok(NewTodo {
            title,
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }

    /// Title and description as an edit. An emptied description is sent as
    /// an empty string so the backend clears it.
    pub fn to_changes(&self) -> Result<TodoChanges> {
        let title = required(&self.title, "Title")?;
        Ok(TodoChanges {
            title: Some(title),
            description: Some(self.description.trim().to_string()),
            completed: None,
        })
    }
}
