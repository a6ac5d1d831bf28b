//! In-memory backend for unit tests.

use crate::api::TodoBackend;
use crate::error::{ClientError, Result};
use crate::identity::ScriptLoader;
use crate::models::{AuthResponse, NewTodo, Todo, TodoChanges, User};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn user(id: u64) -> User {
    User {
        id,
        email: format!("user{}@example.com", id),
        name: format!("User {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn todo(id: u64, title: &str, completed: bool) -> Todo {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(id as i64);
    Todo {
        id,
        title: title.to_string(),
        description: String::new(),
        completed,
        created_at: created,
        updated_at: created,
        user_id: 1,
    }
}

/// Script loader that succeeds without touching the network.
pub struct ReadyLoader;

#[async_trait]
impl ScriptLoader for ReadyLoader {
    async fn load(&self, _src: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct State {
    tokens: HashMap<String, User>,
    accounts: HashMap<String, (String, User)>,
    todos: Vec<Todo>,
    next_id: u64,
    calls: usize,
    fail_next: Option<ClientError>,
    last_changes: Option<TodoChanges>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().next_id = 100;
        backend
    }

    pub fn issue_token(&self, user: User) -> String {
        let mut state = self.state.lock().unwrap();
        let token = format!("token-{}-{}", user.id, state.tokens.len());
        state.tokens.insert(token.clone(), user);
        token
    }

    pub fn seed(&self, todos: Vec<Todo>) {
        self.state.lock().unwrap().todos = todos;
    }

    pub fn fail_next(&self, error: ClientError) {
        self.state.lock().unwrap().fail_next = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn last_changes(&self) -> Option<TodoChanges> {
        self.state.lock().unwrap().last_changes.clone()
    }

    fn enter(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn authorize(state: &State, token: &str) -> Result<User> {
        state
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ClientError::Unauthorized("Invalid token".to_string()))
    }
}

#[async_trait]
impl TodoBackend for FakeBackend {
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse> {
        let mut state = self.enter()?;
        if state.accounts.contains_key(email) {
            return Err(ClientError::Api {
                status: 400,
                message: "User already exists with this email".to_string(),
            });
        }
        state.next_id += 1;
        let mut account = user(state.next_id);
        account.email = email.to_string();
        account.name = name.to_string();
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), account.clone()));
        let token = format!("token-{}", account.id);
        state.tokens.insert(token.clone(), account.clone());
        Ok(AuthResponse {
            message: None,
            access_token: token,
            user: account,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let state = self.enter()?;
        match state.accounts.get(email) {
            Some((stored, account)) if stored == password => Ok(AuthResponse {
                message: None,
                access_token: format!("token-{}", account.id),
                user: account.clone(),
            }),
            _ => Err(ClientError::Unauthorized("Invalid credentials".to_string())),
        }
    }

    async fn google_auth(&self, credential: &str) -> Result<AuthResponse> {
        let mut state = self.enter()?;
        if credential != "valid-credential" {
            return Err(ClientError::Api {
                status: 400,
                message: "Invalid token".to_string(),
            });
        }
        let account = user(42);
        let token = "google-token".to_string();
        state.tokens.insert(token.clone(), account.clone());
        Ok(AuthResponse {
            message: None,
            access_token: token,
            user: account,
        })
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let state = self.enter()?;
        Self::authorize(&state, token)
    }

    async fn list_todos(&self, token: &str) -> Result<Vec<Todo>> {
        let state = self.enter()?;
        Self::authorize(&state, token)?;
        Ok(state.todos.clone())
    }

    async fn create_todo(&self, token: &str, new: &NewTodo) -> Result<Todo> {
        let mut state = self.enter()?;
        let owner = Self::authorize(&state, token)?;
        state.next_id += 1;
        let mut created = todo(state.next_id, &new.title, false);
        created.description = new.description.clone().unwrap_or_default();
        created.user_id = owner.id;
        state.todos.insert(0, created.clone());
        Ok(created)
    }

    async fn update_todo(&self, token: &str, id: u64, changes: &TodoChanges) -> Result<Todo> {
        let mut state = self.enter()?;
        Self::authorize(&state, token)?;
        state.last_changes = Some(changes.clone());
        let item = state
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ClientError::NotFound("Todo not found".to_string()))?;
        if let Some(title) = &changes.title {
            item.title = title.clone();
        }
        if let Some(description) = &changes.description {
            item.description = description.clone();
        }
        if let Some(completed) = changes.completed {
            item.completed = completed;
        }
        item.updated_at += Duration::seconds(1);
        Ok(item.clone())
    }

    async fn delete_todo(&self, token: &str, id: u64) -> Result<()> {
        let mut state = self.enter()?;
        Self::authorize(&state, token)?;
        let before = state.todos.len();
        state.todos.retain(|t| t.id != id);
        if state.todos.len() == before {
            return Err(ClientError::NotFound("Todo not found".to_string()));
        }
        Ok(())
    }
}
