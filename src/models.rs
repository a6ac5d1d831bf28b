use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// User record as returned by the auth endpoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

// Todo item owned by a user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub user_id: u64,
}

impl Todo {
    pub fn was_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GoogleAuthRequest<'a> {
    pub credential: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct TodosResponse {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Deserialize)]
pub struct TodoResponse {
    pub todo: Todo,
}

// Body of a non-2xx response
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update body. Absent fields are left untouched by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TodoChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn toggle(todo: &Todo) -> Self {
        TodoChanges {
            completed: Some(!todo.completed),
            ..Default::default()
        }
    }

    /// Drops every field that already matches `todo`.
    pub fn against(self, todo: &Todo) -> Self {
        TodoChanges {
            title: self.title.filter(|t| *t != todo.title),
            description: self.description.filter(|d| *d != todo.description),
            completed: self.completed.filter(|c| *c != todo.completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps arrive either as RFC 3339 or as naive ISO strings in UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Todo {
        serde_json::from_value(json!({
            "id": 7,
            "title": "Buy milk",
            "description": "",
            "completed": false,
            "created_at": "2024-03-01T09:30:00.123456",
            "updated_at": "2024-03-01T09:30:00.123456",
            "user_id": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let todo = sample();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            todo.created_at.timestamp(),
            expected.timestamp(),
            "naive timestamps should be read as UTC"
        );
    }

    #[test]
    fn test_rfc3339_timestamp_with_offset() {
        let parsed = timestamp::parse("2024-03-01T11:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_garbage_timestamp_rejected() {
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_null_description_becomes_empty() {
        let todo: Todo = serde_json::from_value(json!({
            "id": 1,
            "title": "x",
            "description": null,
            "completed": true,
            "created_at": "2024-03-01T09:30:00Z",
            "updated_at": "2024-03-02T09:30:00Z",
            "user_id": 1
        }))
        .unwrap();
        assert_eq!(todo.description, "");
        assert!(todo.was_edited());
    }

    #[test]
    fn test_changes_only_serialize_present_fields() {
        let changes = TodoChanges::toggle(&sample());
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({ "completed": true })
        );
    }

    #[test]
    fn test_changes_against_drops_unchanged() {
        let todo = sample();
        let changes = TodoChanges {
            title: Some("Buy milk".to_string()),
            description: Some("2 litres".to_string()),
            completed: None,
        }
        .against(&todo);
        assert_eq!(changes.title, None);
        assert_eq!(changes.description.as_deref(), Some("2 litres"));
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_error_body_prefers_error_field() {
        let body: ErrorBody =
            serde_json::from_value(json!({ "error": "Title is required", "message": "x" }))
                .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Title is required"));
    }
}
