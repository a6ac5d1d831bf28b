use crate::error::{ClientError, Result};
use crate::models::{
    AuthResponse, CurrentUserResponse, ErrorBody, GoogleAuthRequest, LoginRequest, NewTodo,
    RegisterRequest, Todo, TodoChanges, TodoResponse, TodosResponse, User,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Remote todo API. Every authenticated call takes the bearer token explicitly.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse>;
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;
    async fn google_auth(&self, credential: &str) -> Result<AuthResponse>;
    async fn current_user(&self, token: &str) -> Result<User>;
    async fn list_todos(&self, token: &str) -> Result<Vec<Todo>>;
    async fn create_todo(&self, token: &str, todo: &NewTodo) -> Result<Todo>;
    async fn update_todo(&self, token: &str, id: u64, changes: &TodoChanges) -> Result<Todo>;
    async fn delete_todo(&self, token: &str, id: u64) -> Result<()>;
}

pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "API URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("todo-tui/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ClientError::ServerUnreachable(e.to_string())
            } else {
                ClientError::Request(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or(text);
        warn!(status = %status, error = %message, "Request rejected by backend");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Unauthorized(message)
            }
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl TodoBackend for HttpBackend {
    async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse> {
        let url = self.url("/auth/register");
        debug!(url = %url, email = %email, "Registering account");

        let body = RegisterRequest {
            email,
            password,
            name,
        };
        self.json(self.http.post(&url).json(&body), "register response")
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = self.url("/auth/login");
        debug!(url = %url, email = %email, "Attempting login");

        let body = LoginRequest { email, password };
        self.json(self.http.post(&url).json(&body), "login response")
            .await
    }

    async fn google_auth(&self, credential: &str) -> Result<AuthResponse> {
        let url = self.url("/auth/google");
        debug!(url = %url, "Exchanging provider credential");

        let body = GoogleAuthRequest { credential };
        self.json(self.http.post(&url).json(&body), "google auth response")
            .await
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let url = self.url("/auth/me");
        debug!(url = %url, "Fetching current user");

        let response: CurrentUserResponse = self
            .json(self.http.get(&url).bearer_auth(token), "current user")
            .await?;
        Ok(response.user)
    }

    async fn list_todos(&self, token: &str) -> Result<Vec<Todo>> {
        let url = self.url("/todos");
        debug!(url = %url, "Fetching todos");

        let response: TodosResponse = self
            .json(self.http.get(&url).bearer_auth(token), "todo list")
            .await?;
        Ok(response.todos)
    }

    async fn create_todo(&self, token: &str, todo: &NewTodo) -> Result<Todo> {
        let url = self.url("/todos");
        debug!(url = %url, title = %todo.title, "Creating todo");

        let response: TodoResponse = self
            .json(
                self.http.post(&url).bearer_auth(token).json(todo),
                "created todo",
            )
            .await?;
        Ok(response.todo)
    }

    async fn update_todo(&self, token: &str, id: u64, changes: &TodoChanges) -> Result<Todo> {
        let url = self.url(&format!("/todos/{}", id));
        debug!(url = %url, changes = ?changes, "Updating todo");

        let response: TodoResponse = self
            .json(
                self.http.patch(&url).bearer_auth(token).json(changes),
                "updated todo",
            )
            .await?;
        Ok(response.todo)
    }

    async fn delete_todo(&self, token: &str, id: u64) -> Result<()> {
        let url = self.url(&format!("/todos/{}", id));
        debug!(url = %url, "Deleting todo");

        // Body is an optional acknowledgement; nothing in it is needed.
        self.send(self.http.delete(&url).bearer_auth(token)).await?;
        Ok(())
    }
}
