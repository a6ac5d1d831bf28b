//! HttpBackend against a mock todo API.

use serde_json::{json, Value};
use todo_tui::models::{NewTodo, TodoChanges};
use todo_tui::{ClientError, HttpBackend, TodoBackend};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_json() -> Value {
    json!({
        "id": 1,
        "email": "ada@example.com",
        "name": "Ada",
        "created_at": "2024-05-01T08:00:00.000001"
    })
}

fn todo_json(id: u64, title: &str, completed: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "completed": completed,
        "created_at": "2024-05-01T09:00:00",
        "updated_at": "2024-05-01T09:00:00",
        "user_id": 1
    })
}

async fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&format!("{}/api", server.uri())).unwrap()
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn test_register_posts_all_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "password": "pw",
                "name": "Ada"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "User created successfully",
                "access_token": "tok",
                "user": user_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = backend(&server)
            .await
            .register("ada@example.com", "pw", "Ada")
            .await
            .unwrap();

        assert_eq!(auth.access_token, "tok");
        assert_eq!(auth.user.name, "Ada");
    }

    #[tokio::test]
    async fn test_login_rejected_surfaces_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let result = backend(&server).await.login("ada@example.com", "nope").await;

        match result {
            Err(ClientError::Unauthorized(msg)) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_google_auth_sends_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/google"))
            .and(body_json(json!({ "credential": "id-token" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gtok",
                "user": user_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = backend(&server).await.google_auth("id-token").await.unwrap();
        assert_eq!(auth.access_token, "gtok");
    }

    #[tokio::test]
    async fn test_current_user_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
            .mount(&server)
            .await;

        let user = backend(&server).await.current_user("tok").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
    }
}

mod todos {
    use super::*;

    #[tokio::test]
    async fn test_list_todos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "todos": [todo_json(2, "b", true), todo_json(1, "a", false)]
            })))
            .mount(&server)
            .await;

        let todos = backend(&server).await.list_todos("tok").await.unwrap();
        let ids: Vec<u64> = todos.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_create_omits_missing_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .and(body_json(json!({ "title": "Buy milk" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "todo": todo_json(5, "Buy milk", false) })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let new = NewTodo {
            title: "Buy milk".to_string(),
            description: None,
        };
        let todo = backend(&server).await.create_todo("tok", &new).await.unwrap();
        assert_eq!(todo.id, 5);
        assert!(!todo.completed);
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/todos/5"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "todo": todo_json(5, "Buy milk", true) })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let changes = TodoChanges {
            completed: Some(true),
            ..Default::default()
        };
        let todo = backend(&server)
            .await
            .update_todo("tok", 5, &changes)
            .await
            .unwrap();
        assert!(todo.completed);
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).await.delete_todo("tok", 5).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_todo_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Todo not found" })),
            )
            .mount(&server)
            .await;

        let result = backend(&server).await.delete_todo("tok", 9).await;
        assert!(matches!(result, Err(ClientError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
            .mount(&server)
            .await;

        match backend(&server).await.list_todos("tok").await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "database is down");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let result = backend(&server).await.list_todos("tok").await;
        assert!(matches!(result, Err(ClientError::Parse(_))));
    }
}

#[tokio::test]
async fn test_unreachable_server() {
    let backend = HttpBackend::new("http://127.0.0.1:9/api").unwrap();
    let result = backend.list_todos("tok").await;
    assert!(matches!(result, Err(ClientError::ServerUnreachable(_))));
}
