use crate::{attributes::AttributeSet, error::AuthError, verifier::AuthSource};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct Credentials {
    username: String,
    #[schema(format = Password)]
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = Credentials,
    responses (
        (status = 200, description = "Login successful", body = AttributeSet, content_type = "application/json"),
        (status = 400, description = "Missing username or password", body = String),
        (status = 401, description = "Wrong username or password", body = String),
        (status = 500, description = "Authentication system failure", body = String),
    ),
    tag= "login"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    source: Extension<Arc<dyn AuthSource>>,
    payload: Option<Json<Credentials>>,
) -> Response {
    let credentials: Credentials = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("credentials: {:?}", credentials);

    if credentials.username.is_empty() || credentials.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing username or password".to_string(),
        )
            .into_response();
    }

    let password = SecretString::from(credentials.password);

    match source.authenticate(&credentials.username, &password).await {
        Ok(attributes) => (StatusCode::OK, Json(attributes)).into_response(),

        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            AuthError::InvalidCredentials.to_string(),
        )
            .into_response(),

        Err(e) => {
            error!("Authentication source failed: {e:?}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "authentication system failure".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::api::router;
    use crate::verifier::{tests::MemoryStore, CredentialVerifier};
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post(store: MemoryStore, body: &str) -> Response {
        router(Arc::new(CredentialVerifier::new("main", 6, store)))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_login_ok_returns_attributes() {
        let store = MemoryStore::with_user("alice", "correct", 2);
        let response = post(
            store.clone(),
            r#"{"username": "alice", "password": "correct"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json, json!({"group": ["50"], "username": ["alice"]}));
        assert_eq!(store.attempts("alice"), 0);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = MemoryStore::with_user("alice", "correct", 0);
        let response = post(
            store.clone(),
            r#"{"username": "alice", "password": "nope"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "wrong username or password");
        assert_eq!(store.attempts("alice"), 1);
    }

    #[tokio::test]
    async fn test_login_unknown_user_looks_like_wrong_password() {
        let store = MemoryStore::with_user("alice", "correct", 0);
        let response = post(store, r#"{"username": "bob", "password": "correct"}"#).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "wrong username or password");
    }

    #[tokio::test]
    async fn test_login_empty_fields() {
        let store = MemoryStore::with_user("alice", "correct", 0);
        let response = post(store.clone(), r#"{"username": "", "password": "x"}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post(store.clone(), r#"{"username": "alice", "password": ""}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.attempts("alice"), 0);
    }

    #[tokio::test]
    async fn test_login_missing_payload() {
        let response = post(MemoryStore::default(), "not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Missing payload");
    }

    #[tokio::test]
    async fn test_login_store_down_is_500() {
        let store = MemoryStore {
            fail_connect: true,
            ..MemoryStore::default()
        };
        let response = post(store, r#"{"username": "alice", "password": "x"}"#).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "authentication system failure");
    }
}
