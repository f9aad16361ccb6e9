pub mod health;
pub mod login;

pub use health::health;
pub use login::login;

use crate::api::openapi;
use axum::response::Json;

// axum handler for the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}
