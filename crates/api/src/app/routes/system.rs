use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
