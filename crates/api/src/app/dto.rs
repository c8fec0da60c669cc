use core::str::FromStr;

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, async_trait};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use bazaar_core::DomainError;
use bazaar_parties::{UserProfile, Vendor};

use crate::app::errors::ApiError;

// -------------------------
// Response envelope
// -------------------------

/// `{status, message?, count?, stats?, data?}` as every endpoint returns it.
#[derive(Debug, Serialize)]
pub struct Envelope<D = (), S = ()> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<S>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<D>,
}

impl Envelope {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            count: None,
            stats: None,
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            ..Self::message(message)
        }
    }
}

impl<D> Envelope<D> {
    pub fn data(data: D) -> Self {
        Self {
            status: "success",
            message: None,
            count: None,
            stats: None,
            data: Some(data),
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// List payload with its `count`.
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::data(items)
        }
    }
}

impl<D, S> Envelope<D, S> {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_stats<T>(self, stats: T) -> Envelope<D, T> {
        Envelope {
            status: self.status,
            message: self.message,
            count: self.count,
            stats: Some(stats),
            data: self.data,
        }
    }

    pub fn created(self) -> (StatusCode, Self) {
        (StatusCode::CREATED, self)
    }
}

impl<D: Serialize, S: Serialize> IntoResponse for Envelope<D, S> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

// -------------------------
// Request extraction
// -------------------------

/// JSON body whose rejections use the error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Parse a path or query value, reporting failures as 400s.
pub fn parse<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

/// Parse an optional filter; empty strings and `all` mean "no filter".
pub fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}

// -------------------------
// Shared payloads
// -------------------------

#[derive(Debug, Serialize)]
pub struct SessionPayload {
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Free-form list filters; each route parses the keys it understands.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
    pub payment_status: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

impl ListParams {
    pub fn price(raw: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| ApiError::BadRequest(format!("{name} must be a whole amount in paise"))),
        }
    }

    pub fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use bazaar_core::Category;
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(Envelope::message("Logged out successfully")).unwrap();
        assert_eq!(body, json!({"status": "success", "message": "Logged out successfully"}));

        let body = serde_json::to_value(Envelope::list(vec![1, 2]).with_stats(json!({"total": 2}))).unwrap();
        assert_eq!(
            body,
            json!({"status": "success", "count": 2, "stats": {"total": 2}, "data": [1, 2]})
        );
    }

    #[test]
    fn error_envelope_has_error_status() {
        let body = serde_json::to_value(Envelope::error("Route not found")).unwrap();
        assert_eq!(body, json!({"status": "error", "message": "Route not found"}));
    }

    #[test]
    fn filters_treat_all_as_absent() {
        assert_eq!(parse_filter::<Category>(Some("all")).unwrap(), None);
        assert_eq!(parse_filter::<Category>(None).unwrap(), None);
        assert_eq!(parse_filter::<Category>(Some("books")).unwrap(), Some(Category::Books));
        assert!(parse_filter::<Category>(Some("gadgets")).is_err());
    }

    #[test]
    fn prices_must_be_integers() {
        assert_eq!(ListParams::price(Some("1500"), "minPrice").unwrap(), Some(1500));
        assert!(ListParams::price(Some("15.5"), "minPrice").is_err());
    }
}
