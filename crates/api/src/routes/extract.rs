//! Extractors whose rejections use the API's JSON error shape.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::ValidationError;

/// `Json<T>` that rejects with a 400 `{"error": ...}` body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ValidationError::new("body", rejection.body_text()).into()),
        }
    }
}

/// `Query<T>` that rejects with a 400 `{"error": ...}` body.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ValidationError::new("query", rejection.body_text()).into()),
        }
    }
}

/// Parse an optional query flag. Absent or blank is `false`.
pub fn parse_flag(raw: Option<&str>, field: &'static str) -> Result<bool, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(_) => Err(ValidationError::new(field, "must be true or false")),
    }
}

/// Parse an optional query value with `FromStr`. Absent or blank is `None`.
pub fn parse_optional<T>(
    raw: Option<&str>,
    field: &'static str,
) -> Result<Option<T>, ValidationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|e| ValidationError::new(field, e.to_string())))
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use larder_core::SortKey;

    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(!parse_flag(None, "all").unwrap());
        assert!(parse_flag(Some("TRUE"), "all").unwrap());
        assert!(!parse_flag(Some("0"), "all").unwrap());
        assert!(parse_flag(Some("yes"), "all").is_err());
    }

    #[test]
    fn test_parse_optional() {
        assert_eq!(
            parse_optional::<SortKey>(Some("expiry"), "sort").unwrap(),
            Some(SortKey::Expiry)
        );
        assert_eq!(parse_optional::<SortKey>(Some(" "), "sort").unwrap(), None);
        let err = parse_optional::<SortKey>(Some("colour"), "sort").unwrap_err();
        assert_eq!(err.field, "sort");
    }
}
