//! Request extractors that validate payloads before handlers run

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::AppError;

/// Field-level constraints for an inbound payload.
///
/// Violations are reported as `{"field": .., "error": ..}` objects, one per field.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<Value>>;
}

fn violation(field: &str, error: String) -> Value {
    json!({ "field": field, "error": error })
}

/// Check that `value` holds between `min` and `max` characters, inclusive.
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Option<Value> {
    let len = value.chars().count();
    if len < min {
        Some(violation(
            field,
            format!("must be at least {} characters", min),
        ))
    } else if len > max {
        Some(violation(
            field,
            format!("must be at most {} characters", max),
        ))
    } else {
        None
    }
}

/// Check that `value` is strictly greater than `bound`.
pub fn check_greater_than(field: &str, value: i64, bound: i64) -> Option<Value> {
    (value <= bound).then(|| violation(field, format!("must be greater than {}", bound)))
}

/// Report a field that has to be present.
pub fn require<T>(field: &str, value: Option<T>) -> Result<T, Value> {
    value.ok_or_else(|| violation(field, "field required".to_string()))
}

/// JSON body extractor that runs [`Validate`] before handing the payload over.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::validation(
                    vec![json!({ "error": rejection.body_text() })],
                    "request body could not be decoded",
                )
            })?;

        payload
            .validate()
            .map_err(|details| AppError::validation(details, "request validation failed"))?;

        Ok(Self(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        name: String,
        amount: i64,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), Vec<Value>> {
            let errors: Vec<Value> = [
                check_length("name", &self.name, 1, 3),
                check_greater_than("amount", self.amount, 0),
            ]
            .into_iter()
            .flatten()
            .collect();

            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors)
            }
        }
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(check_length("title", "ééé", 1, 3).is_none());
        assert!(check_length("title", "", 1, 3).is_some());
        assert!(check_length("title", "abcd", 1, 3).is_some());
    }

    #[test]
    fn greater_than_is_strict() {
        assert!(check_greater_than("price", 10, 10).is_some());
        assert!(check_greater_than("price", 11, 10).is_none());
    }

    #[test]
    fn require_reports_missing_field() {
        assert_eq!(require("book_id", Some(1)).unwrap(), 1);
        let missing = require::<i32>("book_id", None).unwrap_err();
        assert_eq!(missing["field"], "book_id");
    }

    #[tokio::test]
    async fn accepts_valid_payload() {
        let ValidatedJson(probe) =
            ValidatedJson::<Probe>::from_request(json_request(r#"{"name":"ab","amount":3}"#), &())
                .await
                .unwrap();
        assert_eq!(probe.name, "ab");
        assert_eq!(probe.amount, 3);
    }

    #[tokio::test]
    async fn reports_every_violated_field() {
        let err =
            ValidatedJson::<Probe>::from_request(json_request(r#"{"name":"","amount":0}"#), &())
                .await
                .unwrap_err();

        match &err {
            AppError::Validation { details, .. } => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0]["field"], "name");
                assert_eq!(details[1]["field"], "amount");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_validation_error() {
        let err = ValidatedJson::<Probe>::from_request(json_request(r#"{"name":"ab"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
