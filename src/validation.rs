use once_cell::sync::Lazy;
use regex::Regex;
use rocket::serde::json::{self, Json};
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Question slugs: lowercase words of letters and digits joined by single hyphens.
pub static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// Turns a JSON data guard result into a validated payload or a 400.
pub trait JsonValidateExt<T> {
    fn validate_body(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Result<Json<T>, json::Error<'_>> {
    fn validate_body(self) -> Result<T, AppError> {
        let payload = self
            .map_err(|err| AppError::Validation(format!("Invalid JSON payload: {}", err)))?
            .into_inner();

        payload
            .validate()
            .map_err(|errors| AppError::Validation(describe(&errors)))?;

        Ok(payload)
    }
}

/// Flattens field errors into a stable `field: message; field: message` string.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, field_errors)| {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();

    fields.sort();
    fields.join("; ")
}

/// Required, non-empty scalar query parameter.
pub fn required_param<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(regex(path = *SLUG_REGEX, message = "must be a lowercase slug"))]
        slug: String,
    }

    fn parsed(name: &str, slug: &str) -> Result<Json<Payload>, json::Error<'static>> {
        Ok(Json(Payload {
            name: name.to_string(),
            slug: slug.to_string(),
        }))
    }

    #[test]
    fn test_valid_payload_passes() {
        let payload = parsed("Two Sum", "two-sum").validate_body().expect("valid");
        assert_eq!(payload.slug, "two-sum");
    }

    #[test]
    fn test_invalid_fields_are_reported() {
        let err = match parsed("", "Two Sum").validate_body() {
            Err(AppError::Validation(msg)) => msg,
            _ => panic!("expected a validation error"),
        };

        assert_eq!(
            err,
            "name: must not be empty; slug: must be a lowercase slug"
        );
    }

    #[test]
    fn test_slug_pattern() {
        for good in ["3sum", "two-sum", "a", "lru-cache-2"] {
            assert!(SLUG_REGEX.is_match(good), "{} should match", good);
        }
        for bad in ["", "Two-Sum", "two--sum", "-two", "two sum", "two_sum"] {
            assert!(!SLUG_REGEX.is_match(bad), "{} should not match", bad);
        }
    }

    #[test]
    fn test_required_param() {
        assert_eq!(required_param(Some(" 3sum "), "Slug").unwrap(), "3sum");
        assert!(matches!(
            required_param(Some("  "), "Slug"),
            Err(AppError::Validation(msg)) if msg == "Slug is required"
        ));
        assert!(required_param(None, "Date").is_err());
    }
}
