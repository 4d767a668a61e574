use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// Error body shared by every endpoint: `{"error": ...}` plus optional per-field detail
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }

    pub fn with_fields(error: impl Into<String>, fields: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            fields: Some(fields),
        }
    }
}

fn bad_request(error_response: ErrorResponse) -> actix_web::Error {
    actix_web::error::InternalError::from_response(
        "",
        HttpResponse::BadRequest().json(error_response),
    )
    .into()
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
///
/// `limit` caps JSON bodies in bytes; the extractor does not read `web::PayloadConfig`.
pub fn json_config(limit: usize) -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let mut fields = serde_json::Map::new();

            match err {
                actix_web_validator::Error::Validate(validation_errors) => {
                    for (field, errors) in validation_errors.field_errors() {
                        let messages: Vec<String> = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
                            })
                            .collect();
                        fields.insert(
                            field.to_string(),
                            serde_json::json!({"errors": messages})
                        );
                    }

                    bad_request(ErrorResponse::with_fields(
                        "Validation failed",
                        serde_json::Value::Object(fields),
                    ))
                }
                actix_web_validator::Error::Deserialize(de_err) => {
                    let err_string = de_err.to_string();

                    let (error, message) = if err_string.contains("missing field `title`")
                        || err_string.contains("missing field `company`")
                    {
                        (
                            "Title and company are required fields",
                            err_string.clone(),
                        )
                    } else if err_string.contains("EOF while parsing") {
                        (
                            "Request validation failed",
                            "Request body is empty. Expected JSON payload".to_string(),
                        )
                    } else if err_string.contains("invalid job status") {
                        (
                            "Request validation failed",
                            "Invalid status. Allowed values are 0, 1, 2 and 3".to_string(),
                        )
                    } else {
                        ("Request validation failed", "Invalid JSON format".to_string())
                    };
                    fields.insert("message".to_string(), serde_json::json!(message));

                    bad_request(ErrorResponse::with_fields(
                        error,
                        serde_json::Value::Object(fields),
                    ))
                }
                _ => {
                    fields.insert(
                        "message".to_string(),
                        serde_json::json!("Validation error")
                    );

                    bad_request(ErrorResponse::with_fields(
                        "Validation failed",
                        serde_json::Value::Object(fields),
                    ))
                }
            }
        })
}
