use actix_web::HttpResponse;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fields: serde_json::Value,
}

/// Flatten validator errors into `{field: {errors: [..]}}`
///
/// Struct-level rules report under `__all__`.
pub fn field_messages(validation_errors: &ValidationErrors) -> serde_json::Map<String, serde_json::Value> {
    let mut fields = serde_json::Map::new();
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
        fields.insert(field.to_string(), serde_json::json!({"errors": messages}));
    }
    fields
}

fn deserialize_message(err_string: &str) -> &'static str {
    if err_string.contains("EOF while parsing") {
        "Request body is empty. Expected JSON payload"
    } else if err_string.contains("unknown variant") {
        "Invalid enum value. Check allowed values for this field"
    } else if err_string.contains("expected HH:mm") {
        "Invalid time. Expected 24-hour HH:mm"
    } else if err_string.contains("expected YYYY-MM-DD") {
        "Invalid date. Expected YYYY-MM-DD"
    } else {
        "Invalid request format"
    }
}

fn bad_request(err: actix_web_validator::Error) -> actix_web::Error {
    let mut fields = serde_json::Map::new();

    let error_response = match err {
        actix_web_validator::Error::Validate(validation_errors) => ErrorResponse {
            error: "Validation failed".to_string(),
            fields: serde_json::Value::Object(field_messages(&validation_errors)),
        },
        actix_web_validator::Error::Deserialize(de_err) => {
            fields.insert(
                "message".to_string(),
                serde_json::json!(deserialize_message(&de_err.to_string())),
            );
            ErrorResponse {
                error: "Request validation failed".to_string(),
                fields: serde_json::Value::Object(fields),
            }
        }
        _ => {
            fields.insert("message".to_string(), serde_json::json!("Validation error"));
            ErrorResponse {
                error: "Validation failed".to_string(),
                fields: serde_json::Value::Object(fields),
            }
        }
    };

    actix_web::error::InternalError::from_response("", HttpResponse::BadRequest().json(error_response)).into()
}

/// JSON body config with the project-wide validation error shape
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| bad_request(err))
}

/// Query string config with the project-wide validation error shape
pub fn query_config() -> actix_web_validator::QueryConfig {
    actix_web_validator::QueryConfig::default().error_handler(|err, _req| bad_request(err))
}
