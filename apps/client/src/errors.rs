use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Field-level validation messages returned by the backend, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, messages: Vec<String>) {
        self.0.insert(field.into(), messages);
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// One-line form used in banners: `field: a, b; other: c`.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// One bullet per message, with user-facing field labels.
    pub fn bullet_lines(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| {
                let label = field_label(field);
                messages.iter().map(move |m| format!("{label}: {m}"))
            })
            .collect()
    }

    /// Builds a field map from a decoded JSON object.
    /// Bare strings become one-element lists; other values are kept as JSON text.
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let mut fields = FieldErrors::new();
        for (field, value) in object {
            let messages = match value {
                Value::Array(items) => items.iter().map(json_message).collect(),
                other => vec![json_message(other)],
            };
            fields.insert(field.clone(), messages);
        }
        fields
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

fn json_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_label(field: &str) -> &str {
    match field {
        "password1" => "Password",
        "password2" => "Confirm password",
        "non_field_errors" => "Error",
        other => other,
    }
}

/// Errors produced at the API-client boundary.
///
/// Whether a failed response carries a plain message or per-field validation
/// messages is decided once, when the response is unwrapped.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{text}")]
    Message { status: u16, text: String },

    #[error("{fields}")]
    FieldErrors { status: u16, fields: FieldErrors },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Message { status, .. } | ApiError::FieldErrors { status, .. } => {
                Some(*status)
            }
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::FieldErrors { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Message suitable for a single-line banner or toast.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            ApiError::Message { text, .. } => text.clone(),
            ApiError::FieldErrors { fields, .. } => fields.summary(),
            ApiError::Decode(_) => "The server returned an unexpected response.".to_string(),
            ApiError::Request(msg) => msg.clone(),
        }
    }
}

/// Turns a non-2xx response body into a tagged error.
///
/// - object with a string `detail` or `message` → `Message`
/// - any other object → `FieldErrors`
/// - anything else (non-JSON, arrays, scalars, empty) → `Message("API error: <status>")`
pub fn unwrap_error_response(status: StatusCode, body: &[u8]) -> ApiError {
    let code = status.as_u16();
    let fallback = || ApiError::Message {
        status: code,
        text: format!("API error: {code}"),
    };

    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return fallback(),
    };

    let Value::Object(object) = value else {
        return fallback();
    };

    for key in ["detail", "message"] {
        if let Some(Value::String(text)) = object.get(key) {
            return ApiError::Message {
                status: code,
                text: text.clone(),
            };
        }
    }

    if object.is_empty() {
        return fallback();
    }

    ApiError::FieldErrors {
        status: code,
        fields: FieldErrors::from_json_object(&object),
    }
}

/// Client-side checks that short-circuit before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("You must agree to the terms of service and privacy policy")]
    TermsNotAccepted,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("File size exceeds 5MB limit. Please select a smaller file.")]
    FileTooLarge { size: u64 },

    #[error("Invalid file type. Please select a PDF, DOCX, or TXT file.")]
    UnsupportedFileType { content_type: String },

    #[error("Please select a file first")]
    NoFileSelected,
}

/// Flow-level error returned by session, wizard and submission operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Login failed. Please try again.")]
    SessionNotEstablished,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Message rendered inline next to the form that triggered the error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Api(e) => e.field_errors(),
            _ => None,
        }
    }

    /// Lines for an inline error block: one bullet per field message when
    /// the backend returned a field map, otherwise the single message.
    pub fn inline_messages(&self) -> Vec<String> {
        match self.field_errors() {
            Some(fields) => fields.bullet_lines(),
            None => vec![self.user_message()],
        }
    }
}
