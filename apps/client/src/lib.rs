//! Client library for the ResumeRise backend: CSRF bootstrap, cookie-based
//! auth session, resume upload and the job-context questionnaire.

pub mod api;
pub mod config;
pub mod consent;
pub mod csrf;
pub mod errors;
pub mod models;
pub mod navigation;
pub mod session;
pub mod state;
pub mod submission;
pub mod upload;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, AuthBackend};
pub use config::Config;
pub use errors::{ApiError, AppError, FieldErrors, ValidationError};
pub use session::{AuthSession, AuthSnapshot, AuthStatus};
pub use state::AppState;
