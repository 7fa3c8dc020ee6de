//! Backend endpoints behind a trait, so the session and submission flows can
//! run against an in-memory fake as easily as against the real API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    ApiClient, CSRF_TOKEN_PATH, LOGIN_PATH, LOGOUT_PATH, PASSWORD_CHANGE_PATH, QUESTIONNAIRE_PATH,
    REGISTRATION_PATH, USER_PATH,
};
use crate::errors::ApiError;
use crate::models::{Credentials, PasswordChange, ProfileUpdate, RegistrationForm, RegistrationRequest, User};
use crate::wizard::QuestionnaireSubmission;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `GET /auth/csrf-token/`, then the `csrftoken` cookie value.
    async fn fetch_csrf_token(&self) -> Result<Option<String>, ApiError>;

    /// `POST /auth/login/`. The response is not assumed to carry the profile.
    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError>;

    /// `POST /auth/registration/`.
    async fn register(&self, form: &RegistrationForm) -> Result<(), ApiError>;

    /// `POST /auth/logout/` with an empty JSON body.
    async fn logout(&self) -> Result<(), ApiError>;

    /// Session check. `Some` only for a record carrying a non-empty username;
    /// any failure reads as "no session".
    async fn current_user(&self) -> Option<User>;

    /// `GET /auth/user/`, with errors propagated.
    async fn get_profile(&self) -> Result<User, ApiError>;

    /// `PATCH /auth/user/`. `None` when the backend answers 204.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, ApiError>;

    /// `POST /auth/password/change/`.
    async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError>;

    /// `POST /api/questionnaire/` as multipart form data.
    async fn submit_questionnaire(
        &self,
        submission: &QuestionnaireSubmission,
    ) -> Result<Option<Value>, ApiError>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn fetch_csrf_token(&self) -> Result<Option<String>, ApiError> {
        let status = self.touch(CSRF_TOKEN_PATH).await?;
        debug!(%status, "csrf token endpoint");
        Ok(self.csrf_token())
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        // Refresh the CSRF cookie first; a failure here is not fatal, the
        // backend will reject the POST if the token is really missing.
        if let Err(e) = self.touch(CSRF_TOKEN_PATH).await {
            warn!("Failed to refresh CSRF token before login: {e}");
        }
        self.post::<_, Value>(LOGIN_PATH, credentials).await?;
        Ok(())
    }

    async fn register(&self, form: &RegistrationForm) -> Result<(), ApiError> {
        self.post::<_, Value>(REGISTRATION_PATH, &RegistrationRequest::from(form))
            .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.post::<_, Value>(LOGOUT_PATH, &json!({})).await?;
        Ok(())
    }

    async fn current_user(&self) -> Option<User> {
        match self.get::<User>(USER_PATH).await {
            Ok(Some(user)) if user.has_username() => Some(user),
            Ok(_) => {
                debug!("session check returned no username");
                None
            }
            Err(e) => {
                debug!("session check failed: {e}");
                None
            }
        }
    }

    async fn get_profile(&self) -> Result<User, ApiError> {
        self.get::<User>(USER_PATH)
            .await?
            .ok_or_else(|| ApiError::Message {
                status: 204,
                text: "Profile response was empty".to_string(),
            })
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, ApiError> {
        self.patch(USER_PATH, update).await
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.post::<_, Value>(PASSWORD_CHANGE_PATH, change).await?;
        Ok(())
    }

    async fn submit_questionnaire(
        &self,
        submission: &QuestionnaireSubmission,
    ) -> Result<Option<Value>, ApiError> {
        self.post_multipart(QUESTIONNAIRE_PATH, submission.to_form()?)
            .await
    }
}
