//! In-memory backend used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::AuthBackend;
use crate::errors::{ApiError, FieldErrors};
use crate::models::{Credentials, PasswordChange, ProfileUpdate, RegistrationForm, User};
use crate::wizard::QuestionnaireSubmission;

pub struct FakeBackend {
    accounts: Mutex<HashMap<String, String>>,
    session: Mutex<Option<User>>,
    calls: Mutex<Vec<&'static str>>,
    submissions: Mutex<Vec<QuestionnaireSubmission>>,
    csrf_fails: bool,
    blank_session: bool,
    logout_fails: bool,
    submit_error: Option<FieldErrors>,
}

impl FakeBackend {
    pub const CSRF_TOKEN: &'static str = "fake-csrf-token";

    pub fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert("demo".to_string(), "demo1234".to_string());
        Self {
            accounts: Mutex::new(accounts),
            session: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            csrf_fails: false,
            blank_session: false,
            logout_fails: false,
            submit_error: None,
        }
    }

    pub fn with_csrf_failure(mut self) -> Self {
        self.csrf_fails = true;
        self
    }

    /// Login succeeds but the session record comes back without a username.
    pub fn with_blank_session(mut self) -> Self {
        self.blank_session = true;
        self
    }

    pub fn with_logout_failure(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    pub fn with_submit_error(mut self, field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field, vec![message.to_string()]);
        self.submit_error = Some(fields);
        self
    }

    pub fn with_session(self, username: &str) -> Self {
        *self.session.lock().unwrap() = Some(session_user(username));
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<QuestionnaireSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.accounts.lock().unwrap().get(username).cloned()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn signed_in(&self) -> Result<User, ApiError> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Message {
                status: 403,
                text: "Authentication credentials were not provided.".to_string(),
            })
    }
}

fn session_user(username: &str) -> User {
    User {
        pk: Some(1),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        ..Default::default()
    }
}

fn field_error(field: &str, message: &str) -> ApiError {
    let mut fields = FieldErrors::new();
    fields.insert(field, vec![message.to_string()]);
    ApiError::FieldErrors { status: 400, fields }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn fetch_csrf_token(&self) -> Result<Option<String>, ApiError> {
        self.record("csrf");
        if self.csrf_fails {
            return Err(ApiError::Request("connection refused".to_string()));
        }
        Ok(Some(Self::CSRF_TOKEN.to_string()))
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.record("login");
        let valid = self
            .accounts
            .lock()
            .unwrap()
            .get(&credentials.username)
            .is_some_and(|p| *p == credentials.password);
        if !valid {
            return Err(field_error(
                "non_field_errors",
                "Unable to log in with provided credentials.",
            ));
        }
        let user = if self.blank_session {
            User::default()
        } else {
            session_user(&credentials.username)
        };
        *self.session.lock().unwrap() = Some(user);
        Ok(())
    }

    async fn register(&self, form: &RegistrationForm) -> Result<(), ApiError> {
        self.record("register");
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&form.username) {
            return Err(field_error(
                "username",
                "A user with that username already exists.",
            ));
        }
        accounts.insert(form.username.clone(), form.password.clone());
        Ok(())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record("logout");
        if self.logout_fails {
            return Err(ApiError::Message {
                status: 500,
                text: "API error: 500".to_string(),
            });
        }
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn current_user(&self) -> Option<User> {
        self.record("user");
        self.session
            .lock()
            .unwrap()
            .clone()
            .filter(User::has_username)
    }

    async fn get_profile(&self) -> Result<User, ApiError> {
        self.record("profile");
        self.signed_in()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, ApiError> {
        self.record("update_profile");
        let mut user = self.signed_in()?;
        user.apply(update);
        *self.session.lock().unwrap() = Some(user.clone());
        Ok(Some(user))
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        self.record("change_password");
        let user = self.signed_in()?;
        self.accounts
            .lock()
            .unwrap()
            .insert(user.username, change.new_password1.clone());
        Ok(())
    }

    async fn submit_questionnaire(
        &self,
        submission: &QuestionnaireSubmission,
    ) -> Result<Option<Value>, ApiError> {
        self.record("submit");
        self.signed_in()?;
        if let Some(fields) = &self.submit_error {
            return Err(ApiError::FieldErrors {
                status: 400,
                fields: fields.clone(),
            });
        }
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(Some(json!({ "id": 42 })))
    }
}
