use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;

/// Session user as returned by `GET /auth/user/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_pk")]
    pub pk: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_date_as_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl User {
    pub fn has_username(&self) -> bool {
        !self.username.trim().is_empty()
    }

    /// "First Last" when either name is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }

    /// Folds a profile update into the in-memory user.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        // A blank value clears the field, matching how the backend echoes it back.
        if let Some(v) = &update.email {
            self.email = non_blank(v);
        }
        if let Some(v) = &update.first_name {
            self.first_name = non_blank(v);
        }
        if let Some(v) = &update.last_name {
            self.last_name = non_blank(v);
        }
        if let Some(v) = &update.phone_number {
            self.phone_number = non_blank(v);
        }
        if let Some(v) = &update.address {
            self.address = non_blank(v);
        }
        if let Some(v) = update.date_of_birth {
            self.date_of_birth = Some(v);
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

// Optional profile fields never fail the whole record: a session is decided by
// the username alone, so odd values elsewhere read as absent.

fn lenient_pk<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => non_blank(&s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn blank_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    })
}

/// Editable profile fields. `username` and `pk` are never sent.
/// Absent fields are left out of the PATCH body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl ProfileUpdate {
    /// Editable copy of an existing user, as the profile edit form starts out.
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            date_of_birth: user.date_of_birth,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Sign-up form state.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub agreed_to_terms: bool,
}

impl RegistrationForm {
    /// Checks run before `POST /auth/registration/` is attempted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if !self.agreed_to_terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField("Username"));
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField("Email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

/// Body of `POST /auth/registration/`.
#[derive(Debug, Serialize)]
pub struct RegistrationRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password1: &'a str,
    pub password2: &'a str,
}

impl<'a> From<&'a RegistrationForm> for RegistrationRequest<'a> {
    fn from(form: &'a RegistrationForm) -> Self {
        Self {
            username: &form.username,
            email: &form.email,
            password1: &form.password,
            password2: &form.password,
        }
    }
}

/// Body of `POST /auth/password/change/`.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.new_password1.is_empty() {
            return Err(ValidationError::MissingField("New password"));
        }
        if self.new_password1 != self.new_password2 {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}
