//! Process-wide authentication state, synchronized from the backend's
//! session-check endpoint.
//!
//! States: `Unknown → Checking → { Authenticated, Unauthenticated }`.
//! `Authenticated` is only ever entered with a session record that carries a
//! non-empty username.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::AuthBackend;
use crate::csrf::CsrfReady;
use crate::errors::AppError;
use crate::models::{Credentials, PasswordChange, ProfileUpdate, RegistrationForm, User};
use crate::navigation::{Navigator, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Unknown,
    Checking,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub status: AuthStatus,
    pub user: Option<User>,
    /// Callers disable submit controls while this is set.
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self {
            status: AuthStatus::Unknown,
            user: None,
            is_loading: true,
            error: None,
        }
    }
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

pub struct AuthSession {
    backend: Arc<dyn AuthBackend>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthSnapshot>,
}

impl AuthSession {
    pub fn new(backend: Arc<dyn AuthBackend>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            backend,
            navigator,
            state: RwLock::new(AuthSnapshot::default()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    pub fn navigate(&self, route: Route) {
        self.navigator.navigate(route);
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    /// Initial session check. Requires CSRF initialization to have finished.
    pub async fn check_session(&self, _csrf: &CsrfReady) -> AuthStatus {
        {
            let mut state = self.state.write().await;
            state.status = AuthStatus::Checking;
            state.is_loading = true;
        }

        let user = self.backend.current_user().await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match user {
            Some(user) => {
                info!(username = %user.username, "session authenticated");
                state.status = AuthStatus::Authenticated;
                state.user = Some(user);
            }
            None => {
                info!("no active session");
                state.status = AuthStatus::Unauthenticated;
                state.user = None;
            }
        }
        state.status
    }

    /// Logs in and redirects to the profile page.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AppError> {
        self.login_with_redirect(credentials, Route::Profile).await
    }

    pub async fn login_with_redirect(
        &self,
        credentials: &Credentials,
        route: Route,
    ) -> Result<User, AppError> {
        let user = self.sign_in(credentials).await?;
        self.navigator.navigate(route);
        Ok(user)
    }

    /// Login without a navigation side effect, for flows that redirect on
    /// their own once follow-up work is done.
    ///
    /// The login response is not trusted to describe the user: the session is
    /// re-checked, and only a record with a username authenticates.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User, AppError> {
        self.begin().await;

        let outcome = self.authenticate(credentials).await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match outcome {
            Ok(user) => {
                info!(username = %user.username, "login succeeded");
                state.status = AuthStatus::Authenticated;
                state.user = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!("Login failed: {e}");
                state.status = AuthStatus::Unauthenticated;
                state.user = None;
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<User, AppError> {
        self.backend.login(credentials).await?;
        self.backend
            .current_user()
            .await
            .ok_or(AppError::SessionNotEstablished)
    }

    /// Clears local state whether or not the backend call succeeds, then goes home.
    pub async fn logout(&self) {
        self.begin().await;

        if let Err(e) = self.backend.logout().await {
            warn!("Logout request failed, clearing local session anyway: {e}");
        }

        {
            let mut state = self.state.write().await;
            state.status = AuthStatus::Unauthenticated;
            state.user = None;
            state.is_loading = false;
        }
        info!("logged out");
        self.navigator.navigate(Route::Home);
    }

    /// Creates an account. Validation runs before any network call.
    pub async fn register(&self, form: &RegistrationForm) -> Result<(), AppError> {
        if let Err(e) = form.validate() {
            self.state.write().await.error = Some(e.to_string());
            return Err(e.into());
        }

        self.begin().await;
        let outcome = self.backend.register(form).await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match outcome {
            Ok(()) => {
                info!(username = %form.username, "registration succeeded");
                Ok(())
            }
            Err(e) => {
                warn!("Registration failed: {e}");
                state.error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Sign-up page flow: register, then log straight in.
    pub async fn register_and_login(
        &self,
        form: &RegistrationForm,
        route: Route,
    ) -> Result<User, AppError> {
        self.register(form).await?;
        self.login_with_redirect(&form.credentials(), route).await
    }

    /// Gate for profile pages: unauthenticated visitors are sent to sign-in.
    pub async fn require_authenticated(&self) -> Result<User, AppError> {
        let user = {
            let state = self.state.read().await;
            state.user.clone().filter(|_| state.is_authenticated())
        };
        match user {
            Some(user) => Ok(user),
            None => {
                self.navigator.navigate(Route::SignIn);
                Err(AppError::NotAuthenticated)
            }
        }
    }

    /// Fresh profile from the backend; errors propagate rather than logging out.
    pub async fn load_profile(&self) -> Result<User, AppError> {
        self.require_authenticated().await?;
        match self.backend.get_profile().await {
            Ok(user) => {
                self.state.write().await.user = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!("Failed to load profile: {e}");
                self.state.write().await.error =
                    Some("Failed to load profile data. Please try again.".to_string());
                Err(e.into())
            }
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AppError> {
        let mut user = self.require_authenticated().await?;
        let response = self.backend.update_profile(update).await.map_err(|e| {
            warn!("Failed to update profile: {e}");
            AppError::from(e)
        })?;

        match response {
            Some(updated) if updated.has_username() => user = updated,
            _ => user.apply(update),
        }

        let mut state = self.state.write().await;
        state.user = Some(user.clone());
        state.error = None;
        info!(username = %user.username, "profile updated");
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), AppError> {
        change.validate().map_err(AppError::from)?;
        self.require_authenticated().await?;
        self.backend.change_password(change).await?;
        info!("password changed");
        Ok(())
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.error = None;
        state.is_loading = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csrf::CsrfManager;
    use crate::errors::ValidationError;
    use crate::navigation::RecordingNavigator;
    use crate::testing::FakeBackend;

    fn session(backend: FakeBackend) -> (AuthSession, Arc<FakeBackend>, Arc<RecordingNavigator>) {
        let backend = Arc::new(backend);
        let navigator = Arc::new(RecordingNavigator::default());
        let session = AuthSession::new(backend.clone(), navigator.clone());
        (session, backend, navigator)
    }

    async fn ready(backend: &FakeBackend) -> CsrfReady {
        CsrfManager::new().initialize(backend).await
    }

    #[tokio::test]
    async fn test_initial_state_is_unknown_and_loading() {
        let (session, _, _) = session(FakeBackend::new());
        let snap = session.snapshot().await;
        assert_eq!(snap.status, AuthStatus::Unknown);
        assert!(snap.is_loading);
        assert!(!snap.is_authenticated());
    }

    #[tokio::test]
    async fn test_check_session_runs_after_csrf() {
        let (session, backend, _) = session(FakeBackend::new().with_session("demo"));
        let csrf = ready(&backend).await;
        assert_eq!(session.check_session(&csrf).await, AuthStatus::Authenticated);
        assert_eq!(backend.calls(), vec!["csrf", "user"]);
        assert_eq!(session.user().await.unwrap().username, "demo");
        assert!(!session.snapshot().await.is_loading);
    }

    #[tokio::test]
    async fn test_check_session_without_cookie_is_unauthenticated() {
        let (session, backend, _) = session(FakeBackend::new());
        let csrf = ready(&backend).await;
        assert_eq!(session.check_session(&csrf).await, AuthStatus::Unauthenticated);
        assert!(session.user().await.is_none());
    }

    #[tokio::test]
    async fn test_demo_login_authenticates_and_goes_to_profile() {
        let (session, backend, navigator) = session(FakeBackend::new());
        let csrf = ready(&backend).await;
        session.check_session(&csrf).await;

        let user = session
            .login(&Credentials::new("demo", "demo1234"))
            .await
            .unwrap();

        assert_eq!(user.username, "demo");
        assert!(session.is_authenticated().await);
        assert_eq!(navigator.last(), Some(Route::Profile));
        assert_eq!(backend.calls(), vec!["csrf", "user", "login", "user"]);
    }

    #[tokio::test]
    async fn test_login_without_username_in_session_fails() {
        let (session, _, navigator) = session(FakeBackend::new().with_blank_session());

        let err = session
            .login(&Credentials::new("demo", "demo1234"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SessionNotEstablished));
        let snap = session.snapshot().await;
        assert!(!snap.is_authenticated());
        assert!(snap.user.is_none());
        assert!(!snap.is_loading);
        assert_eq!(snap.error.as_deref(), Some("Login failed. Please try again."));
        assert!(navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_bad_credentials_surface_backend_message() {
        let (session, backend, navigator) = session(FakeBackend::new());

        let err = session
            .login(&Credentials::new("demo", "wrong"))
            .await
            .unwrap_err();

        assert!(err.field_errors().is_some());
        let snap = session.snapshot().await;
        assert_eq!(snap.status, AuthStatus::Unauthenticated);
        assert_eq!(
            snap.error.as_deref(),
            Some("non_field_errors: Unable to log in with provided credentials.")
        );
        // no session re-check after a rejected login
        assert_eq!(backend.calls(), vec!["login"]);
        assert!(navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_logout_when_unauthenticated_is_idempotent() {
        let (session, _, navigator) = session(FakeBackend::new());
        session.logout().await;
        session.logout().await;
        let snap = session.snapshot().await;
        assert_eq!(snap.status, AuthStatus::Unauthenticated);
        assert!(snap.user.is_none());
        assert!(!snap.is_loading);
        assert_eq!(navigator.visited(), vec![Route::Home, Route::Home]);
    }

    #[tokio::test]
    async fn test_logout_clears_state_even_if_backend_fails() {
        let (session, backend, navigator) =
            session(FakeBackend::new().with_session("demo").with_logout_failure());
        let csrf = ready(&backend).await;
        session.check_session(&csrf).await;
        assert!(session.is_authenticated().await);

        session.logout().await;

        assert!(!session.is_authenticated().await);
        assert!(session.user().await.is_none());
        assert_eq!(navigator.last(), Some(Route::Home));
    }

    #[tokio::test]
    async fn test_register_mismatch_makes_no_network_call() {
        let (session, backend, _) = session(FakeBackend::new());
        let form = RegistrationForm {
            username: "newbie".to_string(),
            email: "newbie@example.com".to_string(),
            password: "abc".to_string(),
            confirm_password: "xyz".to_string(),
            agreed_to_terms: true,
        };

        let err = session.register(&form).await.unwrap_err();

        assert_eq!(err.to_string(), "Passwords do not match");
        assert_eq!(
            session.snapshot().await.error.as_deref(),
            Some("Passwords do not match")
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_login_auto_signs_in() {
        let (session, backend, navigator) = session(FakeBackend::new());
        let form = RegistrationForm {
            username: "newbie".to_string(),
            email: "newbie@example.com".to_string(),
            password: "s3cret-pass".to_string(),
            confirm_password: "s3cret-pass".to_string(),
            agreed_to_terms: true,
        };

        let user = session
            .register_and_login(&form, Route::Profile)
            .await
            .unwrap();

        assert_eq!(user.username, "newbie");
        assert_eq!(backend.calls(), vec!["register", "login", "user"]);
        assert_eq!(navigator.last(), Some(Route::Profile));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_reports_field_errors() {
        let (session, _, _) = session(FakeBackend::new());
        let form = RegistrationForm {
            username: "demo".to_string(),
            email: "demo@example.com".to_string(),
            password: "whatever1".to_string(),
            confirm_password: "whatever1".to_string(),
            agreed_to_terms: true,
        };

        let err = session.register(&form).await.unwrap_err();

        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields.get("username").unwrap(),
            &["A user with that username already exists."]
        );
    }

    #[tokio::test]
    async fn test_profile_gate_redirects_to_sign_in() {
        let (session, backend, navigator) = session(FakeBackend::new());
        let err = session.load_profile().await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));
        assert_eq!(navigator.last(), Some(Route::SignIn));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_profile_merges_response() {
        let (session, backend, _) = session(FakeBackend::new());
        session
            .login(&Credentials::new("demo", "demo1234"))
            .await
            .unwrap();

        let user = session
            .update_profile(&ProfileUpdate {
                first_name: Some("Ada".to_string()),
                phone_number: Some("+44 20 7946 0000".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(session.user().await.unwrap().phone_number.as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(backend.calls().last(), Some(&"update_profile"));
    }

    #[tokio::test]
    async fn test_change_password_validates_first() {
        let (session, backend, _) = session(FakeBackend::new());
        session
            .login(&Credentials::new("demo", "demo1234"))
            .await
            .unwrap();
        let calls_before = backend.calls().len();

        let err = session
            .change_password(&PasswordChange {
                new_password1: "one".to_string(),
                new_password2: "two".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PasswordMismatch)
        ));
        assert_eq!(backend.calls().len(), calls_before);

        session
            .change_password(&PasswordChange {
                new_password1: "n3w-pass".to_string(),
                new_password2: "n3w-pass".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(backend.password_of("demo").as_deref(), Some("n3w-pass"));
    }
}
