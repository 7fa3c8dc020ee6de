use std::sync::Arc;

use tracing::info;

use crate::api::{ApiClient, AuthBackend};
use crate::config::Config;
use crate::csrf::CsrfManager;
use crate::errors::ApiError;
use crate::navigation::Navigator;
use crate::session::{AuthSession, AuthStatus};
use crate::submission::Submitter;

/// Shared client state handed to every flow.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub csrf: Arc<CsrfManager>,
    pub session: Arc<AuthSession>,
    pub submitter: Arc<Submitter>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn AuthBackend>, navigator: Arc<dyn Navigator>) -> Self {
        let session = Arc::new(AuthSession::new(backend, navigator));
        Self {
            config,
            csrf: Arc::new(CsrfManager::new()),
            submitter: Arc::new(Submitter::new(Arc::clone(&session))),
            session,
        }
    }

    /// Real HTTP backend for `config.api_url`.
    pub fn connect(config: Config, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let client = ApiClient::new(&config)?;
        info!("API client initialized (base: {})", client.base_url());
        Ok(Self::new(config, Arc::new(client), navigator))
    }

    /// Startup sequence: CSRF token first, then the session check.
    pub async fn bootstrap(&self) -> AuthStatus {
        let ready = self.csrf.initialize(self.session.backend().as_ref()).await;
        self.session.check_session(&ready).await
    }
}
