use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::AuthBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfState {
    pub csrf_token: Option<String>,
    pub loading: bool,
}

impl Default for CsrfState {
    fn default() -> Self {
        Self {
            csrf_token: None,
            loading: true,
        }
    }
}

/// Proof that CSRF initialization has finished (successfully or not).
/// The session check takes one, so it cannot run before the token fetch.
#[derive(Debug, Clone)]
pub struct CsrfReady {
    token: Option<String>,
}

impl CsrfReady {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Fetches the anti-forgery cookie once per process and mirrors it into state.
#[derive(Debug, Default)]
pub struct CsrfManager {
    state: RwLock<CsrfState>,
}

impl CsrfManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> CsrfState {
        self.state.read().await.clone()
    }

    /// Single attempt, no retry. A failure is logged and leaves the token unset;
    /// mutating calls then go out without the header and the backend decides.
    pub async fn initialize(&self, backend: &dyn AuthBackend) -> CsrfReady {
        let token = match backend.fetch_csrf_token().await {
            Ok(Some(token)) => {
                info!("CSRF token issued");
                Some(token)
            }
            Ok(None) => {
                warn!("CSRF endpoint answered but no csrftoken cookie was set");
                None
            }
            Err(e) => {
                warn!("Failed to fetch CSRF token: {e}");
                None
            }
        };

        let mut state = self.state.write().await;
        state.csrf_token = token.clone();
        state.loading = false;
        CsrfReady { token }
    }
}
