//! Cookie-consent choices and their on-disk record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieCategory {
    Necessary,
    Functional,
    Analytics,
    Marketing,
}

impl CookieCategory {
    pub const ALL: [CookieCategory; 4] = [
        CookieCategory::Necessary,
        CookieCategory::Functional,
        CookieCategory::Analytics,
        CookieCategory::Marketing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Necessary => "Necessary",
            Self::Functional => "Functional",
            Self::Analytics => "Analytics",
            Self::Marketing => "Marketing",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Necessary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePreferences {
    pub necessary: bool,
    pub functional: bool,
    pub analytics: bool,
    pub marketing: bool,
}

impl Default for CookiePreferences {
    fn default() -> Self {
        Self::reject_all()
    }
}

impl CookiePreferences {
    pub fn accept_all() -> Self {
        Self {
            necessary: true,
            functional: true,
            analytics: true,
            marketing: true,
        }
    }

    /// Only the required categories stay on.
    pub fn reject_all() -> Self {
        Self {
            necessary: true,
            functional: false,
            analytics: false,
            marketing: false,
        }
    }

    pub fn is_enabled(&self, category: CookieCategory) -> bool {
        match category {
            CookieCategory::Necessary => self.necessary,
            CookieCategory::Functional => self.functional,
            CookieCategory::Analytics => self.analytics,
            CookieCategory::Marketing => self.marketing,
        }
    }

    /// Flips an optional category. Required categories are left as they are.
    pub fn toggle(&mut self, category: CookieCategory) {
        let slot = match category {
            CookieCategory::Necessary => return,
            CookieCategory::Functional => &mut self.functional,
            CookieCategory::Analytics => &mut self.analytics,
            CookieCategory::Marketing => &mut self.marketing,
        };
        *slot = !*slot;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConsentRecord {
    consent_given: bool,
    preferences: CookiePreferences,
}

/// JSON file holding the visitor's last consent choice.
#[derive(Debug, Clone)]
pub struct ConsentStore {
    path: PathBuf,
}

impl ConsentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` until a choice has been saved, meaning the banner should show.
    pub async fn load(&self) -> Result<Option<CookiePreferences>, AppError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no consent record");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let record: ConsentRecord = serde_json::from_slice(&raw)
            .map_err(|e| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(record.consent_given.then_some(record.preferences))
    }

    pub async fn save(&self, preferences: CookiePreferences) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let record = ConsentRecord {
            consent_given: true,
            preferences,
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        tokio::fs::write(&self.path, json).await?;
        info!(
            analytics = preferences.analytics,
            marketing = preferences.marketing,
            "cookie preferences saved"
        );
        Ok(())
    }
}

/// Analytics only load with a measurement id configured and consent given.
pub fn analytics_enabled(preferences: Option<&CookiePreferences>, config: &Config) -> bool {
    config.ga_measurement_id.is_some() && preferences.is_some_and(|p| p.analytics)
}
