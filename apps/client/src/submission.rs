//! Final wizard step: send the questionnaire with its resume, or park it
//! behind the authentication modal until the visitor signs in.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{AppError, ValidationError};
use crate::models::{Credentials, RegistrationForm};
use crate::navigation::Route;
use crate::session::AuthSession;
use crate::upload::{ResumeFile, ResumeId};
use crate::wizard::{QuestionnaireSubmission, UploadWizard};

/// A questionnaire that could not be sent yet, with the exact form state and
/// file it will be sent with.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub resume_id: ResumeId,
    pub submission: QuestionnaireSubmission,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted {
        resume_id: ResumeId,
        response: Option<Value>,
    },
    AuthRequired(AuthModal),
}

pub struct Submitter {
    session: Arc<AuthSession>,
}

impl Submitter {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// Confirm on the last wizard step.
    pub async fn finish(
        &self,
        wizard: &UploadWizard,
        resume_id: &ResumeId,
        file: Option<&ResumeFile>,
    ) -> Result<SubmitOutcome, AppError> {
        if !wizard.is_last_step() {
            return Err(AppError::InvalidTransition(format!(
                "cannot submit from step {}",
                wizard.step()
            )));
        }
        let file = file.ok_or(ValidationError::NoFileSelected)?;

        let pending = PendingSubmission {
            resume_id: resume_id.clone(),
            submission: QuestionnaireSubmission::new(&wizard.form, file.clone()),
        };

        if !self.session.is_authenticated().await {
            info!(resume_id = %resume_id, "not signed in, deferring questionnaire");
            return Ok(SubmitOutcome::AuthRequired(AuthModal::new(pending)));
        }

        self.submit_pending(&pending).await
    }

    /// Sends a prepared submission and moves on to its analysis page.
    pub async fn submit_pending(
        &self,
        pending: &PendingSubmission,
    ) -> Result<SubmitOutcome, AppError> {
        info!(resume_id = %pending.resume_id, "submitting questionnaire: {}", pending.submission);
        let response = self
            .session
            .backend()
            .submit_questionnaire(&pending.submission)
            .await
            .map_err(|e| {
                warn!("Questionnaire submission failed: {e}");
                AppError::from(e)
            })?;

        self.session
            .navigate(Route::Analysis(pending.resume_id.clone()));
        Ok(SubmitOutcome::Submitted {
            resume_id: pending.resume_id.clone(),
            response,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalTab {
    SignIn,
    SignUp,
}

/// Sign-in / sign-up dialog holding a deferred questionnaire.
#[derive(Debug)]
pub struct AuthModal {
    pending: PendingSubmission,
    pub tab: ModalTab,
    error: Option<Vec<String>>,
    open: bool,
}

impl AuthModal {
    pub fn new(pending: PendingSubmission) -> Self {
        Self {
            pending,
            tab: ModalTab::SignIn,
            error: None,
            open: true,
        }
    }

    pub fn pending(&self) -> &PendingSubmission {
        &self.pending
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Inline error lines from the last attempt.
    pub fn error(&self) -> Option<&[String]> {
        self.error.as_deref()
    }

    pub fn switch_tab(&mut self, tab: ModalTab) {
        self.tab = tab;
        self.error = None;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn into_pending(self) -> PendingSubmission {
        self.pending
    }

    pub async fn sign_in(
        &mut self,
        submitter: &Submitter,
        credentials: &Credentials,
    ) -> Result<SubmitOutcome, AppError> {
        self.error = None;
        if let Err(e) = submitter.session().sign_in(credentials).await {
            return Err(self.keep(e));
        }
        self.submit(submitter).await
    }

    pub async fn sign_up(
        &mut self,
        submitter: &Submitter,
        form: &RegistrationForm,
    ) -> Result<SubmitOutcome, AppError> {
        self.error = None;
        let session = submitter.session();
        let outcome = match session.register(form).await {
            Ok(()) => session.sign_in(&form.credentials()).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            return Err(self.keep(e));
        }
        self.submit(submitter).await
    }

    /// Resend after a failed submission. The visitor has to ask for it.
    pub async fn retry(&mut self, submitter: &Submitter) -> Result<SubmitOutcome, AppError> {
        self.error = None;
        self.submit(submitter).await
    }

    async fn submit(&mut self, submitter: &Submitter) -> Result<SubmitOutcome, AppError> {
        match submitter.submit_pending(&self.pending).await {
            Ok(outcome) => {
                self.open = false;
                Ok(outcome)
            }
            Err(e) => Err(self.keep(e)),
        }
    }

    fn keep(&mut self, e: AppError) -> AppError {
        self.error = Some(e.inline_messages());
        e
    }
}
