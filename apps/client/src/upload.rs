//! Resume selection and the pre-questionnaire upload status machine.
//!
//! Files are checked for size and type before anything touches the network,
//! whether they came from the file picker or a drag-and-drop.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{AppError, ValidationError};

pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;
pub const PROGRESS_STEP: u8 = 20;
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);

// ────────────────────────────────────────────────────────────────────────────
// Resume identifier
// ────────────────────────────────────────────────────────────────────────────

/// Client-generated token correlating an upload with its analysis route.
/// Not a durable identity: a new one is minted for every upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResumeId(String);

impl ResumeId {
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(raw[..8].to_string())
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// File selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Picker,
    DragAndDrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFileType {
    Pdf,
    Docx,
    Txt,
}

impl ResumeFileType {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Txt => "text/plain",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        // Browsers may append parameters, e.g. "text/plain; charset=utf-8".
        let essence = mime.split(';').next().unwrap_or("").trim();
        [Self::Pdf, Self::Docx, Self::Txt]
            .into_iter()
            .find(|t| t.mime().eq_ignore_ascii_case(essence))
    }

    /// MIME type a browser would report for this file name.
    pub fn mime_for_file_name(file_name: &str) -> &'static str {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".pdf") {
            Self::Pdf.mime()
        } else if lower.ends_with(".docx") {
            Self::Docx.mime()
        } else if lower.ends_with(".txt") {
            Self::Txt.mime()
        } else {
            "application/octet-stream"
        }
    }
}

/// A validated resume ready to be attached to a questionnaire submission.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub file_type: ResumeFileType,
    pub bytes: Bytes,
}

impl ResumeFile {
    /// Size and type checks shared by both selection paths.
    pub fn validate(
        content_type: &str,
        size: u64,
        source: SelectionSource,
    ) -> Result<ResumeFileType, ValidationError> {
        if size > MAX_RESUME_BYTES {
            debug!(?source, size, "resume rejected: too large");
            return Err(ValidationError::FileTooLarge { size });
        }
        ResumeFileType::from_mime(content_type).ok_or_else(|| {
            debug!(?source, content_type, "resume rejected: unsupported type");
            ValidationError::UnsupportedFileType {
                content_type: content_type.to_string(),
            }
        })
    }

    pub fn new(
        file_name: impl Into<String>,
        content_type: &str,
        bytes: impl Into<Bytes>,
        source: SelectionSource,
    ) -> Result<Self, ValidationError> {
        let bytes = bytes.into();
        let file_type = Self::validate(content_type, bytes.len() as u64, source)?;
        Ok(Self {
            file_name: file_name.into(),
            file_type,
            bytes,
        })
    }

    /// Loads a resume from disk. The size check runs on metadata, before the read.
    pub async fn from_path(path: &Path, source: SelectionSource) -> Result<Self, AppError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        let metadata = tokio::fs::metadata(path).await?;
        let content_type = ResumeFileType::mime_for_file_name(&file_name);
        let file_type = Self::validate(content_type, metadata.len(), source)?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            file_name,
            file_type,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Upload status machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading { progress: u8 },
    Context { resume_id: ResumeId },
    Success { resume_id: ResumeId },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Proceed,
    Tick,
    ContextCompleted,
    Failed(String),
    Reset,
}

impl UploadStatus {
    /// Transition table. Pairs not listed are rejected.
    pub fn transition(&self, event: &UploadEvent) -> Result<UploadStatus, AppError> {
        use UploadEvent as E;
        use UploadStatus as S;

        let next = match (self, event) {
            (S::Idle, E::Proceed) => S::Uploading { progress: 0 },
            (S::Uploading { progress }, E::Tick) if *progress >= 100 => S::Context {
                resume_id: ResumeId::generate(),
            },
            (S::Uploading { progress }, E::Tick) => S::Uploading {
                progress: progress.saturating_add(PROGRESS_STEP).min(100),
            },
            (S::Context { resume_id }, E::ContextCompleted) => S::Success {
                resume_id: resume_id.clone(),
            },
            (S::Uploading { .. } | S::Context { .. }, E::Failed(message)) => S::Error {
                message: message.clone(),
            },
            (S::Success { .. } | S::Error { .. }, E::Reset) => S::Idle,
            (from, event) => {
                return Err(AppError::InvalidTransition(format!(
                    "{event:?} is not allowed from {from:?}"
                )))
            }
        };
        Ok(next)
    }

    pub fn resume_id(&self) -> Option<&ResumeId> {
        match self {
            Self::Context { resume_id } | Self::Success { resume_id } => Some(resume_id),
            _ => None,
        }
    }
}

/// The upload card: a selected file plus its status.
#[derive(Debug)]
pub struct UploadSection {
    status: UploadStatus,
    file: Option<ResumeFile>,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            status: UploadStatus::Idle,
            file: None,
        }
    }
}

impl UploadSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn file(&self) -> Option<&ResumeFile> {
        self.file.as_ref()
    }

    pub fn select(&mut self, file: ResumeFile) {
        info!(file = %file.file_name, size_mb = file.size_mb(), "resume selected");
        self.file = Some(file);
    }

    pub fn proceed(&mut self) -> Result<(), AppError> {
        if self.file.is_none() {
            return Err(ValidationError::NoFileSelected.into());
        }
        self.apply(UploadEvent::Proceed)
    }

    pub fn tick(&mut self) -> Result<(), AppError> {
        self.apply(UploadEvent::Tick)
    }

    pub fn complete_context(&mut self) -> Result<(), AppError> {
        self.apply(UploadEvent::ContextCompleted)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), AppError> {
        self.apply(UploadEvent::Failed(message.into()))
    }

    /// "Upload another" / "Try again": back to idle with no file.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.apply(UploadEvent::Reset)?;
        self.file = None;
        Ok(())
    }

    /// Drives simulated processing progress until the questionnaire step is reached.
    pub async fn run_processing(&mut self, period: Duration) -> Result<ResumeId, AppError> {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        loop {
            interval.tick().await;
            self.tick()?;
            match &self.status {
                UploadStatus::Context { resume_id } => return Ok(resume_id.clone()),
                UploadStatus::Uploading { progress } => debug!(progress, "processing"),
                other => {
                    return Err(AppError::InvalidTransition(format!(
                        "processing ended in {other:?}"
                    )))
                }
            }
        }
    }

    fn apply(&mut self, event: UploadEvent) -> Result<(), AppError> {
        self.status = self.status.transition(&event)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &str = "application/pdf";

    #[test]
    fn test_resume_id_is_short_and_fresh() {
        let a = ResumeId::generate();
        let b = ResumeId::generate();
        assert_eq!(a.as_str().len(), 8);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_oversized_file_rejected_for_both_sources() {
        for source in [SelectionSource::Picker, SelectionSource::DragAndDrop] {
            let err = ResumeFile::validate(PDF, MAX_RESUME_BYTES + 1, source).unwrap_err();
            assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        }
    }

    #[test]
    fn test_exactly_five_mb_is_accepted() {
        assert_eq!(
            ResumeFile::validate(PDF, MAX_RESUME_BYTES, SelectionSource::Picker),
            Ok(ResumeFileType::Pdf)
        );
    }

    #[test]
    fn test_unsupported_type_rejected_for_both_sources() {
        for source in [SelectionSource::Picker, SelectionSource::DragAndDrop] {
            let err = ResumeFile::validate("image/png", 1024, source).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid file type. Please select a PDF, DOCX, or TXT file."
            );
        }
    }

    #[test]
    fn test_accepted_types() {
        assert_eq!(ResumeFileType::from_mime("text/plain; charset=utf-8"), Some(ResumeFileType::Txt));
        assert_eq!(
            ResumeFileType::from_mime(ResumeFileType::Docx.mime()),
            Some(ResumeFileType::Docx)
        );
        assert_eq!(ResumeFileType::from_mime("application/msword"), None);
    }

    #[test]
    fn test_mime_for_file_name() {
        assert_eq!(ResumeFileType::mime_for_file_name("CV.PDF"), PDF);
        assert_eq!(
            ResumeFileType::mime_for_file_name("resume.doc"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path_reads_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.txt");
        tokio::fs::write(&path, b"Jane Doe\nRust engineer").await.unwrap();
        let file = ResumeFile::from_path(&path, SelectionSource::Picker)
            .await
            .unwrap();
        assert_eq!(file.file_name, "resume.txt");
        assert_eq!(file.file_type, ResumeFileType::Txt);
        assert_eq!(&file.bytes[..8], b"Jane Doe");
    }

    #[tokio::test]
    async fn test_from_path_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();
        let err = ResumeFile::from_path(&path, SelectionSource::DragAndDrop)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn test_proceed_requires_file() {
        let mut section = UploadSection::new();
        let err = section.proceed().unwrap_err();
        assert_eq!(err.to_string(), "Please select a file first");
        assert_eq!(section.status(), &UploadStatus::Idle);
    }

    #[test]
    fn test_ticks_reach_context_after_full_progress() {
        let mut section = UploadSection::new();
        section.select(ResumeFile::new("cv.pdf", PDF, vec![1u8; 16], SelectionSource::Picker).unwrap());
        section.proceed().unwrap();
        for expected in [20, 40, 60, 80, 100] {
            section.tick().unwrap();
            assert_eq!(section.status(), &UploadStatus::Uploading { progress: expected });
        }
        section.tick().unwrap();
        assert!(matches!(section.status(), UploadStatus::Context { .. }));
    }

    #[test]
    fn test_context_completion_keeps_resume_id() {
        let context = UploadStatus::Context {
            resume_id: ResumeId::from_raw("abc12345"),
        };
        let done = context.transition(&UploadEvent::ContextCompleted).unwrap();
        assert_eq!(done.resume_id().map(ResumeId::as_str), Some("abc12345"));
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        assert!(UploadStatus::Idle.transition(&UploadEvent::Tick).is_err());
        assert!(UploadStatus::Idle.transition(&UploadEvent::Reset).is_err());
        let success = UploadStatus::Success {
            resume_id: ResumeId::from_raw("abc12345"),
        };
        assert!(success.transition(&UploadEvent::Proceed).is_err());
    }

    #[test]
    fn test_reset_after_error_clears_file() {
        let mut section = UploadSection::new();
        section.select(ResumeFile::new("cv.txt", "text/plain", "hello", SelectionSource::Picker).unwrap());
        section.proceed().unwrap();
        section.fail("network down").unwrap();
        assert_eq!(
            section.status(),
            &UploadStatus::Error {
                message: "network down".to_string()
            }
        );
        section.reset().unwrap();
        assert_eq!(section.status(), &UploadStatus::Idle);
        assert!(section.file().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processing_takes_six_ticks() {
        let mut section = UploadSection::new();
        section.select(ResumeFile::new("cv.pdf", PDF, vec![0u8; 4], SelectionSource::Picker).unwrap());
        section.proceed().unwrap();

        let started = tokio::time::Instant::now();
        let resume_id = section.run_processing(PROGRESS_TICK).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= PROGRESS_TICK * 6, "elapsed {elapsed:?}");
        assert!(elapsed < PROGRESS_TICK * 7, "elapsed {elapsed:?}");
        assert_eq!(section.status().resume_id(), Some(&resume_id));
    }
}
