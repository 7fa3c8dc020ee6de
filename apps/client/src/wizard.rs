//! Four-step questionnaire collected before a resume is submitted.

use std::fmt;
use std::str::FromStr;

use reqwest::multipart::{Form, Part};

use crate::errors::{ApiError, ValidationError};
use crate::upload::ResumeFile;

pub const TOTAL_STEPS: u8 = 4;
pub const RESUME_PART: &str = "resume";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExperienceLevel {
    EntryLevel,
    #[default]
    MidLevel,
    SeniorLevel,
}

impl ExperienceLevel {
    /// Years-of-experience bucket the backend expects.
    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::EntryLevel => "0-2",
            Self::MidLevel => "3-5",
            Self::SeniorLevel => "6+",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry-level" => Ok(Self::EntryLevel),
            "mid-level" => Ok(Self::MidLevel),
            "senior-level" => Ok(Self::SeniorLevel),
            other => Err(format!(
                "unknown experience level '{other}' (expected entry-level, mid-level or senior-level)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompanySize {
    Startup,
    Small,
    Medium,
    Enterprise,
    #[default]
    Any,
}

impl CompanySize {
    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Enterprise => "enterprise",
            Self::Any => "any",
        }
    }
}

impl FromStr for CompanySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Startup,
            Self::Small,
            Self::Medium,
            Self::Enterprise,
            Self::Any,
        ]
        .into_iter()
        .find(|size| size.wire_value() == s)
        .ok_or_else(|| format!("unknown company size '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    Immediately,
    #[default]
    OneToThreeMonths,
    ThreeToSixMonths,
    SixPlusMonths,
}

impl Timeframe {
    /// Value shown in the form select.
    pub fn form_value(&self) -> &'static str {
        match self {
            Self::Immediately => "immediately",
            Self::OneToThreeMonths => "1-3 months",
            Self::ThreeToSixMonths => "3-6 months",
            Self::SixPlusMonths => "6+ months",
        }
    }

    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Immediately => "immediate",
            other => other.form_value(),
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Immediately,
            Self::OneToThreeMonths,
            Self::ThreeToSixMonths,
            Self::SixPlusMonths,
        ]
        .into_iter()
        .find(|t| t.form_value() == s)
        .ok_or_else(|| format!("unknown timeframe '{s}'"))
    }
}

/// Job-context answers collected by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Questionnaire {
    pub job_title: String,
    pub industry: String,
    pub experience_level: ExperienceLevel,
    pub target_company_size: CompanySize,
    pub target_location: String,
    pub timeframe: Timeframe,
    pub specific_job_description: String,
}

impl Questionnaire {
    /// Metadata fields as sent to `POST /api/questionnaire/`, one entry per field.
    pub fn wire_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("job_title", self.job_title.trim().to_string()),
            ("industry", self.industry.trim().to_string()),
            ("experience_level", self.experience_level.wire_value().to_string()),
            (
                "target_company_size",
                self.target_company_size.wire_value().to_string(),
            ),
            ("target_location", self.target_location.trim().to_string()),
            ("timeframe", self.timeframe.wire_value().to_string()),
            (
                "specific_job_description",
                self.specific_job_description.clone(),
            ),
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Step machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAdvance {
    Moved(u8),
    ReadyToSubmit,
}

#[derive(Debug, Clone)]
pub struct UploadWizard {
    step: u8,
    pub form: Questionnaire,
}

impl Default for UploadWizard {
    fn default() -> Self {
        Self {
            step: 1,
            form: Questionnaire::default(),
        }
    }
}

impl UploadWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn is_last_step(&self) -> bool {
        self.step == TOTAL_STEPS
    }

    pub fn progress_percent(&self) -> u8 {
        (u16::from(self.step) * 100 / u16::from(TOTAL_STEPS)) as u8
    }

    /// Only step 1 has required fields.
    pub fn can_proceed(&self) -> bool {
        self.step_requirements().is_ok()
    }

    pub fn next(&mut self) -> Result<WizardAdvance, ValidationError> {
        self.step_requirements()?;
        if self.step < TOTAL_STEPS {
            self.step += 1;
            Ok(WizardAdvance::Moved(self.step))
        } else {
            Ok(WizardAdvance::ReadyToSubmit)
        }
    }

    /// No-op on the first step.
    pub fn back(&mut self) -> u8 {
        if self.step > 1 {
            self.step -= 1;
        }
        self.step
    }

    fn step_requirements(&self) -> Result<(), ValidationError> {
        if self.step == 1 {
            if self.form.job_title.trim().is_empty() {
                return Err(ValidationError::MissingField("Job title"));
            }
            if self.form.industry.trim().is_empty() {
                return Err(ValidationError::MissingField("Industry"));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission payload
// ────────────────────────────────────────────────────────────────────────────

/// Questionnaire answers bound to the selected resume, kept intact so a
/// deferred submission can be replayed after sign-in.
#[derive(Debug, Clone)]
pub struct QuestionnaireSubmission {
    pub fields: Vec<(&'static str, String)>,
    pub resume: ResumeFile,
}

impl QuestionnaireSubmission {
    pub fn new(questionnaire: &Questionnaire, resume: ResumeFile) -> Self {
        Self {
            fields: questionnaire.wire_fields(),
            resume,
        }
    }

    /// Multipart body: one `resume` file part plus one text part per field.
    pub fn to_form(&self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.resume.bytes.to_vec())
            .file_name(self.resume.file_name.clone())
            .mime_str(self.resume.file_type.mime())?;

        let form = self
            .fields
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(*name, value.clone())
            })
            .part(RESUME_PART, part);
        Ok(form)
    }
}

impl fmt::Display for QuestionnaireSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} fields, {} bytes)",
            self.resume.file_name,
            self.fields.len(),
            self.resume.bytes.len()
        )
    }
}
