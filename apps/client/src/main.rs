use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resumerise::consent::{analytics_enabled, CookieCategory, CookiePreferences, ConsentStore};
use resumerise::models::{Credentials, PasswordChange, ProfileUpdate, RegistrationForm, User};
use resumerise::navigation::{LogNavigator, Route};
use resumerise::submission::{SubmitOutcome, Submitter};
use resumerise::upload::{ResumeFile, SelectionSource, UploadSection, PROGRESS_TICK};
use resumerise::wizard::{CompanySize, ExperienceLevel, Timeframe, UploadWizard, WizardAdvance};
use resumerise::{AppError, AppState, Config};

#[derive(Parser)]
#[command(name = "resumerise")]
#[command(about = "Command-line client for the ResumeRise backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL; overrides RESUMERISE_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Account(AccountCommand),
    /// Show or change cookie preferences
    Consent {
        #[command(subcommand)]
        action: ConsentAction,
        #[arg(long, default_value = ".resumerise/consent.json")]
        file: PathBuf,
    },
}

/// Commands that talk to the backend.
#[derive(Subcommand)]
enum AccountCommand {
    /// Sign in and show the session user
    Login(Login),
    /// Create an account, then sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        agree_terms: bool,
    },
    /// Show the profile of the signed-in user
    Profile(Login),
    /// Change profile fields; omitted fields are left alone
    UpdateProfile {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<chrono::NaiveDate>,
    },
    ChangePassword {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// End the backend session
    Logout,
    /// Upload a resume with its job context
    Upload(Upload),
}

#[derive(Args)]
struct Login {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
}

impl Login {
    fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

#[derive(Args)]
struct Upload {
    /// PDF, DOCX or TXT, at most 5MB
    file: PathBuf,
    #[arg(long)]
    job_title: String,
    #[arg(long)]
    industry: String,
    /// entry-level, mid-level or senior-level
    #[arg(long, default_value = "mid-level")]
    experience_level: ExperienceLevel,
    /// any, startup, small, medium or enterprise
    #[arg(long, default_value = "any")]
    company_size: CompanySize,
    #[arg(long, default_value = "")]
    location: String,
    /// "immediately", "1-3 months", "3-6 months" or "6+ months"
    #[arg(long, default_value = "1-3 months")]
    timeframe: Timeframe,
    #[arg(long, default_value = "")]
    job_description: String,
    /// Credentials used when the upload needs a session
    #[arg(long, requires = "password")]
    username: Option<String>,
    #[arg(long, requires = "username")]
    password: Option<String>,
}

#[derive(Subcommand)]
enum ConsentAction {
    Show,
    AcceptAll,
    RejectAll,
    /// Flip one optional category: functional, analytics or marketing
    Toggle { category: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = Config::for_api_url(url)?.api_url;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("ResumeRise client v{}", env!("CARGO_PKG_VERSION"));

    let command = match cli.command {
        Command::Consent { action, file } => return handle_consent(&action, &file, &config).await,
        Command::Account(command) => command,
    };

    let state = AppState::connect(config, Arc::new(LogNavigator))?;
    let status = state.bootstrap().await;
    info!("Session status at startup: {status:?}");

    if let Err(e) = run(command, &state).await {
        report(&e);
        return Err(e.into());
    }
    Ok(())
}

async fn run(command: AccountCommand, state: &AppState) -> Result<(), AppError> {
    let session = &state.session;
    match command {
        AccountCommand::Login(login) => {
            let user = session.login(&login.credentials()).await?;
            print_user(&user);
        }
        AccountCommand::Register {
            username,
            email,
            password,
            confirm_password,
            agree_terms,
        } => {
            let form = RegistrationForm {
                username,
                email,
                password,
                confirm_password,
                agreed_to_terms: agree_terms,
            };
            let user = session.register_and_login(&form, Route::Profile).await?;
            println!("Account created for {}", user.username);
        }
        AccountCommand::Profile(login) => {
            session.sign_in(&login.credentials()).await?;
            print_user(&session.load_profile().await?);
        }
        AccountCommand::UpdateProfile {
            login,
            email,
            first_name,
            last_name,
            phone_number,
            address,
            date_of_birth,
        } => {
            let update = ProfileUpdate {
                email,
                first_name,
                last_name,
                phone_number,
                address,
                date_of_birth,
            };
            if update.is_empty() {
                warn!("No profile fields given; nothing to update");
                return Ok(());
            }
            session.sign_in(&login.credentials()).await?;
            let user = session.update_profile(&update).await?;
            println!("Profile updated successfully");
            print_user(&user);
        }
        AccountCommand::ChangePassword {
            login,
            new_password,
            confirm_password,
        } => {
            let change = PasswordChange {
                new_password1: new_password,
                new_password2: confirm_password,
            };
            change.validate()?;
            session.sign_in(&login.credentials()).await?;
            session.change_password(&change).await?;
            println!("Password changed");
        }
        AccountCommand::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        AccountCommand::Upload(upload) => run_upload(upload, &state.submitter).await?,
    }
    Ok(())
}

async fn run_upload(upload: Upload, submitter: &Submitter) -> Result<(), AppError> {
    let file = ResumeFile::from_path(&upload.file, SelectionSource::Picker).await?;

    let mut section = UploadSection::new();
    section.select(file);
    section.proceed()?;
    let resume_id = section.run_processing(PROGRESS_TICK).await?;

    let mut wizard = UploadWizard::new();
    wizard.form.job_title = upload.job_title;
    wizard.form.industry = upload.industry;
    wizard.form.experience_level = upload.experience_level;
    wizard.form.target_company_size = upload.company_size;
    wizard.form.target_location = upload.location;
    wizard.form.timeframe = upload.timeframe;
    wizard.form.specific_job_description = upload.job_description;
    while wizard.next()? != WizardAdvance::ReadyToSubmit {}

    let outcome = match submitter.finish(&wizard, &resume_id, section.file()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            section.fail(e.user_message())?;
            return Err(e);
        }
    };

    let outcome = match outcome {
        SubmitOutcome::AuthRequired(mut modal) => {
            let (Some(username), Some(password)) = (upload.username, upload.password) else {
                info!("Sign-in required; pass --username and --password to continue");
                section.fail("Sign in to submit your questionnaire")?;
                return Err(AppError::NotAuthenticated);
            };
            match modal
                .sign_in(submitter, &Credentials::new(username, password))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    section.fail(e.user_message())?;
                    return Err(e);
                }
            }
        }
        submitted => submitted,
    };

    section.complete_context()?;
    if let SubmitOutcome::Submitted { resume_id, .. } = outcome {
        println!("Submitted. Analysis: {}", Route::Analysis(resume_id));
    }
    Ok(())
}

async fn handle_consent(action: &ConsentAction, file: &Path, config: &Config) -> Result<()> {
    let store = ConsentStore::new(file);
    let current = store.load().await?;

    let updated = match action {
        ConsentAction::Show => None,
        ConsentAction::AcceptAll => Some(CookiePreferences::accept_all()),
        ConsentAction::RejectAll => Some(CookiePreferences::reject_all()),
        ConsentAction::Toggle { category } => {
            let category = CookieCategory::ALL
                .into_iter()
                .find(|c| c.label().eq_ignore_ascii_case(category))
                .with_context(|| format!("unknown cookie category '{category}'"))?;
            if category.is_required() {
                bail!("{} cookies are always enabled", category.label());
            }
            let mut prefs = current.unwrap_or_default();
            prefs.toggle(category);
            Some(prefs)
        }
    };

    if let Some(prefs) = updated {
        store.save(prefs).await?;
    }
    let prefs = updated.or(current);

    match &prefs {
        Some(prefs) => {
            for category in CookieCategory::ALL {
                let mark = if prefs.is_enabled(category) { "on" } else { "off" };
                println!("{:<12} {}", category.label(), mark);
            }
        }
        None => println!("No cookie choice saved yet"),
    }
    println!(
        "Analytics: {}",
        if analytics_enabled(prefs.as_ref(), config) { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email.as_deref().unwrap_or("-"));
    if let Some(phone) = &user.phone_number {
        println!("  phone:   {phone}");
    }
    if let Some(address) = &user.address {
        println!("  address: {address}");
    }
    if let Some(dob) = &user.date_of_birth {
        println!("  born:    {dob}");
    }
}

fn report(e: &AppError) {
    for line in e.inline_messages() {
        eprintln!("  • {line}");
    }
}
