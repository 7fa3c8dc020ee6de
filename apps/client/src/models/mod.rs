pub mod user;

pub use user::{Credentials, PasswordChange, ProfileUpdate, RegistrationForm, RegistrationRequest, User};
