use colored::Colorize;
use inquire::Text;
use validator::ValidateEmail;

use crate::{error::AppError, profile::Profile};

/// Maximum length for Git username
const MAX_USERNAME_LENGTH: usize = 100;
/// Maximum length for Git email address
const MAX_EMAIL_LENGTH: usize = 254;
/// Maximum length for profile alias
const MAX_ALIAS_LENGTH: usize = 64;

/// Prompts user for input until valid input is provided
pub fn prompt_until_valid<F>(prompt_message: &str, input_validation: F) -> Result<String, AppError>
where
    F: Fn(&str) -> Result<(), AppError>,
{
    loop {
        let input: String = Text::new(prompt_message).prompt()?.trim().to_string();
        match input_validation(&input) {
            Ok(_) => break Ok(input),
            Err(AppError::Validation(msg)) => println!("{}", msg.red()),
            Err(AppError::DuplicateAlias(alias)) => {
                println!("{}", format!("alias '{alias}' already exists").red())
            }
            Err(e) => return Err(e),
        }
    }
}

/// Validates username input
pub fn validate_input_username(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        Err(AppError::Validation("username cannot be empty".to_string()))
    } else if name.chars().count() > MAX_USERNAME_LENGTH {
        Err(AppError::Validation(format!("username too long, max {} characters", MAX_USERNAME_LENGTH)))
    } else if name.contains(['\n', '\r']) {
        Err(AppError::Validation("username cannot span lines".to_string()))
    } else if name.trim() != name {
        Err(AppError::Validation("username cannot start or end with spaces".to_string()))
    } else {
        Ok(())
    }
}

/// Validates email input
pub fn validate_input_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        Err(AppError::Validation("email cannot be empty".to_string()))
    } else if email.trim() != email {
        Err(AppError::Validation("email cannot start or end with spaces".to_string()))
    } else if email.len() > MAX_EMAIL_LENGTH {
        Err(AppError::Validation(format!("email too long, max {} characters", MAX_EMAIL_LENGTH)))
    } else if !email.validate_email() {
        Err(AppError::Validation("invalid email format".to_string()))
    } else {
        Ok(())
    }
}

/// Validates alias format: ASCII letters and digits only
pub fn validate_alias_format(alias: &str) -> Result<(), AppError> {
    if alias.is_empty() {
        Err(AppError::Validation("alias cannot be empty".to_string()))
    } else if alias.len() > MAX_ALIAS_LENGTH {
        Err(AppError::Validation(format!("alias too long, max {} characters", MAX_ALIAS_LENGTH)))
    } else if !alias.chars().all(|c| c.is_ascii_alphanumeric()) {
        Err(AppError::Validation("alias may only contain letters and digits".to_string()))
    } else {
        Ok(())
    }
}

/// Validates an alias input, including uniqueness among stored profiles
pub fn validate_input_alias(alias: &str, existing_profiles: &[Profile]) -> Result<(), AppError> {
    validate_alias_format(alias)?;
    if existing_profiles.iter().any(|profile| profile.alias == alias) {
        return Err(AppError::DuplicateAlias(alias.to_string()));
    }
    Ok(())
}
