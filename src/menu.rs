use colored::Colorize;
use inquire::{Confirm, Select};

use crate::{
    commands::{
        add_profile, list_all_profiles, remove_profile, show_current_user, switch_profile,
        test_all_profiles, test_profile, update_remote,
    },
    error::AppError,
    lifecycle::{NewProfile, ProfileManager},
    profile::Profile,
    storage::check_if_profiles_exist,
    validation::{prompt_until_valid, validate_input_alias, validate_input_email, validate_input_username},
};

/// Menu entry returning to the previous screen; not a valid alias
pub const BACK_OPTION: &str = "[back]";
/// Menu entry probing every profile
const ALL_OPTION: &str = "[all profiles]";

/// Runs interactive menu interface
pub fn run_menu(manager: &ProfileManager) -> Result<(), AppError> {
    loop {
        let actions: Vec<&'static str> = vec![
            "switch profile",
            "add profile",
            "remove profile",
            "show current profile",
            "show all profiles",
            "test connection",
            "update repository remote",
            "quit",
        ];

        let action_selected: &'static str = Select::new(&format!("{}", "select action".blue()), actions)
            .prompt()?;

        let result = match action_selected {
            "switch profile" => menu_switch_profile(manager),
            "add profile" => menu_add_profile(manager),
            "remove profile" => menu_remove_profile(manager),
            "show current profile" => show_current_user(manager),
            "show all profiles" => list_all_profiles(manager),
            "test connection" => menu_test_connection(manager),
            "update repository remote" => update_remote(manager),
            "quit" => {
                println!("{}", "quitting".yellow());
                break Ok(());
            }
            _ => unreachable!("unexpected input"),
        };

        // A failed action is reported and the menu keeps running; cancelled prompts end it.
        match result {
            Ok(()) => {}
            Err(AppError::Inquire(err)) => return Err(AppError::Inquire(err)),
            Err(err) => println!("{}", err.to_string().red()),
        }
    }
}

/// Menu for switching profiles
fn menu_switch_profile(manager: &ProfileManager) -> Result<(), AppError> {
    let Some(alias) = select_alias(manager, "select profile to switch:", false)? else {
        return Ok(());
    };
    switch_profile(manager, &alias)
}

/// Menu for adding a new profile
fn menu_add_profile(manager: &ProfileManager) -> Result<(), AppError> {
    let profiles: Vec<Profile> = manager.profiles();

    // Input validation
    let alias: String = prompt_until_valid(
        &format!("{}", "enter alias (letters and digits):".blue()),
        |input| validate_input_alias(input, &profiles),
    )?;

    let user_name: String = prompt_until_valid(
        &format!("{}", "enter git username:".blue()),
        validate_input_username,
    )?;

    let user_email: String = prompt_until_valid(
        &format!("{}", "enter git email:".blue()),
        validate_input_email,
    )?;

    let ask_passphrase = Confirm::new(&format!("{}", "protect the key with a passphrase?".blue()))
        .with_default(false)
        .prompt()?;
    let switch_after = Confirm::new(&format!("{}", "switch to this profile now?".blue()))
        .with_default(true)
        .prompt()?;

    let request = NewProfile {
        alias,
        user_name,
        user_email,
        passphrase: None,
    };
    add_profile(manager, request, ask_passphrase, switch_after)
}

/// Menu for removing a profile
fn menu_remove_profile(manager: &ProfileManager) -> Result<(), AppError> {
    let Some(alias) = select_alias(manager, "select profile to remove:", false)? else {
        return Ok(());
    };
    remove_profile(manager, &alias, false)
}

/// Menu for testing one or all connections
fn menu_test_connection(manager: &ProfileManager) -> Result<(), AppError> {
    match select_alias(manager, "select profile to test:", true)? {
        Some(alias) if alias == ALL_OPTION => test_all_profiles(manager),
        Some(alias) => test_profile(manager, &alias),
        None => Ok(()),
    }
}

/// Prompts for a stored alias; `None` when the user picks back
fn select_alias(manager: &ProfileManager, prompt: &str, with_all: bool) -> Result<Option<String>, AppError> {
    let profiles: Vec<Profile> = manager.profiles();
    check_if_profiles_exist(&profiles)?;

    let mut options: Vec<String> = build_alias_list(&profiles);
    if with_all {
        options.insert(options.len() - 1, ALL_OPTION.to_string());
    }
    let selected: String = Select::new(&format!("{}", prompt.blue()), options).prompt()?;

    Ok((selected != BACK_OPTION).then_some(selected))
}

/// Builds list of profile aliases for menu to display
pub fn build_alias_list(profiles: &[Profile]) -> Vec<String> {
    let mut aliases: Vec<String> = profiles.iter()
        .map(|profile| profile.alias.clone())
        .collect();
    aliases.push(BACK_OPTION.to_string());
    aliases
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::validation::validate_alias_format;

    #[test]
    fn alias_list_keeps_order_and_ends_with_back() {
        let profiles = vec![
            Profile::new("work", "J", "j@corp.com", PathBuf::from("k1")),
            Profile::new("home", "J", "j@home.io", PathBuf::from("k2")),
        ];
        assert_eq!(build_alias_list(&profiles), ["work", "home", BACK_OPTION]);
    }

    #[test]
    fn menu_sentinels_can_never_be_aliases() {
        assert!(validate_alias_format(BACK_OPTION).is_err());
        assert!(validate_alias_format(ALL_OPTION).is_err());
    }
}
