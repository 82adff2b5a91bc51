//! Command handlers shared by the CLI and the interactive menu.

use colored::Colorize;
use inquire::{Confirm, Password, Text};

use crate::{
    error::AppError,
    lifecycle::{NewProfile, ProfileManager, Step},
    profile::Profile,
    remote::RemoteSync,
    ssh::{FileRemoval, ProbeOutcome, keys::read_public_key},
    storage::check_if_profiles_exist,
};

/// Word the user types to confirm a removal
const DELETE_CONFIRMATION: &str = "DELETE";

/// Adds a profile and walks the user through registering its key
///
/// # Arguments
/// * `request` - New profile fields
/// * `ask_passphrase` - Prompt for a key passphrase first
/// * `switch_after` - Activate the profile once it is stored
pub fn add_profile(
    manager: &ProfileManager,
    mut request: NewProfile,
    ask_passphrase: bool,
    switch_after: bool,
) -> Result<(), AppError> {
    if ask_passphrase {
        let passphrase = Password::new(&format!("{}", "key passphrase (empty for none):".blue()))
            .with_help_message("passed to ssh-keygen as an argument, so it is briefly visible in the process list")
            .prompt()?;
        request.passphrase = Some(passphrase).filter(|p| !p.is_empty());
    }

    let keys_url = manager.settings().ssh_keys_url();
    let report = manager.add(&request, |profile| show_key_instructions(manager, profile, &keys_url))?;

    println!("{} {}", "added profile:".green(), report.profile.alias);
    if let Some(outcome) = &report.probe {
        print_probe(manager, &report.profile, outcome);
    }

    if switch_after {
        switch_profile(manager, &report.profile.alias)?;
    }
    Ok(())
}

/// Prints the public key and where to register it
fn show_key_instructions(manager: &ProfileManager, profile: &Profile, keys_url: &str) {
    let Some(key_path) = &profile.key_path else {
        return;
    };
    match read_public_key(key_path) {
        Ok(public_key) => {
            println!("{}", "public key:".blue());
            println!("{}", public_key.green());
        }
        Err(err) => println!("{} {err}", "could not read public key:".yellow()),
    }
    println!("{} {}", "add it to your account at:".blue(), keys_url);
    println!(
        "{} git@{}:<owner>/<repository>.git",
        "clone with:".blue(),
        manager.host_alias(profile)
    );
}

/// Switches global Git identity to a profile
pub fn switch_profile(manager: &ProfileManager, alias: &str) -> Result<(), AppError> {
    let report = manager.switch(alias)?;

    println!(
        "{} {} <{}>",
        "switched to:".green(),
        report.profile.user_name,
        report.profile.user_email
    );
    print_remote(&report.remote);
    if let Some(outcome) = &report.probe {
        print_probe(manager, &report.profile, outcome);
    }
    Ok(())
}

/// Asks for the typed word and a final yes/no
pub fn confirm_removal(profile: &Profile) -> Result<bool, AppError> {
    println!("{}", "this permanently deletes:".yellow());
    println!("  profile {} ({} <{}>)", profile.alias, profile.user_name, profile.user_email);
    if let Some(key_path) = &profile.key_path {
        println!("  SSH key {} and its .pub", key_path.display());
    }
    println!("  SSH config entry for {}", profile.alias);

    let typed = Text::new(&format!(
        "{}",
        format!("type '{DELETE_CONFIRMATION}' to confirm removal of '{}':", profile.alias).red()
    ))
    .prompt()?;
    if typed.trim() != DELETE_CONFIRMATION {
        return Ok(false);
    }
    Ok(Confirm::new(&format!("{}", "are you absolutely sure?".red()))
        .with_default(false)
        .prompt()?)
}

/// Removes a profile and reports every step
///
/// # Arguments
/// * `confirmed` - Skip the confirmation prompts
pub fn remove_profile(manager: &ProfileManager, alias: &str, confirmed: bool) -> Result<(), AppError> {
    let profile = manager
        .store()
        .find(alias)
        .ok_or_else(|| AppError::ProfileNotFound(alias.to_string()))?;

    if !confirmed && !confirm_removal(&profile)? {
        println!("{}", "removal cancelled".yellow());
        return Ok(());
    }

    let report = manager.remove(alias)?;

    for key in [&report.keys.private_key, &report.keys.public_key] {
        let path = key.path().display();
        match key {
            FileRemoval::Removed(_) => println!("{} removed {path}", "✓".green()),
            FileRemoval::Missing(_) => println!("{} no key file at {path}", "-".yellow()),
            FileRemoval::Failed(_, reason) => println!("{} {path}: {reason}", "✗".red()),
        }
    }
    print_step("ssh config entry", &report.ssh_config);
    print_step("profile entry", &report.store);
    match &report.identity {
        Step::Done => println!("{} cleared global git identity", "✓".green()),
        Step::NotNeeded => println!("{} profile was not active, git identity kept", "-".yellow()),
        Step::Failed(reason) => println!("{} failed to clear git identity: {reason}", "✗".red()),
    }

    if !report.is_complete() {
        return Err(AppError::PartialRemoval {
            alias: alias.to_string(),
            failures: report.failures(),
        });
    }
    println!("{} {}", "removed profile:".green(), alias);
    Ok(())
}

fn print_step(name: &str, step: &Step) {
    match step {
        Step::Done => println!("{} removed {name}", "✓".green()),
        Step::NotNeeded => println!("{} no {name} found", "-".yellow()),
        Step::Failed(reason) => println!("{} {name}: {reason}", "✗".red()),
    }
}

/// Shows current Git identity
pub fn show_current_user(manager: &ProfileManager) -> Result<(), AppError> {
    match manager.current()? {
        Some((identity, profile)) => {
            println!("{} {} <{}>", "current user:".blue(), identity.name, identity.email);
            match profile {
                Some(profile) => println!("{} {}", "profile:".blue(), profile.alias),
                None => println!("{}", "no stored profile matches this identity".yellow()),
            }
        }
        None => println!("{}", "no global git identity set".yellow()),
    }
    Ok(())
}

/// Lists all profiles in stored order, marking the active one
pub fn list_all_profiles(manager: &ProfileManager) -> Result<(), AppError> {
    let profiles = manager.profiles();
    check_if_profiles_exist(&profiles)?;

    let active = manager.current().ok().flatten().and_then(|(_, profile)| profile);
    for profile in &profiles {
        let marker = if active.as_ref().is_some_and(|a| a.alias == profile.alias) {
            "*".green()
        } else {
            " ".normal()
        };
        println!(
            "{marker} {} {} <{}> {}",
            profile.alias.bold(),
            profile.user_name,
            profile.user_email,
            manager.host_alias(profile).dimmed()
        );
    }
    Ok(())
}

/// Tests SSH authentication for one profile
pub fn test_profile(manager: &ProfileManager, alias: &str) -> Result<(), AppError> {
    let (profile, outcome) = manager.test(alias)?;
    print_probe(manager, &profile, &outcome);
    if outcome.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::ConnectionProbeInconclusive {
            alias: alias.to_string(),
            detail: outcome.to_string(),
        })
    }
}

/// Tests SSH authentication for every profile
pub fn test_all_profiles(manager: &ProfileManager) -> Result<(), AppError> {
    check_if_profiles_exist(&manager.profiles())?;

    let results = manager.test_all();
    let failed: Vec<String> = results
        .iter()
        .filter(|(_, outcome)| !outcome.is_authenticated())
        .map(|(profile, _)| profile.alias.clone())
        .collect();
    for (profile, outcome) in &results {
        println!("{}", profile.alias.bold());
        print_probe(manager, profile, outcome);
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::ConnectionProbeInconclusive {
            alias: failed.join(", "),
            detail: "not every profile authenticated".to_string(),
        })
    }
}

/// Rewrites origin for the active profile
pub fn update_remote(manager: &ProfileManager) -> Result<(), AppError> {
    let (profile, remote) = manager.update_remote()?;
    println!("{} {}", "active profile:".blue(), profile.alias);
    print_remote(&remote);
    Ok(())
}

fn print_remote(remote: &RemoteSync) {
    match remote {
        RemoteSync::NotInRepository => {}
        RemoteSync::Rewritten { .. } | RemoteSync::AlreadyCurrent { .. } => {
            println!("{}", remote.to_string().green())
        }
        RemoteSync::NoRemote | RemoteSync::Unrecognized { .. } => {
            println!("{}", remote.to_string().yellow())
        }
        RemoteSync::Failed { .. } => println!("{}", remote.to_string().red()),
    }
}

fn print_probe(manager: &ProfileManager, profile: &Profile, outcome: &ProbeOutcome) {
    let host_alias = manager.host_alias(profile);
    let guidance = outcome.guidance(&host_alias, &manager.settings().ssh_keys_url());
    if outcome.is_authenticated() {
        println!("{} {}", "connection test:".green(), outcome);
        println!("{}", guidance.green());
    } else {
        println!("{} {}", "connection test:".yellow(), outcome);
        println!("{}", guidance.yellow());
    }
}
