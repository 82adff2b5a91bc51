use clap::{Parser, Subcommand};

/// CLI arguments parser using `clap`
#[derive(Parser, Debug)]
#[command(name = "git-switch", version, about = "Switch between Git identities, each with its own SSH key")]
pub struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Subcommand chosen to execute, interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Adds a new profile with its own SSH key
    Add {
        /// Unique alias, letters and digits only
        alias: String,
        /// Git username
        user_name: String,
        /// Git email
        user_email: String,
        /// Prompt for a passphrase protecting the new key (passed to ssh-keygen on its command line)
        #[arg(long)]
        passphrase: bool,
        /// Skip the connection test
        #[arg(long)]
        no_probe: bool,
        /// Switch to the profile once it is added
        #[arg(long)]
        switch: bool,
    },
    /// Switches global Git identity and the current repository's remote to a profile
    Switch {
        /// Alias of profile to switch to
        alias: String,
        /// Skip the connection test
        #[arg(long)]
        no_probe: bool,
    },
    /// Removes a profile, its SSH key and its SSH config entry
    Remove {
        /// Alias of profile to remove
        alias: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Displays current Git identity
    Current,
    /// Displays all stored profiles
    List,
    /// Tests SSH authentication for a profile
    Test {
        /// Alias of profile to test
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        alias: Option<String>,
        /// Test every profile
        #[arg(long)]
        all: bool,
    },
    /// Points the current repository's origin at the active profile
    Remote,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_in_alias_first_order() {
        let cli = Cli::parse_from(["git-switch", "add", "work", "Jane Doe", "jane@corp.com", "--no-probe"]);
        match cli.command {
            Some(Commands::Add { alias, user_name, user_email, no_probe, switch, passphrase }) => {
                assert_eq!(alias, "work");
                assert_eq!(user_name, "Jane Doe");
                assert_eq!(user_email, "jane@corp.com");
                assert!(no_probe);
                assert!(!switch);
                assert!(!passphrase);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_requires_alias_or_all() {
        assert!(Cli::try_parse_from(["git-switch", "test"]).is_err());
        assert!(Cli::try_parse_from(["git-switch", "test", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["git-switch", "test", "work", "--all"]).is_err());
    }

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::parse_from(["git-switch", "-v"]);
        assert!(cli.command.is_none());
        assert!(cli.verbose);
    }
}
