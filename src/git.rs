use std::{
    path::PathBuf,
    process::{Command, Output},
};

use crate::{error::AppError, profile::Identity};

/// Global Git author identity, read and written but not owned by this tool
pub trait IdentityPort {
    /// Current global `user.name` / `user.email`, `None` when either is unset
    fn get_identity(&self) -> Result<Option<Identity>, AppError>;
    fn set_identity(&self, identity: &Identity) -> Result<(), AppError>;
    /// Unsets both keys; unsetting an absent key is not an error
    fn clear_identity(&self) -> Result<(), AppError>;
}

/// The repository of the current working directory
pub trait RepositoryPort {
    fn is_inside_work_tree(&self) -> bool;
    /// URL of a remote, `None` if the remote does not exist
    fn remote_url(&self, remote: &str) -> Result<Option<String>, AppError>;
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), AppError>;
}

/// Both ports backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    work_dir: Option<PathBuf>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            work_dir: None,
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs repository commands in `dir` instead of the process working directory
    #[cfg(test)]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, AppError> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }
        tracing::debug!(?args, "running git");
        let output = command.output().map_err(|err| {
            AppError::GitCommand(format!("failed to run {}: {err}", self.program))
        })?;
        Ok(output)
    }

    fn failure(output: &Output) -> Result<AppError, AppError> {
        Ok(AppError::GitCommand(
            String::from_utf8(output.stderr.clone())?.trim().to_string(),
        ))
    }

    /// Executes Git config get command against the global config
    ///
    /// # Arguments
    /// * `key` - Git config key (user.name or user.email)
    pub fn get_global(&self, key: &str) -> Result<Option<String>, AppError> {
        let git_command_output: Output = self.run(&["config", "--global", "--get", key])?;

        // exit status 1 means the key is not set
        if git_command_output.status.code() == Some(1) {
            return Ok(None);
        }
        if !git_command_output.status.success() {
            return Err(Self::failure(&git_command_output)?);
        }

        Ok(config_value(&git_command_output.stdout))
    }

    /// Executes a Git config set command against the global config
    ///
    /// # Arguments
    /// * `key` - Git config key to set (user.name or user.email)
    /// * `value` - Value to set for key (username or email)
    pub fn set_global(&self, key: &str, value: &str) -> Result<(), AppError> {
        let git_command_output: Output = self.run(&["config", "--global", key, value])?;

        if !git_command_output.status.success() {
            return Err(Self::failure(&git_command_output)?);
        }

        Ok(())
    }

    /// Unsets a global key, tolerating a key that is already absent
    pub fn unset_global(&self, key: &str) -> Result<(), AppError> {
        let git_command_output: Output = self.run(&["config", "--global", "--unset", key])?;

        // exit status 5 means there was nothing to unset
        match git_command_output.status.code() {
            Some(0) | Some(5) => Ok(()),
            _ => Err(Self::failure(&git_command_output)?),
        }
    }
}

impl IdentityPort for GitCli {
    fn get_identity(&self) -> Result<Option<Identity>, AppError> {
        let name = self.get_global("user.name")?;
        let email = self.get_global("user.email")?;
        Ok(match (name, email) {
            (Some(name), Some(email)) => Some(Identity { name, email }),
            _ => None,
        })
    }

    fn set_identity(&self, identity: &Identity) -> Result<(), AppError> {
        self.set_global("user.name", &identity.name)?;
        self.set_global("user.email", &identity.email)?;
        tracing::info!(name = %identity.name, email = %identity.email, "set global git identity");
        Ok(())
    }

    fn clear_identity(&self) -> Result<(), AppError> {
        self.unset_global("user.name")?;
        self.unset_global("user.email")?;
        tracing::info!("cleared global git identity");
        Ok(())
    }
}

impl RepositoryPort for GitCli {
    /// Checks if current directory is in a Git working tree
    fn is_inside_work_tree(&self) -> bool {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Ok(_) => false,
            Err(err) => {
                tracing::debug!(error = %err, "git not available, assuming no repository");
                false
            }
        }
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>, AppError> {
        let git_command_output: Output = self.run(&["remote", "get-url", remote])?;

        if !git_command_output.status.success() {
            // git reports a missing remote as a plain failure
            tracing::debug!(remote, "remote not configured");
            return Ok(None);
        }

        let value = String::from_utf8(git_command_output.stdout)?.trim().to_string();
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), AppError> {
        let git_command_output: Output = self.run(&["remote", "set-url", remote, url])?;

        if !git_command_output.status.success() {
            return Err(Self::failure(&git_command_output)?);
        }

        tracing::info!(remote, url, "updated remote url");
        Ok(())
    }
}

/// Value printed by `git config --get`; only the line terminator is dropped
/// so a padded value reads back exactly as it was written
fn config_value(stdout: &[u8]) -> Option<String> {
    let value = String::from_utf8_lossy(stdout);
    let value = value.trim_end_matches(['\n', '\r']);
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        which::which("git").is_ok()
    }

    #[test]
    fn reads_and_rewrites_origin_in_a_fresh_repository() {
        if !git_available() {
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let status = Command::new("git")
            .args(["init", "-q"])
            .current_dir(td.path())
            .status()
            .expect("git init");
        assert!(status.success());

        let git = GitCli::in_dir(td.path());
        assert!(git.is_inside_work_tree());
        assert_eq!(git.remote_url("origin").unwrap(), None);
        assert!(git.set_remote_url("origin", "git@github.com-work:a/b").is_err());

        let status = Command::new("git")
            .args(["remote", "add", "origin", "https://github.com/acme/widget"])
            .current_dir(td.path())
            .status()
            .expect("git remote add");
        assert!(status.success());

        git.set_remote_url("origin", "git@github.com-work:acme/widget").unwrap();
        assert_eq!(
            git.remote_url("origin").unwrap().as_deref(),
            Some("git@github.com-work:acme/widget")
        );
    }

    #[test]
    fn config_value_keeps_surrounding_spaces() {
        assert_eq!(config_value(b"Jane Doe\n").as_deref(), Some("Jane Doe"));
        assert_eq!(config_value(b" Jane \r\n").as_deref(), Some(" Jane "));
        assert_eq!(config_value(b"\n"), None);
    }

    #[test]
    fn padded_name_reads_back_unchanged_from_git() {
        if !git_available() {
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let file = td.path().join("gitconfig");
        let status = Command::new("git")
            .arg("config")
            .arg("--file")
            .arg(&file)
            .args(["user.name", "Jane "])
            .status()
            .expect("git config set");
        assert!(status.success());

        let output = Command::new("git")
            .arg("config")
            .arg("--file")
            .arg(&file)
            .args(["--get", "user.name"])
            .output()
            .expect("git config get");
        let name = config_value(&output.stdout).unwrap();

        let profile = crate::profile::Profile::new("work", "Jane ", "j@corp.com", PathBuf::from("k"));
        assert_eq!(name, "Jane ");
        assert!(profile.matches(&Identity::new(&name, "j@corp.com")));
    }

    #[test]
    fn missing_binary_surfaces_git_command_error() {
        let git = GitCli {
            program: "git-switch-definitely-missing".to_string(),
            work_dir: None,
        };
        assert!(matches!(git.get_global("user.name"), Err(AppError::GitCommand(_))));
        assert!(!git.is_inside_work_tree());
    }
}
