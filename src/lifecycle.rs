//! Add, switch and remove profiles across the store, the key pair, the SSH
//! config block and the global git identity.

use std::fmt;

use crate::{
    config::Settings,
    error::AppError,
    git::{GitCli, IdentityPort, RepositoryPort},
    profile::{Identity, Profile},
    remote::{RemoteSync, sync_origin},
    ssh::{BlockWrite, ConnectionProbe, KeyPairs, KeyRemoval, ProbeOutcome, SshConfigEditor, SshKeygen, SshProbe},
    storage::{ProfileStore, find_profile},
    validation::{validate_alias_format, validate_input_email, validate_input_username},
};

/// Input for a new profile
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub alias: String,
    pub user_name: String,
    pub user_email: String,
    pub passphrase: Option<String>,
}

/// Result of a completed add
#[derive(Debug, Clone)]
pub struct AddReport {
    pub profile: Profile,
    pub ssh_config: BlockWrite,
    /// `None` when probing is disabled
    pub probe: Option<ProbeOutcome>,
}

/// Result of a completed switch
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub profile: Profile,
    pub remote: RemoteSync,
    pub probe: Option<ProbeOutcome>,
}

/// Outcome of one independent removal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Done,
    NotNeeded,
    Failed(String),
}

impl Step {
    fn from_result<T>(result: Result<T, AppError>, done: impl FnOnce(T) -> bool) -> Self {
        match result {
            Ok(value) => {
                if done(value) {
                    Step::Done
                } else {
                    Step::NotNeeded
                }
            }
            Err(err) => Step::Failed(err.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Step::Failed(_))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Done => write!(f, "done"),
            Step::NotNeeded => write!(f, "nothing to do"),
            Step::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Item-by-item result of a removal
#[derive(Debug, Clone)]
pub struct RemoveReport {
    pub profile: Profile,
    pub keys: KeyRemoval,
    pub ssh_config: Step,
    pub store: Step,
    /// `Done` when the removed profile was the active identity and got cleared
    pub identity: Step,
}

impl RemoveReport {
    /// Descriptions of the steps that failed
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        if self.keys.has_failures() {
            for key in [&self.keys.private_key, &self.keys.public_key] {
                if key.is_failed() {
                    failures.push(key.to_string());
                }
            }
        }
        for (name, step) in [
            ("ssh config", &self.ssh_config),
            ("profile store", &self.store),
            ("git identity", &self.identity),
        ] {
            if let Step::Failed(reason) = step {
                failures.push(format!("{name}: {reason}"));
            }
        }
        failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }
}

/// Orchestrates profile operations over the store and the external tools
pub struct ProfileManager {
    settings: Settings,
    store: ProfileStore,
    ssh_config: SshConfigEditor,
    keys: Box<dyn KeyPairs>,
    probe: Box<dyn ConnectionProbe>,
    identity: Box<dyn IdentityPort>,
    repo: Box<dyn RepositoryPort>,
}

impl ProfileManager {
    /// Manager backed by `git`, `ssh-keygen` and `ssh`
    pub fn new(settings: Settings) -> Self {
        let keys = SshKeygen::new(&settings.ssh_dir);
        let probe = SshProbe::new(settings.probe_timeout);
        Self::with_parts(
            settings,
            Box::new(keys),
            Box::new(probe),
            Box::new(GitCli::new()),
            Box::new(GitCli::new()),
        )
    }

    pub fn with_parts(
        settings: Settings,
        keys: Box<dyn KeyPairs>,
        probe: Box<dyn ConnectionProbe>,
        identity: Box<dyn IdentityPort>,
        repo: Box<dyn RepositoryPort>,
    ) -> Self {
        Self {
            store: ProfileStore::new(&settings.profiles_file),
            ssh_config: SshConfigEditor::new(&settings.ssh_config_file, &settings.host),
            settings,
            keys,
            probe,
            identity,
            repo,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn ssh_config(&self) -> &SshConfigEditor {
        &self.ssh_config
    }

    /// Stored profiles in insertion order
    pub fn profiles(&self) -> Vec<Profile> {
        self.store.load()
    }

    pub fn host_alias(&self, profile: &Profile) -> String {
        profile.host_alias(&self.settings.host)
    }

    /// Creates key, SSH config block and store entry for a new profile
    ///
    /// `on_key_ready` runs once the key and config block exist and before the
    /// probe, so the caller can show the public key to the user.
    pub fn add<F>(&self, request: &NewProfile, on_key_ready: F) -> Result<AddReport, AppError>
    where
        F: FnOnce(&Profile),
    {
        let alias = request.alias.as_str();
        validate_alias_format(alias)?;
        validate_input_username(&request.user_name)?;
        validate_input_email(&request.user_email)?;
        if find_profile(&self.store.load(), alias).is_some() {
            return Err(AppError::DuplicateAlias(alias.to_string()));
        }

        let key_path = self
            .keys
            .generate(alias, &request.user_email, request.passphrase.as_deref())
            .map_err(|err| match err {
                AppError::KeyGenerationFailed { .. } => err,
                other => AppError::KeyGenerationFailed {
                    alias: alias.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let ssh_config = self
            .ssh_config
            .add_block(alias, &key_path)
            .map_err(|err| AppError::ConfigWriteFailed {
                alias: alias.to_string(),
                key_path: key_path.clone(),
                source: Box::new(err),
            })?;

        let profile = Profile::new(alias, &request.user_name, &request.user_email, key_path);
        on_key_ready(&profile);

        let probe = self
            .settings
            .probe_enabled
            .then(|| self.probe.probe(&self.host_alias(&profile)));

        let mut profiles = self.store.load();
        if find_profile(&profiles, alias).is_some() {
            return Err(AppError::DuplicateAlias(alias.to_string()));
        }
        profiles.push(profile.clone());
        self.store
            .save(&profiles)
            .map_err(|err| AppError::StoreWriteFailed {
                alias: alias.to_string(),
                source: Box::new(err),
            })?;
        tracing::info!(alias, "profile added");

        Ok(AddReport {
            profile,
            ssh_config,
            probe,
        })
    }

    /// Activates a profile: global identity, `origin` remote, then an advisory probe
    pub fn switch(&self, alias: &str) -> Result<SwitchReport, AppError> {
        let profile = self
            .store
            .find(alias)
            .ok_or_else(|| AppError::ProfileNotFound(alias.to_string()))?;

        self.identity
            .set_identity(&Identity::new(&profile.user_name, &profile.user_email))?;
        let remote = sync_origin(self.repo.as_ref(), &self.settings.host, alias);

        let probe = (self.settings.probe_enabled && profile.key_path.is_some())
            .then(|| self.probe.probe(&self.host_alias(&profile)));
        tracing::info!(alias, %remote, "switched profile");

        Ok(SwitchReport {
            profile,
            remote,
            probe,
        })
    }

    /// Deletes key pair, SSH config block and store entry, then clears the
    /// global identity if it belonged to the profile
    ///
    /// Every step runs even when an earlier one failed.
    pub fn remove(&self, alias: &str) -> Result<RemoveReport, AppError> {
        let profiles = self.store.load();
        let profile = find_profile(&profiles, alias)
            .cloned()
            .ok_or_else(|| AppError::ProfileNotFound(alias.to_string()))?;

        let key_path = profile
            .key_path
            .clone()
            .unwrap_or_else(|| self.keys.key_path(alias));
        let keys = self.keys.remove(&key_path);

        let ssh_config = Step::from_result(self.ssh_config.remove_block(alias), |removed| removed);

        let remaining: Vec<Profile> = profiles.into_iter().filter(|p| p.alias != alias).collect();
        let store = Step::from_result(self.store.save(&remaining), |_| true);

        let identity = match self.identity.get_identity() {
            Ok(Some(current)) if profile.matches(&current) => {
                Step::from_result(self.identity.clear_identity(), |_| true)
            }
            Ok(_) => Step::NotNeeded,
            Err(err) => Step::Failed(err.to_string()),
        };

        let report = RemoveReport {
            profile,
            keys,
            ssh_config,
            store,
            identity,
        };
        if report.is_complete() {
            tracing::info!(alias, "profile removed");
        } else {
            tracing::warn!(alias, failures = ?report.failures(), "profile partially removed");
        }
        Ok(report)
    }

    /// Global identity and the profile it belongs to, if any
    pub fn current(&self) -> Result<Option<(Identity, Option<Profile>)>, AppError> {
        Ok(self.identity.get_identity()?.map(|identity| {
            let profile = self.store.find_by_identity(&identity);
            (identity, profile)
        }))
    }

    /// Probes one profile, regardless of the probe setting
    pub fn test(&self, alias: &str) -> Result<(Profile, ProbeOutcome), AppError> {
        let profile = self
            .store
            .find(alias)
            .ok_or_else(|| AppError::ProfileNotFound(alias.to_string()))?;
        if profile.key_path.is_none() {
            return Err(AppError::Validation(format!("profile '{alias}' has no SSH key")));
        }
        let outcome = self.probe.probe(&self.host_alias(&profile));
        Ok((profile, outcome))
    }

    /// Probes every profile that has a key, in display order
    pub fn test_all(&self) -> Vec<(Profile, ProbeOutcome)> {
        self.profiles()
            .into_iter()
            .filter(|profile| profile.key_path.is_some())
            .map(|profile| {
                let outcome = self.probe.probe(&self.host_alias(&profile));
                (profile, outcome)
            })
            .collect()
    }

    /// Rewrites `origin` for the profile matching the active identity
    pub fn update_remote(&self) -> Result<(Profile, RemoteSync), AppError> {
        let Some((_, profile)) = self.current()? else {
            return Err(AppError::Validation("no global git identity is set".to_string()));
        };
        let profile = profile.ok_or_else(|| {
            AppError::Validation("current git identity does not match any profile".to_string())
        })?;
        let remote = sync_origin(self.repo.as_ref(), &self.settings.host, &profile.alias);
        Ok((profile, remote))
    }
}
