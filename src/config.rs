use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::AppError;

/// Profiles file in user's home directory
const PROFILES_FILE: &str = ".git_profiles.json";
/// SSH directory in user's home directory
const SSH_DIR: &str = ".ssh";
/// Hosting service every profile authenticates against
pub const DEFAULT_HOST: &str = "github.com";
/// Seconds before an unresponsive SSH probe is killed
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// Resolved locations and knobs for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// JSON file holding the profile list
    pub profiles_file: PathBuf,
    /// Directory where key pairs are generated
    pub ssh_dir: PathBuf,
    /// SSH client configuration file
    pub ssh_config_file: PathBuf,
    /// Git host, e.g. `github.com`
    pub host: String,
    /// Upper bound for a connection probe
    pub probe_timeout: Duration,
    /// Whether Add/Switch run the advisory connection probe
    pub probe_enabled: bool,
}

impl Settings {
    /// Defaults rooted at `home`
    pub fn with_home(home: &Path) -> Self {
        let ssh_dir = home.join(SSH_DIR);
        Self {
            profiles_file: home.join(PROFILES_FILE),
            ssh_config_file: ssh_dir.join("config"),
            ssh_dir,
            host: DEFAULT_HOST.to_string(),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            probe_enabled: true,
        }
    }

    /// Resolves settings from the home directory and `GIT_SWITCH_*` overrides
    pub fn from_env() -> Result<Self, AppError> {
        let home_dir: PathBuf = dirs::home_dir().ok_or_else(|| {
            AppError::Validation("failed to find the home directory".to_string())
        })?;
        Self::from_lookup(&home_dir, |key| env::var(key).ok())
    }

    /// Applies overrides from `lookup` on top of the defaults for `home`
    pub fn from_lookup<F>(home: &Path, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::with_home(home);
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = var("GIT_SWITCH_PROFILES") {
            settings.profiles_file = PathBuf::from(path);
        }
        if let Some(dir) = var("GIT_SWITCH_SSH_DIR") {
            settings.ssh_dir = PathBuf::from(dir);
            settings.ssh_config_file = settings.ssh_dir.join("config");
        }
        if let Some(path) = var("GIT_SWITCH_SSH_CONFIG") {
            settings.ssh_config_file = PathBuf::from(path);
        }
        if let Some(host) = var("GIT_SWITCH_HOST") {
            settings.host = host;
        }
        if let Some(secs) = var("GIT_SWITCH_PROBE_TIMEOUT") {
            let secs: u64 = secs.parse().map_err(|_| {
                AppError::Validation(format!("GIT_SWITCH_PROBE_TIMEOUT must be whole seconds, got '{secs}'"))
            })?;
            if secs == 0 {
                return Err(AppError::Validation(
                    "GIT_SWITCH_PROBE_TIMEOUT must be greater than zero".to_string(),
                ));
            }
            settings.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = var("GIT_SWITCH_NO_PROBE") {
            settings.probe_enabled = !matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(settings)
    }

    /// Page where a public key is registered with the host
    pub fn ssh_keys_url(&self) -> String {
        format!("https://{}/settings/ssh/new", self.host)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_live_under_home() {
        let settings = Settings::from_lookup(Path::new("/home/jane"), lookup(&[])).unwrap();
        assert_eq!(settings.profiles_file, PathBuf::from("/home/jane/.git_profiles.json"));
        assert_eq!(settings.ssh_dir, PathBuf::from("/home/jane/.ssh"));
        assert_eq!(settings.ssh_config_file, PathBuf::from("/home/jane/.ssh/config"));
        assert_eq!(settings.host, "github.com");
        assert_eq!(settings.probe_timeout, Duration::from_secs(15));
        assert!(settings.probe_enabled);
    }

    #[test]
    fn ssh_dir_override_moves_config_unless_config_is_set() {
        let settings =
            Settings::from_lookup(Path::new("/h"), lookup(&[("GIT_SWITCH_SSH_DIR", "/tmp/keys")])).unwrap();
        assert_eq!(settings.ssh_config_file, PathBuf::from("/tmp/keys/config"));

        let settings = Settings::from_lookup(
            Path::new("/h"),
            lookup(&[("GIT_SWITCH_SSH_DIR", "/tmp/keys"), ("GIT_SWITCH_SSH_CONFIG", "/tmp/cfg")]),
        )
        .unwrap();
        assert_eq!(settings.ssh_config_file, PathBuf::from("/tmp/cfg"));
    }

    #[test]
    fn probe_overrides() {
        let settings = Settings::from_lookup(
            Path::new("/h"),
            lookup(&[("GIT_SWITCH_PROBE_TIMEOUT", "4"), ("GIT_SWITCH_NO_PROBE", "true")]),
        )
        .unwrap();
        assert_eq!(settings.probe_timeout, Duration::from_secs(4));
        assert!(!settings.probe_enabled);
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Settings::from_lookup(Path::new("/h"), lookup(&[("GIT_SWITCH_PROBE_TIMEOUT", "soon")]));
        assert!(matches!(err, Err(AppError::Validation(_))));
        let err = Settings::from_lookup(Path::new("/h"), lookup(&[("GIT_SWITCH_PROBE_TIMEOUT", "0")]));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn keys_url_follows_host() {
        let settings = Settings::with_home(Path::new("/h"));
        assert_eq!(settings.ssh_keys_url(), "https://github.com/settings/ssh/new");
    }
}
