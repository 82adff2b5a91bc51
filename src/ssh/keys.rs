use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::error::AppError;

/// Key size requested from ssh-keygen
const KEY_BITS: &str = "4096";

/// Creates and deletes the key pair behind each profile
pub trait KeyPairs {
    /// Deterministic private key location for an alias
    fn key_path(&self, alias: &str) -> PathBuf;

    /// Generates a key pair, or returns the existing private key untouched
    ///
    /// `SshKeygen` hands the passphrase to `ssh-keygen -N`, where other local
    /// users can read it from the process list while the tool runs.
    fn generate(&self, alias: &str, email: &str, passphrase: Option<&str>) -> Result<PathBuf, AppError>;

    /// Deletes the private and public key, reporting each file separately
    fn remove(&self, key_path: &Path) -> KeyRemoval;
}

/// What happened to one key file during removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRemoval {
    Removed(PathBuf),
    Missing(PathBuf),
    Failed(PathBuf, String),
}

impl FileRemoval {
    pub fn path(&self) -> &Path {
        match self {
            FileRemoval::Removed(path) | FileRemoval::Missing(path) | FileRemoval::Failed(path, _) => path,
        }
    }

    #[cfg(test)]
    pub fn is_removed(&self) -> bool {
        matches!(self, FileRemoval::Removed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileRemoval::Failed(..))
    }
}

impl fmt::Display for FileRemoval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRemoval::Removed(path) => write!(f, "removed {}", path.display()),
            FileRemoval::Missing(path) => write!(f, "not found {}", path.display()),
            FileRemoval::Failed(path, err) => write!(f, "failed to remove {}: {err}", path.display()),
        }
    }
}

/// Outcome for both halves of a key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRemoval {
    pub private_key: FileRemoval,
    pub public_key: FileRemoval,
}

impl KeyRemoval {
    pub fn has_failures(&self) -> bool {
        self.private_key.is_failed() || self.public_key.is_failed()
    }
}

/// Public key path paired with a private key path
pub fn public_key_path(key_path: &Path) -> PathBuf {
    let mut name = key_path.as_os_str().to_owned();
    name.push(".pub");
    PathBuf::from(name)
}

/// Reads the public half of a key pair for display
pub fn read_public_key(key_path: &Path) -> Result<String, AppError> {
    Ok(fs::read_to_string(public_key_path(key_path))?.trim().to_string())
}

/// Key pairs generated with the OpenSSH `ssh-keygen` tool
#[derive(Debug, Clone)]
pub struct SshKeygen {
    ssh_dir: PathBuf,
    program: String,
}

impl SshKeygen {
    pub fn new(ssh_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssh_dir: ssh_dir.into(),
            program: "ssh-keygen".to_string(),
        }
    }

    /// Uses a different key generation executable
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn ensure_ssh_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.ssh_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.ssh_dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    fn failed(alias: &str, reason: impl Into<String>) -> AppError {
        AppError::KeyGenerationFailed {
            alias: alias.to_string(),
            reason: reason.into(),
        }
    }
}

impl KeyPairs for SshKeygen {
    fn key_path(&self, alias: &str) -> PathBuf {
        self.ssh_dir.join(format!("id_rsa_{alias}"))
    }

    fn generate(&self, alias: &str, email: &str, passphrase: Option<&str>) -> Result<PathBuf, AppError> {
        let key_path = self.key_path(alias);
        if key_path.exists() {
            tracing::info!(alias, path = %key_path.display(), "reusing existing SSH key");
            return Ok(key_path);
        }

        let program = which::which(&self.program)
            .map_err(|_| Self::failed(alias, format!("{} not found on PATH", self.program)))?;
        self.ensure_ssh_dir().map_err(|err| Self::failed(alias, err.to_string()))?;

        tracing::debug!(alias, path = %key_path.display(), "running ssh-keygen");
        let output = Command::new(program)
            .args(["-q", "-t", "rsa", "-b", KEY_BITS, "-C", email, "-N", passphrase.unwrap_or("")])
            .arg("-f")
            .arg(&key_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| Self::failed(alias, err.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(Self::failed(alias, reason));
        }
        if !key_path.exists() {
            return Err(Self::failed(alias, "no key file was written"));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))
                .map_err(|err| Self::failed(alias, err.to_string()))?;
            let public = public_key_path(&key_path);
            if public.exists() {
                fs::set_permissions(&public, fs::Permissions::from_mode(0o644))
                    .map_err(|err| Self::failed(alias, err.to_string()))?;
            }
        }

        tracing::info!(alias, path = %key_path.display(), "generated SSH key");
        Ok(key_path)
    }

    fn remove(&self, key_path: &Path) -> KeyRemoval {
        KeyRemoval {
            private_key: remove_file(key_path),
            public_key: remove_file(&public_key_path(key_path)),
        }
    }
}

/// Best-effort deletion of one file
pub fn remove_file(path: &Path) -> FileRemoval {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed key file");
            FileRemoval::Removed(path.to_path_buf())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "key file already absent");
            FileRemoval::Missing(path.to_path_buf())
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove key file");
            FileRemoval::Failed(path.to_path_buf(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_is_derived_from_alias() {
        let keys = SshKeygen::new("/home/j/.ssh");
        assert_eq!(keys.key_path("work"), PathBuf::from("/home/j/.ssh/id_rsa_work"));
        assert_eq!(
            public_key_path(&keys.key_path("work")),
            PathBuf::from("/home/j/.ssh/id_rsa_work.pub")
        );
    }

    #[test]
    fn existing_key_is_returned_unchanged() {
        let td = tempfile::tempdir().expect("tmpdir");
        let keys = SshKeygen::new(td.path()).with_program("ssh-keygen-definitely-missing");
        let existing = keys.key_path("work");
        fs::write(&existing, "PRIVATE").unwrap();

        let path = keys.generate("work", "j@x.io", None).unwrap();

        assert_eq!(path, existing);
        assert_eq!(fs::read_to_string(&path).unwrap(), "PRIVATE");
    }

    #[test]
    fn missing_tool_fails_without_creating_files() {
        let td = tempfile::tempdir().expect("tmpdir");
        let keys = SshKeygen::new(td.path().join("ssh")).with_program("ssh-keygen-definitely-missing");

        let err = keys.generate("work", "j@x.io", None).unwrap_err();

        assert!(matches!(err, AppError::KeyGenerationFailed { ref alias, .. } if alias == "work"));
        assert!(!td.path().join("ssh").exists());
    }

    #[test]
    fn generates_restricted_key_pair_with_email_comment() {
        if which::which("ssh-keygen").is_err() {
            return;
        }
        let td = tempfile::tempdir().expect("tmpdir");
        let keys = SshKeygen::new(td.path().join("ssh"));

        let path = keys.generate("work", "jane@corp.com", None).unwrap();

        assert!(path.exists());
        let public = read_public_key(&path).unwrap();
        assert!(public.starts_with("ssh-rsa "));
        assert!(public.ends_with("jane@corp.com"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }

        let again = keys.generate("work", "other@corp.com", None).unwrap();
        assert_eq!(again, path);
        assert!(read_public_key(&path).unwrap().ends_with("jane@corp.com"));
    }

    #[test]
    fn remove_reports_each_file() {
        let td = tempfile::tempdir().expect("tmpdir");
        let keys = SshKeygen::new(td.path());
        let path = keys.key_path("work");
        fs::write(public_key_path(&path), "ssh-rsa AAAA").unwrap();

        let removal = keys.remove(&path);

        assert_eq!(removal.private_key, FileRemoval::Missing(path.clone()));
        assert_eq!(removal.public_key, FileRemoval::Removed(public_key_path(&path)));
        assert!(!removal.has_failures());
        assert!(!public_key_path(&path).exists());
    }
}
