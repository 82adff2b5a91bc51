use std::{
    fmt,
    io::Read,
    process::{Command, Stdio},
    thread,
    time::Duration,
};

use wait_timeout::ChildExt;

/// Phrase the git host prints once the key is accepted
const AUTH_SUCCESS_PHRASE: &str = "successfully authenticated";

/// Output fragments meaning the host was never reached
const CONNECTION_ERRORS: &[&str] = &[
    "could not resolve hostname",
    "connection timed out",
    "operation timed out",
    "connection refused",
    "network is unreachable",
    "no route to host",
    "connection closed by",
    "connection reset",
];

/// Result of an authentication probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Key accepted; `account` is the user name the host greeted, if any
    Authenticated { account: Option<String> },
    /// Host answered but did not accept the key
    Rejected { output: String },
    /// Host could not be reached or did not answer in time
    Unreachable { output: String },
    /// ssh could not run or produced nothing to classify
    Unknown { detail: String },
}

impl ProbeOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ProbeOutcome::Authenticated { .. })
    }

    /// Next step for the user
    pub fn guidance(&self, host_alias: &str, keys_url: &str) -> String {
        match self {
            ProbeOutcome::Authenticated { .. } => format!("git@{host_alias} is ready to use"),
            ProbeOutcome::Rejected { .. } => format!(
                "the key was not accepted. Add the public key at {keys_url}, then run: ssh -T git@{host_alias}"
            ),
            ProbeOutcome::Unreachable { .. } => {
                "could not reach the host. Check your network connection and try again".to_string()
            }
            ProbeOutcome::Unknown { .. } => {
                "could not run ssh. Make sure an OpenSSH client is installed and on PATH".to_string()
            }
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Authenticated { account: Some(account) } => {
                write!(f, "authenticated as {account}")
            }
            ProbeOutcome::Authenticated { account: None } => write!(f, "authenticated"),
            ProbeOutcome::Rejected { output } => write!(f, "rejected: {output}"),
            ProbeOutcome::Unreachable { output } => write!(f, "unreachable: {output}"),
            ProbeOutcome::Unknown { detail } => write!(f, "unknown: {detail}"),
        }
    }
}

/// Verifies that a host alias authenticates
pub trait ConnectionProbe {
    fn probe(&self, host_alias: &str) -> ProbeOutcome;
}

/// Probe driving the OpenSSH client in batch mode
#[derive(Debug, Clone)]
pub struct SshProbe {
    program: String,
    timeout: Duration,
}

impl SshProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ssh".to_string(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn args(&self, host_alias: &str) -> Vec<String> {
        let connect_secs = self.timeout.as_secs().max(1);
        vec![
            "-T".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={connect_secs}"),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            format!("git@{host_alias}"),
        ]
    }
}

impl ConnectionProbe for SshProbe {
    fn probe(&self, host_alias: &str) -> ProbeOutcome {
        tracing::debug!(host_alias, timeout = ?self.timeout, "probing ssh authentication");
        let mut child = match Command::new(&self.program)
            .args(self.args(host_alias))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                return ProbeOutcome::Unknown {
                    detail: format!("failed to run {}: {err}", self.program),
                };
            }
        };

        // Drain both pipes off-thread so a chatty child cannot block on a full pipe.
        let readers: Vec<_> = [
            child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
            child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        ]
        .into_iter()
        .flatten()
        .map(|mut stream| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stream.read_to_string(&mut buf);
                buf
            })
        })
        .collect();

        let timed_out = match child.wait_timeout(self.timeout) {
            Ok(Some(_status)) => false,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                true
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return ProbeOutcome::Unknown {
                    detail: format!("failed to wait for {}: {err}", self.program),
                };
            }
        };

        // Readers of a killed child may still be held open by its descendants; leave them detached.
        let outcome = if timed_out {
            ProbeOutcome::Unreachable {
                output: format!("no answer within {}s", self.timeout.as_secs()),
            }
        } else {
            let output: String = readers
                .into_iter()
                .filter_map(|reader| reader.join().ok())
                .collect::<Vec<_>>()
                .join("\n");
            classify(&output)
        };
        tracing::info!(host_alias, %outcome, "ssh probe finished");
        outcome
    }
}

/// Classifies combined ssh output; the exit code is ignored because the git host
/// closes the session with a failure status even after a successful login.
pub fn classify(output: &str) -> ProbeOutcome {
    let trimmed = output.trim();
    let lower = trimmed.to_lowercase();

    if lower.contains(AUTH_SUCCESS_PHRASE) {
        return ProbeOutcome::Authenticated {
            account: greeted_account(trimmed),
        };
    }
    if CONNECTION_ERRORS.iter().any(|phrase| lower.contains(phrase)) {
        return ProbeOutcome::Unreachable {
            output: trimmed.to_string(),
        };
    }
    if trimmed.is_empty() {
        return ProbeOutcome::Unknown {
            detail: "ssh produced no output".to_string(),
        };
    }
    ProbeOutcome::Rejected {
        output: trimmed.to_string(),
    }
}

/// Extracts `name` from a `Hi name! ...` greeting
fn greeted_account(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Hi ")?;
        let end = rest.find('!')?;
        let name = rest[..end].trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}
