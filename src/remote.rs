use std::fmt;

use crate::{git::RepositoryPort, profile::host_alias};

/// Remote rewritten on switch
pub const ORIGIN: &str = "origin";

/// How a remote URL relates to the target host alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// URL must change to `to`
    Changed { to: String },
    /// URL already routes through the target alias
    AlreadyCurrent,
    /// URL does not point at the git host in a known shape
    Unrecognized,
}

/// Computes the aliased SSH form of `url` for `alias` on `host`
///
/// Accepts `https://<host>/<path>`, `git@<host>:<path>` and
/// `git@<host>-<other>:<path>`; `<path>` is carried over unchanged.
pub fn rewrite(url: &str, host: &str, alias: &str) -> Rewrite {
    let Some(path) = repository_path(url, host) else {
        return Rewrite::Unrecognized;
    };
    let target = format!("git@{}:{path}", host_alias(host, alias));
    if target == url {
        Rewrite::AlreadyCurrent
    } else {
        Rewrite::Changed { to: target }
    }
}

/// `<path>` part of a recognized remote URL
fn repository_path<'a>(url: &'a str, host: &str) -> Option<&'a str> {
    let path = if let Some(rest) = url.strip_prefix("https://") {
        rest.strip_prefix(host)?.strip_prefix('/')?
    } else {
        let rest = url.strip_prefix("git@")?.strip_prefix(host)?;
        match rest.strip_prefix('-') {
            Some(aliased) => {
                let (other, path) = aliased.split_once(':')?;
                if other.is_empty() || other.contains(['/', '@']) {
                    return None;
                }
                path
            }
            None => rest.strip_prefix(':')?,
        }
    };
    (!path.is_empty()).then_some(path)
}

/// What happened to `origin` during a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    NotInRepository,
    NoRemote,
    AlreadyCurrent { url: String },
    /// Remote points elsewhere and was left unchanged
    Unrecognized { url: String },
    Rewritten { from: String, to: String },
    Failed { reason: String },
}

impl fmt::Display for RemoteSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteSync::NotInRepository => write!(f, "not inside a git repository"),
            RemoteSync::NoRemote => write!(f, "no '{ORIGIN}' remote"),
            RemoteSync::AlreadyCurrent { url } => write!(f, "remote already uses {url}"),
            RemoteSync::Unrecognized { url } => write!(f, "remote left unchanged: {url}"),
            RemoteSync::Rewritten { from, to } => write!(f, "remote updated: {from} -> {to}"),
            RemoteSync::Failed { reason } => write!(f, "failed to update remote: {reason}"),
        }
    }
}

/// Points `origin` of the current repository at the host alias of `alias`
pub fn sync_origin(repo: &dyn RepositoryPort, host: &str, alias: &str) -> RemoteSync {
    if !repo.is_inside_work_tree() {
        return RemoteSync::NotInRepository;
    }

    let url = match repo.remote_url(ORIGIN) {
        Ok(Some(url)) => url,
        Ok(None) => return RemoteSync::NoRemote,
        Err(err) => return RemoteSync::Failed { reason: err.to_string() },
    };

    match rewrite(&url, host, alias) {
        Rewrite::AlreadyCurrent => RemoteSync::AlreadyCurrent { url },
        Rewrite::Unrecognized => {
            tracing::info!(%url, "remote does not point at the git host, leaving it");
            RemoteSync::Unrecognized { url }
        }
        Rewrite::Changed { to } => match repo.set_remote_url(ORIGIN, &to) {
            Ok(()) => RemoteSync::Rewritten { from: url, to },
            Err(err) => {
                tracing::warn!(error = %err, "failed to rewrite remote");
                RemoteSync::Failed { reason: err.to_string() }
            }
        },
    }
}
