//! Keeps several Git identities side by side and switches between them.
//!
//! Every profile owns a key pair, a `Host <host>-<alias>` block in the SSH
//! client configuration and an entry in the profiles file. Switching sets the
//! global `user.name`/`user.email` and points the current repository's
//! `origin` at the profile's host alias so pushes use the right key.
//!
//! The store and the SSH config are written atomically, but two invocations
//! running at the same time are not coordinated; the last writer wins.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs_util;
pub mod git;
pub mod lifecycle;
pub mod menu;
pub mod profile;
pub mod remote;
pub mod ssh;
pub mod storage;
pub mod validation;

pub use config::Settings;
pub use error::AppError;
pub use lifecycle::{NewProfile, ProfileManager};
pub use profile::{Identity, Profile};
