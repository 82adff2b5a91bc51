//! Non-destructive editing of the SSH client configuration file.
//!
//! The file is parsed into an ordered list of segments. A segment is either text
//! this tool does not own, kept byte-for-byte, or a managed block belonging to
//! one profile:
//!
//! ```text
//! # Git profile: work
//! Host github.com-work
//!     HostName github.com
//!     User git
//!     IdentityFile /home/jane/.ssh/id_rsa_work
//!     IdentitiesOnly yes
//!
//! ```
//!
//! A block starts at its marker comment, or at a bare `Host <host>-<alias>` line
//! written by hand. It ends at the first blank line (which it keeps as its
//! separator), the next `Host`/`Match` declaration or the next marker, whichever
//! comes first. Commented-out options inside a block belong to the block.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{error::AppError, fs_util::write_atomic, profile::host_alias};

/// Comment that tags a managed block
pub const MARKER_PREFIX: &str = "# Git profile:";

/// One contiguous region of the file owned by a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    alias: String,
    lines: Vec<String>,
    separator: Option<String>,
}

impl ManagedBlock {
    /// Builds the canonical block for a profile
    pub fn new(alias: &str, host: &str, key_path: &Path) -> Self {
        let lines = vec![
            format!("{MARKER_PREFIX} {alias}"),
            format!("Host {}", host_alias(host, alias)),
            format!("    HostName {host}"),
            "    User git".to_string(),
            format!("    IdentityFile {}", identity_file_value(key_path)),
            "    IdentitiesOnly yes".to_string(),
        ];
        Self {
            alias: alias.to_string(),
            lines,
            separator: Some(String::new()),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Raw lines, marker included, separator excluded
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Host pattern of the block's `Host` line
    pub fn host_alias(&self) -> Option<&str> {
        self.lines.iter().find_map(|line| match split_keyword(line) {
            Some((key, value)) if key.eq_ignore_ascii_case("host") => Some(value),
            _ => None,
        })
    }

    /// Value of an option line such as `IdentityFile`, keyword matched case-insensitively
    pub fn option(&self, name: &str) -> Option<&str> {
        self.lines.iter().skip_while(|line| !is_declaration(line)).skip(1).find_map(|line| {
            match split_keyword(line) {
                Some((key, value)) if key.eq_ignore_ascii_case(name) => Some(value),
                _ => None,
            }
        })
    }

    /// Ends every line with `\r` so the block matches a CRLF file
    fn use_crlf(&mut self) {
        for line in self.lines.iter_mut().chain(self.separator.iter_mut()) {
            if !line.ends_with('\r') {
                line.push('\r');
            }
        }
    }

    pub fn identity_file(&self) -> Option<PathBuf> {
        self.option("IdentityFile")
            .map(|value| PathBuf::from(value.trim_matches('"')))
    }
}

/// A piece of the configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(Vec<String>),
    Managed(ManagedBlock),
}

/// Whether `add_block` created a new block or rewrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWrite {
    Added,
    Replaced,
}

/// Parsed SSH configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfigDocument {
    segments: Vec<Segment>,
    trailing_newline: bool,
    crlf: bool,
}

impl SshConfigDocument {
    /// Splits `contents` into text and managed segments for `host`
    pub fn parse(contents: &str, host: &str) -> Self {
        let mut lines: Vec<&str> = contents.split('\n').collect();
        let trailing_newline = contents.ends_with('\n');
        let crlf = lines.first().is_some_and(|line| line.ends_with('\r')) && lines.len() > 1;
        if trailing_newline || contents.is_empty() {
            lines.pop();
        }

        let mut segments = Vec::new();
        let mut text: Vec<String> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let (alias, has_marker) = if let Some(alias) = marker_alias(line) {
                (alias, true)
            } else if let Some(alias) = unmarked_alias(line, host) {
                (alias, false)
            } else {
                text.push(line.to_string());
                i += 1;
                continue;
            };

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }

            let mut block_lines = vec![line.to_string()];
            i += 1;
            if has_marker && i < lines.len() && is_declaration(lines[i]) {
                block_lines.push(lines[i].to_string());
                i += 1;
            }
            while i < lines.len() && !ends_block(lines[i]) {
                block_lines.push(lines[i].to_string());
                i += 1;
            }
            let separator = if i < lines.len() && lines[i].trim().is_empty() {
                i += 1;
                Some(lines[i - 1].to_string())
            } else {
                None
            };

            segments.push(Segment::Managed(ManagedBlock {
                alias,
                lines: block_lines,
                separator,
            }));
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self {
            segments,
            trailing_newline,
            crlf,
        }
    }

    /// Serializes back to file contents; untouched segments come out as read
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => lines.extend(text.iter().map(String::as_str)),
                Segment::Managed(block) => {
                    lines.extend(block.lines.iter().map(String::as_str));
                    if let Some(separator) = &block.separator {
                        lines.push(separator);
                    }
                }
            }
        }
        let mut out = lines.join("\n");
        if self.trailing_newline && !lines.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn blocks(&self) -> impl Iterator<Item = &ManagedBlock> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Managed(block) => Some(block),
            Segment::Text(_) => None,
        })
    }

    /// First block owned by `alias`
    pub fn block(&self, alias: &str) -> Option<&ManagedBlock> {
        self.blocks().find(|block| block.alias == alias)
    }

    /// Replaces the block for `block.alias()` in place, or appends it at the end
    ///
    /// Later duplicates for the same alias are dropped so the SSH client cannot
    /// pick a stale entry.
    pub fn upsert(&mut self, mut block: ManagedBlock) -> BlockWrite {
        if self.crlf {
            block.use_crlf();
        }
        let alias = block.alias.clone();
        let first = self
            .segments
            .iter()
            .position(|segment| matches!(segment, Segment::Managed(b) if b.alias == alias));

        match first {
            Some(index) => {
                self.segments[index] = Segment::Managed(block);
                let mut position = 0;
                self.segments.retain(|segment| {
                    let keep = position <= index
                        || !matches!(segment, Segment::Managed(b) if b.alias == alias);
                    position += 1;
                    keep
                });
                BlockWrite::Replaced
            }
            None => {
                let eol = if self.crlf { "\r" } else { "" };
                if self.crlf && !self.trailing_newline {
                    if let Some(line) = self.last_line_mut() {
                        line.push('\r');
                    }
                }
                if self.last_line().is_some_and(|line| !line.trim().is_empty()) {
                    self.segments.push(Segment::Text(vec![eol.to_string()]));
                }
                self.segments.push(Segment::Managed(block));
                self.trailing_newline = true;
                BlockWrite::Added
            }
        }
    }

    /// Deletes every block for `alias`, returning whether anything was removed
    pub fn remove(&mut self, alias: &str) -> bool {
        let before = self.segments.len();
        self.segments
            .retain(|segment| !matches!(segment, Segment::Managed(b) if b.alias == alias));
        self.segments.len() != before
    }

    fn last_line_mut(&mut self) -> Option<&mut String> {
        match self.segments.last_mut()? {
            Segment::Text(text) => text.last_mut(),
            Segment::Managed(block) => match &mut block.separator {
                Some(separator) => Some(separator),
                None => block.lines.last_mut(),
            },
        }
    }

    fn last_line(&self) -> Option<&str> {
        match self.segments.last()? {
            Segment::Text(text) => text.last().map(String::as_str),
            Segment::Managed(block) => block
                .separator
                .as_deref()
                .or_else(|| block.lines.last().map(String::as_str)),
        }
    }
}

/// The SSH client configuration file for one git host
#[derive(Debug, Clone)]
pub struct SshConfigEditor {
    path: PathBuf,
    host: String,
}

impl SshConfigEditor {
    pub fn new(path: impl Into<PathBuf>, host: &str) -> Self {
        Self {
            path: path.into(),
            host: host.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the file; a missing file is an empty document
    pub fn read(&self) -> Result<SshConfigDocument, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(SshConfigDocument::parse(&contents, &self.host)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SshConfigDocument::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the block for `alias`, replacing any existing one
    pub fn add_block(&self, alias: &str, key_path: &Path) -> Result<BlockWrite, AppError> {
        let mut document = self.read()?;
        let write = document.upsert(ManagedBlock::new(alias, &self.host, key_path));
        write_atomic(&self.path, document.render().as_bytes())?;
        tracing::info!(alias, path = %self.path.display(), ?write, "wrote SSH config block");
        Ok(write)
    }

    /// Deletes the block for `alias`; an absent block leaves the file untouched
    pub fn remove_block(&self, alias: &str) -> Result<bool, AppError> {
        let mut document = self.read()?;
        if !document.remove(alias) {
            tracing::debug!(alias, "no SSH config block to remove");
            return Ok(false);
        }
        write_atomic(&self.path, document.render().as_bytes())?;
        tracing::info!(alias, path = %self.path.display(), "removed SSH config block");
        Ok(true)
    }

    pub fn block(&self, alias: &str) -> Result<Option<ManagedBlock>, AppError> {
        Ok(self.read()?.block(alias).cloned())
    }
}

/// Alias named by a marker comment line
fn marker_alias(line: &str) -> Option<String> {
    let alias = line.trim().strip_prefix(MARKER_PREFIX)?.trim();
    (!alias.is_empty()).then(|| alias.to_string())
}

/// Alias of a hand-written `Host <host>-<alias>` line with a single pattern
fn unmarked_alias(line: &str, host: &str) -> Option<String> {
    let (key, value) = split_keyword(line)?;
    if !key.eq_ignore_ascii_case("host") || value.split_whitespace().count() != 1 {
        return None;
    }
    let alias = value.strip_prefix(host)?.strip_prefix('-')?;
    (!alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric())).then(|| alias.to_string())
}

/// `Host` or `Match` line starting a new stanza
fn is_declaration(line: &str) -> bool {
    matches!(split_keyword(line), Some((key, _)) if key.eq_ignore_ascii_case("host") || key.eq_ignore_ascii_case("match"))
}

fn ends_block(line: &str) -> bool {
    line.trim().is_empty() || is_declaration(line) || marker_alias(line).is_some()
}

/// Splits `Keyword value` or `Keyword=value`, ignoring comments
fn split_keyword(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let end = trimmed.find(|c: char| c.is_whitespace() || c == '=')?;
    let (key, rest) = trimmed.split_at(end);
    let value = rest.trim_start().strip_prefix('=').unwrap_or(rest).trim();
    Some((key, value))
}

/// Forward slashes on every platform, quoted when the path has spaces
fn identity_file_value(key_path: &Path) -> String {
    let value = key_path.to_string_lossy().replace('\\', "/");
    if value.contains(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "github.com";

    fn doc(contents: &str) -> SshConfigDocument {
        SshConfigDocument::parse(contents, HOST)
    }

    fn block(alias: &str, key: &str) -> ManagedBlock {
        ManagedBlock::new(alias, HOST, Path::new(key))
    }

    #[test]
    fn unmanaged_text_round_trips_byte_for_byte() {
        for contents in [
            "",
            "Host *\n    ServerAliveInterval 60\n",
            "Host box\r\n  User me\r\n\r\n# note",
            "\n\n",
            "Host a\n\tUser x\nHost b\n",
        ] {
            assert_eq!(doc(contents).render(), contents);
        }
    }

    #[test]
    fn parses_marked_block_with_fields() {
        let contents = "Host *\n  AddKeysToAgent yes\n\n# Git profile: work\nHost github.com-work\n    HostName github.com\n    User git\n    IdentityFile /k/id_rsa_work\n    IdentitiesOnly yes\n\nHost box\n";
        let document = doc(contents);

        let work = document.block("work").expect("block");
        assert_eq!(work.host_alias(), Some("github.com-work"));
        assert_eq!(work.identity_file(), Some(PathBuf::from("/k/id_rsa_work")));
        assert_eq!(work.option("hostname"), Some("github.com"));
        assert_eq!(document.segments.len(), 3);
        assert_eq!(document.render(), contents);
    }

    #[test]
    fn hand_written_host_alias_is_recognized() {
        let document = doc("Host github.com-home\n  IdentityFile=~/.ssh/home\nHost github.com\n  User git\n");
        let home = document.block("home").expect("block");
        assert_eq!(home.lines().len(), 2);
        assert_eq!(home.identity_file(), Some(PathBuf::from("~/.ssh/home")));
        assert!(document.block("github").is_none());
    }

    #[test]
    fn other_hosts_and_multi_pattern_lines_stay_text() {
        let document = doc("Host gitlab.com-work\nHost github.com-a github.com-b\nHost github.com-my_work\n");
        assert_eq!(document.blocks().count(), 0);
    }

    #[test]
    fn block_ends_at_next_host_when_blank_line_is_missing() {
        let contents = "# Git profile: work\nHost github.com-work\n    IdentityFile /k/w\nHost personal\n    User me\n";
        let mut document = doc(contents);

        assert!(document.remove("work"));

        assert_eq!(document.render(), "Host personal\n    User me\n");
    }

    #[test]
    fn marker_ends_block_without_blank_line() {
        let contents = "# Git profile: work\nHost github.com-work\n    User git\n# Git profile: home\nHost github.com-home\n    User git\n";
        let mut document = doc(contents);
        document.remove("work");
        assert_eq!(document.render(), "# Git profile: home\nHost github.com-home\n    User git\n");
    }

    const COMMENTED_OPTION: &str = "Host box\n    User me\n\n# Git profile: work\nHost github.com-work\n    HostName github.com\n#    Port 443\n    User git\n    IdentityFile /k/old\n    IdentitiesOnly yes\n\n";

    #[test]
    fn remove_takes_commented_options_with_the_block() {
        let mut document = doc(COMMENTED_OPTION);

        assert!(document.remove("work"));

        assert_eq!(document.render(), "Host box\n    User me\n\n");
    }

    #[test]
    fn upsert_replaces_commented_options_too() {
        let mut document = doc(COMMENTED_OPTION);

        assert_eq!(document.upsert(block("work", "/k/new")), BlockWrite::Replaced);

        let rendered = document.render();
        assert!(!rendered.contains("/k/old"));
        assert!(!rendered.contains("Port 443"));
        assert_eq!(rendered.matches("IdentityFile").count(), 1);
        assert!(rendered.starts_with("Host box\n    User me\n\n# Git profile: work\n"));
    }

    #[test]
    fn append_to_crlf_file_keeps_crlf() {
        for contents in ["Host box\r\n    User me\r\n", "Host box\r\n    User me"] {
            let mut document = doc(contents);
            document.upsert(block("work", "/k/w"));

            let rendered = document.render();
            assert!(rendered.contains("Host github.com-work\r\n"));
            assert!(rendered.ends_with("IdentitiesOnly yes\r\n\r\n"));
            assert_eq!(rendered.matches('\n').count(), rendered.matches("\r\n").count(), "{rendered:?}");
        }
    }

    #[test]
    fn append_adds_block_and_separator() {
        let mut document = doc("");
        assert_eq!(document.upsert(block("work", "/k/w")), BlockWrite::Added);
        assert_eq!(
            document.render(),
            "# Git profile: work\nHost github.com-work\n    HostName github.com\n    User git\n    IdentityFile /k/w\n    IdentitiesOnly yes\n\n"
        );
    }

    #[test]
    fn append_after_file_without_trailing_newline() {
        let mut document = doc("Host box\n    User me");
        document.upsert(block("work", "/k/w"));
        let rendered = document.render();
        assert!(rendered.starts_with("Host box\n    User me\n\n# Git profile: work\n"));
        assert!(rendered.ends_with("IdentitiesOnly yes\n\n"));
    }

    #[test]
    fn upsert_replaces_in_place_and_drops_duplicates() {
        let contents = "# Git profile: work\nHost github.com-work\n    IdentityFile /old\n\nHost box\n    User me\n\n# Git profile: work\nHost github.com-work\n    IdentityFile /older\n\n";
        let mut document = doc(contents);

        assert_eq!(document.upsert(block("work", "/new")), BlockWrite::Replaced);

        let rendered = document.render();
        assert_eq!(rendered.matches("Host github.com-work").count(), 1);
        assert!(rendered.starts_with("# Git profile: work\nHost github.com-work\n"));
        assert!(rendered.contains("IdentityFile /new"));
        assert!(rendered.contains("Host box\n    User me\n"));
        assert!(!rendered.contains("/old"));
    }

    #[test]
    fn remove_keeps_neighbours() {
        let mut document = doc("");
        document.upsert(block("work", "/k/w"));
        document.upsert(block("home", "/k/h"));

        assert!(document.remove("work"));

        assert!(document.block("work").is_none());
        assert_eq!(document.block("home").and_then(|b| b.identity_file()), Some(PathBuf::from("/k/h")));
    }

    #[test]
    fn identity_file_with_spaces_is_quoted() {
        let b = block("work", "/Users/Jane Doe/.ssh/id_rsa_work");
        assert!(b.lines().contains(&"    IdentityFile \"/Users/Jane Doe/.ssh/id_rsa_work\"".to_string()));
        assert_eq!(b.identity_file(), Some(PathBuf::from("/Users/Jane Doe/.ssh/id_rsa_work")));
    }

    #[test]
    fn editor_add_twice_keeps_one_block_with_new_key() {
        let td = tempfile::tempdir().expect("tmpdir");
        let editor = SshConfigEditor::new(td.path().join("config"), HOST);

        assert_eq!(editor.add_block("work", Path::new("/k/first")).unwrap(), BlockWrite::Added);
        assert_eq!(editor.add_block("work", Path::new("/k/second")).unwrap(), BlockWrite::Replaced);

        let contents = fs::read_to_string(editor.path()).unwrap();
        assert_eq!(contents.matches("# Git profile: work").count(), 1);
        assert_eq!(contents.matches("Host github.com-work").count(), 1);
        assert_eq!(
            editor.block("work").unwrap().and_then(|b| b.identity_file()),
            Some(PathBuf::from("/k/second"))
        );
    }

    #[test]
    fn editor_remove_absent_block_leaves_file_untouched() {
        let td = tempfile::tempdir().expect("tmpdir");
        let path = td.path().join("config");
        let original = "Host box\n  User me\n# trailing comment without newline";
        fs::write(&path, original).unwrap();
        let editor = SshConfigEditor::new(&path, HOST);

        assert!(!editor.remove_block("work").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);

        let missing = SshConfigEditor::new(td.path().join("absent"), HOST);
        assert!(!missing.remove_block("work").unwrap());
        assert!(!td.path().join("absent").exists());
    }

    #[test]
    fn editor_keeps_manual_entries_across_add_and_remove() {
        let td = tempfile::tempdir().expect("tmpdir");
        let path = td.path().join("config");
        let manual = "Host *\n    ServerAliveInterval 30\n\nHost box\n    HostName 10.0.0.2\n";
        fs::write(&path, manual).unwrap();
        let editor = SshConfigEditor::new(&path, HOST);

        editor.add_block("work", Path::new("/k/w")).unwrap();
        assert!(editor.remove_block("work").unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{manual}\n"));
    }
}
