use std::{
    fs,
    io::Write,
    path::Path,
};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// Replaces `path` with `contents` via a temp file in the same directory and a rename.
///
/// Readers see either the old or the new file, never a truncated one. An existing
/// file keeps its permissions; a new one is created owner read/write only.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }

    tmp.persist(path).map_err(|err| AppError::Io(err.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file atomically");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_contents() {
        let td = tempfile::tempdir().expect("tmpdir");
        let target = td.path().join("store.json");
        fs::write(&target, "old contents that are longer").unwrap();

        write_atomic(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(td.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temp file must be renamed away");
    }

    #[test]
    fn creates_missing_parent_directory() {
        let td = tempfile::tempdir().expect("tmpdir");
        let target = td.path().join("nested").join("config");
        write_atomic(&target, b"Host x\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "Host x\n");
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permissions_of_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir().expect("tmpdir");
        let target = td.path().join("config");
        fs::write(&target, "a").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&target, b"b").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn new_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir().expect("tmpdir");
        let target = td.path().join("fresh");
        write_atomic(&target, b"x").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
