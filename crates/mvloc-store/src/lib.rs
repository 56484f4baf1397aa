//! Scoped reading and writing of locale catalogs and source snapshots.
//!
//! Every file is opened, read fully and closed inside one call; nothing holds
//! a handle across operations. Writes go through [`write_atomic`].

mod catalog;
mod snapshot;

pub use catalog::{parse_catalog, serialize_catalog};
pub use snapshot::{load_snapshot, parse_json_snapshot, SNAPSHOT_EXTENSIONS};

use mvloc_core::{LocaleFile, MvlocError};
use std::fs;
use std::io::Write;
use std::path::Path;

pub type StoreResult<T> = std::result::Result<T, MvlocError>;

pub(crate) fn read_utf8(path: &Path) -> StoreResult<String> {
    let bytes = fs::read(path).map_err(|e| MvlocError::io(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        let offset = e.utf8_error().valid_up_to();
        let line = e.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1;
        MvlocError::Parse {
            path: path.to_path_buf(),
            line,
            key: None,
            message: "file is not valid UTF-8".into(),
        }
    })
}

/// Load a locale catalog. A file that does not exist yet yields an empty one.
pub fn load_locale(path: &Path, fallback_language: &str) -> StoreResult<LocaleFile> {
    if !path.exists() {
        tracing::debug!(event = "locale_absent", path = %path.display());
        return Ok(LocaleFile::new(fallback_language));
    }
    let text = read_utf8(path)?;
    let file = parse_catalog(&text, path, fallback_language)?;
    tracing::debug!(
        event = "locale_loaded",
        path = %path.display(),
        entries = file.len()
    );
    Ok(file)
}

/// Save a locale catalog. Returns `false` when the bytes on disk already match.
pub fn save_locale(path: &Path, file: &LocaleFile) -> StoreResult<bool> {
    let text = serialize_catalog(file);
    if let Ok(current) = fs::read(path) {
        if current == text.as_bytes() {
            tracing::debug!(event = "locale_unchanged", path = %path.display());
            return Ok(false);
        }
    }
    write_atomic(path, text.as_bytes())?;
    tracing::debug!(event = "locale_saved", path = %path.display(), bytes = text.len());
    Ok(true)
}

/// Write through a sibling temp file and rename it over the target, so a
/// reader never observes a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| MvlocError::io(dir, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".into());
    let tmp = dir.join(format!(".{name}.{}.tmp", std::process::id()));

    let written = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.flush()?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(MvlocError::io(path, e));
    }
    Ok(())
}
