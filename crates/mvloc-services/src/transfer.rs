use color_eyre::eyre::WrapErr;
use mvloc_core::{MvlocError, Result};
use mvloc_store::{load_locale, save_locale};
use mvloc_sync::{CopyCriteria, TransferStats};
use std::path::Path;

fn existing(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(MvlocError::io(
        path,
        std::io::Error::new(std::io::ErrorKind::NotFound, "catalog not found"),
    )
    .into())
}

/// Copy translations from the catalog at `from` into the one at `into` and
/// write the result to `output`. A catalog without a `Language:` header takes
/// its language from the file stem of `into`.
pub fn merge_catalogs(
    from: &Path,
    into: &Path,
    output: &Path,
    criteria: &CopyCriteria,
    relocate: bool,
) -> Result<TransferStats> {
    existing(from)?;
    existing(into)?;
    let stem = into
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let target = load_locale(into, &stem)?;
    let donor = load_locale(from, &target.language)?;

    let (merged, stats) = mvloc_sync::transfer(&donor, &target, criteria, relocate)
        .wrap_err_with(|| format!("merging {} into {}", from.display(), into.display()))?;
    let written = save_locale(output, &merged)?;

    tracing::info!(
        event = "catalogs_merged",
        from = %from.display(),
        into = %into.display(),
        output = %output.display(),
        written,
        skipped = stats.skipped,
        created = stats.created,
        overwritten = stats.overwritten
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvloc_core::EntryStatus;
    use std::fs;

    #[test]
    fn merges_into_a_new_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a/ko.po");
        let b = dir.path().join("b/ko.po");
        let out = dir.path().join("out/ko.po");
        fs::create_dir_all(a.parent().unwrap()).unwrap();
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(
            &a,
            "#, fuzzy\nmsgctxt \"A\"\nmsgid \"Hello\"\nmsgstr \"안녕\"\n\n\
             msgctxt \"N\"\nmsgid \"New\"\nmsgstr \"새\"\n",
        )
        .unwrap();
        let b_text = "# keep\nmsgctxt \"A\"\nmsgid \"Hello\"\nmsgstr \"\"\n";
        fs::write(&b, b_text).unwrap();

        let stats = merge_catalogs(&a, &b, &out, &CopyCriteria::default(), false).unwrap();
        assert_eq!(stats.overwritten, 1);
        assert_eq!(stats.created, 1);

        let merged = load_locale(&out, "ko").unwrap();
        let entry = merged.get("A").unwrap();
        assert_eq!(entry.translated_text, "안녕");
        assert_eq!(entry.status, EntryStatus::Stale);
        assert_eq!(entry.meta.comments, vec!["# keep".to_string()]);
        assert_eq!(merged.get("N").unwrap().translated_text, "새");
        assert_eq!(fs::read_to_string(&b).unwrap(), b_text);
    }

    #[test]
    fn missing_donor_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("ko.po");
        fs::write(&b, "").unwrap();
        let err = merge_catalogs(
            &dir.path().join("nope.po"),
            &b,
            &dir.path().join("out.po"),
            &CopyCriteria::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<MvlocError>(), Some(MvlocError::Io { .. })));
    }
}
