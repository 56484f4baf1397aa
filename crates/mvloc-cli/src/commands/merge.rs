use super::failed;
use crate::exit_status::ExitStatus;
use mvloc_services::{merge_catalogs, CopyCriteria};
use std::path::Path;

pub fn run_merge(
    from: &Path,
    into: &Path,
    output: &Path,
    criteria: &CopyCriteria,
    relocate: bool,
) -> ExitStatus {
    match merge_catalogs(from, into, output, criteria, relocate) {
        Ok(stats) => {
            crate::ui_ok!(
                "{}: {} skipped, {} created, {} overwritten",
                output.display(),
                stats.skipped,
                stats.created,
                stats.overwritten
            );
            ExitStatus::Success
        }
        Err(e) => failed(e),
    }
}
