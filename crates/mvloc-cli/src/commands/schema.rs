use super::failed;
use crate::exit_status::ExitStatus;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;

fn write_schemas(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).wrap_err_with(|| format!("creating {}", out_dir.display()))?;
    macro_rules! dump {
        ($ty:ty, $name:literal) => {{
            let schema = schemars::schema_for!($ty);
            let path = out_dir.join($name);
            let f = fs::File::create(&path)
                .wrap_err_with(|| format!("creating {}", path.display()))?;
            serde_json::to_writer_pretty(f, &schema)?;
        }};
    }
    dump!(mvloc_domain::BatchReport, "batch_report.schema.json");
    dump!(mvloc_domain::TaskReport, "task_report.schema.json");
    dump!(mvloc_domain::Finding, "finding.schema.json");
    Ok(())
}

pub fn run_schema(out_dir: &Path) -> ExitStatus {
    if let Err(e) = write_schemas(out_dir) {
        return failed(e);
    }
    tracing::info!(event = "schema_dumped", path = %out_dir.display());
    crate::ui_ok!("schemas written to {}", out_dir.display());
    ExitStatus::Success
}
