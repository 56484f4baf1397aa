//! Orchestration layer over the lower-level crates.
//! The CLI only talks to this crate and to `mvloc-config`.

mod batch;
mod export;
mod plan;
mod report;
mod sync;
mod transfer;
mod util;
mod validate;

pub use batch::{run_batch, run_task, BatchTask, RunContext, TaskState};
pub use export::export_target;
pub use mvloc_config::Settings;
pub use mvloc_core::{MvlocError, Result};
pub use mvloc_domain::{AggregateStatus, BatchReport, Operation, TaskOutcome, TaskReport};
pub use mvloc_sync::{CopyCriteria, TransferStats, DEFAULT_CRITERIA};
pub use plan::{clean_orphans, load_plan, plan_tasks};
pub use report::{render_text, JsonReportSink, ReportSink, TextReportSink};
pub use sync::sync_target;
pub use transfer::merge_catalogs;
pub use util::{find_source, LocaleTarget};
pub use validate::validate_target;
