//! Diff and merge of source revisions into locale files, and transfer of
//! translations between catalogs of one language.

mod diff;
mod merge;
mod transfer;

pub use diff::{diff, Classification, DiffResult};
pub use merge::{merge, MergeConfig, MergeStats};
pub use transfer::{
    source_location, transfer, Condition, CopyCriteria, Criterion, Field, TransferError,
    TransferStats, DEFAULT_CRITERIA,
};
