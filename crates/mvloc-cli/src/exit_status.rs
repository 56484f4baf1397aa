use mvloc_domain::AggregateStatus;
use std::process::ExitCode;

/// Process exit status.
///
/// - `Success` (0): every task succeeded, possibly with warnings
/// - `PartialFailure` (1): some tasks failed, others succeeded
/// - `Failure` (2): every task failed, or the run could not finish
/// - `Usage` (3): bad configuration or arguments; no task ran and no report was written
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    PartialFailure,
    Failure,
    Usage,
}

impl From<AggregateStatus> for ExitStatus {
    fn from(status: AggregateStatus) -> Self {
        match status {
            AggregateStatus::Success => ExitStatus::Success,
            AggregateStatus::PartialFailure => ExitStatus::PartialFailure,
            AggregateStatus::Failure => ExitStatus::Failure,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::PartialFailure => ExitCode::from(1),
            ExitStatus::Failure => ExitCode::from(2),
            ExitStatus::Usage => ExitCode::from(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::from(ExitStatus::Success), ExitCode::from(0));
        assert_eq!(ExitCode::from(ExitStatus::PartialFailure), ExitCode::from(1));
        assert_eq!(ExitCode::from(ExitStatus::Failure), ExitCode::from(2));
        assert_eq!(ExitCode::from(ExitStatus::Usage), ExitCode::from(3));
        assert_eq!(
            ExitStatus::from(AggregateStatus::PartialFailure),
            ExitStatus::PartialFailure
        );
    }
}
