//! Exit code logic for the iadl process.
//!
//! Single responsibility: map a job summary to the process exit outcome.

use iadl_core::JobSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished job.
///
/// An interrupted job always fails, even when some files completed.
pub(crate) fn determine_exit_outcome(summary: &JobSummary) -> ProcessExit {
    if summary.interrupted {
        return ProcessExit::Failure;
    }
    let completed = summary.succeeded + summary.skipped;
    if summary.failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[cfg(test)]
mod tests {
    use iadl_core::JobSummary;

    use super::determine_exit_outcome;
    use crate::ProcessExit;

    fn summary(succeeded: usize, skipped: usize, failed: usize) -> JobSummary {
        JobSummary {
            succeeded,
            skipped,
            failed,
            ..JobSummary::default()
        }
    }

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        assert_eq!(determine_exit_outcome(&summary(3, 0, 0)), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_when_everything_skipped() {
        assert_eq!(determine_exit_outcome(&summary(0, 4, 0)), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_when_zero_completed_zero_failed() {
        assert_eq!(determine_exit_outcome(&summary(0, 0, 0)), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        assert_eq!(determine_exit_outcome(&summary(2, 0, 1)), ProcessExit::Partial);
        assert_eq!(determine_exit_outcome(&summary(0, 1, 1)), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_failure_when_all_failed() {
        assert_eq!(determine_exit_outcome(&summary(0, 0, 2)), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_failure_when_interrupted() {
        let interrupted = JobSummary {
            interrupted: true,
            ..summary(5, 0, 0)
        };
        assert_eq!(determine_exit_outcome(&interrupted), ProcessExit::Failure);
    }
}
