//! Process exit codes.

use replcheck_verify::Verdict;

/// Verification passed.
pub const EXIT_PASS: i32 = 0;
/// Verification ran and found failures.
pub const EXIT_FAILURES: i32 = 1;
/// Setup or seed generation failed; nothing was verified.
pub const EXIT_FATAL: i32 = 2;
/// Interrupted by SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// How a harness run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Verdict(Verdict),
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Verdict(Verdict::Pass) => EXIT_PASS,
            RunOutcome::Verdict(Verdict::Fail) => EXIT_FAILURES,
            RunOutcome::Interrupted => EXIT_INTERRUPTED,
        }
    }
}

impl From<Verdict> for RunOutcome {
    fn from(verdict: Verdict) -> Self {
        RunOutcome::Verdict(verdict)
    }
}
