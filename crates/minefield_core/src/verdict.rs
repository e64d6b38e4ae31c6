//! Verdict vocabulary and classification rules.
//!
//! This is the single place that encodes conformance semantics: given what a vector expects (from its name) and
//! what the sandboxed run produced, decide which of the eight verdicts the pair earns.
//!
//! The registry below defines the canonical spelling of each verdict. The spelling is part of the result-log wire
//! format, so callers should never hard-code verdict strings; use [`Verdict`] and [`as_str`] / [`from_str`].
//!
//! ## Notes
//! - Matching is **case-sensitive**.
//! - `CRASH` and `TIMEOUT` are tag-independent.
//! - [`Verdict::Pass`] is part of the vocabulary (older logs may carry it) but the classifier never produces it:
//!   a must-pass vector that parses lands in [`Verdict::ExpectedResult`].

use std::fmt;
use std::str::FromStr;

use crate::expectation::ExpectedTag;

/// Classified outcome of one (implementation, vector) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Pass,
    ShouldHavePassed,
    ShouldHaveFailed,
    ImplementationPass,
    ImplementationFail,
    Crash,
    Timeout,
    ExpectedResult,
}

/// Metadata for a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictInfo {
    pub id: Verdict,
    /// Wire spelling used in result logs and as the report's CSS class.
    pub canonical: &'static str,
    /// Human description used by report legends.
    pub description: &'static str,
    /// Whether report legends list this verdict.
    pub in_legend: bool,
}

const fn info(id: Verdict, canonical: &'static str, description: &'static str, in_legend: bool) -> VerdictInfo {
    VerdictInfo {
        id,
        canonical,
        description,
        in_legend,
    }
}

/// Registry of all verdicts, in legend order.
pub const VERDICTS: &[VerdictInfo] = &[
    info(Verdict::ExpectedResult, "EXPECTED_RESULT", "expected result", true),
    info(
        Verdict::ShouldHavePassed,
        "SHOULD_HAVE_PASSED",
        "parsing should have succeeded but failed",
        true,
    ),
    info(
        Verdict::ShouldHaveFailed,
        "SHOULD_HAVE_FAILED",
        "parsing should have failed but succeeded",
        true,
    ),
    info(
        Verdict::ImplementationPass,
        "IMPLEMENTATION_PASS",
        "result undefined, parsing succeeded",
        true,
    ),
    info(
        Verdict::ImplementationFail,
        "IMPLEMENTATION_FAIL",
        "result undefined, parsing failed",
        true,
    ),
    info(Verdict::Crash, "CRASH", "parser crashed", true),
    info(Verdict::Timeout, "TIMEOUT", "timeout", true),
    info(Verdict::Pass, "PASS", "parsing succeeded", false),
];

/// Resolve a spelling to a [`Verdict`].
///
/// ## Returns
/// - `Some(Verdict)` if `token` is a canonical verdict spelling.
/// - `None` otherwise.
pub fn from_str(token: &str) -> Option<Verdict> {
    VERDICTS.iter().find(|v| v.canonical == token).map(|v| v.id)
}

/// Return the canonical spelling for a verdict.
pub fn as_str(id: Verdict) -> &'static str {
    info_for(id).canonical
}

/// Return the full metadata entry for a verdict.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: Verdict) -> &'static VerdictInfo {
    VERDICTS.iter().find(|v| v.id == id).expect("verdict info missing")
}

/// Raw result of a run that exited on its own, before expectations are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawResult {
    Pass,
    Fail,
    Crash,
}

impl RawResult {
    /// `0` accepts, `1` rejects, anything else is a crash.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => RawResult::Pass,
            1 => RawResult::Fail,
            _ => RawResult::Crash,
        }
    }
}

/// What one sandboxed run produced. Consumed by classification and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    /// The subject exited before the deadline. Signal deaths are reported as `128 + signal`.
    Exited { code: i32 },
    /// The deadline elapsed and the subject was terminated; no exit code is meaningful.
    TimedOut,
    /// The subject could not be started at all (missing binary, wrong platform, missing image).
    LaunchFailed { reason: String },
}

impl Verdict {
    /// Every verdict, in declaration order.
    pub const ALL: [Verdict; 8] = [
        Verdict::Pass,
        Verdict::ShouldHavePassed,
        Verdict::ShouldHaveFailed,
        Verdict::ImplementationPass,
        Verdict::ImplementationFail,
        Verdict::Crash,
        Verdict::Timeout,
        Verdict::ExpectedResult,
    ];

    /// Classify one run.
    ///
    /// Rules, in priority order:
    /// 1. timed out → `TIMEOUT`
    /// 2. exit code outside `{0, 1}` → `CRASH`
    /// 3. must-pass that did not pass → `SHOULD_HAVE_PASSED`; must-fail that passed → `SHOULD_HAVE_FAILED`;
    ///    undefined → `IMPLEMENTATION_PASS` / `IMPLEMENTATION_FAIL`
    /// 4. everything else → `EXPECTED_RESULT`
    ///
    /// ## Returns
    /// - `None` for [`RawOutcome::LaunchFailed`]: a pair that never ran gets no verdict and no record.
    pub fn classify(expected: ExpectedTag, outcome: &RawOutcome) -> Option<Verdict> {
        let code = match outcome {
            RawOutcome::LaunchFailed { .. } => return None,
            RawOutcome::TimedOut => return Some(Verdict::Timeout),
            RawOutcome::Exited { code } => *code,
        };

        let verdict = match (RawResult::from_exit_code(code), expected) {
            (RawResult::Crash, _) => Verdict::Crash,
            (RawResult::Fail, ExpectedTag::MustPass) => Verdict::ShouldHavePassed,
            (RawResult::Pass, ExpectedTag::MustFail) => Verdict::ShouldHaveFailed,
            (RawResult::Pass, ExpectedTag::Undefined) => Verdict::ImplementationPass,
            (RawResult::Fail, ExpectedTag::Undefined) => Verdict::ImplementationFail,
            _ => Verdict::ExpectedResult,
        };
        Some(verdict)
    }

    pub fn as_str(self) -> &'static str {
        as_str(self)
    }

    pub fn description(self) -> &'static str {
        info_for(self).description
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a token that is not a verdict spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerdict(pub String);

impl fmt::Display for UnknownVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verdict `{}`", self.0)
    }
}

impl std::error::Error for UnknownVerdict {}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_str(s).ok_or_else(|| UnknownVerdict(s.to_string()))
    }
}
