//! Residual extraction from solver logs
//!
//! Solver logs are append-only: each time step writes one record per solved
//! field, so the most recent value for a field is the last matching line.
//!
//! A residual record looks like:
//!
//! ```text
//! smoothSolver:  Solving for Ux, Initial residual = 0.00123, Final residual = 2.3e-07, No Iterations 3
//! ```
//!
//! The double space after the solver name and the comma-separated labels are
//! part of the grammar. Lines that contain the search token but do not fit
//! it are reported as malformed rather than skipped.

use crate::catalog::{MetricKey, ResidualKind};
use regex::Regex;
use std::num::ParseFloatError;
use std::sync::LazyLock;

/// Anchored grammar for one residual record
static RESIDUAL_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<solver>.+):  Solving for (?P<field>.+), Initial residual = (?P<initial>.+), Final residual = (?P<final>.+), No Iterations (?P<iterations>.+)$",
    )
    .expect("residual record grammar is a valid regex")
});

/// Errors from extracting one metric out of a log document
///
/// All of these are scoped to a single metric; other metrics extracted from
/// the same document are unaffected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    /// No line contains the search token
    #[error("Can't find data for '{token}' in solver log")]
    NotFound { token: String },

    /// The latest line containing the token is not a residual record
    #[error("Line matching '{token}' is not a residual record: {line}")]
    MalformedRecord { token: String, line: String },

    /// The captured residual is not a number
    #[error("{kind} residual '{value}' is not a valid number: {source}")]
    NumericParse {
        kind: ResidualKind,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

impl ExtractError {
    /// Short label for metrics and logs
    pub fn error_type(&self) -> &'static str {
        match self {
            ExtractError::NotFound { .. } => "not_found",
            ExtractError::MalformedRecord { .. } => "malformed_record",
            ExtractError::NumericParse { .. } => "numeric_parse",
        }
    }
}

/// One parsed residual line, borrowing from the log text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidualRecord<'a> {
    pub solver: &'a str,
    pub field: &'a str,
    pub initial: &'a str,
    pub final_residual: &'a str,
    pub iterations: &'a str,
}

impl<'a> ResidualRecord<'a> {
    /// Parse a line against the residual grammar
    ///
    /// Returns `None` if the line does not conform.
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = RESIDUAL_RECORD.captures(line)?;
        Some(Self {
            solver: caps.name("solver")?.as_str(),
            field: caps.name("field")?.as_str(),
            initial: caps.name("initial")?.as_str(),
            final_residual: caps.name("final")?.as_str(),
            iterations: caps.name("iterations")?.as_str(),
        })
    }

    /// Raw captured text for the requested residual
    pub fn residual(&self, kind: ResidualKind) -> &'a str {
        match kind {
            ResidualKind::Initial => self.initial,
            ResidualKind::Final => self.final_residual,
        }
    }
}

/// Substring used to locate a variable's records
///
/// `k` and `p` are too short to search for bare: they occur inside other
/// field names and solver output. Their records are located by the
/// `"for k"` / `"for p"` fragment of `Solving for ...` instead.
pub fn search_token(variable: &str) -> &str {
    match variable {
        "k" => "for k",
        "p" => "for p",
        other => other,
    }
}

/// Extract the latest residual for `key` from `log_text`
///
/// Scans lines from last to first and parses the first line containing the
/// key's search token. Pure: the result depends only on the arguments.
///
/// # Errors
///
/// - `NotFound` if no line contains the search token
/// - `MalformedRecord` if the latest such line does not fit the grammar
/// - `NumericParse` if the selected residual is not a float
pub fn extract_metric(key: &MetricKey, log_text: &str) -> Result<f64, ExtractError> {
    let token = search_token(key.variable());

    // str::lines strips a trailing '\r' as well as '\n'
    let Some(line) = log_text.lines().rev().find(|line| line.contains(token)) else {
        return Err(ExtractError::NotFound {
            token: token.to_string(),
        });
    };

    let record = ResidualRecord::parse(line).ok_or_else(|| ExtractError::MalformedRecord {
        token: token.to_string(),
        line: line.to_string(),
    })?;

    let raw = record.residual(key.kind());
    raw.parse::<f64>()
        .map_err(|source| ExtractError::NumericParse {
            kind: key.kind(),
            value: raw.to_string(),
            source,
        })
}

/// Run independent extractions for several keys against one document
///
/// Results are returned in the order of `keys`; a failure for one key does
/// not affect the others.
pub fn extract_all(
    keys: &[MetricKey],
    log_text: &str,
) -> Vec<(MetricKey, Result<f64, ExtractError>)> {
    keys.iter()
        .map(|key| (key.clone(), extract_metric(key, log_text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
Time = 1

smoothSolver:  Solving for Ux, Initial residual = 1, Final residual = 0.05, No Iterations 2
smoothSolver:  Solving for Uy, Initial residual = 1, Final residual = 0.04, No Iterations 2
GAMG:  Solving for p, Initial residual = 1, Final residual = 0.009, No Iterations 8
time step continuity errors : sum local = 1.2e-04, global = 3.1e-19, cumulative = 3.1e-19
smoothSolver:  Solving for omega, Initial residual = 0.002, Final residual = 8e-05, No Iterations 3
smoothSolver:  Solving for k, Initial residual = 1, Final residual = 0.03, No Iterations 3
ExecutionTime = 0.1 s  ClockTime = 0 s

Time = 2

smoothSolver:  Solving for Ux, Initial residual = 0.4, Final residual = 0.02, No Iterations 2
smoothSolver:  Solving for Uy, Initial residual = 0.3, Final residual = 0.01, No Iterations 2
GAMG:  Solving for p, Initial residual = 0.2, Final residual = 0.0017, No Iterations 6
time step continuity errors : sum local = 4.4e-05, global = 1.9e-19, cumulative = 5e-19
smoothSolver:  Solving for omega, Initial residual = 0.0011, Final residual = 5e-05, No Iterations 3
smoothSolver:  Solving for k, Initial residual = 0.6, Final residual = 0.027, No Iterations 3
ExecutionTime = 0.2 s  ClockTime = 0 s
";

    fn key(variable: &str, kind: ResidualKind) -> MetricKey {
        MetricKey::new(variable, kind)
    }

    #[test]
    fn test_search_token_disambiguates_single_letters() {
        assert_eq!(search_token("k"), "for k");
        assert_eq!(search_token("p"), "for p");
        assert_eq!(search_token("Ux"), "Ux");
        assert_eq!(search_token("omega"), "omega");
    }

    #[test]
    fn test_extracts_latest_initial_residual() {
        let value = extract_metric(&key("Ux", ResidualKind::Initial), LOG).unwrap();
        assert_eq!(value, 0.4);
    }

    #[test]
    fn test_extracts_latest_final_residual() {
        let value = extract_metric(&key("p", ResidualKind::Final), LOG).unwrap();
        assert_eq!(value, 0.0017);
    }

    #[test]
    fn test_k_does_not_match_other_fields() {
        // A bare "k" would hit the trailing "ClockTime" line
        let value = extract_metric(&key("k", ResidualKind::Final), LOG).unwrap();
        assert_eq!(value, 0.027);
    }

    #[test]
    fn test_p_does_not_match_execution_time_lines() {
        // A bare "p" would hit the "time step continuity errors" line
        let value = extract_metric(&key("p", ResidualKind::Initial), LOG).unwrap();
        assert_eq!(value, 0.2);
    }

    #[test]
    fn test_missing_variable_is_not_found() {
        let err = extract_metric(&key("Uz", ResidualKind::Final), LOG).unwrap_err();
        assert_eq!(
            err,
            ExtractError::NotFound {
                token: "Uz".to_string()
            }
        );
        assert_eq!(err.to_string(), "Can't find data for 'Uz' in solver log");
    }

    #[test]
    fn test_empty_log_is_not_found() {
        let err = extract_metric(&key("Ux", ResidualKind::Final), "").unwrap_err();
        assert_eq!(err.error_type(), "not_found");
    }

    #[test]
    fn test_token_on_non_record_line_is_malformed() {
        let log = "\
smoothSolver:  Solving for omega, Initial residual = 0.1, Final residual = 0.01, No Iterations 2
bounding omega, min: -1.2e-05 max: 310 average: 12
";
        let err = extract_metric(&key("omega", ResidualKind::Final), log).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRecord { ref line, .. } if line.starts_with("bounding omega")));
    }

    #[test]
    fn test_single_space_after_colon_is_malformed() {
        let log = "smoothSolver: Solving for Ux, Initial residual = 1, Final residual = 0.1, No Iterations 1";
        let err = extract_metric(&key("Ux", ResidualKind::Final), log).unwrap_err();
        assert_eq!(err.error_type(), "malformed_record");
    }

    #[test]
    fn test_non_numeric_residual_is_numeric_parse_error() {
        let log = "smoothSolver:  Solving for Ux, Initial residual = abc, Final residual = 0.1, No Iterations 1";
        let err = extract_metric(&key("Ux", ResidualKind::Initial), log).unwrap_err();
        match err {
            ExtractError::NumericParse { kind, value, .. } => {
                assert_eq!(kind, ResidualKind::Initial);
                assert_eq!(value, "abc");
            }
            other => panic!("expected NumericParse, got {:?}", other),
        }
    }

    #[test]
    fn test_other_residual_still_parses_when_one_is_garbage() {
        let log = "smoothSolver:  Solving for Ux, Initial residual = abc, Final residual = 0.1, No Iterations 1";
        let value = extract_metric(&key("Ux", ResidualKind::Final), log).unwrap();
        assert_eq!(value, 0.1);
    }

    #[test]
    fn test_crlf_line_endings() {
        let log = "smoothSolver:  Solving for Ux, Initial residual = 1, Final residual = 0.25, No Iterations 1\r\nExecutionTime = 1 s\r\n";
        let value = extract_metric(&key("Ux", ResidualKind::Final), log).unwrap();
        assert_eq!(value, 0.25);
    }

    #[test]
    fn test_zero_residual_is_a_real_value() {
        let log = "DICPCG:  Solving for p, Initial residual = 0, Final residual = 0, No Iterations 0";
        let value = extract_metric(&key("p", ResidualKind::Final), log).unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_record_parse_captures_all_fields() {
        let record = ResidualRecord::parse(
            "GAMG:  Solving for p, Initial residual = 0.2, Final residual = 0.0017, No Iterations 6",
        )
        .unwrap();
        assert_eq!(record.solver, "GAMG");
        assert_eq!(record.field, "p");
        assert_eq!(record.residual(ResidualKind::Initial), "0.2");
        assert_eq!(record.residual(ResidualKind::Final), "0.0017");
        assert_eq!(record.iterations, "6");
    }

    #[test]
    fn test_record_parse_rejects_unrelated_line() {
        assert!(ResidualRecord::parse("Time = 2").is_none());
    }

    #[test]
    fn test_extract_all_isolates_failures() {
        let keys = vec![
            key("Ux", ResidualKind::Final),
            key("Uz", ResidualKind::Final),
            key("k", ResidualKind::Initial),
        ];
        let results = extract_all(&keys, LOG);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, Ok(0.02));
        assert!(results[1].1.is_err());
        assert_eq!(results[2].1, Ok(0.6));
    }
}
