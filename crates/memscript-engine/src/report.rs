//! Result reporter — folds a raw run into the uniform outcome record.
//!
//! Stateless. The engine hands it whatever happened (completion, script
//! fault, or timeout) plus the captured lines and the measured duration;
//! the reporter owns the success-flag / error-text shape the transport
//! relays.

use memscript_core::{ExecutionOutcome, Result};

/// What one run produced before normalization.
pub struct RawOutcome {
    pub result: Result<()>,
    pub output: Vec<String>,
    pub elapsed_ms: u64,
}

pub fn normalize(raw: RawOutcome) -> ExecutionOutcome {
    match raw.result {
        Ok(()) => ExecutionOutcome::success(raw.output, raw.elapsed_ms),
        Err(err) => ExecutionOutcome::failure(raw.output, err.to_string(), raw.elapsed_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memscript_core::Error;

    #[test]
    fn success_has_no_error() {
        let outcome = normalize(RawOutcome {
            result: Ok(()),
            output: vec!["x".into()],
            elapsed_ms: 7,
        });
        assert!(outcome.success);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.output, vec!["x"]);
        assert_eq!(outcome.elapsed_ms, 7);
    }

    #[test]
    fn failure_keeps_partial_output() {
        let outcome = normalize(RawOutcome {
            result: Err(Error::script("boom")),
            output: vec!["before".into()],
            elapsed_ms: 2,
        });
        assert!(!outcome.success);
        assert_eq!(outcome.output, vec!["before"]);
        assert_eq!(outcome.error.as_deref(), Some("script error: boom"));
    }

    #[test]
    fn timeout_reads_as_timeout() {
        let outcome = normalize(RawOutcome {
            result: Err(Error::Timeout(50)),
            output: vec![],
            elapsed_ms: 51,
        });
        assert!(outcome.error.unwrap().contains("timed out after 50 ms"));
    }
}
