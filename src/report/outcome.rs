use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::prelude::*;

/// Result of a batch of independent units of work.
///
/// A failed unit never aborts its siblings, it is recorded here instead.
#[must_use]
#[derive(Debug, Serialize)]
pub struct BatchOutcome<K> {
    pub succeeded: Vec<K>,
    pub failed: Vec<(K, String)>,
}

impl<K> Default for BatchOutcome<K> {
    fn default() -> Self {
        Self { succeeded: Vec::new(), failed: Vec::new() }
    }
}

impl<K: Display> BatchOutcome<K> {
    /// Record the unit result, logging the failure.
    pub fn record<T>(&mut self, key: K, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.succeeded.push(key);
                Some(value)
            }
            Err(error) => {
                error!(%key, "failed: {error:#}");
                self.failed.push((key, format!("{error:#}")));
                None
            }
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert into an error if anything failed.
    pub fn ensure_complete(self) -> Result<Vec<K>> {
        if self.is_complete() {
            return Ok(self.succeeded);
        }
        Err(ReportError::PartialBatchFailure {
            succeeded: self.succeeded.iter().map(ToString::to_string).collect(),
            failed: self.failed.iter().map(|(key, error)| format!("{key} ({error})")).collect(),
        }
        .into())
    }
}

impl<K> Display for BatchOutcome<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded.len(), self.failed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_complete_ok() -> Result {
        let mut outcome = BatchOutcome::default();
        assert_eq!(outcome.record(1, Ok("one")), Some("one"));
        assert_eq!(outcome.ensure_complete()?, vec![1]);
        Ok(())
    }

    #[test]
    fn partial_failure_is_reported() {
        let mut outcome = BatchOutcome::default();
        outcome.record(1, Ok(()));
        outcome.record(2, Err::<(), _>(anyhow::anyhow!("boom")));
        outcome.record(3, Ok(()));
        assert_eq!(outcome.to_string(), "2 succeeded, 1 failed");

        let error = outcome.ensure_complete().unwrap_err();
        match error.downcast_ref::<ReportError>() {
            Some(ReportError::PartialBatchFailure { succeeded, failed }) => {
                assert_eq!(succeeded, &["1", "3"]);
                assert_eq!(failed, &["2 (boom)"]);
            }
            _ => panic!("unexpected error: {error:#}"),
        }
    }
}
