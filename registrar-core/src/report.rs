//! Append-only error sink shared by all pipeline stages.

use crate::{AggregateError, RegistrarError};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects per-item failures so a single run surfaces as many problems as
/// possible. Safe to append from several threads.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Mutex<Vec<RegistrarError>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure.
    pub fn report(&self, error: RegistrarError) {
        tracing::warn!(subject = error.subject(), error = %error, "Recorded error");
        self.lock().push(error);
    }

    /// Record the error of a failed result, passing successes through.
    pub fn capture<T>(&self, result: Result<T, RegistrarError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of everything recorded so far, in report order.
    pub fn errors(&self) -> Vec<RegistrarError> {
        self.lock().clone()
    }

    /// Fail with every recorded error if there is at least one.
    pub fn checkpoint(&self, stage: &'static str) -> Result<(), AggregateError> {
        let errors = self.lock();
        if errors.is_empty() {
            tracing::debug!(stage, "Checkpoint passed");
            return Ok(());
        }
        tracing::error!(stage, count = errors.len(), "Checkpoint failed");
        Err(AggregateError {
            stage,
            errors: errors.clone(),
        })
    }

    // The list is append-only, so a panic in another appender cannot leave it
    // half-updated.
    fn lock(&self) -> MutexGuard<'_, Vec<RegistrarError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
