//! Retry decisions for failed database operations
//!
//! Opening the connection, creating the database file and running statements can all
//! fail for transient reasons (a locked file, a busy writer). Instead of prompting, the
//! controller asks a caller-supplied [`RetryPolicy`] whether to try again. The number of
//! attempts is always bounded by the controller's `max_attempts`, whatever the policy says.

use std::fmt;

/// The operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    CreateFile,
    CreateTable,
    Insert,
    Select,
    Update,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::CreateFile => "create-file",
            Operation::CreateTable => "create-table",
            Operation::Insert => "insert",
            Operation::Select => "select",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Abandon,
}

/// Context handed to a [`RetryPolicy`] after a failed attempt
#[derive(Debug, Clone, Copy)]
pub struct Failure<'a> {
    /// Operation that failed
    pub operation: Operation,
    /// 1-based number of the attempt that just failed
    pub attempt: u32,
    /// Upper bound on attempts; no retry happens past it
    pub max_attempts: u32,
    /// Rendered error from the engine or filesystem
    pub message: &'a str,
}

impl Failure<'_> {
    /// Whether another attempt is still allowed by the bound
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

/// Caller-supplied strategy deciding between retrying and abandoning
///
/// Any `Fn(&Failure) -> RetryDecision` closure is a policy.
pub trait RetryPolicy: Send + Sync {
    fn decide(&self, failure: &Failure<'_>) -> RetryDecision;
}

impl<F> RetryPolicy for F
where
    F: Fn(&Failure<'_>) -> RetryDecision + Send + Sync,
{
    fn decide(&self, failure: &Failure<'_>) -> RetryDecision {
        self(failure)
    }
}

/// Never retries; the first failure is returned to the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct AbandonOnFailure;

impl RetryPolicy for AbandonOnFailure {
    fn decide(&self, _failure: &Failure<'_>) -> RetryDecision {
        RetryDecision::Abandon
    }
}

/// Retries until the controller's attempt bound is reached
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryUntilExhausted;

impl RetryPolicy for RetryUntilExhausted {
    fn decide(&self, _failure: &Failure<'_>) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Run `attempt` until it succeeds, the policy abandons, or `max_attempts` is reached
///
/// Returns the last error together with the number of attempts made.
pub(crate) fn run_with_retry<T, E, F>(
    policy: &dyn RetryPolicy,
    operation: Operation,
    max_attempts: u32,
    attempt: F,
) -> Result<T, (E, u32)>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    run_with_retry_if(policy, operation, max_attempts, attempt, |_| true)
}

/// Like [`run_with_retry`], but errors for which `retryable` is false end the loop
/// immediately without consulting the policy.
pub(crate) fn run_with_retry_if<T, E, F, R>(
    policy: &dyn RetryPolicy,
    operation: Operation,
    max_attempts: u32,
    mut attempt: F,
    retryable: R,
) -> Result<T, (E, u32)>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut made = 0;
    loop {
        made += 1;
        let err = match attempt() {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !retryable(&err) {
            return Err((err, made));
        }

        let message = err.to_string();
        let failure = Failure {
            operation,
            attempt: made,
            max_attempts,
            message: &message,
        };

        if !failure.can_retry() {
            tracing::warn!(
                "{} failed after {} attempt(s), giving up: {}",
                operation,
                made,
                message
            );
            return Err((err, made));
        }

        match policy.decide(&failure) {
            RetryDecision::Retry => {
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying: {}",
                    operation,
                    made,
                    max_attempts,
                    message
                );
            }
            RetryDecision::Abandon => {
                tracing::warn!("{} failed, abandoned by policy: {}", operation, message);
                return Err((err, made));
            }
        }
    }
}
