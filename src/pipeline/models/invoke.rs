use std::sync::mpsc;
use std::time::Duration;

use super::ModelError;

/// Timeout and retry budget applied to every collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Wall-clock limit for one attempt.
    pub timeout: Duration,
    /// Extra attempts after the first, for retryable errors only.
    pub max_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 1,
        }
    }
}

/// Run `call` under `policy`.
///
/// Each attempt runs on its own thread so a hung collaborator cannot stall
/// the request past the timeout; the abandoned attempt finishes in the
/// background and its result is dropped.
pub fn call_with_policy<T, F>(
    phase: &'static str,
    policy: CallPolicy,
    call: F,
) -> Result<T, ModelError>
where
    T: Send + 'static,
    F: Fn() -> Result<T, ModelError> + Send + Sync + Clone + 'static,
{
    let mut last_error = ModelError::WorkerLost;

    for attempt in 0..=policy.max_retries {
        match attempt_once(phase, policy.timeout, call.clone()) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                tracing::warn!(
                    phase,
                    attempt = attempt + 1,
                    error = %e,
                    "Model call failed, retrying"
                );
                last_error = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error)
}

fn attempt_once<T, F>(phase: &'static str, timeout: Duration, call: F) -> Result<T, ModelError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(format!("tanit-{phase}"))
        .spawn(move || {
            let _ = tx.send(call());
        })
        .map_err(|e| ModelError::HttpClient(format!("Failed to spawn {phase} worker: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ModelError::Timeout {
            phase,
            secs: timeout.as_secs(),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ModelError::WorkerLost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(timeout_ms: u64, max_retries: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
        }
    }

    #[test]
    fn success_passes_through() {
        let result = call_with_policy("llm", policy(1_000, 0), || Ok::<_, ModelError>(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn retryable_error_is_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = call_with_policy("stt", policy(1_000, 2), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ModelError::Connection("whisper".into()))
            } else {
                Ok("transcript".to_string())
            }
        });
        assert_eq!(result.unwrap(), "transcript");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_retryable_error_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<String, _> = call_with_policy("vlm", policy(1_000, 3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ModelError::ResponseParsing("garbage".into()))
        });
        assert!(matches!(result, Err(ModelError::ResponseParsing(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_budget_is_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = call_with_policy("llm", policy(1_000, 2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ModelError::Http { status: 503, body: "busy".into() })
        });
        assert!(matches!(result, Err(ModelError::Http { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn hung_call_times_out() {
        let result: Result<(), _> = call_with_policy("llm", policy(50, 0), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert_eq!(result, Err(ModelError::Timeout { phase: "llm", secs: 0 }));
    }
}
