//! Retry-with-confirmation control loop.
//!
//! A failed backing-store call is never retried on its own: the error is
//! handed to a `RetryPrompt` (in practice the user, through the list store's
//! published state) and the loop waits for the answer.

use std::future::Future;

use async_trait::async_trait;

use crate::error::TodoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Replay the same logical operation.
    Retry,
    /// Give up; the error becomes the operation's final result.
    Dismiss,
}

#[async_trait]
pub trait RetryPrompt: Send {
    async fn decide(&mut self, error: &TodoError) -> RetryDecision;
}

/// Runs `op` until it succeeds or the prompt answers `Dismiss`.
pub async fn run_with_retry<T, F, Fut, P>(mut op: F, prompt: &mut P) -> Result<T, TodoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TodoError>>,
    P: RetryPrompt + ?Sized,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match prompt.decide(&error).await {
                RetryDecision::Retry => continue,
                RetryDecision::Dismiss => return Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        answers: VecDeque<RetryDecision>,
        seen: Vec<TodoError>,
    }

    impl Scripted {
        fn new(answers: &[RetryDecision]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                seen: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl RetryPrompt for Scripted {
        async fn decide(&mut self, error: &TodoError) -> RetryDecision {
            self.seen.push(error.clone());
            self.answers.pop_front().unwrap_or(RetryDecision::Dismiss)
        }
    }

    #[tokio::test]
    async fn success_never_prompts() {
        let mut prompt = Scripted::new(&[]);
        let value = run_with_retry(|| async { Ok::<_, TodoError>(7) }, &mut prompt)
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(prompt.seen.is_empty());
    }

    #[tokio::test]
    async fn retry_replays_until_success() {
        let mut attempts = 0;
        let mut prompt = Scripted::new(&[RetryDecision::Retry, RetryDecision::Retry]);
        let value = run_with_retry(
            || {
                attempts += 1;
                let attempt = attempts;
                async move {
                    if attempt < 3 {
                        Err(TodoError::Backend(format!("attempt {attempt}")))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            &mut prompt,
        )
        .await
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(prompt.seen.len(), 2);
    }

    #[tokio::test]
    async fn dismiss_returns_the_error() {
        let mut prompt = Scripted::new(&[RetryDecision::Dismiss]);
        let err = run_with_retry(
            || async { Err::<(), _>(TodoError::Decoding("bad".into())) },
            &mut prompt,
        )
        .await
        .unwrap_err();
        assert_eq!(err, TodoError::Decoding("bad".to_string()));
    }
}
