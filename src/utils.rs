//! Utility functions for retrying Telegram calls and trimming log output.

use crate::error::ChatError;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use userbot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Only transient failures ([`ChatError::is_transient`]) are retried. Errors
/// the message layer falls back on, such as "message is too long", are
/// returned on the first attempt.
///
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 (constants in `config.rs`)
///
/// Flood control ([`ChatError::RetryAfter`]) waits for the delay the server
/// asked for and starts over, at most `TELEGRAM_API_MAX_FLOOD_WAITS` times
/// and only when the delay is within `TELEGRAM_API_MAX_FLOOD_WAIT_SECS`.
///
/// # Errors
///
/// Returns the last error once the attempts are exhausted, or the first
/// non-transient error.
pub async fn retry_telegram_operation<F, Fut, T>(mut operation: F) -> Result<T, ChatError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ChatError>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS,
        TELEGRAM_API_MAX_FLOOD_WAITS, TELEGRAM_API_MAX_FLOOD_WAIT_SECS, TELEGRAM_API_MAX_RETRIES,
    };

    let mut flood_waits = 0;
    loop {
        let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
            .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
            .map(jitter)
            .take(TELEGRAM_API_MAX_RETRIES);

        match RetryIf::start(retry_strategy, &mut operation, ChatError::is_transient).await {
            Err(ChatError::RetryAfter(delay))
                if flood_waits < TELEGRAM_API_MAX_FLOOD_WAITS
                    && delay <= Duration::from_secs(TELEGRAM_API_MAX_FLOOD_WAIT_SECS) =>
            {
                flood_waits += 1;
                warn!("Telegram flood control, waiting {:?} before retrying", delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "Telegram API operation failed after {} attempts: {}",
                    TELEGRAM_API_MAX_RETRIES, e
                );
                return Err(e);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors() {
        let calls = AtomicUsize::new(0);
        let result = retry_telegram_operation(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(ChatError::Network("connection reset".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_semantic_errors() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ChatError> = retry_telegram_operation(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ChatError::TooLong) }
        })
        .await;

        assert!(matches!(result, Err(ChatError::TooLong)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_out_flood_control() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();
        let result = retry_telegram_operation(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ChatError::RetryAfter(Duration::from_secs(12)))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(1)));
        assert!(start.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_on_long_flood_wait() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ChatError> = retry_telegram_operation(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ChatError::RetryAfter(Duration::from_secs(3600))) }
        })
        .await;

        assert!(matches!(result, Err(ChatError::RetryAfter(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
