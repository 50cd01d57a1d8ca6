//! Shared async utilities.

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Waits for a condition to become true, polling at 25ms intervals.
///
/// Returns `Ok(())` if the condition holds within `timeout`, otherwise `Err`
/// with the provided message. The condition is checked once more at the deadline.
pub async fn wait_for_condition<F>(
    mut condition: F,
    timeout: Duration,
    error_msg: &str,
) -> Result<(), String>
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(error_msg.to_string());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_for_condition_success() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag_clone.store(true, Ordering::SeqCst);
        });

        let result = wait_for_condition(
            move || flag.load(Ordering::SeqCst),
            Duration::from_secs(2),
            "Flag not set",
        )
        .await;

        assert!(result.is_ok(), "Condition should be met");
    }

    #[tokio::test]
    async fn test_wait_for_condition_timeout() {
        let result =
            wait_for_condition(|| false, Duration::from_millis(100), "Expected timeout").await;

        assert_eq!(result.unwrap_err(), "Expected timeout");
    }
}
