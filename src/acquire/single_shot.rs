//! Single-shot acquisition for embedded webviews
//!
//! The host only grants a position request that follows a user gesture, so
//! the request is refused up front when the last interaction is too old.
//! Timeouts are retried a bounded number of times; every other platform
//! error ends the session immediately.

use super::{
    AcquireError, AcquireSettings, FailureKind, PlatformErrorKind, PositionFix, Positioning,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Check that `last_interaction` lies within the interaction window before `now`
pub fn check_interaction(
    last_interaction: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    settings: &AcquireSettings,
) -> Result<(), AcquireError> {
    let Some(last) = last_interaction else {
        return Err(AcquireError::new(
            FailureKind::InteractionWindowExpired,
            "no user interaction recorded",
        ));
    };

    let elapsed_ms = (now - last).num_milliseconds();
    let window_ms = settings.interaction_window.as_millis() as i64;

    if elapsed_ms > window_ms {
        return Err(AcquireError::new(
            FailureKind::InteractionWindowExpired,
            format!(
                "last interaction was {} ms ago, window is {} ms",
                elapsed_ms, window_ms
            ),
        ));
    }

    Ok(())
}

/// Acquire a fix with a single platform request plus timeout retries
///
/// # Arguments
/// * `positioning` - Platform capability
/// * `settings` - Interaction window, retry policy and request options
/// * `last_interaction` - Most recent recorded user interaction
/// * `now` - Time the request is being issued
pub async fn acquire<P: Positioning>(
    positioning: &P,
    settings: &AcquireSettings,
    last_interaction: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<PositionFix, AcquireError> {
    check_interaction(last_interaction, now, settings)?;

    let mut retries = 0;
    loop {
        match positioning.request_fix(&settings.single_shot).await {
            Ok(fix) => return Ok(fix),
            Err(err) if err.kind == PlatformErrorKind::Timeout && retries < settings.max_retries => {
                retries += 1;
                debug!(retry = retries, "position request timed out, retrying");
                tokio::time::sleep(settings.retry_delay).await;
            }
            Err(err) => {
                warn!(kind = ?err.kind, attempts = retries + 1, "position request failed");
                return Err(err.into());
            }
        }
    }
}
