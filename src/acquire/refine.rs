//! Refinement acquisition for standalone runtimes
//!
//! Subscribes to position updates and keeps the most accurate fix until one
//! is good enough, the stream fails, or the deadline passes. The stream and
//! the deadline race inside one `select!` and share a cancellation token:
//! the deadline cancels it, which ends the stream. The subscription itself
//! is torn down exactly once on every exit path.

use super::cancel::Teardown;
use super::{AcquireError, AcquireSettings, AcquireState, FailureKind, PositionFix, Positioning};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tracks the best fix seen so far
#[derive(Debug, Default)]
struct BestFix(Option<PositionFix>);

impl BestFix {
    fn offer(&mut self, fix: PositionFix) {
        match self.0 {
            Some(best) if best.accuracy_m() <= fix.accuracy_m() => {}
            _ => self.0 = Some(fix),
        }
    }

    fn or_fail(self, err: AcquireError) -> Result<PositionFix, AcquireError> {
        match self.0 {
            Some(fix) => {
                debug!(accuracy_m = fix.accuracy_m(), "falling back to best fix");
                Ok(fix)
            }
            None => Err(err),
        }
    }
}

/// Acquire the most accurate fix a subscription yields within the deadline
///
/// # Arguments
/// * `positioning` - Platform capability
/// * `settings` - Accuracy threshold, deadline and subscription options
/// * `state` - Session state, moved to `Refining` once updates flow
pub async fn acquire<P: Positioning>(
    positioning: &P,
    settings: &AcquireSettings,
    state: &mut AcquireState,
) -> Result<PositionFix, AcquireError> {
    let (stream, cancel) = positioning
        .subscribe_fixes(&settings.refinement)
        .into_parts();
    let mut teardown = Teardown::new(cancel);

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    *state = AcquireState::Refining;

    let deadline = async {
        tokio::time::sleep(settings.deadline).await;
        debug!("refinement deadline reached");
        token.cancel();
    };
    tokio::pin!(deadline);

    let stream = stream.take_until(token.cancelled());
    tokio::pin!(stream);

    let mut best = BestFix::default();

    let outcome = loop {
        tokio::select! {
            biased;

            _ = &mut deadline, if !token.is_cancelled() => {}

            item = stream.next() => match item {
                Some(Ok(fix)) => {
                    debug!(accuracy_m = fix.accuracy_m(), "position update");
                    if fix.accuracy_m() <= settings.accuracy_threshold_m {
                        break Ok(fix);
                    }
                    best.offer(fix);
                }
                Some(Err(err)) => break best.or_fail(err.into()),
                None if token.is_cancelled() => break best.or_fail(AcquireError::new(
                    FailureKind::Timeout,
                    format!("no position within {:?}", settings.deadline),
                )),
                None => break best.or_fail(AcquireError::new(
                    FailureKind::PositionUnavailable,
                    "position updates ended without a fix",
                )),
            },
        }
    };

    teardown.run();
    outcome
}
