//! Device position acquisition
//!
//! An [`Acquirer`] turns a platform positioning capability into a single
//! WGS84 [`PositionFix`]. The strategy depends on the runtime:
//!
//! - Embedded webviews (WeChat) only honour a one-shot request issued
//!   shortly after a user interaction, so [`single_shot`] checks the
//!   interaction window and retries timeouts.
//! - Standalone browsers get a stream of fixes, which [`refine`] narrows
//!   down to the most accurate one within a deadline.
//!
//! ## Flex Point
//! Adding a positioning source means implementing [`Positioning`]; see
//! [`fixed`] and [`ip`] for the built-in ones.

mod cancel;
pub mod fixed;
pub mod ip;
pub mod refine;
pub mod single_shot;

use crate::config::AcquisitionConfig;
use crate::constants::position::UNKNOWN_ACCURACY_METERS;
use crate::datum::Coordinate;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Terminal acquisition failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CapabilityUnavailable,
    InteractionWindowExpired,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl FailureKind {
    /// Whether the user can fix this themselves (grant permission, tap again)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::InteractionWindowExpired)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapabilityUnavailable => write!(f, "capability_unavailable"),
            Self::InteractionWindowExpired => write!(f, "interaction_window_expired"),
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::PositionUnavailable => write!(f, "position_unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Acquisition failure surfaced to the orchestrator
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct AcquireError {
    pub kind: FailureKind,
    pub message: String,
}

impl AcquireError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Error kinds reported by a platform positioning capability
///
/// Codes follow the W3C Geolocation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Other,
}

impl PlatformErrorKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Other,
        }
    }
}

/// Error reported by a platform positioning capability
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<PlatformError> for AcquireError {
    fn from(err: PlatformError) -> Self {
        let kind = match err.kind {
            PlatformErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            PlatformErrorKind::PositionUnavailable => FailureKind::PositionUnavailable,
            PlatformErrorKind::Timeout => FailureKind::Timeout,
            PlatformErrorKind::Other => FailureKind::Unknown,
        };
        AcquireError::new(kind, err.message)
    }
}

/// A single WGS84 position reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    coordinate: Coordinate,
    accuracy_m: f64,
    captured_at_ms: i64,
}

impl PositionFix {
    /// Create a fix from raw platform values
    ///
    /// A missing, zero or non-finite accuracy becomes the 9999 m sentinel.
    pub fn new(lat: f64, lon: f64, accuracy_m: Option<f64>, captured_at_ms: i64) -> Self {
        let accuracy_m = match accuracy_m {
            Some(a) if a.is_finite() && a > 0.0 => a,
            _ => UNKNOWN_ACCURACY_METERS,
        };
        Self {
            coordinate: Coordinate::wgs84(lat, lon),
            accuracy_m,
            captured_at_ms,
        }
    }

    /// Create a fix stamped with the current time
    pub fn now(lat: f64, lon: f64, accuracy_m: Option<f64>) -> Self {
        Self::new(lat, lon, accuracy_m, Utc::now().timestamp_millis())
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn accuracy_m(&self) -> f64 {
        self.accuracy_m
    }

    pub fn captured_at_ms(&self) -> i64 {
        self.captured_at_ms
    }
}

/// Options passed to the platform with each request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub maximum_age: Duration,
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Stream of fixes produced by a subscription
pub type FixStream = Pin<Box<dyn Stream<Item = Result<PositionFix, PlatformError>> + Send>>;

/// A live subscription to position updates
///
/// The cancel callback tears the subscription down on the platform side.
pub struct FixSubscription {
    stream: FixStream,
    cancel: Box<dyn FnOnce() + Send>,
}

impl FixSubscription {
    pub fn new<S, F>(stream: S, cancel: F) -> Self
    where
        S: Stream<Item = Result<PositionFix, PlatformError>> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            cancel: Box::new(cancel),
        }
    }

    fn into_parts(self) -> (FixStream, Box<dyn FnOnce() + Send>) {
        (self.stream, self.cancel)
    }
}

/// Platform positioning capability
pub trait Positioning: Send + Sync {
    /// Whether positioning exists at all on this platform
    fn is_available(&self) -> bool {
        true
    }

    /// Request a single fix
    fn request_fix(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionFix, PlatformError>> + Send;

    /// Subscribe to continuous position updates
    fn subscribe_fixes(&self, options: &PositionOptions) -> FixSubscription;
}

/// Runtime the acquisition runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Embedded webview that requires a recent user interaction
    Embedded,
    /// Standalone browser or native host
    Standalone,
}

impl Environment {
    /// Detect the runtime from a user agent string
    pub fn from_user_agent(ua: &str) -> Self {
        if ua.to_lowercase().contains("micromessenger") {
            Self::Embedded
        } else {
            Self::Standalone
        }
    }
}

/// Acquisition session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    Idle,
    AwaitingFix,
    Refining,
    Resolved,
    Failed(FailureKind),
}

impl std::fmt::Display for AcquireState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingFix => write!(f, "awaiting_fix"),
            Self::Refining => write!(f, "refining"),
            Self::Resolved => write!(f, "resolved"),
            Self::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Tunables for both acquisition strategies
#[derive(Debug, Clone, PartialEq)]
pub struct AcquireSettings {
    /// How recent a user interaction must be for the single-shot strategy
    pub interaction_window: Duration,
    /// Extra attempts after a timeout (single-shot only)
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Accuracy radius that ends refinement early
    pub accuracy_threshold_m: f64,
    /// Overall refinement deadline
    pub deadline: Duration,
    pub single_shot: PositionOptions,
    pub refinement: PositionOptions,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self::from(&AcquisitionConfig::default())
    }
}

impl From<&AcquisitionConfig> for AcquireSettings {
    fn from(config: &AcquisitionConfig) -> Self {
        Self {
            interaction_window: Duration::from_millis(config.interaction_window_ms),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            accuracy_threshold_m: config.accuracy_threshold_m,
            deadline: Duration::from_secs(config.deadline_secs),
            single_shot: PositionOptions {
                high_accuracy: true,
                maximum_age: Duration::from_secs(config.max_age_secs),
                timeout: Duration::from_secs(config.attempt_timeout_secs),
            },
            refinement: PositionOptions {
                high_accuracy: true,
                maximum_age: Duration::ZERO,
                timeout: Duration::from_secs(config.deadline_secs),
            },
        }
    }
}

/// Drives one acquisition session at a time over a positioning capability
pub struct Acquirer<P> {
    positioning: P,
    environment: Environment,
    settings: AcquireSettings,
    state: AcquireState,
}

impl<P: Positioning> Acquirer<P> {
    pub fn new(positioning: P, environment: Environment, settings: AcquireSettings) -> Self {
        Self {
            positioning,
            environment,
            settings,
            state: AcquireState::Idle,
        }
    }

    pub fn state(&self) -> AcquireState {
        self.state
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Acquire a single fix
    ///
    /// # Arguments
    /// * `last_interaction` - When the user last interacted with the page;
    ///   only consulted by the embedded strategy
    pub async fn acquire(
        &mut self,
        last_interaction: Option<DateTime<Utc>>,
    ) -> Result<PositionFix, AcquireError> {
        self.state = AcquireState::Idle;

        if !self.positioning.is_available() {
            return self.finish(Err(AcquireError::new(
                FailureKind::CapabilityUnavailable,
                "positioning is not available on this platform",
            )));
        }

        self.state = AcquireState::AwaitingFix;
        debug!(environment = ?self.environment, "awaiting position fix");

        let result = match self.environment {
            Environment::Embedded => {
                single_shot::acquire(
                    &self.positioning,
                    &self.settings,
                    last_interaction,
                    Utc::now(),
                )
                .await
            }
            Environment::Standalone => {
                refine::acquire(&self.positioning, &self.settings, &mut self.state).await
            }
        };

        self.finish(result)
    }

    fn finish(
        &mut self,
        result: Result<PositionFix, AcquireError>,
    ) -> Result<PositionFix, AcquireError> {
        match &result {
            Ok(fix) => {
                self.state = AcquireState::Resolved;
                debug!(accuracy_m = fix.accuracy_m(), "position resolved");
            }
            Err(err) => {
                self.state = AcquireState::Failed(err.kind);
                warn!(kind = %err.kind, "position acquisition failed: {}", err.message);
            }
        }
        result
    }
}
