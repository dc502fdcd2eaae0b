//! End-to-end collection
//!
//! A [`Collector`] runs one collection session: acquire a fix, convert it to
//! GCJ02, resolve an address and save the report. Address and persistence
//! go through a [`Backend`], which is either the HTTP surface of a running
//! server ([`remote::RemoteBackend`]) or the resolver and record store in
//! process ([`LocalBackend`]).
//!
//! A record is saved even when acquisition or resolution fails; the failed
//! fields are simply left empty.

pub mod ingest;
pub mod remote;

use crate::acquire::{AcquireError, Acquirer, Environment, FailureKind, Positioning};
use crate::datum::{wgs84_to_gcj02, Coordinate};
use crate::error::Result;
use crate::record::{BrowserReport, DeviceInfo, DeviceReport, LocationReport};
use crate::resolve::{HttpClient, ProviderId, ResolutionOutcome, Resolver};
use crate::store::RecordSink;
use chrono::{DateTime, Utc};
use std::future::Future;
use tracing::{debug, info, warn};

/// Progress of a collection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preparing,
    Locating { embedded: bool },
    ResolvingAddress,
    AddressResolved,
    AddressFailed,
    Saving,
    Completed,
    SaveFailed,
    LocationFailed(FailureKind),
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preparing => write!(f, "Preparing to collect"),
            Self::Locating { embedded: true } => {
                write!(f, "Locating (embedded browser, this can take a few seconds)...")
            }
            Self::Locating { embedded: false } => {
                write!(f, "Locating (this can take a few seconds)...")
            }
            Self::ResolvingAddress => write!(f, "Resolving address..."),
            Self::AddressResolved => write!(f, "Address resolved"),
            Self::AddressFailed => write!(f, "Address lookup failed"),
            Self::Saving => write!(f, "Saving..."),
            Self::Completed => write!(f, "Collection complete"),
            Self::SaveFailed => write!(f, "Save failed"),
            Self::LocationFailed(kind) => write!(f, "{}", failure_message(*kind)),
        }
    }
}

/// User-facing message for an acquisition failure
pub fn failure_message(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::CapabilityUnavailable => "Positioning is not supported on this device",
        FailureKind::InteractionWindowExpired => "Tap \"collect again\" to start locating",
        FailureKind::PermissionDenied => "Location permission was denied",
        FailureKind::PositionUnavailable => "Position unavailable, check that GPS is enabled",
        FailureKind::Timeout => "Locating timed out, check the network and GPS signal",
        FailureKind::Unknown => "Locating failed",
    }
}

/// Actionable hint for failures the user can fix themselves
pub fn failure_hint(kind: FailureKind) -> Option<&'static str> {
    match kind {
        FailureKind::PermissionDenied => Some(
            "Allow location access for this page in the browser settings, then collect again",
        ),
        FailureKind::InteractionWindowExpired => {
            Some("Locating must start right after a tap; tap the button and wait")
        }
        _ => None,
    }
}

/// Address lookup and persistence used by a [`Collector`]
pub trait Backend: Send + Sync {
    /// Resolve a GCJ02 coordinate, or a raw WGS84 one outside the correction region
    fn resolve_address(
        &self,
        coordinate: &Coordinate,
    ) -> impl Future<Output = Result<ResolutionOutcome>> + Send;

    /// Persist a finished report
    fn save(&self, report: &DeviceReport) -> impl Future<Output = Result<()>> + Send;
}

/// Backend that resolves and stores in process
pub struct LocalBackend<H, S> {
    resolver: Resolver<H>,
    sink: S,
}

impl<H: HttpClient, S: RecordSink> LocalBackend<H, S> {
    pub fn new(resolver: Resolver<H>, sink: S) -> Self {
        Self { resolver, sink }
    }

    pub fn resolver(&self) -> &Resolver<H> {
        &self.resolver
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<H: HttpClient, S: RecordSink> Backend for LocalBackend<H, S> {
    async fn resolve_address(&self, coordinate: &Coordinate) -> Result<ResolutionOutcome> {
        self.resolver.resolve(coordinate).await
    }

    async fn save(&self, report: &DeviceReport) -> Result<()> {
        ingest::ingest(&self.sink, report.clone(), None).map(|_| ())
    }
}

/// How a collection session ended
#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    /// Report saved; the address may still be missing
    Completed,
    /// No position; `saved` tells whether the error report was stored
    LocationFailed {
        error: AcquireError,
        hint: Option<&'static str>,
        saved: bool,
    },
    SaveFailed(String),
}

/// Everything a collection session produced
#[derive(Debug, Clone)]
pub struct CollectReport {
    pub phases: Vec<Phase>,
    pub report: DeviceReport,
    pub outcome: CollectOutcome,
}

impl CollectReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == CollectOutcome::Completed
    }

    /// Status shown last
    pub fn status(&self) -> Option<String> {
        self.phases.last().map(Phase::to_string)
    }
}

type Observer = Box<dyn Fn(&Phase) + Send + Sync>;

/// Drives acquisition, resolution and persistence in order
pub struct Collector<P, B> {
    acquirer: Acquirer<P>,
    backend: B,
    user_agent: String,
    observer: Option<Observer>,
}

impl<P: Positioning, B: Backend> Collector<P, B> {
    pub fn new(acquirer: Acquirer<P>, backend: B, user_agent: impl Into<String>) -> Self {
        Self {
            acquirer,
            backend,
            user_agent: user_agent.into(),
            observer: None,
        }
    }

    /// Call `observer` with every phase as it is entered
    pub fn with_observer(mut self, observer: impl Fn(&Phase) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one collection session
    ///
    /// # Arguments
    /// * `last_interaction` - When the user last tapped; gates the embedded
    ///   acquisition strategy
    pub async fn collect(&mut self, last_interaction: Option<DateTime<Utc>>) -> CollectReport {
        let mut phases = Vec::new();

        self.enter(&mut phases, Phase::Preparing);
        let mut report = DeviceReport {
            timestamp: Some(Utc::now().timestamp_millis()),
            device: DeviceInfo::from_user_agent(&self.user_agent),
            browser: BrowserReport {
                ua: self.user_agent.clone(),
            },
            ..Default::default()
        };

        let embedded = self.acquirer.environment() == Environment::Embedded;
        self.enter(&mut phases, Phase::Locating { embedded });

        let fix = match self.acquirer.acquire(last_interaction).await {
            Ok(fix) => fix,
            Err(error) => {
                warn!(kind = %error.kind, "acquisition failed: {}", error.message);
                self.enter(&mut phases, Phase::LocationFailed(error.kind));
                report.error = Some(failure_message(error.kind).to_string());

                let saved = match self.backend.save(&report).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("failed to save error report: {}", e);
                        false
                    }
                };

                return CollectReport {
                    phases,
                    report,
                    outcome: CollectOutcome::LocationFailed {
                        hint: failure_hint(error.kind),
                        error,
                        saved,
                    },
                };
            }
        };

        let gcj = wgs84_to_gcj02(fix.coordinate().lat(), fix.coordinate().lon());
        report.location = LocationReport::from_fix(&fix, &gcj);
        debug!(
            accuracy_m = fix.accuracy_m(),
            applicable = gcj.applicable,
            "position acquired"
        );

        self.enter(&mut phases, Phase::ResolvingAddress);
        match self.backend.resolve_address(&gcj.coordinate).await {
            Ok(outcome) => {
                report.baidu_address = outcome.secondary(ProviderId::Baidu).cloned();
                report.tencent_address = outcome.secondary(ProviderId::Tencent).cloned();
                report.address = outcome.primary;
                self.enter(&mut phases, Phase::AddressResolved);
            }
            Err(e) => {
                warn!("address lookup failed: {}", e);
                self.enter(&mut phases, Phase::AddressFailed);
            }
        }

        self.enter(&mut phases, Phase::Saving);
        let outcome = match self.backend.save(&report).await {
            Ok(()) => {
                self.enter(&mut phases, Phase::Completed);
                info!("collection complete");
                CollectOutcome::Completed
            }
            Err(e) => {
                warn!("failed to save report: {}", e);
                self.enter(&mut phases, Phase::SaveFailed);
                CollectOutcome::SaveFailed(e.to_string())
            }
        };

        CollectReport {
            phases,
            report,
            outcome,
        }
    }

    fn enter(&self, phases: &mut Vec<Phase>, phase: Phase) {
        if let Some(observer) = &self.observer {
            observer(&phase);
        }
        phases.push(phase);
    }
}
