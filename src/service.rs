//! Stateful query façade over the current zone set.
//!
//! Owns the published [`PipService`] snapshot and serializes loads and
//! queries: one operation at a time, overlapping requests are rejected
//! immediately rather than queued. Loads build a complete new snapshot on a
//! blocking worker and swap it in with a single pointer store, so a reader
//! sees either the old zone set or the new one in full.

use std::io::BufRead;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ParseError, ServiceError};
use crate::kml::{parse_document, parse_path, ParseProgress, ParserOptions};
use crate::models::{Coordinate, Zone};
use crate::pip::{PipService, PointCheck};

/// Externally visible service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceStatus {
    Idle,
    Loading,
    Ready { zone_count: usize },
    Querying,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Idle => write!(f, "idle"),
            ServiceStatus::Loading => write!(f, "loading"),
            ServiceStatus::Ready { zone_count } => write!(f, "ready ({} zones)", zone_count),
            ServiceStatus::Querying => write!(f, "querying"),
        }
    }
}

/// Summary of a successful load
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub zone_count: usize,
    pub elapsed: Duration,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(LoadReport),
    /// No document was selected; nothing was started
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// No zone set has been loaded yet
    NothingLoaded,
    Completed(PointCheck),
}

/// The in-flight operation, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Idle,
    Loading,
    Querying,
}

/// Zone set and index published together
struct Snapshot {
    pip: PipService,
    report: LoadReport,
}

struct Inner {
    activity: Mutex<Activity>,
    published: RwLock<Option<Arc<Snapshot>>>,
    options: ParserOptions,
}

impl Inner {
    fn activity(&self) -> MutexGuard<'_, Activity> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    fn status_for(&self, activity: Activity) -> ServiceStatus {
        match activity {
            Activity::Loading => ServiceStatus::Loading,
            Activity::Querying => ServiceStatus::Querying,
            Activity::Idle => match self.snapshot() {
                Some(snapshot) => ServiceStatus::Ready {
                    zone_count: snapshot.report.zone_count,
                },
                None => ServiceStatus::Idle,
            },
        }
    }
}

/// Returns the service to idle when the operation ends, including on panic
struct ActivityGuard {
    inner: Arc<Inner>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        *self.inner.activity() = Activity::Idle;
    }
}

/// Load/query coordinator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryService {
    inner: Arc<Inner>,
}

impl Default for QueryService {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl QueryService {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                activity: Mutex::new(Activity::Idle),
                published: RwLock::new(None),
                options,
            }),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        let activity = *self.inner.activity();
        self.inner.status_for(activity)
    }

    /// Report of the currently published zone set
    pub fn last_load(&self) -> Option<LoadReport> {
        self.inner.snapshot().map(|s| s.report.clone())
    }

    fn begin(&self, next: Activity) -> Result<ActivityGuard, ServiceError> {
        let mut activity = self.inner.activity();
        if *activity != Activity::Idle {
            let status = self.inner.status_for(*activity);
            warn!("Rejecting {:?} request: service is {}", next, status);
            return Err(ServiceError::Busy { status });
        }

        *activity = next;
        Ok(ActivityGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Load zones from a document on disk
    pub async fn load_path<P, F>(&self, path: P, on_progress: F) -> Result<LoadOutcome, ServiceError>
    where
        P: AsRef<Path>,
        F: FnMut(ParseProgress) + Send + 'static,
    {
        let guard = self.begin(Activity::Loading)?;
        let path = path.as_ref().to_path_buf();
        let options = self.inner.options;

        info!("Loading zones from {}", path.display());
        self.run_load(guard, move || parse_path(&path, &options, on_progress))
            .await
    }

    /// Start loading a document in the background.
    ///
    /// A busy service is rejected before anything is spawned. Must be called
    /// from within a tokio runtime.
    pub fn spawn_load_path<P, F>(
        &self,
        path: P,
        on_progress: F,
    ) -> Result<JoinHandle<Result<LoadOutcome, ServiceError>>, ServiceError>
    where
        P: AsRef<Path>,
        F: FnMut(ParseProgress) + Send + 'static,
    {
        let guard = self.begin(Activity::Loading)?;
        let path = path.as_ref().to_path_buf();
        let options = self.inner.options;
        let service = self.clone();

        info!("Loading zones from {} in the background", path.display());
        Ok(tokio::spawn(async move {
            service
                .run_load(guard, move || parse_path(&path, &options, on_progress))
                .await
        }))
    }

    /// Load from a caller's document selection; `None` means it was abandoned
    pub async fn load_selection<P, F>(
        &self,
        selection: Option<P>,
        on_progress: F,
    ) -> Result<LoadOutcome, ServiceError>
    where
        P: AsRef<Path>,
        F: FnMut(ParseProgress) + Send + 'static,
    {
        match selection {
            Some(path) => self.load_path(path, on_progress).await,
            None => {
                info!("No document selected, load cancelled");
                Ok(LoadOutcome::Cancelled)
            }
        }
    }

    /// Load zones from an arbitrary stream
    pub async fn load_reader<R, F>(
        &self,
        source: R,
        expected_len: Option<u64>,
        on_progress: F,
    ) -> Result<LoadOutcome, ServiceError>
    where
        R: BufRead + Send + 'static,
        F: FnMut(ParseProgress) + Send + 'static,
    {
        let guard = self.begin(Activity::Loading)?;
        let options = self.inner.options;

        info!("Loading zones from stream");
        self.run_load(guard, move || {
            parse_document(source, expected_len, &options, on_progress)
        })
        .await
    }

    async fn run_load<J>(&self, guard: ActivityGuard, job: J) -> Result<LoadOutcome, ServiceError>
    where
        J: FnOnce() -> Result<Vec<Zone>, ParseError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        // The guard moves into the worker so the service stays busy until
        // the snapshot is published, even if this future is dropped.
        let report = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let start = Instant::now();

            let zones = job()?;
            let pip = PipService::from_zones(zones);
            let report = LoadReport {
                zone_count: pip.zone_count(),
                elapsed: start.elapsed(),
                loaded_at: Utc::now(),
            };
            inner.publish(Snapshot {
                pip,
                report: report.clone(),
            });

            Ok::<_, ParseError>(report)
        })
        .await
        .map_err(|e| ServiceError::Worker(e.to_string()))?;

        match report {
            Ok(report) => {
                info!(
                    "Loaded {} zones in {:?}",
                    report.zone_count, report.elapsed
                );
                Ok(LoadOutcome::Loaded(report))
            }
            Err(err) => {
                warn!("Load failed, keeping previous zone set: {}", err);
                Err(err.into())
            }
        }
    }

    /// Find the zones containing `point` in the published zone set
    pub async fn query(&self, point: Coordinate) -> Result<QueryOutcome, ServiceError> {
        let guard = self.begin(Activity::Querying)?;

        let Some(snapshot) = self.inner.snapshot() else {
            debug!("Query at {} with no zones loaded", point);
            return Ok(QueryOutcome::NothingLoaded);
        };

        let check = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            snapshot.pip.check_point(point)
        })
        .await
        .map_err(|e| ServiceError::Worker(e.to_string()))?;

        Ok(QueryOutcome::Completed(check))
    }
}
