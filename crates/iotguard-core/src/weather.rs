// ── Weather lookup pipeline ──
//
// Per place-name change: geocode, then fetch the hourly forecast for the
// first match, and publish its first sample. Failures are logged and
// leave the previous forecast in place; nothing is retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{ForecastSample, ForecastState};
use crate::provider::WeatherApi;

/// Which result wins when lookups overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StaleResults {
    /// Whichever run finishes last is shown, even if it was started first.
    #[default]
    LastCompletedWins,
    /// Only the most recently started run may publish.
    LatestRequestWins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub stale_results: StaleResults,
    /// Reset to `Loading` as soon as the place changes.
    pub clear_on_change: bool,
}

/// Why a lookup produced no sample.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("geocoding failed: {0}")]
    Geocode(#[source] CoreError),
    #[error("forecast failed: {0}")]
    Forecast(#[source] CoreError),
    #[error("forecast has no usable first hourly sample")]
    NoSample,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The sample was published.
    Updated(ForecastSample),
    /// Nothing matched the place name; state untouched.
    NoMatch,
    /// A newer run was started; this result was dropped.
    Superseded,
    /// The chain failed; state untouched.
    Failed,
}

struct PipelineInner {
    api: Arc<dyn WeatherApi>,
    options: PipelineOptions,
    state: watch::Sender<ForecastState>,
    place: watch::Sender<String>,
    seq: AtomicU64,
}

/// Cheaply cloneable handle to the pipeline.
#[derive(Clone)]
pub struct WeatherPipeline {
    inner: Arc<PipelineInner>,
}

impl WeatherPipeline {
    pub fn new(api: Arc<dyn WeatherApi>, options: PipelineOptions) -> Self {
        let (state, _) = watch::channel(ForecastState::Loading);
        let (place, _) = watch::channel(String::new());
        Self {
            inner: Arc::new(PipelineInner {
                api,
                options,
                state,
                place,
                seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ForecastState {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ForecastState> {
        self.inner.state.subscribe()
    }

    /// The most recently requested place.
    pub fn place(&self) -> String {
        self.inner.place.borrow().clone()
    }

    /// Start a lookup in the background. HTTP requests of earlier runs are
    /// not aborted.
    pub fn set_place(&self, place: impl Into<String>) -> JoinHandle<LookupOutcome> {
        let place = place.into();
        let ticket = self.begin(&place);
        let this = self.clone();
        tokio::spawn(async move { this.run(place, ticket).await })
    }

    /// Run one lookup inline.
    pub async fn lookup(&self, place: impl Into<String>) -> LookupOutcome {
        let place = place.into();
        let ticket = self.begin(&place);
        self.run(place, ticket).await
    }

    /// Record the request and hand out its sequence ticket.
    fn begin(&self, place: &str) -> u64 {
        let ticket = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.place.send_replace(place.to_owned());
        if self.inner.options.clear_on_change {
            self.inner.state.send_replace(ForecastState::Loading);
        }
        ticket
    }

    async fn run(&self, place: String, ticket: u64) -> LookupOutcome {
        let result = fetch_sample(self.inner.api.as_ref(), &place).await;

        match result {
            Ok(Some(sample)) => {
                if self.inner.options.stale_results == StaleResults::LatestRequestWins
                    && self.inner.seq.load(Ordering::SeqCst) != ticket
                {
                    debug!(place = %place, "discarding superseded forecast");
                    return LookupOutcome::Superseded;
                }
                info!(place = %place, time = %sample.time, "forecast updated");
                self.inner
                    .state
                    .send_replace(ForecastState::Ready(sample.clone()));
                LookupOutcome::Updated(sample)
            }
            Ok(None) => {
                debug!(place = %place, "no geocoding match, keeping previous forecast");
                LookupOutcome::NoMatch
            }
            Err(e) => {
                warn!(place = %place, error = %e, "weather lookup failed");
                LookupOutcome::Failed
            }
        }
    }
}

/// Geocode `place` and take the first forecast sample for the best match.
///
/// `Ok(None)` means nothing matched (a blank place matches nothing).
pub async fn fetch_sample(
    api: &dyn WeatherApi,
    place: &str,
) -> Result<Option<ForecastSample>, LookupError> {
    let place = place.trim();
    if place.is_empty() {
        return Ok(None);
    }

    let matches = api.geocode(place).await.map_err(LookupError::Geocode)?;
    let Some(at) = matches.first().copied() else {
        return Ok(None);
    };

    let hourly = api.forecast(at).await.map_err(LookupError::Forecast)?;
    ForecastSample::from_hourly(&hourly)
        .map(Some)
        .ok_or(LookupError::NoSample)
}
