// ── Dashboard facade ──
//
// Owns one SessionGate, StateMirror, ControlDispatcher, and
// WeatherPipeline for the lifetime of a dashboard view. Collaborators come
// in through an explicit context; nothing here is process-global.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::MirrorPaths;
use crate::control::ControlDispatcher;
use crate::error::CoreError;
use crate::mirror::StateMirror;
use crate::model::{ControlSnapshot, ForecastState, SensorSnapshot};
use crate::provider::{IdentityProvider, RealtimeStore, WeatherApi};
use crate::session::{SessionGate, SessionState};
use crate::stream::SnapshotStream;
use crate::view::{self, DashboardView};
use crate::weather::{LookupOutcome, PipelineOptions, WeatherPipeline};

/// The collaborators a dashboard runs against.
#[derive(Clone)]
pub struct DashboardContext {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn RealtimeStore>,
    pub weather: Arc<dyn WeatherApi>,
}

pub struct Dashboard {
    gate: SessionGate,
    mirror: StateMirror,
    dispatcher: ControlDispatcher,
    pipeline: WeatherPipeline,
}

impl Dashboard {
    /// Mount every component. Must be called within a tokio runtime.
    pub fn mount(
        ctx: &DashboardContext,
        paths: &MirrorPaths,
        options: PipelineOptions,
    ) -> Result<Self, CoreError> {
        let gate = SessionGate::mount(Arc::clone(&ctx.identity), Arc::clone(&ctx.store));
        let mirror = StateMirror::mount(&ctx.store, paths)?;
        let dispatcher = ControlDispatcher::new(Arc::clone(&ctx.store), paths.controls.clone());
        let pipeline = WeatherPipeline::new(Arc::clone(&ctx.weather), options);

        Ok(Self {
            gate,
            mirror,
            dispatcher,
            pipeline,
        })
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    pub fn pipeline(&self) -> &WeatherPipeline {
        &self.pipeline
    }

    /// Current view model.
    pub fn view(&self) -> DashboardView {
        view::render(
            self.gate.role(),
            &self.mirror.sensors(),
            &self.mirror.controls(),
            &self.pipeline.place(),
            &self.pipeline.state(),
        )
    }

    /// Fire-and-forget control write, refused unless the role allows it.
    pub fn toggle(&self, key: &str, value: bool) -> Result<JoinHandle<()>, CoreError> {
        if !self.gate.can_control() {
            return Err(CoreError::NotAuthorized);
        }
        self.dispatcher.toggle(key, value)
    }

    /// Change the weather place.
    pub fn set_place(&self, place: impl Into<String>) -> JoinHandle<LookupOutcome> {
        self.pipeline.set_place(place)
    }

    /// Receivers that fire whenever anything on the view changes.
    pub fn updates(&self) -> DashboardUpdates {
        DashboardUpdates {
            session: self.gate.watch(),
            sensors: self.mirror.watch_sensors(),
            controls: self.mirror.watch_controls(),
            forecast: self.pipeline.watch(),
        }
    }

    /// Stop observing and mirroring. Pipeline runs in flight finish on
    /// their own.
    pub async fn teardown(&self) {
        self.mirror.teardown().await;
        self.gate.teardown().await;
    }
}

/// Change notification across all dashboard state.
pub struct DashboardUpdates {
    session: watch::Receiver<SessionState>,
    sensors: SnapshotStream<SensorSnapshot>,
    controls: SnapshotStream<ControlSnapshot>,
    forecast: watch::Receiver<ForecastState>,
}

impl DashboardUpdates {
    /// Wait for the next change. Returns `false` once any source has shut down.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            res = self.session.changed() => res.is_ok(),
            snap = self.sensors.changed() => snap.is_some(),
            snap = self.controls.changed() => snap.is_some(),
            res = self.forecast.changed() => res.is_ok(),
        }
    }

    /// The session state as of the last change.
    pub fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }
}
