// ── Live state mirror ──
//
// Holds the latest whole-value snapshot of the `sensors` and `controls`
// locations. Each location has its own subscription and pump task; a
// push replaces the snapshot atomically (readers only ever see an
// `Arc` to a complete value).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::MirrorPaths;
use crate::error::CoreError;
use crate::model::{ControlSnapshot, SensorSnapshot};
use crate::provider::{RealtimeStore, Subscription};
use crate::stream::SnapshotStream;

pub struct StateMirror {
    sensors: watch::Receiver<Arc<SensorSnapshot>>,
    controls: watch::Receiver<Arc<ControlSnapshot>>,
    last_push: watch::Receiver<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl StateMirror {
    /// Subscribe to both locations and start mirroring.
    ///
    /// Must be called within a tokio runtime.
    pub fn mount(store: &Arc<dyn RealtimeStore>, paths: &MirrorPaths) -> Result<Self, CoreError> {
        let sensors_sub = store.subscribe(&paths.sensors)?;
        let controls_sub = store.subscribe(&paths.controls)?;

        let (sensors_tx, sensors) = watch::channel(Arc::new(SensorSnapshot::default()));
        let (controls_tx, controls) = watch::channel(Arc::new(ControlSnapshot::default()));
        let (stamp_tx, last_push) = watch::channel(None);
        let stamp_tx = Arc::new(stamp_tx);
        let cancel = CancellationToken::new();

        let handles = vec![
            tokio::spawn(pump(
                sensors_sub,
                sensors_tx,
                Arc::clone(&stamp_tx),
                cancel.clone(),
                SensorSnapshot::from_value,
            )),
            tokio::spawn(pump(
                controls_sub,
                controls_tx,
                stamp_tx,
                cancel.clone(),
                ControlSnapshot::from_value,
            )),
        ];

        Ok(Self {
            sensors,
            controls,
            last_push,
            cancel,
            task_handles: Mutex::new(handles),
        })
    }

    /// Latest sensor snapshot.
    pub fn sensors(&self) -> Arc<SensorSnapshot> {
        self.sensors.borrow().clone()
    }

    /// Latest control snapshot.
    pub fn controls(&self) -> Arc<ControlSnapshot> {
        self.controls.borrow().clone()
    }

    pub fn watch_sensors(&self) -> SnapshotStream<SensorSnapshot> {
        SnapshotStream::new(self.sensors.clone())
    }

    pub fn watch_controls(&self) -> SnapshotStream<ControlSnapshot> {
        SnapshotStream::new(self.controls.clone())
    }

    /// When either snapshot was last replaced.
    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        *self.last_push.borrow()
    }

    /// Cancel both subscriptions and wait for the pump tasks to finish.
    /// No snapshot changes after this returns.
    pub async fn teardown(&self) {
        self.cancel.cancel();

        let mut handles = self.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("state mirror torn down");
    }
}

impl Drop for StateMirror {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Apply pushes from one subscription until cancelled.
async fn pump<T, F>(
    mut sub: Subscription,
    tx: watch::Sender<Arc<T>>,
    stamp: Arc<watch::Sender<Option<DateTime<Utc>>>>,
    cancel: CancellationToken,
    decode: F,
) where
    T: Send + Sync + 'static,
    F: Fn(Option<&Value>) -> T + Send + 'static,
{
    if let Some(initial) = sub.latest() {
        tx.send_replace(Arc::new(decode(Some(&initial))));
        stamp.send_replace(Some(Utc::now()));
    }

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = sub.changed() => next,
        };
        let Some(value) = next else {
            warn!(path = sub.path(), "subscription ended");
            break;
        };
        tx.send_replace(Arc::new(decode(value.as_ref())));
        stamp.send_replace(Some(Utc::now()));
    }

    sub.cancel();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn mounted() -> (Arc<MemoryStore>, StateMirror) {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn RealtimeStore> = store.clone();
        let mirror = StateMirror::mount(&dyn_store, &MirrorPaths::default()).unwrap();
        (store, mirror)
    }

    #[tokio::test]
    async fn pushes_replace_snapshots() {
        let (store, mirror) = mounted();
        let mut sensors = mirror.watch_sensors();

        store.set("sensors", json!({"temperature": 21.5, "ldr": 100}));
        let snap = sensors.changed().await.unwrap();
        assert_eq!(snap.temperature, Some(21.5));

        // Whole-value replacement: the next push drops fields it omits.
        store.set("sensors", json!({"humidity": 40}));
        let snap = sensors.changed().await.unwrap();
        assert_eq!(snap.temperature, None);
        assert_eq!(snap.humidity, Some(40.0));
        assert!(mirror.last_push().is_some());
    }

    #[tokio::test]
    async fn sensors_and_controls_are_independent() {
        let (store, mirror) = mounted();
        let mut controls = mirror.watch_controls();

        store.set("controls", json!({"servo1": true}));
        let snap = controls.changed().await.unwrap();
        assert!(snap.is_on("servo1"));
        assert!(mirror.sensors().is_empty());
    }

    #[tokio::test]
    async fn existing_value_is_mirrored_on_mount() {
        let store = Arc::new(MemoryStore::new());
        store.set("controls/system", json!(true));
        let dyn_store: Arc<dyn RealtimeStore> = store.clone();
        let mirror = StateMirror::mount(&dyn_store, &MirrorPaths::default()).unwrap();

        let mut controls = mirror.watch_controls();
        while !controls.latest().is_on("system") {
            controls.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn no_changes_after_teardown() {
        let (store, mirror) = mounted();
        let mut sensors = mirror.watch_sensors();
        store.set("sensors", json!({"ldr": 10}));
        sensors.changed().await.unwrap();

        mirror.teardown().await;
        assert_eq!(store.subscriber_count(), 0);

        store.set("sensors", json!({"ldr": 999}));
        store.set("controls", json!({"system": true}));
        tokio::task::yield_now().await;

        assert_eq!(mirror.sensors().ldr, Some(10.0));
        assert!(mirror.controls().is_empty());
    }
}
