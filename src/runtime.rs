/// Simulation runtime: owns the in-memory stores, drives the tick timer and
/// the low-frequency garbage-collection sweep, and services the on-demand
/// prediction and debug interfaces. The algorithmic core stays free of
/// concurrency primitives; this is the only module that locks.
use crate::config::BoundingBox;
use crate::geometry::track::{ExclusionSet, FilterContext, TrackStore};
use crate::geometry::GeometryCache;
use crate::models::{ArrivalPrediction, JourneyPlan, Snapshot};
use crate::predict::{plan_journey, predict_arrivals, JourneyOptions};
use crate::schedule::ScheduleData;
use crate::sim::{sweep_fleet, tick, SimulationState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use utoipa::ToSchema;

/// How often stale fleet instances are swept, independent of the tick.
const SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Buffered snapshots for slow WebSocket consumers.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

/// Engine counters exposed through the system API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EngineStats {
    pub live_trains: usize,
    pub fleet_size: usize,
    pub tick_seq: u64,
    pub routes_mapped: usize,
    pub degraded_segments: usize,
    pub track_polylines: usize,
    pub excluded_features: usize,
}

pub struct SimulationRuntime {
    schedule: Arc<ScheduleData>,
    track_store: Arc<TrackStore>,
    bounding_box: Option<BoundingBox>,
    tick_interval: std::time::Duration,
    geometry: RwLock<Arc<GeometryCache>>,
    exclusions: RwLock<ExclusionSet>,
    state: RwLock<SimulationState>,
    arrival_cache: RwLock<HashMap<(String, usize), (u64, Vec<ArrivalPrediction>)>>,
    snapshot_tx: broadcast::Sender<Arc<Snapshot>>,
}

impl SimulationRuntime {
    pub fn new(
        schedule: ScheduleData,
        track_store: TrackStore,
        exclusions: ExclusionSet,
        bounding_box: Option<BoundingBox>,
        tick_interval: std::time::Duration,
    ) -> Self {
        let schedule = Arc::new(schedule);
        let ctx = FilterContext {
            exclusions: &exclusions,
            bounding_box,
        };
        let geometry = GeometryCache::build(&schedule, &track_store, &ctx);
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        Self {
            schedule,
            track_store: Arc::new(track_store),
            bounding_box,
            tick_interval,
            geometry: RwLock::new(Arc::new(geometry)),
            exclusions: RwLock::new(exclusions),
            state: RwLock::new(SimulationState::default()),
            arrival_cache: RwLock::new(HashMap::new()),
            snapshot_tx,
        }
    }

    pub fn schedule(&self) -> &ScheduleData {
        &self.schedule
    }

    pub async fn geometry(&self) -> Arc<GeometryCache> {
        self.geometry.read().await.clone()
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.state.read().await.snapshot.clone()
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Start the tick and sweep loops. The first tick runs before the loops
    /// are spawned so the initial snapshot exists as soon as this returns.
    pub async fn start(self: Arc<Self>) {
        info!(
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            routes = self.schedule.routes().len(),
            "Starting simulation runtime"
        );

        self.run_tick(Utc::now()).await;

        let tick_self = self.clone();
        let tick_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_self.tick_interval);
            // Skip the immediate first fire; the initial tick already ran.
            interval.tick().await;
            loop {
                interval.tick().await;
                tick_self.run_tick(Utc::now()).await;
            }
        });

        let sweep_self = self.clone();
        let sweep_handle = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                sweep_self.run_sweep(Utc::now()).await;
            }
        });

        let _ = tokio::join!(tick_handle, sweep_handle);
    }

    /// One simulation step. A tick failure is logged and the previous
    /// snapshot retained; the timer loop never dies.
    pub async fn run_tick(&self, now: DateTime<Utc>) {
        let geometry = self.geometry.read().await.clone();
        let previous = self.state.read().await.clone();
        let schedule = self.schedule.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tick(&schedule, &geometry, &previous, now)
        }));

        match result {
            Ok(next) => {
                let snapshot = next.snapshot.clone();
                *self.state.write().await = next;
                // Send only fails when nobody is subscribed.
                let _ = self.snapshot_tx.send(snapshot);
            }
            Err(_) => {
                error!("Tick failed, retaining previous snapshot");
            }
        }
    }

    async fn run_sweep(&self, now: DateTime<Utc>) {
        let mut state = self.state.write().await;
        let removed = sweep_fleet(&mut state, now);
        if removed > 0 {
            info!(removed, "Swept stale train instances");
        }
    }

    /// Arrival predictions for a station, briefly cached: entries are reused
    /// until the snapshot they were computed from is superseded.
    pub async fn arrivals(
        &self,
        station_id: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<ArrivalPrediction> {
        let snapshot = self.snapshot().await;
        let key = (station_id.to_string(), limit);

        {
            let cache = self.arrival_cache.read().await;
            if let Some((seq, predictions)) = cache.get(&key) {
                if *seq == snapshot.tick_seq {
                    return predictions.clone();
                }
            }
        }

        let geometry = self.geometry().await;
        let predictions =
            predict_arrivals(station_id, &snapshot, &self.schedule, &geometry, limit, now);

        let mut cache = self.arrival_cache.write().await;
        // Drop entries from older snapshots while we hold the lock.
        cache.retain(|_, entry| entry.0 == snapshot.tick_seq);
        cache.insert(key, (snapshot.tick_seq, predictions.clone()));
        predictions
    }

    pub async fn plan(
        &self,
        from_id: &str,
        to_id: &str,
        opts: JourneyOptions,
        now: DateTime<Utc>,
    ) -> Option<JourneyPlan> {
        let snapshot = self.snapshot().await;
        let geometry = self.geometry().await;
        plan_journey(from_id, to_id, &snapshot, &self.schedule, &geometry, opts, now)
    }

    /// Debug interface: exclude a track feature and rebuild the geometry
    /// cache synchronously, so no tick ever runs against stale geometry.
    pub async fn exclude_feature(&self, id: Option<i64>, name: Option<String>) {
        {
            let mut exclusions = self.exclusions.write().await;
            if let Some(id) = id {
                exclusions.ids.insert(id);
            }
            if let Some(name) = name {
                exclusions.names.insert(name);
            }
        }
        self.rebuild_geometry().await;
        // Refresh the snapshot immediately so consumers see the new paths.
        self.run_tick(Utc::now()).await;
    }

    async fn rebuild_geometry(&self) {
        let exclusions = self.exclusions.read().await.clone();
        let ctx = FilterContext {
            exclusions: &exclusions,
            bounding_box: self.bounding_box,
        };
        let rebuilt = GeometryCache::build(&self.schedule, &self.track_store, &ctx);
        warn!(
            excluded = exclusions.len(),
            degraded_segments = rebuilt.degraded_segment_count(),
            "Rebuilt geometry cache after exclusion change"
        );
        *self.geometry.write().await = Arc::new(rebuilt);
        self.arrival_cache.write().await.clear();
    }

    pub async fn excluded_features(&self) -> ExclusionSet {
        self.exclusions.read().await.clone()
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.read().await;
        let geometry = self.geometry.read().await;
        let exclusions = self.exclusions.read().await;
        EngineStats {
            live_trains: state.snapshot.trains.len(),
            fleet_size: state.fleet.len(),
            tick_seq: state.snapshot.tick_seq,
            routes_mapped: geometry.route_count(),
            degraded_segments: geometry.degraded_segment_count(),
            track_polylines: self.track_store.len(),
            excluded_features: exclusions.len(),
        }
    }
}
