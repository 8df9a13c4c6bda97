//! Periodic fan-out collection with a per-cycle deadline.
//!
//! Every tick spawns one blocking task per registered [`Source`], waits until
//! all of them report or the collection timeout expires, merges whatever
//! arrived into a [`Snapshot`] and publishes it:
//!
//! 1. a copy goes into the [`HistoryStore`],
//! 2. the latest-pointer cell is swapped to the new `Arc<Snapshot>`,
//! 3. every subscriber queue gets the same `Arc` via `try_send`.
//!
//! Subscribers are best-effort. A full queue simply misses that snapshot, so
//! consumers must tolerate gaps and treat the newest value as authoritative.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::history::HistoryStore;
use super::snapshot::{Snapshot, SnapshotBuilder};
use super::source::{Category, Reading, Source};
use super::sources::{self, SystemInfo};
use crate::config::{CollectionSettings, MIN_TICK_INTERVAL};
use crate::error::VitalsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Orchestrator {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

struct Driver {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct Shared {
    settings: CollectionSettings,
    slots: Vec<SourceSlot>,
    history: Arc<HistoryStore>,
    latest: ArcSwapOption<Snapshot>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscriber: AtomicU64,
    // Held for a whole cycle so cycles never interleave; stores the last
    // published timestamp.
    cycle: tokio::sync::Mutex<Option<SystemTime>>,
    host: OnceLock<SystemInfo>,
}

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::Sender<Arc<Snapshot>>,
}

struct SourceSlot {
    category: Category,
    source: Arc<Mutex<Box<dyn Source>>>,
    busy: Arc<AtomicBool>,
    available: bool,
}

struct CollectJob {
    category: Category,
    source: Arc<Mutex<Box<dyn Source>>>,
    _busy: BusyGuard,
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct CollectOutcome {
    category: Category,
    reading: Result<Reading, String>,
}

impl Orchestrator {
    /// Registers `sources`, dropping those whose category is disabled in
    /// `settings` and any second source for an already-claimed category.
    pub fn new(settings: CollectionSettings, sources: Vec<Box<dyn Source>>) -> Self {
        let mut slots: Vec<SourceSlot> = Vec::with_capacity(sources.len());
        for source in sources {
            let category = source.category();
            if !settings.sources.is_enabled(category) {
                debug!(%category, "source disabled by configuration");
                continue;
            }
            if slots.iter().any(|slot| slot.category == category) {
                warn!(%category, "duplicate source for category ignored");
                continue;
            }
            let available = source.is_available();
            if !available {
                info!(%category, "source unavailable, category stays at defaults");
            }
            slots.push(SourceSlot {
                category,
                source: Arc::new(Mutex::new(source)),
                busy: Arc::new(AtomicBool::new(false)),
                available,
            });
        }

        let shared = Shared {
            history: Arc::new(HistoryStore::new(settings.history_capacity)),
            settings,
            slots,
            latest: ArcSwapOption::empty(),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(0),
            cycle: tokio::sync::Mutex::new(None),
            host: OnceLock::new(),
        };
        Orchestrator {
            shared: Arc::new(shared),
            driver: Mutex::new(None),
        }
    }

    /// Uses the built-in hardware adapters for every enabled category.
    pub fn with_default_sources(settings: CollectionSettings) -> Self {
        let sources = sources::default_sources(&settings.sources, settings.top_process_count);
        Self::new(settings, sources)
    }

    /// Starts the periodic driver on the current Tokio runtime. The first
    /// cycle runs immediately. Calling it while running is a no-op.
    pub fn start(&self, tick_interval: Duration) -> Result<(), VitalsError> {
        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        if driver.as_ref().is_some_and(|d| !d.task.is_finished()) {
            debug!("collector already running");
            return Ok(());
        }
        let handle = Handle::try_current().map_err(|_| VitalsError::NoRuntime)?;

        let tick_interval = tick_interval.max(MIN_TICK_INTERVAL);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = handle.spawn(drive(Arc::clone(&self.shared), tick_interval, shutdown_rx));
        *driver = Some(Driver { shutdown, task });

        info!(
            interval_ms = tick_interval.as_millis() as u64,
            sources = self.shared.slots.len(),
            "collector started"
        );
        Ok(())
    }

    /// Signals the driver and waits for it to unwind, at most the configured
    /// stop timeout. An in-flight cycle is abandoned without publishing.
    pub async fn stop(&self) {
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(driver) = driver else {
            return;
        };

        let _ = driver.shutdown.send(true);
        match tokio::time::timeout(self.shared.settings.stop_timeout, driver.task).await {
            Ok(Ok(())) => info!("collector stopped"),
            Ok(Err(err)) => error!(%err, "collection driver terminated abnormally"),
            Err(_) => warn!(
                timeout_ms = self.shared.settings.stop_timeout.as_millis() as u64,
                "collection driver did not stop in time, detaching"
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|d| !d.task.is_finished())
    }

    /// Runs one full cycle now and returns the published snapshot.
    pub async fn collect_once(&self) -> Arc<Snapshot> {
        self.shared.run_cycle().await
    }

    /// The most recently published snapshot. Never waits on a running cycle.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.shared.latest.load_full()
    }

    pub fn history(&self) -> Arc<HistoryStore> {
        Arc::clone(&self.shared.history)
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.shared.settings
    }

    /// Categories that get a task every cycle.
    pub fn active_categories(&self) -> Vec<Category> {
        self.shared
            .slots
            .iter()
            .filter(|slot| slot.available)
            .map(|slot| slot.category)
            .collect()
    }

    /// Registers a bounded queue. Snapshots are pushed without waiting and
    /// dropped for this subscriber while its queue is full.
    pub fn subscribe(&self, tx: mpsc::Sender<Arc<Snapshot>>) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, tx });
        debug!(subscription = id.0, "subscriber added");
        id
    }

    /// Convenience wrapper creating a queue of the configured capacity.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::Receiver<Arc<Snapshot>>) {
        let (tx, rx) = mpsc::channel(self.shared.settings.subscriber_capacity);
        (self.subscribe(tx), rx)
    }

    /// Returns `false` if `id` was not registered (or was already pruned
    /// because its receiver went away).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Static host information, gathered on first use. The accelerator name
    /// comes from the latest snapshot.
    pub fn system_info(&self) -> SystemInfo {
        let mut info = self.shared.host.get_or_init(sources::host_info).clone();
        if let Some(latest) = self.latest()
            && latest.gpu.available
        {
            info.accelerator = Some(latest.gpu.name.clone());
        }
        info
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let driver = self
            .driver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = driver {
            let _ = driver.shutdown.send(true);
        }
    }
}

async fn drive(shared: Arc<Shared>, tick_interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        debug!("stop requested mid-cycle, abandoning snapshot");
                        break;
                    }
                    _ = shared.run_cycle() => {}
                }
            }
        }
    }
}

impl Shared {
    async fn run_cycle(&self) -> Arc<Snapshot> {
        let mut last_timestamp = self.cycle.lock().await;
        let started = Instant::now();
        let deadline = started + self.settings.collection_timeout;

        let now = SystemTime::now();
        let timestamp = match *last_timestamp {
            Some(previous) if previous > now => previous,
            _ => now,
        };

        let span = info_span!("orchestrator.tick", ts = super::snapshot::unix_millis(timestamp));
        let mut builder = SnapshotBuilder::new(timestamp);
        let mut tasks = JoinSet::new();
        for slot in &self.slots {
            if let Some(job) = slot.begin() {
                tasks.spawn_blocking(move || job.run());
            }
        }
        let spawned = tasks.len();

        let gathered = tokio::time::timeout_at(
            deadline,
            async {
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok(outcome) => merge(&mut builder, outcome),
                        Err(err) => warn!(%err, "collection task failed"),
                    }
                }
            }
            .instrument(span.clone()),
        )
        .await;

        if gathered.is_err() {
            // results that arrive from here on are dropped with their handles
            tasks.detach_all();
            let missing: Vec<&str> = self
                .slots
                .iter()
                .filter(|slot| slot.available && !builder.has_reported(slot.category))
                .map(|slot| slot.category.name())
                .collect();
            span.in_scope(|| {
                debug!(
                    ?missing,
                    timeout_ms = self.settings.collection_timeout.as_millis() as u64,
                    "collection timeout, publishing partial snapshot"
                );
            });
        }

        let snapshot = Arc::new(builder.finish());
        *last_timestamp = Some(timestamp);

        self.history.add(&snapshot);
        self.latest.store(Some(Arc::clone(&snapshot)));
        self.notify(&snapshot);

        span.in_scope(|| {
            debug!(
                tasks = spawned,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cycle published"
            );
        });
        snapshot
    }

    fn notify(&self, snapshot: &Arc<Snapshot>) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| match subscriber.tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(subscription = subscriber.id.0, "subscriber queue full, snapshot dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(subscription = subscriber.id.0, "subscriber gone, removing");
                false
            }
        });
    }
}

fn merge(builder: &mut SnapshotBuilder, outcome: CollectOutcome) {
    match outcome.reading {
        Ok(reading) if reading.category() == outcome.category => {
            if !builder.apply(reading) {
                debug!(category = %outcome.category, "category already reported this cycle, reading dropped");
            }
        }
        Ok(reading) => warn!(
            expected = %outcome.category,
            got = %reading.category(),
            "source returned a reading for another category, discarded"
        ),
        Err(panic) => warn!(
            category = %outcome.category,
            %panic,
            "source panicked, category keeps its default"
        ),
    }
}

impl SourceSlot {
    /// `None` when the source is unavailable or its previous call has not
    /// returned yet.
    fn begin(&self) -> Option<CollectJob> {
        if !self.available {
            return None;
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            warn!(category = %self.category, "source still busy from an earlier cycle, skipped");
            return None;
        }
        Some(CollectJob {
            category: self.category,
            source: Arc::clone(&self.source),
            _busy: BusyGuard(Arc::clone(&self.busy)),
        })
    }
}

impl CollectJob {
    fn run(self) -> CollectOutcome {
        let _span = tracing::debug_span!("source.collect", category = %self.category).entered();
        let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        let reading = panic::catch_unwind(AssertUnwindSafe(|| source.collect()))
            .map_err(|payload| panic_message(payload.as_ref()));
        CollectOutcome {
            category: self.category,
            reading,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::snapshot::{CpuMetrics, MemoryMetrics};

    struct Fixed(Reading);

    impl Source for Fixed {
        fn category(&self) -> Category {
            self.0.category()
        }

        fn collect(&mut self) -> Reading {
            self.0.clone()
        }
    }

    struct Liar;

    impl Source for Liar {
        fn category(&self) -> Category {
            Category::Memory
        }

        fn collect(&mut self) -> Reading {
            Reading::Cpu(CpuMetrics {
                usage_percent: 77.0,
                ..Default::default()
            })
        }
    }

    fn cpu(usage: f32) -> Box<dyn Source> {
        Box::new(Fixed(Reading::Cpu(CpuMetrics {
            usage_percent: usage,
            ..Default::default()
        })))
    }

    #[test]
    fn duplicate_categories_keep_first_source() {
        let orchestrator = Orchestrator::new(CollectionSettings::default(), vec![cpu(1.0), cpu(2.0)]);
        assert_eq!(orchestrator.active_categories(), vec![Category::Cpu]);
    }

    #[test]
    fn disabled_category_is_not_registered() {
        let mut settings = CollectionSettings::default();
        settings.sources.set(Category::Cpu, false);
        let orchestrator = Orchestrator::new(settings, vec![cpu(1.0)]);
        assert!(orchestrator.active_categories().is_empty());
    }

    #[test]
    fn start_outside_runtime_fails() {
        let orchestrator = Orchestrator::new(CollectionSettings::default(), vec![cpu(1.0)]);
        assert!(matches!(
            orchestrator.start(Duration::from_millis(100)),
            Err(VitalsError::NoRuntime)
        ));
        assert!(!orchestrator.is_running());
    }

    #[tokio::test]
    async fn mismatched_reading_is_discarded() {
        let orchestrator =
            Orchestrator::new(CollectionSettings::default(), vec![cpu(5.0), Box::new(Liar)]);
        let snapshot = orchestrator.collect_once().await;
        assert_eq!(snapshot.cpu.usage_percent, 5.0);
        assert_eq!(snapshot.memory, MemoryMetrics::default());
    }

    #[test]
    fn merge_keeps_first_reading_per_category() {
        let mut builder = SnapshotBuilder::new(SystemTime::UNIX_EPOCH);
        for usage in [10.0, 90.0] {
            merge(
                &mut builder,
                CollectOutcome {
                    category: Category::Cpu,
                    reading: Ok(Reading::Cpu(CpuMetrics {
                        usage_percent: usage,
                        ..Default::default()
                    })),
                },
            );
        }
        merge(
            &mut builder,
            CollectOutcome {
                category: Category::Memory,
                reading: Err("boom".to_string()),
            },
        );
        assert!(!builder.has_reported(Category::Memory));
        assert_eq!(builder.finish().cpu.usage_percent, 10.0);
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn busy_guard_releases_slot() {
        let orchestrator = Orchestrator::new(CollectionSettings::default(), vec![cpu(1.0)]);
        let slot = &orchestrator.shared.slots[0];
        let job = slot.begin().expect("idle slot must yield a job");
        assert!(slot.begin().is_none());
        let outcome = job.run();
        assert_eq!(outcome.category, Category::Cpu);
        assert!(slot.begin().is_some());
    }
}
