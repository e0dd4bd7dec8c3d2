mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use availability::{generate_slots, merge_overlapping, normalize_blocks, within_blocks, SlotStep};
pub use error::EngineError;
pub use mutations::{NewService, ServicePatch, TransitionOutcome, DEFAULT_SERVICE_COLOR};
pub use store::InMemoryStore;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex, RwLock, RwLockReadGuard};
use tracing::error;

use crate::config::BookingPolicy;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedDayState = Arc<RwLock<DayState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { event, response } = cmd else {
            handle_non_append(&mut wal, cmd);
            continue;
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    // commit what we have before compaction or stats see the log
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }
        commit_batch(&mut wal, &mut batch);
        if let Some(other) = deferred {
            handle_non_append(&mut wal, other);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(ref e) = result {
        error!("WAL flush of {} events failed: {e}", batch.len());
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    let append_result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after a failed append so the partial batch cannot leak into
    // the next one; every caller in this batch is told it failed.
    let flush_result = wal.flush_sync();
    append_result.and(flush_result)
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { event, response } => {
            commit_batch(wal, &mut vec![(event, response)]);
        }
    }
}

/// The scheduling core. One instance per process, shared as `Arc<Engine>`.
pub struct Engine {
    pub(super) store: InMemoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    pub policy: BookingPolicy,
    /// Serializes read-modify-write of services and the weekly schedule.
    pub(super) catalog_lock: Mutex<()>,
    /// Held shared by every mutation, taken before any day lock; compaction
    /// takes it exclusively so its snapshot cannot miss an in-flight event.
    pub(super) write_gate: RwLock<()>,
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        policy: BookingPolicy,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: InMemoryStore::new(),
            wal_tx,
            notify,
            policy,
            catalog_lock: Mutex::new(()),
            write_gate: RwLock::new(()),
        };

        // Sole owner of every Arc during replay, so try_write never contends.
        // Blocking locks are not an option: this runs inside the runtime.
        for event in &events {
            match store::event_date(event) {
                Some(date) => {
                    let day = engine.store.day_or_create(date);
                    let Ok(mut guard) = day.try_write() else {
                        return Err(io::Error::other("replay: day state unexpectedly locked"));
                    };
                    engine.store.apply_day_event(&mut guard, event);
                }
                None => engine.store.apply_catalog_event(event),
            }
        }
        tracing::info!("replayed {} events from {}", events.len(), wal_path.display());

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// Shared permit to mutate. Must be acquired before any day lock.
    pub(super) async fn write_permit(&self) -> RwLockReadGuard<'_, ()> {
        self.write_gate.read().await
    }

    /// WAL-append + apply + notify for an appointment event. Caller holds a
    /// write permit and the day's write lock, so the check that preceded this
    /// call still holds.
    pub(super) async fn persist_and_apply(
        &self,
        day: &mut DayState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_day_event(day, event);
        self.notify.send(event);
        Ok(())
    }

    /// WAL-append + apply + notify for a service or schedule event. Caller
    /// holds a write permit and the catalog lock.
    pub(super) async fn persist_and_apply_catalog(&self, event: &Event) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        self.store.apply_catalog_event(event);
        self.notify.send(event);
        Ok(())
    }

    /// Locate an appointment's day and take its write lock.
    pub(super) async fn resolve_appointment_write(
        &self,
        id: &ulid::Ulid,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<DayState>, EngineError> {
        let date = self
            .store
            .date_of_appointment(id)
            .ok_or(EngineError::NotFound(*id))?;
        let day = self.store.get_day(&date).ok_or(EngineError::NotFound(*id))?;
        Ok(day.write_owned().await)
    }
}
