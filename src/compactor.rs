use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::session::SessionStore;

/// Background housekeeping: rewrites the WAL once enough appends pile up
/// and drops expired admin sessions.
pub async fn run_compactor(
    engine: Arc<Engine>,
    sessions: Arc<SessionStore>,
    threshold: u64,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        compact_once(&engine, threshold).await;
        let purged = sessions.purge_expired();
        if purged > 0 {
            debug!("purged {purged} expired sessions");
        }
    }
}

/// Returns true when a compaction ran.
pub async fn compact_once(engine: &Engine, threshold: u64) -> bool {
    let appends = engine.wal_appends_since_compact().await;
    if appends < threshold {
        return false;
    }
    match engine.compact_wal().await {
        Ok(()) => {
            info!("compacted WAL after {appends} appends");
            true
        }
        Err(e) => {
            warn!("WAL compaction failed: {e}");
            false
        }
    }
}
