//! Periodic contact-status viewing and reacting.
//!
//! Each tick fetches the current status list for the bot's own identity,
//! takes at most the configured limit in input order, marks each read and
//! optionally reacts with a random emoji from the pool. Outbound actions are
//! paced 1 second apart within a tick. Status ids already handled by this
//! watcher are skipped, so reactions stay idempotent across ticks.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pick_random;
use super::task::TaskHandle;
use super::traits::{StatusUpdate, WaClient};
use crate::config::Config;

/// Gap between consecutive per-status side effects within one tick.
const ITEM_GAP: Duration = Duration::from_secs(1);

/// Processed-status ids remembered for dedup before the oldest are evicted.
const SEEN_CAP: usize = 1024;

/// Status watcher settings, snapshotted from [`Config`].
#[derive(Debug, Clone)]
pub struct StatusWatcher {
    interval: Duration,
    limit: usize,
    auto_react: bool,
    emojis: Arc<Vec<String>>,
}

impl StatusWatcher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.status_view_interval,
            limit: config.status_view_limit,
            auto_react: config.auto_status_react,
            emojis: Arc::new(config.status_react_emojis.clone()),
        }
    }

    /// Spawn the watcher task against `client`. The first pass happens
    /// immediately, then one per interval. The caller owns the handle.
    pub fn start<C: WaClient>(&self, client: C) -> TaskHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        let interval = self.interval;
        let limit = self.limit;
        let auto_react = self.auto_react;
        let emojis = Arc::clone(&self.emojis);

        let join = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut seen = SeenSet::new(SEEN_CAP);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("status watcher started");

            loop {
                tokio::select! {
                    // cancellation wins over a simultaneously-ready tick
                    biased;
                    _ = child.cancelled() => {
                        info!("status watcher stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        run_tick(&client, limit, auto_react, &emojis, &mut seen, &mut rng).await;
                    }
                }
            }
        });

        TaskHandle::new(token, join)
    }
}

async fn run_tick<C: WaClient>(
    client: &C,
    limit: usize,
    auto_react: bool,
    emojis: &[String],
    seen: &mut SeenSet,
    rng: &mut StdRng,
) {
    let own_jid = client.self_jid().clone();
    let updates = match client.fetch_status_updates(&own_jid).await {
        Ok(updates) => updates,
        Err(e) => {
            warn!(error = %e, "status fetch failed");
            return;
        }
    };

    if updates.is_empty() {
        debug!("no new status updates");
        return;
    }

    let take = updates.len().min(limit);
    debug!(found = updates.len(), processing = take, "processing status updates");

    for status in updates.into_iter().take(take) {
        if seen.contains(&status.key.id) {
            continue;
        }
        if !process_status(client, &status, auto_react, emojis, rng).await {
            // read-mark failed: leave the id unseen so the next tick retries
            return;
        }
        seen.insert(status.key.id.clone());

        tokio::time::sleep(ITEM_GAP).await;
    }
}

/// Mark one status read and optionally react. Returns false when the
/// read-mark failed and the rest of the tick should be abandoned.
async fn process_status<C: WaClient>(
    client: &C,
    status: &StatusUpdate,
    auto_react: bool,
    emojis: &[String],
    rng: &mut StdRng,
) -> bool {
    if let Err(e) = client.read_messages(std::slice::from_ref(&status.key)).await {
        warn!(error = %e, id = %status.key.id, "failed to mark status read");
        return false;
    }

    if auto_react {
        if let Some(emoji) = pick_random(emojis, rng) {
            match client.send_reaction(&status.key, emoji).await {
                Ok(()) => info!(%emoji, id = %status.key.id, "reacted to status"),
                Err(e) => warn!(error = %e, id = %status.key.id, "failed to react to status"),
            }
        }
    }

    true
}

/// Insertion-ordered set with a capacity bound; oldest ids are evicted first.
struct SeenSet {
    ids: HashSet<String>,
    order: VecDeque<String>,
    cap: usize,
}

impl SeenSet {
    fn new(cap: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}
