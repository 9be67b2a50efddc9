//! Scan state machine and background sync.
//!
//! Per scan: try the live endpoint; on a transport failure queue the scan
//! and fall back to [`verify_offline`]. In the background the roster is
//! refreshed every `sync_interval` and queued scans are replayed every
//! `replay_interval` while the backend is reachable.

use crate::offline::verify_offline;
use crate::queue::PendingQueue;
use crate::roster::RosterCache;
use chrono::Utc;
use gymdesk_client::storage::KeyValueStore;
use gymdesk_client::ApiClient;
use gymdesk_core::error::{GymError, GymResult};
use gymdesk_core::{PendingScan, RosterSnapshot, ScanOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REPLAY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub kiosk_id: String,
    pub sync_interval: Duration,
    pub replay_interval: Duration,
}

impl ScannerConfig {
    pub fn new(kiosk_id: impl Into<String>) -> Self {
        Self {
            kiosk_id: kiosk_id.into(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            replay_interval: DEFAULT_REPLAY_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Result of one replay pass. `dropped` scans are gone for good.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub dropped: usize,
}

pub struct Scanner {
    client: ApiClient,
    roster: RosterCache,
    queue: PendingQueue,
    config: ScannerConfig,
    status: watch::Sender<Connectivity>,
}

impl Scanner {
    /// `store` holds the roster and the pending queue (persistent scope).
    pub fn new(client: ApiClient, store: Arc<dyn KeyValueStore>, config: ScannerConfig) -> Self {
        let (status, _) = watch::channel(Connectivity::Online);
        Self {
            client,
            roster: RosterCache::new(store.clone()),
            queue: PendingQueue::new(store),
            config,
            status,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn roster(&self) -> &RosterCache {
        &self.roster
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    pub fn is_online(&self) -> bool {
        *self.status.borrow() == Connectivity::Online
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Connectivity> {
        self.status.subscribe()
    }

    /// One scan attempt with offline fallback.
    pub async fn scan(&self, token: &str) -> GymResult<ScanOutcome> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GymError::InvalidInput("empty QR token".into()));
        }

        match self.client.scan(token, &self.config.kiosk_id).await {
            Ok(resp) => {
                self.set_status(Connectivity::Online);
                let outcome = ScanOutcome::online(resp, Utc::now());
                tracing::info!(
                    kiosk_id = %self.config.kiosk_id,
                    decision = outcome.decision.as_str(),
                    "scan"
                );
                Ok(outcome)
            }
            Err(e) if e.is_network() => {
                tracing::warn!(error = %e, "scan endpoint unreachable, verifying offline");
                self.set_status(Connectivity::Offline);

                let pending = PendingScan {
                    token: token.to_string(),
                    kiosk_id: self.config.kiosk_id.clone(),
                };
                match self.queue.push(pending) {
                    Ok(queued) => tracing::debug!(queued, "scan queued for replay"),
                    Err(e) => tracing::warn!(error = %e, "could not queue scan for replay"),
                }

                let roster = self.roster.load().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "cached roster unreadable, treating as empty");
                    RosterSnapshot::default()
                });
                Ok(verify_offline(token, &roster, Utc::now()))
            }
            Err(e) => Err(e),
        }
    }

    /// Pulls the roster into the cache. Returns the member count.
    pub async fn sync_roster(&self) -> GymResult<usize> {
        match self.client.offline_roster().await {
            Ok(snapshot) => {
                self.roster.save(&snapshot, Utc::now())?;
                self.set_status(Connectivity::Online);
                tracing::info!(members = snapshot.len(), "roster synced");
                Ok(snapshot.len())
            }
            Err(e) => {
                tracing::warn!(error = %e, "roster sync failed");
                self.set_status(Connectivity::Offline);
                Err(e)
            }
        }
    }

    /// Resubmits every queued scan once.
    ///
    /// The queue is emptied before resubmitting; scans that fail here are
    /// not re-queued.
    pub async fn replay_pending(&self) -> GymResult<ReplaySummary> {
        let pending = self.queue.take_all()?;
        let mut summary = ReplaySummary {
            attempted: pending.len(),
            ..ReplaySummary::default()
        };
        if pending.is_empty() {
            return Ok(summary);
        }

        for scan in &pending {
            match self.client.scan(&scan.token, &scan.kiosk_id).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    tracing::warn!(error = %e, kiosk_id = %scan.kiosk_id, "replayed scan dropped");
                    summary.dropped += 1;
                }
            }
        }

        if summary.succeeded > 0 {
            self.set_status(Connectivity::Online);
        }
        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            dropped = summary.dropped,
            "replay done"
        );
        Ok(summary)
    }

    /// Background loop: sync now and every `sync_interval`, replay after
    /// each successful sync and every `replay_interval` while online.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut sync_tick = tokio::time::interval(self.config.sync_interval);
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut replay_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.replay_interval,
            self.config.replay_interval,
        );
        replay_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        tracing::info!(
            kiosk_id = %self.config.kiosk_id,
            sync_secs = self.config.sync_interval.as_secs(),
            replay_secs = self.config.replay_interval.as_secs(),
            "kiosk sync loop started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sync_tick.tick() => {
                    if self.sync_roster().await.is_ok() {
                        self.replay_if_queued().await;
                    }
                }
                _ = replay_tick.tick() => {
                    if self.is_online() {
                        self.replay_if_queued().await;
                    }
                }
            }
        }

        tracing::info!("kiosk sync loop stopped");
    }

    async fn replay_if_queued(&self) {
        if self.queue.is_empty() {
            return;
        }
        if let Err(e) = self.replay_pending().await {
            tracing::warn!(error = %e, "replay failed");
        }
    }

    fn set_status(&self, next: Connectivity) {
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::info!(status = ?next, "connectivity changed");
            *current = next;
            true
        });
    }
}
