//! Cached member roster for offline verification.

use chrono::{DateTime, Duration, Utc};
use gymdesk_client::storage::{keys, KeyValueStore, KeyValueStoreExt};
use gymdesk_core::error::GymResult;
use gymdesk_core::{MemberDetails, MemberId, RosterSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Roster persisted under `offline_active_members` / `offline_member_details`.
///
/// Staleness is tracked from the last successful [`save`](Self::save)
/// in this process; a roster inherited from a previous run has no sync
/// time until the next sync.
pub struct RosterCache {
    store: Arc<dyn KeyValueStore>,
    last_synced: RwLock<Option<DateTime<Utc>>>,
}

impl RosterCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            last_synced: RwLock::new(None),
        }
    }

    pub fn save(&self, snapshot: &RosterSnapshot, synced_at: DateTime<Utc>) -> GymResult<()> {
        self.store
            .set_json(keys::OFFLINE_ACTIVE_MEMBERS, &snapshot.active_members)?;
        self.store
            .set_json(keys::OFFLINE_MEMBER_DETAILS, &snapshot.details)?;
        if let Ok(mut last) = self.last_synced.write() {
            *last = Some(synced_at);
        }
        tracing::debug!(members = snapshot.len(), "roster cached");
        Ok(())
    }

    /// The cached roster; empty if nothing was ever synced.
    pub fn load(&self) -> GymResult<RosterSnapshot> {
        let active_members: Vec<MemberId> = self
            .store
            .get_json(keys::OFFLINE_ACTIVE_MEMBERS)?
            .unwrap_or_default();
        let details: HashMap<MemberId, MemberDetails> = self
            .store
            .get_json(keys::OFFLINE_MEMBER_DETAILS)?
            .unwrap_or_default();
        Ok(RosterSnapshot {
            active_members,
            details,
        })
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.last_synced.read().ok().and_then(|l| *l)
    }

    pub fn staleness(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_synced().map(|at| now - at)
    }
}
