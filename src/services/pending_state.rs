use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::models::destination::DestinationSummary;
use crate::models::trip_input::TripInput;
use crate::services::ttl_cache::{Clock, TtlCache};

/// What an anonymous visitor had on screen when they were sent to sign in,
/// so the page can pick up where it left off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingState {
    pub trip_input: TripInput,
    #[serde(default)]
    pub partial_results: Vec<DestinationSummary>,
    /// Destination the visitor tried to favorite before signing in.
    #[serde(default)]
    pub pending_favorite: Option<String>,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

pub struct PendingStateStore {
    entries: TtlCache<String, PendingState>,
}

impl PendingStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: TtlCache::new(ttl),
        }
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn save(&self, session_id: &str, mut state: PendingState) {
        state.saved_at = Utc::now();
        self.entries.insert(session_id.to_string(), state);
    }

    /// Saved state, or `None` once it is older than the TTL.
    pub fn load(&self, session_id: &str) -> Option<PendingState> {
        self.entries.get(&session_id.to_string())
    }

    pub fn clear(&self, session_id: &str) {
        self.entries.remove(&session_id.to_string());
    }
}
