use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::models::destination::{DestinationKey, DestinationSummary, ExplorationSummaryResult};
use crate::models::trip_input::TripInput;
use crate::services::detail_cache::{DestinationView, DetailAttach, DetailCache};
use crate::services::detail_generator::DetailGenerator;
use crate::services::results::{merge_results, MergedDestination};
use crate::services::summary_generator::read_destinations;

/// Sessions untouched for this long are dropped.
const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Streaming,
    Complete,
    Failed { message: String },
}

/// Identifies one search within a session. Work tagged with an older epoch
/// is ignored when it reports back.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub epoch: u64,
    pub trip: Arc<TripInput>,
}

struct SessionState {
    epoch: u64,
    trip: Option<Arc<TripInput>>,
    destinations: Vec<DestinationSummary>,
    result: Option<ExplorationSummaryResult>,
    status: SearchStatus,
    summary_task: Option<AbortHandle>,
    last_active: Instant,
}

/// One visitor's planning session: the active search, its summaries and the
/// detail plans generated for them.
pub struct SearchSession {
    pub id: String,
    state: Mutex<SessionState>,
    details: DetailCache,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SearchSession {
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                epoch: 0,
                trip: None,
                destinations: Vec::new(),
                result: None,
                status: SearchStatus::Idle,
                summary_task: None,
                last_active: Instant::now(),
            }),
            details: DetailCache::new(),
        }
    }

    /// Begin a new search. Everything from the previous search is dropped:
    /// its summary stream is aborted and every detail plan, finished or
    /// not, is invalidated.
    pub fn start_search(&self, trip: TripInput) -> SearchTicket {
        let mut state = lock(&self.state);
        state.epoch += 1;
        if let Some(task) = state.summary_task.take() {
            task.abort();
        }
        let trip = Arc::new(trip);
        state.trip = Some(Arc::clone(&trip));
        state.destinations.clear();
        state.result = None;
        state.status = SearchStatus::Streaming;
        state.last_active = Instant::now();
        self.details.invalidate_all();

        info!("Session {} started search #{}", self.id, state.epoch);
        SearchTicket {
            epoch: state.epoch,
            trip,
        }
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        lock(&self.state).epoch == epoch
    }

    pub fn epoch(&self) -> u64 {
        lock(&self.state).epoch
    }

    /// Start or join the detail plan for `key` using the trip of search
    /// `epoch`. Returns `None` if that search has been replaced. The trip is
    /// read and the run registered under the session lock, so a newer search
    /// cannot slip in between.
    pub fn begin_detail(
        &self,
        epoch: u64,
        key: DestinationKey,
        generator: DetailGenerator,
        name: String,
        country: String,
    ) -> Option<DetailAttach> {
        let state = lock(&self.state);
        if state.epoch != epoch {
            return None;
        }
        let trip = state.trip.clone()?;
        Some(self.details.begin(key, generator, name, country, trip))
    }

    /// Remember the summary task so a newer search can abort it.
    pub fn attach_summary_task(&self, epoch: u64, task: AbortHandle) {
        let mut state = lock(&self.state);
        if state.epoch == epoch {
            state.summary_task = Some(task);
        } else {
            task.abort();
        }
    }

    /// Apply a summary snapshot. Returns false if the search was replaced.
    pub fn record_snapshot(&self, epoch: u64, snapshot: &Value) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != epoch {
            return false;
        }
        state.destinations = read_destinations(snapshot, &state.destinations);
        state.last_active = Instant::now();
        true
    }

    pub fn complete(&self, epoch: u64, result: ExplorationSummaryResult) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != epoch {
            return false;
        }
        state.destinations = result.destinations.clone();
        state.result = Some(result);
        state.status = SearchStatus::Complete;
        state.summary_task = None;
        true
    }

    pub fn fail(&self, epoch: u64, message: &str) -> bool {
        let mut state = lock(&self.state);
        if state.epoch != epoch {
            return false;
        }
        info!("Session {} search #{} marked failed", self.id, epoch);
        state.status = SearchStatus::Failed {
            message: message.to_string(),
        };
        state.summary_task = None;
        true
    }

    pub fn trip(&self) -> Option<Arc<TripInput>> {
        lock(&self.state).trip.clone()
    }

    pub fn status(&self) -> SearchStatus {
        lock(&self.state).status.clone()
    }

    pub fn destinations(&self) -> Vec<DestinationSummary> {
        lock(&self.state).destinations.clone()
    }

    pub fn result(&self) -> Option<ExplorationSummaryResult> {
        lock(&self.state).result.clone()
    }

    pub fn details(&self) -> &DetailCache {
        &self.details
    }

    /// Summary card by name, narrowed by country when one is given.
    pub fn find_destination(&self, name: &str, country: Option<&str>) -> Option<DestinationSummary> {
        let state = lock(&self.state);
        let wanted_name = name.trim().to_lowercase();
        let wanted_country = country.map(|c| c.trim().to_lowercase());
        state
            .destinations
            .iter()
            .find(|d| {
                let key = d.key();
                key.name == wanted_name
                    && wanted_country.as_ref().map_or(true, |c| &key.country == c)
            })
            .cloned()
    }

    pub fn destination_view(&self, key: &DestinationKey) -> Option<DestinationView> {
        let summary = lock(&self.state)
            .destinations
            .iter()
            .find(|d| &d.key() == key)
            .cloned();
        self.details.view(key, summary.as_ref())
    }

    /// Summaries with any detail state merged in, in generation order.
    pub fn merged_results(&self) -> Vec<MergedDestination> {
        let destinations = self.destinations();
        merge_results(&destinations, |key| self.details.status(key))
    }

    fn touch(&self) {
        lock(&self.state).last_active = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        lock(&self.state).last_active.elapsed()
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<SearchSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for `id`, or a new one. Unknown or missing ids get a
    /// fresh random id.
    pub fn get_or_create(&self, id: Option<&str>) -> Arc<SearchSession> {
        let mut sessions = lock(&self.sessions);
        sessions.retain(|_, s| s.idle_for() < SESSION_IDLE_LIMIT);

        if let Some(session) = id.and_then(|id| sessions.get(id)) {
            session.touch();
            return Arc::clone(session);
        }

        let id = id
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = Arc::new(SearchSession::new(id.clone()));
        sessions.insert(id, Arc::clone(&session));
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<SearchSession>> {
        let sessions = lock(&self.sessions);
        let session = sessions.get(id).cloned();
        if let Some(session) = &session {
            session.touch();
        }
        session
    }
}
