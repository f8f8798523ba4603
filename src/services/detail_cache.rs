use futures::StreamExt;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::models::destination::{DestinationKey, DestinationSuggestion, DestinationSummary};
use crate::models::trip_input::TripInput;
use crate::services::coalescer::{Attach, CacheStatus, CoalesceError, Coalescer};
use crate::services::detail_generator::DetailGenerator;
use crate::services::llm::GenerationError;

pub type DetailResult = Result<Arc<DestinationSuggestion>, CoalesceError<GenerationError>>;
pub type DetailAttach = Attach<Arc<DestinationSuggestion>, GenerationError>;
pub type ProgressReceiver = watch::Receiver<Option<Arc<Value>>>;

/// What the UI should show for one destination right now.
#[derive(Debug, Clone)]
pub enum DestinationView {
    /// Full plan is ready.
    Detail(Arc<DestinationSuggestion>),
    /// Plan is being generated; show the summary card and any partial plan.
    Loading {
        summary: Option<DestinationSummary>,
        partial: Option<Arc<Value>>,
    },
    /// No plan requested yet.
    Summary(DestinationSummary),
}

/// Phase 2 results for one search session. Work for a destination runs at
/// most once per epoch, and every viewer attaches to the same run.
#[derive(Clone, Default)]
pub struct DetailCache {
    coalescer: Coalescer<DestinationKey, Arc<DestinationSuggestion>, GenerationError>,
    progress: Arc<Mutex<HashMap<DestinationKey, ProgressReceiver>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or join detail generation for `key`.
    pub fn begin(
        &self,
        key: DestinationKey,
        generator: DetailGenerator,
        name: String,
        country: String,
        trip: Arc<TripInput>,
    ) -> DetailAttach {
        let progress = Arc::clone(&self.progress);
        let task_key = key.clone();

        self.coalescer.begin(key, move || {
            let (tx, rx) = watch::channel(None);
            lock(&progress).insert(task_key.clone(), rx.clone());

            async move {
                let result = run_detail(&generator, &name, &country, &trip, &tx).await;

                let mut progress = lock(&progress);
                if progress
                    .get(&task_key)
                    .map_or(false, |current| current.same_channel(&rx))
                {
                    progress.remove(&task_key);
                }
                result
            }
        })
    }

    pub async fn request(
        &self,
        key: DestinationKey,
        generator: DetailGenerator,
        name: String,
        country: String,
        trip: Arc<TripInput>,
    ) -> DetailResult {
        match self.begin(key, generator, name, country, trip) {
            Attach::Ready(detail) => Ok(detail),
            Attach::Waiting(shared) => shared.await,
        }
    }

    /// Live snapshots of a run in progress.
    pub fn progress(&self, key: &DestinationKey) -> Option<ProgressReceiver> {
        lock(&self.progress).get(key).cloned()
    }

    pub fn get(&self, key: &DestinationKey) -> Option<Arc<DestinationSuggestion>> {
        self.coalescer.get(key)
    }

    pub fn status(&self, key: &DestinationKey) -> CacheStatus<Arc<DestinationSuggestion>> {
        self.coalescer.status(key)
    }

    /// Terminal detail, else the in-flight state, else the summary card.
    pub fn view(
        &self,
        key: &DestinationKey,
        summary: Option<&DestinationSummary>,
    ) -> Option<DestinationView> {
        match self.coalescer.status(key) {
            CacheStatus::Terminal(detail) => Some(DestinationView::Detail(detail)),
            CacheStatus::Pending => Some(DestinationView::Loading {
                summary: summary.cloned(),
                partial: self.progress(key).and_then(|rx| rx.borrow().clone()),
            }),
            CacheStatus::Absent => summary.cloned().map(DestinationView::Summary),
        }
    }

    pub fn invalidate_all(&self) {
        self.coalescer.invalidate_all();
        lock(&self.progress).clear();
    }
}

async fn run_detail(
    generator: &DetailGenerator,
    name: &str,
    country: &str,
    trip: &TripInput,
    progress: &watch::Sender<Option<Arc<Value>>>,
) -> Result<Arc<DestinationSuggestion>, GenerationError> {
    let mut stream = generator.generate(name, country, trip).await?;
    let mut last = None;

    while let Some(item) = stream.next().await {
        let snapshot = item.map_err(|e| {
            warn!("Detail generation for {}, {} failed: {}", name, country, e);
            e
        })?;
        progress.send_replace(Some(Arc::clone(&snapshot)));
        last = Some(snapshot);
    }

    let last = last.ok_or_else(|| {
        GenerationError::Schema("detail stream ended without output".to_string())
    })?;
    let suggestion = DetailGenerator::finalize(&last, name, country)?;
    info!(
        "Detail plan ready for {}, {} ({} days)",
        name,
        country,
        suggestion.itinerary.len()
    );
    Ok(Arc::new(suggestion))
}
