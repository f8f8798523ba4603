use actix_web::{web, HttpResponse};
use async_stream::stream;
use futures::{Stream, StreamExt};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{public_coalesce_message, public_generation_message, ApiError};
use crate::models::destination::DestinationKey;
use crate::models::trip_input::TripInput;
use crate::routes::stream::{ndjson_response, StreamFrame};
use crate::services::coalescer::Attach;
use crate::services::currency::{format_price, CurrencyCode};
use crate::services::detail_cache::{DestinationView, DetailAttach, DetailResult, ProgressReceiver};
use crate::services::llm::GenerationError;
use crate::services::results::{map_markers, sort_destinations, SortOption};
use crate::services::search_session::{SearchSession, SearchTicket};
use crate::services::summary_generator::{self, SummaryGenerator};
use crate::state::AppState;

const FRAME_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub trip_input: TripInput,
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub sort: Option<String>,
    pub selected: Option<String>,
    pub country: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DestinationQuery {
    pub country: Option<String>,
}

/*
    /api/search
*/
pub async fn start_search(
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    let SearchRequest {
        session_id,
        trip_input,
    } = body.into_inner();
    let trip = trip_input.validate()?;
    require_generation(&state)?;

    let session = state.sessions.get_or_create(session_id.as_deref());
    let ticket = session.start_search(trip);
    info!("Streaming summaries for session {}", session.id);

    let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
    let task = tokio::spawn(stream_summaries(
        state.summaries.clone(),
        Arc::clone(&session),
        ticket.clone(),
        tx,
    ));
    session.attach_summary_task(ticket.epoch, task.abort_handle());

    let first = StreamFrame::Session {
        session_id: session.id.clone(),
        epoch: ticket.epoch,
    };
    let frames = stream! {
        yield first;
        let mut finished = false;
        while let Some(frame) = rx.recv().await {
            finished = frame.is_terminal();
            yield frame;
        }
        if !finished && !session.is_current(ticket.epoch) {
            yield StreamFrame::Error {
                message: "This search was replaced by a newer one".to_string(),
            };
        }
    };

    Ok(ndjson_response(frames))
}

/// Drive one summary stream to completion. Snapshots are recorded on the
/// session even if the client has gone away.
async fn stream_summaries(
    generator: SummaryGenerator,
    session: Arc<SearchSession>,
    ticket: SearchTicket,
    tx: mpsc::Sender<StreamFrame>,
) {
    let mut snapshots = match generator.generate(&ticket.trip).await {
        Ok(stream) => stream,
        Err(e) => {
            report_failure(&session, &ticket, &tx, &e).await;
            return;
        }
    };

    let mut last: Option<Arc<Value>> = None;
    while let Some(item) = snapshots.next().await {
        match item {
            Ok(snapshot) => {
                if !session.record_snapshot(ticket.epoch, &snapshot) {
                    return;
                }
                let _ = tx
                    .send(StreamFrame::Partial {
                        data: snapshot.as_ref().clone(),
                    })
                    .await;
                last = Some(snapshot);
            }
            Err(e) => {
                report_failure(&session, &ticket, &tx, &e).await;
                return;
            }
        }
    }

    let outcome = last
        .ok_or_else(|| GenerationError::Schema("empty summary stream".to_string()))
        .and_then(|snapshot| summary_generator::finalize(&snapshot));

    match outcome {
        Ok(result) => {
            let frame = StreamFrame::complete(&result);
            if session.complete(ticket.epoch, result) {
                let _ = tx.send(frame).await;
            }
        }
        Err(e) => report_failure(&session, &ticket, &tx, &e).await,
    }
}

/// The session and the client only ever see the public message.
async fn report_failure(
    session: &SearchSession,
    ticket: &SearchTicket,
    tx: &mpsc::Sender<StreamFrame>,
    err: &GenerationError,
) {
    warn!("Summary generation for session {} failed: {}", session.id, err);
    let message = public_generation_message(err);
    if session.fail(ticket.epoch, &message) {
        let _ = tx.send(StreamFrame::Error { message }).await;
    }
}

/// Generation without credentials fails the request up front.
fn require_generation(state: &AppState) -> Result<(), ApiError> {
    if state.generation_configured {
        return Ok(());
    }
    Err(ApiError::Generation(GenerationError::Configuration(
        "OPENAI_API_KEY is not set".to_string(),
    )))
}

fn find_session(state: &AppState, session_id: &str) -> Result<Arc<SearchSession>, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| ApiError::not_found("Search session"))
}

fn resolve_key(session: &SearchSession, name: &str, country: Option<&str>) -> Option<DestinationKey> {
    match country {
        Some(country) if !country.trim().is_empty() => Some(DestinationKey::new(name, country)),
        _ => session.find_destination(name, None).map(|d| d.key()),
    }
}

fn session_currency(session: &SearchSession) -> CurrencyCode {
    session
        .trip()
        .map(|trip| trip.display_currency())
        .unwrap_or_default()
}

/*
    /api/search/{session_id}/results
*/
pub async fn results(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ResultsQuery>,
) -> Result<HttpResponse, ApiError> {
    let session = find_session(&state, &path)?;

    let sort: SortOption = query
        .sort
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;
    let currency = match query.currency.as_deref() {
        Some(code) => code.parse().map_err(ApiError::BadRequest)?,
        None => session_currency(&session),
    };

    let mut merged = session.merged_results();
    sort_destinations(&mut merged, sort);
    let merged: Vec<_> = merged
        .into_iter()
        .map(|m| m.with_display_currency(currency))
        .collect();

    let selected = query
        .selected
        .as_deref()
        .and_then(|name| resolve_key(&session, name, query.country.as_deref()));
    let markers = map_markers(&merged, selected.as_ref());
    let result = session.result();

    Ok(HttpResponse::Ok().json(json!({
        "sessionId": session.id,
        "status": session.status(),
        "sort": sort,
        "currency": currency,
        "summary": result.as_ref().map(|r| r.summary.clone()),
        "recommendedDestination": result.as_ref().and_then(|r| r.recommended_destination.clone()),
        "weatherComparison": result.as_ref().map(|r| r.weather_comparison.clone()).unwrap_or_default(),
        "destinations": merged,
        "markers": markers,
    })))
}

/*
    /api/search/{session_id}/destinations/{name}
*/
pub async fn destination(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<DestinationQuery>,
) -> Result<HttpResponse, ApiError> {
    let (session_id, name) = path.into_inner();
    let session = find_session(&state, &session_id)?;
    let key = resolve_key(&session, &name, query.country.as_deref())
        .ok_or_else(|| ApiError::not_found("Destination"))?;
    let view = session
        .destination_view(&key)
        .ok_or_else(|| ApiError::not_found("Destination"))?;
    let currency = session_currency(&session);

    let body = match view {
        DestinationView::Detail(detail) => json!({
            "status": "complete",
            "destination": detail.as_ref(),
            "displayTotalCost": detail.total_trip_cost.map(|eur| format_price(eur, currency)),
        }),
        DestinationView::Loading { summary, partial } => json!({
            "status": "loading",
            "destination": summary,
            "partial": partial.as_deref(),
        }),
        DestinationView::Summary(summary) => json!({
            "status": "summary",
            "destination": summary,
        }),
    };
    Ok(HttpResponse::Ok().json(body))
}

/*
    /api/search/{session_id}/destinations/{name}/detail
*/
pub async fn stream_detail(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<DestinationQuery>,
) -> Result<HttpResponse, ApiError> {
    require_generation(&state)?;
    let (session_id, name) = path.into_inner();
    let session = find_session(&state, &session_id)?;
    let epoch = session.epoch();
    if session.trip().is_none() {
        return Err(ApiError::Conflict(
            "No search has been started in this session".to_string(),
        ));
    }

    let summary = session.find_destination(&name, query.country.as_deref());
    let country = query
        .country
        .clone()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| summary.as_ref().map(|s| s.country.clone()))
        .ok_or_else(|| ApiError::not_found("Destination"))?;
    let name = summary.map(|s| s.name).unwrap_or(name);

    let key = DestinationKey::new(&name, &country);
    let attach = session
        .begin_detail(epoch, key.clone(), state.details.clone(), name, country)
        .ok_or_else(|| ApiError::Conflict("This search was replaced by a newer one".to_string()))?;
    let progress = session.details().progress(&key);

    Ok(ndjson_response(detail_frames(attach, progress)))
}

enum DetailStep {
    Progress,
    ProducerGone,
    Done(DetailResult),
}

/// Partial snapshots while the shared run is going, then exactly one
/// terminal frame. Dropping this stream does not stop the run.
fn detail_frames(
    attach: DetailAttach,
    progress: Option<ProgressReceiver>,
) -> impl Stream<Item = StreamFrame> {
    stream! {
        let mut waiting = match attach {
            Attach::Ready(detail) => {
                yield StreamFrame::complete(detail.as_ref());
                return;
            }
            Attach::Waiting(shared) => shared,
        };

        let outcome = match progress {
            None => (&mut waiting).await,
            Some(mut rx) => loop {
                let current = rx.borrow_and_update().clone();
                if let Some(snapshot) = current {
                    yield StreamFrame::Partial { data: snapshot.as_ref().clone() };
                }

                let step = tokio::select! {
                    outcome = &mut waiting => DetailStep::Done(outcome),
                    changed = rx.changed() => if changed.is_ok() {
                        DetailStep::Progress
                    } else {
                        DetailStep::ProducerGone
                    },
                };
                match step {
                    DetailStep::Progress => continue,
                    DetailStep::ProducerGone => break (&mut waiting).await,
                    DetailStep::Done(outcome) => break outcome,
                }
            },
        };

        match outcome {
            Ok(detail) => yield StreamFrame::complete(detail.as_ref()),
            Err(e) => yield StreamFrame::Error { message: public_coalesce_message(&e) },
        }
    }
}
