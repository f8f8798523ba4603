use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::models::destination::{DestinationKey, DestinationSuggestion, DestinationSummary};
use crate::services::coalescer::CacheStatus;
use crate::services::currency::{format_price, CurrencyCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Highest match score first.
    #[default]
    Match,
    /// Cheapest daily cost first.
    Cost,
    /// Best weather score first.
    Weather,
    /// Shortest suggested duration first.
    Duration,
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "match" | "" => Ok(SortOption::Match),
            "cost" => Ok(SortOption::Cost),
            "weather" => Ok(SortOption::Weather),
            "duration" => Ok(SortOption::Duration),
            other => Err(format!("Unknown sort option: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailStatus {
    Complete,
    Loading,
    None,
}

/// One row of the results list: the summary card with any finished detail
/// laid over it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDestination {
    #[serde(flatten)]
    pub summary: DestinationSummary,
    pub detail_status: DetailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<DestinationSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_daily_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_total_cost: Option<String>,
}

impl MergedDestination {
    pub fn from_summary(summary: DestinationSummary) -> Self {
        Self {
            summary,
            detail_status: DetailStatus::None,
            detail: None,
            display_daily_cost: None,
            display_total_cost: None,
        }
    }

    pub fn key(&self) -> DestinationKey {
        self.summary.key()
    }

    /// Formatted prices for the chosen currency. Stored amounts stay EUR.
    pub fn with_display_currency(mut self, currency: CurrencyCode) -> Self {
        self.display_daily_cost = self
            .summary
            .estimated_daily_cost
            .map(|eur| format_price(eur, currency));
        self.display_total_cost = self
            .detail
            .as_ref()
            .and_then(|d| d.total_trip_cost)
            .map(|eur| format_price(eur, currency));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Destination,
    ItineraryDay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub kind: MarkerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

/// Combine the session's summaries with whatever detail state each one has.
/// Order follows `summaries`.
pub fn merge_results<F>(summaries: &[DestinationSummary], detail_for: F) -> Vec<MergedDestination>
where
    F: Fn(&DestinationKey) -> CacheStatus<Arc<DestinationSuggestion>>,
{
    summaries
        .iter()
        .map(|summary| match detail_for(&summary.key()) {
            CacheStatus::Terminal(detail) => MergedDestination {
                summary: summary.clone().overlay(&detail.summary),
                detail_status: DetailStatus::Complete,
                detail: Some(detail.as_ref().clone()),
                display_daily_cost: None,
                display_total_cost: None,
            },
            CacheStatus::Pending => MergedDestination {
                detail_status: DetailStatus::Loading,
                ..MergedDestination::from_summary(summary.clone())
            },
            CacheStatus::Absent => MergedDestination::from_summary(summary.clone()),
        })
        .collect()
}

/// Stable sort; destinations missing the sort field go last.
pub fn sort_destinations(items: &mut [MergedDestination], sort: SortOption) {
    match sort {
        SortOption::Match => items.sort_by(|a, b| {
            descending_missing_last(a.summary.match_score, b.summary.match_score)
        }),
        SortOption::Cost => items.sort_by(|a, b| {
            ascending_missing_last(
                a.summary.estimated_daily_cost,
                b.summary.estimated_daily_cost,
            )
        }),
        SortOption::Weather => items.sort_by(|a, b| {
            descending_missing_last(weather_score(&a.summary), weather_score(&b.summary))
        }),
        SortOption::Duration => items.sort_by(|a, b| {
            ascending_missing_last(duration_days(&a.summary), duration_days(&b.summary))
        }),
    }
}

fn weather_score(summary: &DestinationSummary) -> Option<f64> {
    summary.weather.as_ref().and_then(|w| w.score())
}

fn duration_days(summary: &DestinationSummary) -> Option<f64> {
    summary
        .suggested_duration
        .as_deref()
        .and_then(parse_duration_days)
        .map(f64::from)
}

/// First integer in a free-text duration ("5-7 days" is 5).
pub fn parse_duration_days(text: &str) -> Option<u32> {
    static FIRST_NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = FIRST_NUMBER.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(text).and_then(|m| m.as_str().parse().ok())
}

fn ascending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn descending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Day markers for the selected destination when its plan is ready,
/// otherwise one marker per destination that has coordinates.
pub fn map_markers(
    merged: &[MergedDestination],
    selected: Option<&DestinationKey>,
) -> Vec<MapMarker> {
    let selected_detail = selected.and_then(|key| {
        merged
            .iter()
            .find(|m| &m.key() == key)
            .and_then(|m| m.detail.as_ref())
    });

    if let Some(detail) = selected_detail {
        let days: Vec<MapMarker> = detail
            .itinerary
            .iter()
            .filter_map(|day| {
                day.coordinates.map(|c| MapMarker {
                    name: day.location.clone(),
                    lat: c.lat,
                    lng: c.lng,
                    kind: MarkerKind::ItineraryDay,
                    day: Some(day.day),
                })
            })
            .collect();
        if !days.is_empty() {
            return days;
        }
    }

    merged
        .iter()
        .filter_map(|m| {
            m.summary.coordinates.map(|c| MapMarker {
                name: m.summary.name.clone(),
                lat: c.lat,
                lng: c.lng,
                kind: MarkerKind::Destination,
                day: None,
            })
        })
        .collect()
}
