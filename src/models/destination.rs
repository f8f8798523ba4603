use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of highlighted activities kept on a summary card.
pub const MAX_TOP_ACTIVITIES: usize = 4;

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherSnapshot {
    pub avg_temp_c: Option<f64>,
    pub sunshine_hours: Option<f64>,
    pub rainy_days: Option<f64>,
    pub description: Option<String>,
}

impl WeatherSnapshot {
    /// Sunshine hours minus rainy days; higher is better.
    pub fn score(&self) -> Option<f64> {
        match (self.sunshine_hours, self.rainy_days) {
            (Some(sun), Some(rain)) => Some(sun - rain),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrivingPace {
    Relaxed,
    Moderate,
    Intensive,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    DriveOnly,
    FlyAndDrive,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteStop {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub nights: Option<u32>,
    pub description: Option<String>,
}

/// Phase 1 card: one ranked candidate from the exploration pass.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DestinationSummary {
    pub name: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
    pub reasoning: String,
    /// 0-100, higher is a better fit.
    pub match_score: Option<f64>,
    /// Always EUR, whatever the display currency.
    pub estimated_daily_cost: Option<f64>,
    pub best_time_to_visit: Option<String>,
    pub top_activities: Vec<String>,
    pub weather: Option<WeatherSnapshot>,
    pub suggested_duration: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route_stops: Vec<RouteStop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driving_pace: Option<DrivingPace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_drive_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
}

impl DestinationSummary {
    pub fn key(&self) -> DestinationKey {
        DestinationKey::new(&self.name, &self.country)
    }

    /// Clamp model output into the documented ranges.
    pub fn normalize(mut self) -> Self {
        self.match_score = self.match_score.map(|s| s.clamp(0.0, 100.0));
        self.top_activities.truncate(MAX_TOP_ACTIVITIES);
        self
    }

    /// Lay `newer` over this summary. Fields `newer` leaves empty keep the
    /// value already known.
    pub fn overlay(self, newer: &DestinationSummary) -> Self {
        fn text(old: String, new: &str) -> String {
            if new.trim().is_empty() {
                old
            } else {
                new.to_string()
            }
        }
        fn list<T: Clone>(old: Vec<T>, new: &[T]) -> Vec<T> {
            if new.is_empty() {
                old
            } else {
                new.to_vec()
            }
        }

        Self {
            name: text(self.name, &newer.name),
            country: text(self.country, &newer.country),
            coordinates: newer.coordinates.or(self.coordinates),
            reasoning: text(self.reasoning, &newer.reasoning),
            match_score: newer.match_score.or(self.match_score),
            estimated_daily_cost: newer.estimated_daily_cost.or(self.estimated_daily_cost),
            best_time_to_visit: newer.best_time_to_visit.clone().or(self.best_time_to_visit),
            top_activities: list(self.top_activities, &newer.top_activities),
            weather: newer.weather.clone().or(self.weather),
            suggested_duration: newer.suggested_duration.clone().or(self.suggested_duration),
            route_stops: list(self.route_stops, &newer.route_stops),
            driving_pace: newer.driving_pace.or(self.driving_pace),
            total_drive_hours: newer.total_drive_hours.or(self.total_drive_hours),
            travel_mode: newer.travel_mode.or(self.travel_mode),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherComparison {
    pub destination: String,
    pub avg_temp_c: Option<f64>,
    pub sunshine_hours: Option<f64>,
    pub rainy_days: Option<f64>,
    pub summary: Option<String>,
}

/// Complete Phase 1 output.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorationSummaryResult {
    pub summary: String,
    pub destinations: Vec<DestinationSummary>,
    pub weather_comparison: Vec<WeatherComparison>,
    pub recommended_destination: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ItineraryDay {
    pub day: u32,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub highlights: Vec<String>,
    pub drive_time_hours: Option<f64>,
    pub drive_distance_km: Option<f64>,
    pub overnight_stay: Option<String>,
    pub meals: Vec<String>,
    pub tip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LocalInsight {
    pub category: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LocalEvent {
    pub name: String,
    pub date: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Phase 2 output: the summary fields plus a full plan. Costs are EUR.
#[derive(Debug, Serialize, Deserialize, JsonSchema, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DestinationSuggestion {
    #[serde(flatten)]
    pub summary: DestinationSummary,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub itinerary: Vec<ItineraryDay>,
    pub estimated_accommodation_cost: Option<f64>,
    pub estimated_flight_cost: Option<f64>,
    pub estimated_driving_cost: Option<f64>,
    pub total_trip_cost: Option<f64>,
    pub local_insights: Vec<LocalInsight>,
    pub local_events: Vec<LocalEvent>,
}

/// Identity of a destination inside one search session. Names alone are not
/// unique ("Santiago"), so the country is part of the key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    pub name: String,
    pub country: String,
}

impl DestinationKey {
    pub fn new(name: &str, country: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            country: country.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.country)
    }
}
