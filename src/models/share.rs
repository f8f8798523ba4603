use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::destination::DestinationSummary;
use crate::models::trip_input::TripInput;

/// A read-only snapshot of a search anyone with the link can open.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedTrip {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub trip_input: TripInput,
    #[serde(default)]
    pub destinations: Vec<DestinationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_destination: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSharedTrip {
    pub trip_input: TripInput,
    #[serde(default)]
    pub destinations: Vec<DestinationSummary>,
    #[serde(default)]
    pub selected_destination: Option<serde_json::Value>,
}
