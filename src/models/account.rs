use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::trip_input::{BudgetLevel, TravelRange, TripInput};
use crate::services::currency::CurrencyCode;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub destination_name: String,
    pub country: String,
    /// Normalised `name|country`; one favorite per destination per user.
    #[serde(default)]
    pub destination_key: String,
    /// Snapshot of the summary or suggestion the user saved.
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_input: Option<TripInput>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub destination_name: String,
    pub country: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub trip_input: Option<TripInput>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub destination_name: String,
    pub country: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<WishlistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlist {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WishlistPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistItem {
    pub destination_name: String,
    pub country: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub note: Option<String>,
}

/// Search defaults remembered per user.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(rename = "_id", default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_level: Option<BudgetLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_range: Option<TravelRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
