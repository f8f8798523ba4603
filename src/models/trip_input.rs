use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::currency::CurrencyCode;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TravelRange {
    ShortHaul,
    MediumHaul,
    LongHaul,
    DrivingDistance,
    Any,
}

impl TravelRange {
    pub fn describe(&self) -> &'static str {
        match self {
            TravelRange::ShortHaul => "short-haul (flights under 3 hours)",
            TravelRange::MediumHaul => "medium-haul (flights of 3 to 6 hours)",
            TravelRange::LongHaul => "long-haul (flights over 6 hours)",
            TravelRange::DrivingDistance => "within driving distance",
            TravelRange::Any => "any distance",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    Budget,
    Moderate,
    Comfort,
    Luxury,
}

impl BudgetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetLevel::Budget => "budget",
            BudgetLevel::Moderate => "moderate",
            BudgetLevel::Comfort => "comfort",
            BudgetLevel::Luxury => "luxury",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStyle {
    Relaxation,
    Adventure,
    Cultural,
    Romantic,
    RoadTrip,
    Mixed,
}

impl TripStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStyle::Relaxation => "relaxation",
            TripStyle::Adventure => "adventure",
            TripStyle::Cultural => "cultural",
            TripStyle::Romantic => "romantic",
            TripStyle::RoadTrip => "road_trip",
            TripStyle::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    pub min: u32,
    pub max: u32,
}

/// When the traveler wants to go. On the wire the two shapes are told apart
/// by the `flexible` boolean rather than a string tag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "RawDateSpec", into = "RawDateSpec")]
pub enum DateSpec {
    Flexible {
        description: Option<String>,
        duration_days: Option<DurationRange>,
    },
    Exact {
        start_date: String,
        end_date: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct RawDateSpec {
    flexible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_days: Option<DurationRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
}

impl TryFrom<RawDateSpec> for DateSpec {
    type Error = String;

    fn try_from(raw: RawDateSpec) -> Result<Self, Self::Error> {
        if raw.flexible {
            if raw.start_date.is_some() || raw.end_date.is_some() {
                return Err("flexible dates cannot carry startDate/endDate".to_string());
            }
            Ok(DateSpec::Flexible {
                description: raw.description,
                duration_days: raw.duration_days,
            })
        } else {
            match (raw.start_date, raw.end_date) {
                (Some(start_date), Some(end_date)) => Ok(DateSpec::Exact {
                    start_date,
                    end_date,
                }),
                _ => Err("exact dates require both startDate and endDate".to_string()),
            }
        }
    }
}

impl From<DateSpec> for RawDateSpec {
    fn from(spec: DateSpec) -> Self {
        match spec {
            DateSpec::Flexible {
                description,
                duration_days,
            } => RawDateSpec {
                flexible: true,
                description,
                duration_days,
                start_date: None,
                end_date: None,
            },
            DateSpec::Exact {
                start_date,
                end_date,
            } => RawDateSpec {
                flexible: false,
                description: None,
                duration_days: None,
                start_date: Some(start_date),
                end_date: Some(end_date),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationPreference {
    Open,
    Region { region: String },
    Compare { places: Vec<String> },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_range: Option<TravelRange>,
    pub dates: DateSpec,
    pub travelers: u32,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_preference: Option<String>,
    pub budget_level: BudgetLevel,
    pub trip_style: TripStyle,
    pub location_preference: LocationPreference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_point: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
}

impl TripInput {
    /// Road trips and driving-distance searches ask for a multi-stop route
    /// instead of a single destination.
    pub fn is_road_trip(&self) -> bool {
        self.trip_style == TripStyle::RoadTrip
            || self.travel_range == Some(TravelRange::DrivingDistance)
    }

    pub fn display_currency(&self) -> CurrencyCode {
        self.currency.unwrap_or_default()
    }

    /// Check the input and return a normalised copy: blank optional strings
    /// become `None` and interests are trimmed and de-duplicated.
    pub fn validate(self) -> Result<TripInput, ValidationError> {
        if self.travelers < 1 {
            return Err(ValidationError::new("travelers must be at least 1"));
        }

        match &self.dates {
            DateSpec::Exact {
                start_date,
                end_date,
            } => {
                let start = parse_date("startDate", start_date)?;
                let end = parse_date("endDate", end_date)?;
                if start > end {
                    return Err(ValidationError::new("startDate must not be after endDate"));
                }
            }
            DateSpec::Flexible {
                duration_days: Some(range),
                ..
            } => {
                if range.min < 1 || range.min > range.max {
                    return Err(ValidationError::new(
                        "durationDays must satisfy 1 <= min <= max",
                    ));
                }
            }
            DateSpec::Flexible { .. } => {}
        }

        let location_preference = match self.location_preference {
            LocationPreference::Open => LocationPreference::Open,
            LocationPreference::Region { region } => {
                let region = region.trim().to_string();
                if region.is_empty() {
                    return Err(ValidationError::new("region preference requires a region"));
                }
                LocationPreference::Region { region }
            }
            LocationPreference::Compare { places } => {
                let places = dedupe_tags(places);
                if places.is_empty() {
                    return Err(ValidationError::new(
                        "compare preference requires at least one place",
                    ));
                }
                LocationPreference::Compare { places }
            }
        };

        let dates = match self.dates {
            DateSpec::Flexible {
                description,
                duration_days,
            } => DateSpec::Flexible {
                description: non_blank(description),
                duration_days,
            },
            exact => exact,
        };

        Ok(TripInput {
            home_city: non_blank(self.home_city),
            travel_range: self.travel_range,
            dates,
            travelers: self.travelers,
            interests: dedupe_tags(self.interests),
            weather_preference: non_blank(self.weather_preference),
            budget_level: self.budget_level,
            trip_style: self.trip_style,
            location_preference,
            starting_point: non_blank(self.starting_point),
            notes: non_blank(self.notes),
            currency: self.currency,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::new(format!("{} must be a YYYY-MM-DD date", field)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop empties and keep the first occurrence of each tag
/// (case-insensitive), preserving order.
fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn london_trip() -> TripInput {
        serde_json::from_value(json!({
            "homeCity": "London",
            "dates": { "flexible": false, "startDate": "2026-04-10", "endDate": "2026-04-17" },
            "travelers": 2,
            "interests": ["Hiking"],
            "budgetLevel": "moderate",
            "tripStyle": "mixed",
            "locationPreference": { "type": "open" }
        }))
        .unwrap()
    }

    #[test]
    fn test_parses_exact_dates() {
        let trip = london_trip();
        assert_eq!(
            trip.dates,
            DateSpec::Exact {
                start_date: "2026-04-10".to_string(),
                end_date: "2026-04-17".to_string()
            }
        );
        assert!(trip.validate().is_ok());
    }

    #[test]
    fn test_flexible_dates_round_trip_through_wire_shape() {
        let spec: DateSpec = serde_json::from_value(json!({
            "flexible": true,
            "description": "sometime in May",
            "durationDays": { "min": 5, "max": 7 }
        }))
        .unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["flexible"], true);
        assert_eq!(value["durationDays"]["max"], 7);
        assert!(value.get("startDate").is_none());
    }

    #[test]
    fn test_exact_dates_require_both_ends() {
        let result: Result<DateSpec, _> =
            serde_json::from_value(json!({ "flexible": false, "startDate": "2026-04-10" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_road_trip() {
        let mut trip = london_trip();
        assert!(!trip.is_road_trip());

        trip.trip_style = TripStyle::RoadTrip;
        assert!(trip.is_road_trip());

        trip.trip_style = TripStyle::Cultural;
        trip.travel_range = Some(TravelRange::DrivingDistance);
        assert!(trip.is_road_trip());

        trip.travel_range = Some(TravelRange::LongHaul);
        assert!(!trip.is_road_trip());
    }

    #[test]
    fn test_is_road_trip_matches_definition_for_all_combinations() {
        let styles = [
            TripStyle::Relaxation,
            TripStyle::Adventure,
            TripStyle::Cultural,
            TripStyle::Romantic,
            TripStyle::RoadTrip,
            TripStyle::Mixed,
        ];
        let ranges = [
            None,
            Some(TravelRange::ShortHaul),
            Some(TravelRange::MediumHaul),
            Some(TravelRange::LongHaul),
            Some(TravelRange::DrivingDistance),
            Some(TravelRange::Any),
        ];
        for style in styles {
            for range in ranges {
                let mut trip = london_trip();
                trip.trip_style = style;
                trip.travel_range = range;
                assert_eq!(
                    trip.is_road_trip(),
                    style == TripStyle::RoadTrip || range == Some(TravelRange::DrivingDistance)
                );
            }
        }
    }

    #[test]
    fn test_validate_dedupes_interests_in_order() {
        let mut trip = london_trip();
        trip.interests = vec![
            "Hiking".to_string(),
            " food ".to_string(),
            "hiking".to_string(),
            "".to_string(),
            "Food".to_string(),
            "Museums".to_string(),
        ];
        let trip = trip.validate().unwrap();
        assert_eq!(trip.interests, vec!["Hiking", "food", "Museums"]);
    }

    #[test]
    fn test_validate_rejects_zero_travelers() {
        let mut trip = london_trip();
        trip.travelers = 0;
        assert!(trip.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_reversed_dates() {
        let mut trip = london_trip();
        trip.dates = DateSpec::Exact {
            start_date: "2026-04-17".to_string(),
            end_date: "2026-04-10".to_string(),
        };
        assert!(trip.validate().is_err());

        let mut trip = london_trip();
        trip.dates = DateSpec::Exact {
            start_date: "April 10".to_string(),
            end_date: "2026-04-10".to_string(),
        };
        assert!(trip.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_duration() {
        let mut trip = london_trip();
        trip.dates = DateSpec::Flexible {
            description: None,
            duration_days: Some(DurationRange { min: 9, max: 4 }),
        };
        assert!(trip.validate().is_err());
    }

    #[test]
    fn test_validate_blanks_become_none() {
        let mut trip = london_trip();
        trip.home_city = Some("   ".to_string());
        trip.notes = Some("".to_string());
        let trip = trip.validate().unwrap();
        assert!(trip.home_city.is_none());
        assert!(trip.notes.is_none());
    }

    #[test]
    fn test_location_preference_variants() {
        let region: LocationPreference =
            serde_json::from_value(json!({ "type": "region", "region": "Balkans" })).unwrap();
        assert_eq!(
            region,
            LocationPreference::Region {
                region: "Balkans".to_string()
            }
        );

        let mut trip = london_trip();
        trip.location_preference = LocationPreference::Compare { places: vec![] };
        assert!(trip.validate().is_err());
    }
}
