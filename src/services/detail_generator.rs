use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::config::GenerationLimits;
use crate::models::destination::DestinationSuggestion;
use crate::models::trip_input::TripInput;
use crate::services::llm::{
    output_schema, GenerationError, GenerationProvider, GenerationRequest, PartialObjectStream,
};
use crate::services::prompt_builder;

/// Phase 2: one streamed call per (destination, trip) pair producing the
/// full plan. Output is not byte-stable across calls; callers should only
/// rely on its shape.
#[derive(Clone)]
pub struct DetailGenerator {
    provider: Arc<dyn GenerationProvider>,
    limits: GenerationLimits,
}

impl DetailGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>, limits: GenerationLimits) -> Self {
        Self { provider, limits }
    }

    pub fn max_tokens_for(&self, input: &TripInput) -> u32 {
        if input.is_road_trip() {
            self.limits.road_trip_detail_max_tokens
        } else {
            self.limits.detail_max_tokens
        }
    }

    pub async fn generate(
        &self,
        name: &str,
        country: &str,
        input: &TripInput,
    ) -> Result<PartialObjectStream, GenerationError> {
        let input = input.clone().validate()?;
        info!("Generating detail plan for {}, {}", name, country);

        self.provider
            .generate(GenerationRequest {
                system_prompt: prompt_builder::system_prompt(&input).to_string(),
                user_prompt: prompt_builder::detail_prompt(name, country, &input),
                schema_name: "destination_suggestion",
                schema: output_schema::<DestinationSuggestion>(),
                max_output_tokens: self.max_tokens_for(&input),
            })
            .await
    }

    /// Turn the terminal snapshot into a typed suggestion. The requested
    /// name and country fill in anything the model left out.
    pub fn finalize(
        snapshot: &Value,
        name: &str,
        country: &str,
    ) -> Result<DestinationSuggestion, GenerationError> {
        let mut suggestion: DestinationSuggestion = serde_json::from_value(snapshot.clone())
            .map_err(|e| GenerationError::Schema(e.to_string()))?;

        if suggestion.summary.name.trim().is_empty() {
            suggestion.summary.name = name.to_string();
        }
        if suggestion.summary.country.trim().is_empty() {
            suggestion.summary.country = country.to_string();
        }
        if suggestion.itinerary.is_empty() {
            return Err(GenerationError::Schema(
                "detail plan has no itinerary".to_string(),
            ));
        }
        suggestion.summary = suggestion.summary.normalize();
        suggestion.itinerary.sort_by_key(|d| d.day);
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finalize_fills_identity_and_orders_days() {
        let snapshot = json!({
            "matchScore": 90,
            "itinerary": [
                { "day": 2, "location": "Douro Valley" },
                { "day": 1, "location": "Ribeira" }
            ]
        });
        let suggestion = DetailGenerator::finalize(&snapshot, "Porto", "Portugal").unwrap();
        assert_eq!(suggestion.summary.name, "Porto");
        assert_eq!(suggestion.summary.country, "Portugal");
        assert_eq!(suggestion.itinerary[0].day, 1);
    }

    #[test]
    fn test_finalize_rejects_plan_without_days() {
        let result = DetailGenerator::finalize(&json!({ "name": "Porto" }), "Porto", "Portugal");
        assert!(matches!(result, Err(GenerationError::Schema(_))));
    }

    #[test]
    fn test_finalize_rejects_wrong_shape() {
        let result = DetailGenerator::finalize(&json!({ "itinerary": "none" }), "Porto", "Portugal");
        assert!(matches!(result, Err(GenerationError::Schema(_))));
    }
}
