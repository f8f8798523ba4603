use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::config::GenerationLimits;
use crate::models::destination::{DestinationSummary, ExplorationSummaryResult};
use crate::models::trip_input::TripInput;
use crate::services::llm::{
    output_schema, GenerationError, GenerationProvider, GenerationRequest, PartialObjectStream,
};
use crate::services::prompt_builder;

/// Phase 1: one streamed call producing the ranked list of candidates.
#[derive(Clone)]
pub struct SummaryGenerator {
    provider: Arc<dyn GenerationProvider>,
    limits: GenerationLimits,
}

impl SummaryGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>, limits: GenerationLimits) -> Self {
        Self { provider, limits }
    }

    pub fn max_tokens_for(&self, input: &TripInput) -> u32 {
        if input.is_road_trip() {
            self.limits.road_trip_summary_max_tokens
        } else {
            self.limits.summary_max_tokens
        }
    }

    /// Validate the input, then start the stream. Nothing reaches the
    /// provider if validation fails.
    pub async fn generate(&self, input: &TripInput) -> Result<PartialObjectStream, GenerationError> {
        let input = input.clone().validate()?;

        info!(
            "Generating destination summaries (road trip: {})",
            input.is_road_trip()
        );

        self.provider
            .generate(GenerationRequest {
                system_prompt: prompt_builder::system_prompt(&input).to_string(),
                user_prompt: prompt_builder::exploration_prompt(&input),
                schema_name: "exploration_summary",
                schema: output_schema::<ExplorationSummaryResult>(),
                max_output_tokens: self.max_tokens_for(&input),
            })
            .await
    }
}

/// Read the destinations visible in a Phase 1 snapshot.
///
/// Elements that do not deserialize yet (an enum value half-streamed, say)
/// keep their previous reading, and elements without a name are not shown,
/// so a card never disappears or reverts between snapshots.
pub fn read_destinations(
    snapshot: &Value,
    previous: &[DestinationSummary],
) -> Vec<DestinationSummary> {
    let Some(items) = snapshot.get("destinations").and_then(Value::as_array) else {
        return previous.to_vec();
    };

    let mut out = Vec::with_capacity(items.len().max(previous.len()));
    for (i, item) in items.iter().enumerate() {
        let parsed = serde_json::from_value::<DestinationSummary>(item.clone())
            .ok()
            .filter(|d| !d.name.trim().is_empty())
            .map(DestinationSummary::normalize);

        match (parsed, previous.get(i)) {
            (Some(summary), _) => out.push(summary),
            (None, Some(prior)) => out.push(prior.clone()),
            (None, None) => break,
        }
    }
    if out.len() < previous.len() {
        out.extend_from_slice(&previous[out.len()..]);
    }
    out
}

/// Parse the terminal Phase 1 snapshot.
pub fn finalize(snapshot: &Value) -> Result<ExplorationSummaryResult, GenerationError> {
    let mut result: ExplorationSummaryResult = serde_json::from_value(snapshot.clone())
        .map_err(|e| GenerationError::Schema(e.to_string()))?;
    result.destinations = result
        .destinations
        .into_iter()
        .filter(|d| !d.name.trim().is_empty())
        .map(DestinationSummary::normalize)
        .collect();
    if result.destinations.is_empty() {
        return Err(GenerationError::Schema(
            "no destinations in generated summary".to_string(),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip_input::tests::london_trip;
    use crate::models::trip_input::TripStyle;
    use crate::services::llm::{chunk_text, snapshot_stream};
    use async_trait::async_trait;
    use futures::{stream, StreamExt};
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingProvider {
        output: String,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationProvider for RecordingProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<PartialObjectStream, GenerationError> {
            self.requests.lock().unwrap().push(request);
            let deltas: Vec<Result<String, GenerationError>> =
                chunk_text(&self.output, 9).into_iter().map(Ok).collect();
            Ok(snapshot_stream(stream::iter(deltas)))
        }
    }

    fn provider() -> Arc<RecordingProvider> {
        Arc::new(RecordingProvider {
            output: json!({
                "summary": "Two strong hiking options",
                "destinations": [
                    { "name": "Picos de Europa", "country": "Spain", "matchScore": 92 },
                    { "name": "Dolomites", "country": "Italy", "matchScore": 88 }
                ],
                "weatherComparison": [],
                "recommendedDestination": "Picos de Europa"
            })
            .to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_generate_streams_and_finalizes() {
        let provider = provider();
        let generator = SummaryGenerator::new(provider.clone(), GenerationLimits::default());
        let snapshots: Vec<_> = generator
            .generate(&london_trip())
            .await
            .unwrap()
            .collect()
            .await;

        let last = snapshots.last().unwrap().as_ref().unwrap();
        let result = finalize(last).unwrap();
        assert_eq!(result.destinations.len(), 2);
        assert_eq!(
            result.recommended_destination.as_deref(),
            Some("Picos de Europa")
        );

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_output_tokens, 6000);
        assert!(requests[0].user_prompt.contains("Home city: London"));
    }

    #[tokio::test]
    async fn test_road_trip_uses_larger_budget() {
        let provider = provider();
        let generator = SummaryGenerator::new(provider.clone(), GenerationLimits::default());
        let mut trip = london_trip();
        trip.trip_style = TripStyle::RoadTrip;
        let _ = generator.generate(&trip).await.unwrap();
        assert_eq!(provider.requests.lock().unwrap()[0].max_output_tokens, 10000);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = provider();
        let generator = SummaryGenerator::new(provider.clone(), GenerationLimits::default());
        let mut trip = london_trip();
        trip.travelers = 0;
        let result = generator.generate(&trip).await;
        assert!(matches!(result, Err(GenerationError::Validation(_))));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_read_destinations_keeps_previous_reading() {
        let first = read_destinations(
            &json!({ "destinations": [{ "name": "Bled", "country": "Slovenia" }] }),
            &[],
        );
        assert_eq!(first.len(), 1);

        // half-streamed enum value does not deserialize yet
        let second = read_destinations(
            &json!({ "destinations": [
                { "name": "Bled", "country": "Slovenia", "travelMode": "drive_o" },
                { "name": "" }
            ] }),
            &first,
        );
        assert_eq!(second, first);

        let third = read_destinations(
            &json!({ "destinations": [
                { "name": "Bled", "country": "Slovenia", "travelMode": "drive_only" },
                { "name": "Piran" }
            ] }),
            &second,
        );
        assert_eq!(third.len(), 2);
        assert_eq!(third[1].name, "Piran");
    }

    #[test]
    fn test_finalize_requires_destinations() {
        assert!(matches!(
            finalize(&json!({ "summary": "nothing", "destinations": [] })),
            Err(GenerationError::Schema(_))
        ));
    }
}
