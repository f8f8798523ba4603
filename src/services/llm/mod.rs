pub mod accumulator;
pub mod openai;
pub mod partial_json;
pub mod provider;

pub use accumulator::{merge_monotonic, snapshot_stream, PartialAccumulator};
pub use openai::OpenAiProvider;
pub use provider::{GenerationError, GenerationProvider, GenerationRequest, PartialObjectStream};

use serde_json::Value;

/// JSON schema for a generated output type.
pub fn output_schema<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

/// Split canned output into small text deltas, the way a provider streams it.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}
