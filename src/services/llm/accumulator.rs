use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

use super::partial_json::parse_partial;
use super::provider::{GenerationError, PartialObjectStream};

/// Collects streamed text and turns it into monotonically growing snapshots.
#[derive(Default)]
pub struct PartialAccumulator {
    buffer: String,
    snapshot: Option<Arc<Value>>,
}

impl PartialAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Arc<Value>> {
        self.snapshot.clone()
    }

    /// Append a text delta. Returns the new snapshot when the visible
    /// object changed.
    pub fn push(&mut self, delta: &str) -> Option<Arc<Value>> {
        self.buffer.push_str(delta);
        let parsed = parse_partial(&self.buffer)?;
        self.apply(parsed)
    }

    /// Parse the whole buffer strictly. Returns the final snapshot if it
    /// differs from the last one emitted.
    pub fn finish(&mut self) -> Result<Option<Arc<Value>>, GenerationError> {
        let full: Value = serde_json::from_str(self.buffer.trim()).map_err(|e| {
            GenerationError::Schema(format!("incomplete or malformed output: {}", e))
        })?;
        Ok(self.apply(full))
    }

    fn apply(&mut self, incoming: Value) -> Option<Arc<Value>> {
        let merged = match &self.snapshot {
            Some(current) => merge_monotonic(current, incoming),
            None => incoming,
        };
        if self.snapshot.as_deref() == Some(&merged) {
            return None;
        }
        let snapshot = Arc::new(merged);
        self.snapshot = Some(snapshot.clone());
        Some(snapshot)
    }
}

/// Merge `incoming` over `current` without ever losing information:
/// keys are never removed, arrays never shrink, strings never get shorter
/// and `null` never replaces a value.
pub fn merge_monotonic(current: &Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                let next = match old.get(&key) {
                    Some(existing) => merge_monotonic(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (Value::Array(old), Value::Array(new)) => {
            let len = old.len().max(new.len());
            let mut new = new.into_iter();
            let mut merged = Vec::with_capacity(len);
            for i in 0..len {
                let next = match (old.get(i), new.next()) {
                    (Some(existing), Some(value)) => merge_monotonic(existing, value),
                    (Some(existing), None) => existing.clone(),
                    (None, Some(value)) => value,
                    (None, None) => break,
                };
                merged.push(next);
            }
            Value::Array(merged)
        }
        (existing, Value::Null) => existing.clone(),
        (Value::String(old), Value::String(new)) => {
            if new.len() >= old.len() {
                Value::String(new)
            } else {
                Value::String(old.clone())
            }
        }
        (existing @ (Value::Object(_) | Value::Array(_)), _) => existing.clone(),
        (_, incoming) => incoming,
    }
}

/// Turn a stream of text deltas into a [`PartialObjectStream`]. A failed
/// delta or a final document that does not parse ends the stream with a
/// single error.
pub fn snapshot_stream<S>(deltas: S) -> PartialObjectStream
where
    S: Stream<Item = Result<String, GenerationError>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut deltas = Box::pin(deltas);
        let mut accumulator = PartialAccumulator::new();
        let mut failed = false;

        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(text) => {
                    if let Some(snapshot) = accumulator.push(&text) {
                        yield Ok(snapshot);
                    }
                }
                Err(err) => {
                    failed = true;
                    yield Err(err);
                    break;
                }
            }
        }

        if !failed {
            match accumulator.finish() {
                Ok(Some(snapshot)) => yield Ok(snapshot),
                Ok(None) => {}
                Err(err) => yield Err(err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    /// True when every field and element of `before` still exists in `after`.
    fn is_monotonic(before: &Value, after: &Value) -> bool {
        match (before, after) {
            (Value::Object(a), Value::Object(b)) => a
                .iter()
                .all(|(k, v)| b.get(k).map_or(false, |w| is_monotonic(v, w))),
            (Value::Array(a), Value::Array(b)) => {
                a.len() <= b.len() && a.iter().zip(b).all(|(v, w)| is_monotonic(v, w))
            }
            (Value::String(a), Value::String(b)) => b.len() >= a.len(),
            (Value::Null, _) => true,
            (_, Value::Null) => false,
            _ => true,
        }
    }

    #[test]
    fn test_merge_keeps_fields_and_elements() {
        let current = json!({ "a": "long text", "list": [1, 2, 3], "keep": true });
        let incoming = json!({ "a": "long", "list": [1], "new": 5, "keep": null });
        let merged = merge_monotonic(&current, incoming);
        assert_eq!(
            merged,
            json!({ "a": "long text", "list": [1, 2, 3], "keep": true, "new": 5 })
        );
    }

    #[test]
    fn test_push_emits_growing_snapshots() {
        let doc = r#"{"summary": "Great picks", "destinations": [{"name": "Porto", "matchScore": 91}, {"name": "Seville", "matchScore": 84}]}"#;
        let mut accumulator = PartialAccumulator::new();
        let mut previous = json!({});
        let mut emitted = 0;

        for chunk in doc.as_bytes().chunks(7) {
            let text = std::str::from_utf8(chunk).unwrap();
            if let Some(snapshot) = accumulator.push(text) {
                assert!(is_monotonic(&previous, &snapshot));
                previous = (*snapshot).clone();
                emitted += 1;
            }
        }
        accumulator.finish().unwrap();

        assert!(emitted > 3);
        assert_eq!(
            *accumulator.snapshot().unwrap(),
            serde_json::from_str::<Value>(doc).unwrap()
        );
    }

    #[test]
    fn test_finish_rejects_truncated_output() {
        let mut accumulator = PartialAccumulator::new();
        accumulator.push(r#"{"summary": "cut off"#);
        assert!(matches!(
            accumulator.finish(),
            Err(GenerationError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_stream_ends_with_terminal_value() {
        let deltas = vec![
            Ok(r#"{"name": "Po"#.to_string()),
            Ok(r#"rto", "country": "Portugal"}"#.to_string()),
        ];
        let snapshots: Vec<_> = snapshot_stream(stream::iter(deltas)).collect().await;
        let last = snapshots.last().unwrap().as_ref().unwrap();
        assert_eq!(**last, json!({ "name": "Porto", "country": "Portugal" }));
        assert!(snapshots.iter().all(|s| s.is_ok()));
    }

    #[tokio::test]
    async fn test_snapshot_stream_propagates_single_error() {
        let deltas = vec![
            Ok(r#"{"name": "Po"#.to_string()),
            Err(GenerationError::Network("connection reset".to_string())),
            Ok(r#"rto"}"#.to_string()),
        ];
        let items: Vec<_> = snapshot_stream(stream::iter(deltas)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1],
            Err(GenerationError::Network("connection reset".to_string()))
        );
    }
}
