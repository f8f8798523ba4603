use actix_web::{web::Bytes, HttpResponse};
use futures::{Stream, StreamExt};
use log::error;
use serde::Serialize;
use serde_json::Value;

/// One line of an NDJSON progress stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    #[serde(rename_all = "camelCase")]
    Session { session_id: String, epoch: u64 },
    /// Latest snapshot; replaces any earlier one.
    Partial { data: Value },
    Complete { data: Value },
    Error { message: String },
}

impl StreamFrame {
    /// Terminal frame for a finished value. A value that fails to serialize
    /// ends the stream with an error instead.
    pub fn complete<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => StreamFrame::Complete { data },
            Err(e) => {
                error!("Failed to serialize stream result: {}", e);
                StreamFrame::Error {
                    message: "Failed to prepare the result. Please try again.".to_string(),
                }
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::Complete { .. } | StreamFrame::Error { .. })
    }
}

fn encode(frame: StreamFrame) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(&frame)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

pub fn ndjson_response<S>(frames: S) -> HttpResponse
where
    S: Stream<Item = StreamFrame> + 'static,
{
    HttpResponse::Ok()
        .content_type("application/x-ndjson")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(frames.map(encode))
}
