//! Server-sent event plumbing shared by the streaming providers.

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tracing::{debug, warn};

use crate::core::error::LlmError;

pub(crate) const DONE_SENTINEL: &str = "[DONE]";
pub(crate) const STREAM_TRUNCATED: &str = "stream ended before completion";

/// What a provider decided after looking at one `data:` payload.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseControl {
    Continue,
    Done,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Accumulates raw transport bytes and yields complete lines.
#[derive(Debug, Default)]
pub(crate) struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete, trimmed line. Lines that are not valid UTF-8 are
    /// dropped with a warning.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        loop {
            let newline_pos = memchr(b'\n', &self.buffer)?;
            let line = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(s) => Some(s.trim().to_string()),
                Err(e) => {
                    warn!(error = %e, "Invalid UTF-8 in stream");
                    None
                }
            };
            self.buffer.drain(..=newline_pos);
            if let Some(line) = line {
                return Some(line);
            }
        }
    }

    /// Whatever is left once the transport closed without a trailing newline.
    pub(crate) fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// Drive an SSE byte stream, handing each `data:` payload to `on_payload`
/// in transport order until it returns [`SseControl::Done`] or the stream
/// ends.
pub(crate) async fn drive_sse<S, B, E, F>(stream: S, mut on_payload: F) -> Result<(), LlmError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&str) -> Result<SseControl, LlmError>,
{
    futures_util::pin_mut!(stream);
    let mut lines = SseLineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LlmError::NetworkError(e.to_string()))?;
        lines.push(chunk.as_ref());

        while let Some(line) = lines.next_line() {
            if let Some(payload) = extract_data_payload(&line) {
                if on_payload(payload)? == SseControl::Done {
                    return Ok(());
                }
            }
        }
    }

    if let Some(line) = lines.take_remainder() {
        if let Some(payload) = extract_data_payload(&line) {
            on_payload(payload)?;
        }
    }

    debug!("SSE stream closed by transport");
    Ok(())
}

/// If a streamed payload carries an `error` object, turn it into an error.
pub(crate) fn stream_error(value: &serde_json::Value) -> Option<LlmError> {
    value.get("error")?;
    Some(LlmError::NetworkError(format_api_error(&value.to_string())))
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("detail")
                .or_else(|| value.get("message"))
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// One-line description of a vendor error body.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error: <empty>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API Error: {summary}");
            }
        }
        return format!("API Error: {json_value}");
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("API Error: {collapsed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(
        chunks: Vec<&'static str>,
    ) -> impl Stream<Item = Result<&'static [u8], std::io::Error>> {
        futures_util::stream::iter(chunks.into_iter().map(|c| Ok(c.as_bytes())))
    }

    #[tokio::test]
    async fn drive_sse_handles_spacing_variants_and_split_chunks() {
        let stream = byte_stream(vec![
            "data: {\"n\":1}\n",
            "data:{\"n\"",
            ":2}\n\n: keep-alive\n",
            "data: [DONE]\n",
            "data: {\"n\":3}\n",
        ]);

        let mut seen = Vec::new();
        drive_sse(stream, |payload| {
            if payload == DONE_SENTINEL {
                return Ok(SseControl::Done);
            }
            seen.push(payload.to_string());
            Ok(SseControl::Continue)
        })
        .await
        .expect("stream should succeed");

        assert_eq!(seen, vec!["{\"n\":1}", "{\"n\":2}"]);
    }

    #[tokio::test]
    async fn drive_sse_flushes_unterminated_final_line() {
        let stream = byte_stream(vec!["data: first\n", "data: last"]);
        let mut seen = Vec::new();
        drive_sse(stream, |payload| {
            seen.push(payload.to_string());
            Ok(SseControl::Continue)
        })
        .await
        .unwrap();
        assert_eq!(seen, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn drive_sse_propagates_payload_errors() {
        let stream = byte_stream(vec!["data: boom\n", "data: never\n"]);
        let mut calls = 0;
        let result = drive_sse(stream, |_| {
            calls += 1;
            Err(LlmError::InvalidResponse("boom".into()))
        })
        .await;
        assert_eq!(result, Err(LlmError::InvalidResponse("boom".into())));
        assert_eq!(calls, 1);
    }

    #[test]
    fn line_buffer_skips_invalid_utf8() {
        let mut lines = SseLineBuffer::default();
        lines.push(b"\xff\xfe\nok\n");
        assert_eq!(lines.next_line().as_deref(), Some("ok"));
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn stream_error_detects_error_objects() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"error":{"message":"internal server error"}}"#).unwrap();
        assert_eq!(
            stream_error(&value),
            Some(LlmError::NetworkError(
                "API Error: internal server error".to_string()
            ))
        );

        let fine: serde_json::Value = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(stream_error(&fine).is_none());
    }

    #[test]
    fn format_api_error_summarizes_json() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"invalid_request_error"}}"#;
        assert_eq!(format_api_error(raw), "API Error: model overloaded");

        let replicate = r#"{"detail":"Invalid version or not permitted","status":422}"#;
        assert_eq!(
            format_api_error(replicate),
            "API Error: Invalid version or not permitted"
        );
    }

    #[test]
    fn format_api_error_handles_unstructured_bodies() {
        assert_eq!(format_api_error(r#"{"status":"failed"}"#), r#"API Error: {"status":"failed"}"#);
        assert_eq!(format_api_error("  api\n failure "), "API Error: api failure");
        assert_eq!(format_api_error(""), "API Error: <empty>");
    }
}
