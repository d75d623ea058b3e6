//! Decoder for `data: <json>\n\n` framed progress streams.

use std::collections::VecDeque;

use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, warn};

use vflow_capabilities::{ByteStream, CapabilityResult};
use vflow_models::ClipProgressEvent;

const DATA_PREFIX: &str = "data: ";

/// Reassembles complete lines across chunk boundaries.
///
/// Only lines starting with `data: ` are dispatched. A line whose payload
/// fails to parse is dropped. Bytes after the last newline stay buffered
/// until more data arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ClipProgressEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// End of stream. An unterminated trailing frame is discarded.
    pub fn finish(&mut self) {
        if self.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
            debug!(bytes = self.buffer.len(), "Discarding unterminated frame at end of stream");
        }
        self.buffer.clear();
    }
}

fn parse_line(line: &[u8]) -> Option<ClipProgressEvent> {
    let text = String::from_utf8_lossy(line);
    let payload = text.trim_end_matches('\r').strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(payload = %payload, "Dropping malformed progress frame: {}", e);
            None
        }
    }
}

struct DecodeState {
    body: ByteStream,
    decoder: FrameDecoder,
    pending: VecDeque<ClipProgressEvent>,
    done: bool,
}

/// Turn a framed response body into a one-shot stream of events.
///
/// A transport error is yielded once and ends the stream.
pub fn decode_events(body: ByteStream) -> impl Stream<Item = CapabilityResult<ClipProgressEvent>> + Send {
    let state = DecodeState {
        body,
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use vflow_capabilities::CapabilityError;

    fn body(chunks: &[&str]) -> ByteStream {
        let chunks: Vec<CapabilityResult<Bytes>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[test]
    fn test_frame_split_mid_chunk() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder
            .push(br#"data: {"type":"progress","current":1,"total""#)
            .is_empty());

        let events = decoder.push(b":4,\"percentage\":25}\n\n");
        assert_eq!(
            events,
            vec![ClipProgressEvent::Progress {
                current: 1,
                total: 4,
                percentage: Some(25.0)
            }]
        );
    }

    #[test]
    fn test_several_frames_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(
            b"data: {\"type\":\"scene_complete\",\"current\":1,\"total\":2,\"sceneId\":7}\n\n\
              data: {\"type\":\"complete\",\"current\":2,\"total\":2}\n\n",
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "scene_complete");
        assert_eq!(events[1].event_type(), "complete");
    }

    #[test]
    fn test_non_data_and_malformed_lines_are_dropped() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(
            b": keep-alive\n\
              event: progress\n\
              data: {not json}\n\
              data: {\"type\":\"error\",\"error\":\"ffmpeg crashed\"}\r\n",
        );
        assert_eq!(
            events,
            vec![ClipProgressEvent::Error {
                message: Some("ffmpeg crashed".into())
            }]
        );
    }

    #[test]
    fn test_multibyte_text_split_across_chunks() {
        let frame = "data: {\"type\":\"error\",\"message\":\"caf\u{e9}\"}\n".as_bytes();
        let split = frame.len() - 4;
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&frame[..split]).is_empty());
        let events = decoder.push(&frame[split..]);
        assert_eq!(
            events,
            vec![ClipProgressEvent::Error {
                message: Some("caf\u{e9}".into())
            }]
        );
    }

    #[tokio::test]
    async fn test_unterminated_trailing_frame_is_discarded() {
        let events: Vec<_> = decode_events(body(&[
            "data: {\"type\":\"progress\",\"current\":1,\"total\":2}\n\n",
            "data: {\"type\":\"complete\",\"current\":2,\"total\":2}",
        ]))
        .collect()
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().event_type(), "progress");
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks: Vec<CapabilityResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"progress\",\"current\":1,\"total\":3}\n")),
            Err(CapabilityError::Stream("connection reset".into())),
            Ok(Bytes::from_static(b"data: {\"type\":\"complete\",\"current\":3,\"total\":3}\n")),
        ];
        let events: Vec<_> = decode_events(Box::pin(stream::iter(chunks))).collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(events[1].is_err());
    }
}
