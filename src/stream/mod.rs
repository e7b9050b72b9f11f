//! Pure stream parsing: chunks to frames to events.
//!
//! [`FrameReassembler`] and [`decode_frame`] need no network and are driven
//! by [`event_stream`], which turns a transport chunk stream into a lazy
//! stream of [`StreamEvent`]s.

pub mod decode;
pub mod frame;

pub use decode::{decode_frame, unwrap_output_envelope};
pub use frame::FrameReassembler;

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::warn;

use crate::error::{DecodeWarning, FlowError};
use crate::transport::ChunkStream;
use crate::types::StreamEvent;

/// Lazy sequence of decoded events for one transport call.
pub type EventStream = BoxStream<'static, Result<StreamEvent, FlowError>>;

/// Receives decode warnings as they happen.
pub type WarningSink = Arc<dyn Fn(&DecodeWarning) + Send + Sync>;

/// Decode a chunk stream into events.
///
/// A transport error is yielded once and ends the stream. Malformed frames
/// are logged, reported to `warnings`, and skipped. Dropping the returned
/// stream drops the underlying connection.
pub fn event_stream(chunks: ChunkStream, warnings: Option<WarningSink>) -> EventStream {
    let stream = async_stream::stream! {
        let mut reassembler = FrameReassembler::new();
        let mut chunks = chunks;

        while let Some(chunk_result) = chunks.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for frame in reassembler.push_bytes(&chunk) {
                match decode_frame(&frame) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => {
                        tracing::debug!(kind = ?frame.event_kind, "Ignoring unknown event kind");
                    }
                    Err(warning) => {
                        warn!(%warning, "Skipping undecodable frame");
                        if let Some(sink) = &warnings {
                            sink(&warning);
                        }
                    }
                }
            }
        }

        reassembler.finish();
    };
    Box::pin(stream)
}
