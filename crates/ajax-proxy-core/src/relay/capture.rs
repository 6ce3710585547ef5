//! Request body tee.
//!
//! The inbound body is streamed to the outbound exchange while every chunk
//! is retained, so a redirected exchange can be re-issued with the complete
//! original body. Retained chunks share storage with the ones sent outbound.

use axum::body::{Body, HttpBody};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::io;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Body attached to one outbound hop.
pub enum OutboundBody {
    /// Method carries no body (or the inbound body was empty).
    Empty,
    /// First hop: live inbound stream. `length` is set when the inbound size is exact.
    Stream { body: reqwest::Body, length: Option<u64> },
    /// Redirect hop: captured copy of the inbound body.
    Replay(Bytes),
}

enum CaptureState {
    Pending(JoinHandle<Vec<Bytes>>),
    Done(Option<Bytes>),
}

/// Handle to the copy of the inbound body being recorded by the tee.
pub struct BodyCapture {
    state: CaptureState,
}

impl BodyCapture {
    pub fn empty() -> Self {
        Self { state: CaptureState::Done(None) }
    }

    /// Wait until the inbound body has been fully read and return the copy.
    ///
    /// Returns `None` for bodiless requests. Chunks are concatenated in arrival order.
    pub async fn finish(&mut self) -> Option<Bytes> {
        if let CaptureState::Pending(_) = self.state {
            let pending = std::mem::replace(&mut self.state, CaptureState::Done(None));
            if let CaptureState::Pending(handle) = pending {
                let captured = match handle.await {
                    Ok(chunks) => concat(chunks),
                    Err(e) => {
                        tracing::warn!("Body capture task failed: {}", e);
                        None
                    },
                };
                self.state = CaptureState::Done(captured);
            }
        }

        match &self.state {
            CaptureState::Done(captured) => captured.clone(),
            CaptureState::Pending(_) => None,
        }
    }
}

/// Split the inbound body into an outbound stream and a capture handle.
///
/// Must be called inside a tokio runtime: the copy is driven by a spawned task
/// that keeps reading (and recording) even if the outbound side stops consuming.
pub fn tee(body: Body) -> (OutboundBody, BodyCapture) {
    if body.is_end_stream() {
        return (OutboundBody::Empty, BodyCapture::empty());
    }

    let length = body.size_hint().exact();
    let (tx, rx) = mpsc::unbounded_channel();
    let pump = tokio::spawn(pump(body, tx));

    let outbound = OutboundBody::Stream {
        body: reqwest::Body::wrap_stream(UnboundedReceiverStream::new(rx)),
        length,
    };
    (outbound, BodyCapture { state: CaptureState::Pending(pump) })
}

async fn pump(body: Body, tx: mpsc::UnboundedSender<Result<Bytes, io::Error>>) -> Vec<Bytes> {
    let mut captured = Vec::new();
    let mut chunks = body.into_data_stream();

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                captured.push(bytes.clone());
                // Receiver is gone once the upstream answered early; keep recording.
                let _ = tx.send(Ok(bytes));
            },
            Err(e) => {
                tracing::debug!("Inbound body stream failed: {}", e);
                let _ = tx.send(Err(io::Error::other(e)));
                break;
            },
        }
    }

    captured
}

/// Join retained chunks; a single chunk is returned without copying.
fn concat(mut chunks: Vec<Bytes>) -> Option<Bytes> {
    chunks.retain(|c| !c.is_empty());
    match chunks.len() {
        0 => None,
        1 => chunks.pop(),
        _ => {
            let total = chunks.iter().map(Bytes::len).sum();
            let mut joined = BytesMut::with_capacity(total);
            for chunk in &chunks {
                joined.extend_from_slice(chunk);
            }
            Some(joined.freeze())
        },
    }
}
