//! One connection: read a frame, answer it, repeat until the peer leaves.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::logutil::{escape_log, request_summary};
use crate::metrics;
use crate::protocol::codec::{self, FramingError, MAX_PAYLOAD};
use crate::protocol::response::Response;
use crate::server::dispatch::{CommandProcessor, SessionContext};

pub struct Session<S> {
    stream: S,
    ctx: SessionContext,
    processor: Arc<CommandProcessor>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, ctx: SessionContext, processor: Arc<CommandProcessor>) -> Self {
        Self { stream, ctx, processor }
    }

    /// Serve requests until end-of-stream or a transport failure. Names this
    /// connection put online are released either way.
    pub async fn run(mut self) -> Result<(), FramingError> {
        let result = self.serve().await;
        let released = self.processor.registry().close_session(self.ctx.id);
        if !released.is_empty() {
            info!(
                "[{}] offline: {}",
                self.ctx.peer,
                released.iter().map(|n| escape_log(n)).collect::<Vec<_>>().join(", ")
            );
        }
        result
    }

    async fn serve(&mut self) -> Result<(), FramingError> {
        loop {
            let request: Value = match codec::read_message(&mut self.stream).await {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(()),
                Err(e) => {
                    metrics::inc_framing_errors();
                    warn!("[{}] dropping connection: {}", self.ctx.peer, e);
                    return Err(e);
                }
            };
            debug!("[{}] <- {}", self.ctx.peer, request_summary(&request));

            let response = self.processor.process(&mut self.ctx, request).await;
            let frame = match codec::encode(&response) {
                Ok(frame) => frame,
                Err(FramingError::Oversize(len)) => {
                    metrics::inc_oversize_responses();
                    // The command may already be saved, so keep its outcome
                    match response.shrink_to_fit(MAX_PAYLOAD) {
                        Some(trimmed) => {
                            warn!("[{}] response of {} bytes trimmed to fit a frame", self.ctx.peer, len);
                            codec::encode(&trimmed)?
                        }
                        None => {
                            warn!("[{}] response of {} bytes does not fit a frame", self.ctx.peer, len);
                            codec::encode(&Response::error("Response too large"))?
                        }
                    }
                }
                Err(e) => return Err(e),
            };
            self.stream.write_all(&frame).await?;
            self.stream.flush().await?;
        }
    }
}
