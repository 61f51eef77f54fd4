//! Stdio adapter — one JSON call per input line, one JSON reply per output line.
//!
//! Input: `{"service": "add_two_ints", "request": {"a": 3, "b": 4}}`.
//! `request` may be omitted (or `{}`/`null`) for argument-less services.
//! Output: the [`ReplyEnvelope`] for the call.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::process::bus::ServiceHandle;
use crate::process::wire::{ERR_BAD_REQUEST, ReplyEnvelope};
use crate::service::Request;

#[derive(Deserialize)]
struct StdioCall {
    service: String,
    #[serde(default)]
    request: Option<RequestBody>,
}

// Untagged: a pair of i64 operands, or an object with no fields at all.
// Anything else fails to decode and is answered with `bad_request`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestBody {
    TwoInts(TwoIntsBody),
    Empty(EmptyBody),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TwoIntsBody {
    a: i64,
    b: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyBody {}

impl From<Option<RequestBody>> for Request {
    fn from(body: Option<RequestBody>) -> Self {
        match body {
            Some(RequestBody::TwoInts(TwoIntsBody { a, b })) => Request::TwoInts { a, b },
            Some(RequestBody::Empty(EmptyBody {})) | None => Request::Empty,
        }
    }
}

/// Spawn the adapter on process stdin/stdout.
///
/// The adapter holds its own [`ServiceHandle`]; when stdin closes the handle
/// is dropped, which lets the run loop finish once no other handles remain.
pub fn start(handle: ServiceHandle, shutdown: CancellationToken) -> JoinHandle<()> {
    info!("stdio adapter: reading calls from stdin");
    tokio::spawn(async move {
        let reader = BufReader::new(tokio::io::stdin());
        if let Err(e) = serve_lines(&handle, reader, tokio::io::stdout(), shutdown).await {
            warn!("stdio adapter I/O error: {e}");
        }
    })
}

/// Serve calls from `reader` until EOF or `shutdown`, writing replies to `writer`.
pub async fn serve_lines<R, W>(
    handle: &ServiceHandle,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("stdio adapter shutting down");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdio adapter: stdin closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let reply = handle_line(handle, line).await;
                let mut out = serde_json::to_string(&reply)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
    }

    Ok(())
}

/// Decode one input line, submit it, and build the reply.
pub async fn handle_line(handle: &ServiceHandle, line: &str) -> ReplyEnvelope {
    let call: StdioCall = match serde_json::from_str(line) {
        Ok(call) => call,
        Err(e) => {
            debug!("stdio adapter: undecodable line: {e}");
            return ReplyEnvelope::error(ERR_BAD_REQUEST, format!("invalid call: {e}"));
        }
    };

    let result = handle.call(call.service.as_str(), call.request.into()).await;
    ReplyEnvelope::from_call(&call.service, result)
}
