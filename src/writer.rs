//! Dedicated writer task for JSON-lines responses.
//!
//! A transport for line-oriented workers (see the `users` demo) and tests.
//! Behind an HTTP server the routing layer supplies its own [`JsonSink`].
//!
//! Handlers do not touch the underlying stream. A [`JsonWriterHandle`]
//! (a [`JsonSink`]) pushes response bodies into an mpsc channel, and one
//! writer task drains the channel and writes each body as a single line of
//! JSON to any `AsyncWrite`.
//!
//! # Architecture
//!
//! ```text
//! Handler 1 ─┐
//! Handler 2 ─┼─► mpsc::Sender<Value> ─► Writer Task ─► stream (one JSON per line)
//! Handler N ─┘
//! ```

use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{DispatchError, Result};
use crate::handler::JsonSink;
use crate::interceptor::BoxFuture;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum bodies written before a flush.
const MAX_BATCH_SIZE: usize = 64;

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct JsonWriterConfig {
    /// Channel capacity for the body queue.
    pub channel_capacity: usize,
}

impl Default for JsonWriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Handle for sending bodies to the writer task.
///
/// This is cheaply cloneable and can be shared across handlers.
#[derive(Debug, Clone)]
pub struct JsonWriterHandle {
    tx: mpsc::Sender<Value>,
}

impl JsonWriterHandle {
    /// Queue a body, waiting for channel capacity.
    pub async fn send(&self, body: Value) -> Result<()> {
        self.tx
            .send(body)
            .await
            .map_err(|_| DispatchError::SinkClosed)
    }

    /// Queue a body without waiting.
    pub fn try_send(&self, body: Value) -> Result<()> {
        self.tx.try_send(body).map_err(|_| DispatchError::SinkClosed)
    }
}

impl JsonSink for JsonWriterHandle {
    fn send_json(&self, body: Value) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.send(body))
    }
}

/// Spawn the writer task and return a handle for sending bodies.
///
/// The task ends cleanly once every handle is dropped.
pub fn spawn_json_writer<W>(
    writer: W,
    config: JsonWriterConfig,
) -> (JsonWriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (JsonWriterHandle { tx }, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_json_writer_default<W>(writer: W) -> (JsonWriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_json_writer(writer, JsonWriterConfig::default())
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<Value>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(4096);

    loop {
        let first = match rx.recv().await {
            Some(v) => v,
            // Channel closed, clean shutdown
            None => return Ok(()),
        };

        buf.clear();
        encode_line(&mut buf, &first)?;

        let mut batched = 1;
        while batched < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(body) => {
                    encode_line(&mut buf, &body)?;
                    batched += 1;
                }
                Err(_) => break,
            }
        }

        writer.write_all(&buf).await?;
        writer.flush().await?;
        tracing::trace!(bodies = batched, bytes = buf.len(), "wrote response batch");
    }
}

/// Append `body` as one JSON line. Uses explicit `\n` on every platform.
fn encode_line(buf: &mut Vec<u8>, body: &Value) -> Result<()> {
    serde_json::to_writer(&mut *buf, body)?;
    buf.push(b'\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    use crate::handler::Response;

    #[test]
    fn test_writer_config_default() {
        let config = JsonWriterConfig::default();
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_encode_line() {
        let mut buf = Vec::new();
        encode_line(&mut buf, &json!({"a": 1})).unwrap();
        encode_line(&mut buf, &json!("x")).unwrap();
        assert_eq!(buf, b"{\"a\":1}\n\"x\"\n");
    }

    #[tokio::test]
    async fn test_bodies_arrive_as_lines() {
        let (client, server) = duplex(4096);
        let (handle, _task) = spawn_json_writer_default(client);

        handle.send(json!({"data": 1})).await.unwrap();
        handle.send(json!({"data": 2})).await.unwrap();

        let mut lines = BufReader::new(server).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"data":1}"#);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"data":2}"#);
    }

    #[tokio::test]
    async fn test_response_through_writer() {
        let (client, server) = duplex(4096);
        let (handle, _task) = spawn_json_writer_default(client);
        let res = Response::with_sink(std::sync::Arc::new(handle));

        res.error(&crate::SymbolicError::new("a.b", "c")).await.unwrap();

        let mut lines = BufReader::new(server).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({"error": {"code": "a.b", "message": "c"}}));
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, _server) = duplex(4096);
        let (handle, task) = spawn_json_writer_default(client);

        drop(handle);

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_after_task_stopped() {
        let (client, _server) = duplex(4096);
        let (handle, task) = spawn_json_writer_default(client);
        task.abort();
        let _ = task.await;

        let err = handle.send(json!(1)).await.unwrap_err();
        assert!(matches!(err, DispatchError::SinkClosed));
        assert!(matches!(handle.try_send(json!(1)), Err(DispatchError::SinkClosed)));
    }
}
