//! Outbound response seam.
//!
//! Provides methods for answering a request:
//! - `json` - send an arbitrary JSON-serializable value
//! - `data` - send a success envelope `{"data": ...}`
//! - `error` - send an error envelope `{"error": {"code", "message"}}`
//!
//! # Example
//!
//! ```ignore
//! async fn show(req: Request, res: Response) -> Result<()> {
//!     res.data(&serde_json::json!({"name": "Bob"})).await
//! }
//! ```

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::interceptor::BoxFuture;
use crate::symbolic::SymbolicError;

/// Anything that can receive a JSON response body.
pub trait JsonSink: Send + Sync + 'static {
    /// Deliver one JSON value.
    fn send_json(&self, body: Value) -> BoxFuture<'_, Result<()>>;
}

/// Response handle passed to handlers.
///
/// `Response` is `Clone`; all clones write to the same sink. Without a sink
/// (see [`Response::new`]) every write succeeds and is discarded.
#[derive(Clone, Default)]
pub struct Response {
    sink: Option<Arc<dyn JsonSink>>,
}

impl Response {
    /// Create a response without a sink (for testing).
    pub fn new() -> Self {
        Self { sink: None }
    }

    /// Create a response writing to `sink`.
    pub fn with_sink(sink: Arc<dyn JsonSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Send a JSON value.
    pub async fn json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let body = serde_json::to_value(payload)?;
        self.send(body).await
    }

    /// Send a success envelope: `{"data": payload}`.
    pub async fn data<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let body = json!({ "data": serde_json::to_value(payload)? });
        self.send(body).await
    }

    /// Send an error envelope: `{"error": {"code", "message"}}`.
    pub async fn error(&self, err: &SymbolicError) -> Result<()> {
        let body = json!({ "error": serde_json::to_value(err)? });
        self.send(body).await
    }

    async fn send(&self, body: Value) -> Result<()> {
        match &self.sink {
            Some(sink) => sink.send_json(body).await,
            // No sink configured (testing mode)
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

/// Sink that records every body it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    bodies: Mutex<Vec<Value>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything written so far, in order.
    pub fn bodies(&self) -> Vec<Value> {
        self.lock().clone()
    }

    /// Number of writes so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        self.bodies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonSink for MemorySink {
    fn send_json(&self, body: Value) -> BoxFuture<'_, Result<()>> {
        self.lock().push(body);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> (Arc<MemorySink>, Response) {
        let sink = MemorySink::new();
        let res = Response::with_sink(sink.clone());
        (sink, res)
    }

    #[tokio::test]
    async fn test_respond_without_sink() {
        let res = Response::new();
        assert!(res.json(&"test").await.is_ok());
        assert!(res.data(&1).await.is_ok());
        assert!(res.error(&SymbolicError::new("a.b", "c")).await.is_ok());
    }

    #[tokio::test]
    async fn test_json_is_written_verbatim() {
        let (sink, res) = recorded();
        res.json(&json!({"todo": "later"})).await.unwrap();
        assert_eq!(sink.bodies(), vec![json!({"todo": "later"})]);
    }

    #[tokio::test]
    async fn test_data_envelope() {
        let (sink, res) = recorded();
        res.data(&json!({"firstName": "Bob"})).await.unwrap();
        assert_eq!(sink.bodies(), vec![json!({"data": {"firstName": "Bob"}})]);
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (sink, res) = recorded();
        res.error(&SymbolicError::new("auth.badCredentials", "bad"))
            .await
            .unwrap();
        assert_eq!(
            sink.bodies(),
            vec![json!({"error": {"code": "auth.badCredentials", "message": "bad"}})]
        );
    }

    #[tokio::test]
    async fn test_clones_share_sink() {
        let (sink, res) = recorded();
        let res2 = res.clone();
        res.json(&1).await.unwrap();
        res2.json(&2).await.unwrap();
        assert_eq!(sink.len(), 2);
        assert!(!sink.is_empty());
    }
}
