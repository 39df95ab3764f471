//! In-memory extraction client for tests.
//!
//! Answers through a caller-supplied closure and records every call so tests
//! can assert on what was asked, in what order.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::schema::ResultShape;
use crate::ExtractionClient;

type Responder = dyn Fn(&str, ResultShape) -> Result<serde_json::Value> + Send + Sync;

/// One call made to a [`ScriptedClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub instruction: String,
    pub shape: ResultShape,
}

pub struct ScriptedClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, ResultShape) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails.
    pub fn failing(message: &'static str) -> Self {
        Self::new(move |_, _| Err(anyhow::anyhow!(message)))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, shape: ResultShape) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.shape == shape)
            .collect()
    }
}

#[async_trait]
impl ExtractionClient for ScriptedClient {
    async fn extract(&self, instruction: &str, shape: ResultShape) -> Result<serde_json::Value> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                instruction: instruction.to_string(),
                shape,
            });
        (self.responder)(instruction, shape)
    }
}
