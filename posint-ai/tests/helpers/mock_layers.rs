//! Mock classifier layers
//!
//! Return a fixed output (or a fixed failure) and record when they were
//! called, using the tokio clock so paused-time tests can measure delays.

use async_trait::async_trait;
use posint_ai::error::ClassifierError;
use posint_ai::types::{Classifier, ClassifierOutput, LayerKind};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Output with the given label and confidence and no entities
pub fn layer_output(source_id: &str, event_type: &str, confidence: f64) -> ClassifierOutput {
    ClassifierOutput {
        event_type: event_type.to_string(),
        confidence,
        ..ClassifierOutput::empty(source_id)
    }
}

/// Scripted layer
#[derive(Clone)]
pub struct MockLayer {
    id: &'static str,
    kind: LayerKind,
    response: Result<ClassifierOutput, String>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl MockLayer {
    pub fn ok(id: &'static str, kind: LayerKind, output: ClassifierOutput) -> Self {
        Self {
            id,
            kind,
            response: Ok(output),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(id: &'static str, kind: LayerKind, message: &str) -> Self {
        Self {
            id,
            kind,
            response: Err(message.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of classify calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Clock reading at each call
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_arc(self) -> Arc<dyn Classifier> {
        Arc::new(self)
    }
}

#[async_trait]
impl Classifier for MockLayer {
    fn source_id(&self) -> &'static str {
        self.id
    }

    fn kind(&self) -> LayerKind {
        self.kind
    }

    async fn classify(&self, _text: &str) -> Result<ClassifierOutput, ClassifierError> {
        self.calls.lock().unwrap().push(Instant::now());
        match &self.response {
            Ok(output) => Ok(output.clone()),
            Err(message) => Err(ClassifierError::Network(message.clone())),
        }
    }
}
