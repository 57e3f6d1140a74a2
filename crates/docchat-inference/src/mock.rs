//! Mock inference backend for deterministic testing.
//!
//! Embeddings are derived from the text, completions are matched against
//! substring rules, and structured completions are scripted per schema
//! name. Every call is logged for assertions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docchat_inference::mock::MockInferenceBackend;
//! use serde_json::json;
//!
//! let backend = MockInferenceBackend::new()
//!     .with_dimension(8)
//!     .with_structured("email_intent", json!({"wants_email": false, "email_address": null}))
//!     .with_completion_rule("SOURCES_USED", "Answer.\nSOURCES_USED: report");
//! ```

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use docchat_core::{
    CompletionOptions, EmbeddingBackend, Error, GenerationBackend, PromptMessage, Result,
    StructuredSchema, Vector,
};

/// Mock inference backend for testing.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    completion_rules: Vec<(String, String)>,
    default_response: String,
    structured: HashMap<String, JsonValue>,
    failing_structured: Vec<String>,
    fail_completions: bool,
    fail_embeddings: bool,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// "embed", "complete" or "structured"
    pub operation: String,
    /// Embedded text, last prompt message, or schema name
    pub input: String,
    /// Full prompt text (all messages joined) for completions
    pub prompt: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 16,
            completion_rules: Vec::new(),
            default_response: "Mock response".to_string(),
            structured: HashMap::new(),
            failing_structured: Vec::new(),
            fail_completions: false,
            fail_embeddings: false,
        }
    }
}

impl MockInferenceBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Response for completions that match no rule.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Return `response` when any prompt message contains `needle`.
    /// Rules are checked in insertion order.
    pub fn with_completion_rule(
        mut self,
        needle: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .completion_rules
            .push((needle.into(), response.into()));
        self
    }

    /// Script the JSON returned for a structured completion by schema name.
    pub fn with_structured(mut self, schema_name: impl Into<String>, value: JsonValue) -> Self {
        Arc::make_mut(&mut self.config)
            .structured
            .insert(schema_name.into(), value);
        self
    }

    /// Make structured completions for one schema fail with an upstream error.
    pub fn with_failing_structured(mut self, schema_name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .failing_structured
            .push(schema_name.into());
        self
    }

    /// Make every free-text completion fail.
    pub fn with_failing_completions(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_completions = true;
        self
    }

    /// Make every embedding request fail.
    pub fn with_failing_embeddings(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embeddings = true;
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    fn count(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn embed_call_count(&self) -> usize {
        self.count("embed")
    }

    pub fn complete_call_count(&self) -> usize {
        self.count("complete")
    }

    pub fn structured_call_count(&self) -> usize {
        self.count("structured")
    }

    /// Schema names of structured calls, in call order.
    pub fn structured_calls(&self) -> Vec<String> {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == "structured")
            .map(|c| c.input.clone())
            .collect()
    }

    fn log_call(&self, operation: &str, input: &str, prompt: String) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
            prompt,
        });
    }
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn join_prompt(messages: &[PromptMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            self.log_call("embed", text, String::new());
            if self.config.fail_embeddings {
                return Err(Error::Embedding("Simulated embedding failure".to_string()));
            }
            vectors.push(MockEmbeddingGenerator::generate(text, self.config.dimension));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        _options: CompletionOptions,
    ) -> Result<String> {
        let prompt = join_prompt(messages);
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.log_call("complete", &last, prompt.clone());

        if self.config.fail_completions {
            return Err(Error::Inference("Simulated completion failure".to_string()));
        }

        for (needle, response) in &self.config.completion_rules {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.config.default_response.clone())
    }

    async fn complete_structured(
        &self,
        messages: &[PromptMessage],
        schema: &StructuredSchema,
    ) -> Result<JsonValue> {
        self.log_call("structured", &schema.name, join_prompt(messages));

        if self.config.failing_structured.contains(&schema.name) {
            return Err(Error::Inference(format!(
                "Simulated failure for {}",
                schema.name
            )));
        }

        self.config
            .structured
            .get(&schema.name)
            .cloned()
            .ok_or_else(|| {
                Error::Inference(format!("No scripted response for {}", schema.name))
            })
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic unit vector from text. The same text
    /// always produces the same embedding.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let dimension = dimension.max(1);
        let mut vec = vec![0.0; dimension];

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        Self::normalize(&mut vec);
        vec
    }

    fn normalize(vec: &mut [f32]) {
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in vec.iter_mut() {
                *x /= magnitude;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let backend = MockInferenceBackend::new().with_dimension(8);
        let a = backend.embed("hello").await.unwrap();
        let b = backend.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_eq!(backend.embed_call_count(), 2);
    }

    #[tokio::test]
    async fn test_completion_rules_in_order() {
        let backend = MockInferenceBackend::new()
            .with_completion_rule("summary", "A summary")
            .with_completion_rule("sum", "never reached for summary")
            .with_fixed_response("fallback");

        let r = backend
            .generate_with_system("", "write a summary", CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(r, "A summary");

        let r = backend
            .generate_with_system("", "other", CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(r, "fallback");
        assert_eq!(backend.complete_call_count(), 2);
    }

    #[tokio::test]
    async fn test_structured_scripted_and_unscripted() {
        let backend =
            MockInferenceBackend::new().with_structured("email_intent", json!({"wants_email": true}));
        let schema = StructuredSchema {
            name: "email_intent".to_string(),
            schema: json!({}),
        };
        let value = backend
            .complete_structured(&[PromptMessage::user("x")], &schema)
            .await
            .unwrap();
        assert_eq!(value["wants_email"], true);

        let missing = StructuredSchema {
            name: "other".to_string(),
            schema: json!({}),
        };
        assert!(backend
            .complete_structured(&[PromptMessage::user("x")], &missing)
            .await
            .is_err());
        assert_eq!(backend.structured_calls(), vec!["email_intent", "other"]);
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let backend = MockInferenceBackend::new()
            .with_failing_completions()
            .with_failing_embeddings();
        assert!(backend.embed("x").await.is_err());
        assert!(backend
            .complete(&[PromptMessage::user("x")], CompletionOptions::default())
            .await
            .is_err());
    }
}
