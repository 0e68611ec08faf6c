//! Backend factory pattern for configuration-driven construction.
//!
//! A different completion service can be slotted in without touching the
//! orchestrator: implement [`BackendFactory`], register it, and name the
//! backend type in configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{BackendError, CompletionBackend};

/// Factory for creating completion backends from configuration.
pub trait BackendFactory: Send + Sync {
    /// Unique identifier for this backend type (e.g., "ollama").
    fn backend_type(&self) -> &'static str;

    /// Create a backend instance from JSON configuration.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn CompletionBackend>, BackendError>;

    /// Validate configuration without creating a backend.
    fn validate_config(&self, config: &JsonValue) -> Result<(), BackendError>;

    /// Sensible defaults for optional fields.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this backend.
    fn description(&self) -> &'static str {
        "Completion backend"
    }
}

/// Registry of available backend factories.
#[derive(Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, Arc<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; a factory with the same type replaces the old one.
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        self.factories
            .insert(factory.backend_type().to_string(), factory);
    }

    /// Create a backend from type name and configuration.
    pub fn create(
        &self,
        backend_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn CompletionBackend>, BackendError> {
        self.factories
            .get(backend_type)
            .ok_or_else(|| {
                BackendError::NotConfigured(format!(
                    "unknown backend type: '{}'. Available: {:?}",
                    backend_type,
                    self.available_types()
                ))
            })?
            .create(config)
    }

    /// Validate configuration for a backend type.
    pub fn validate(&self, backend_type: &str, config: &JsonValue) -> Result<(), BackendError> {
        self.factories
            .get(backend_type)
            .ok_or_else(|| {
                BackendError::NotConfigured(format!("unknown backend type: '{}'", backend_type))
            })?
            .validate_config(config)
    }

    /// List available backend types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_backend(&self, backend_type: &str) -> bool {
        self.factories.contains_key(backend_type)
    }

    /// Registry with all built-in backends registered.
    #[cfg(feature = "ollama")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::OllamaBackendFactory));
        registry
    }

    /// Registry with all built-in backends registered.
    #[cfg(not(feature = "ollama"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ChatMessage, CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;

    struct MockBackend {
        name: String,
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, BackendError> {
            Ok(CompletionResponse {
                content: "{}".to_string(),
                usage: TokenUsage::default(),
                model: "mock".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct MockBackendFactory;

    impl BackendFactory for MockBackendFactory {
        fn backend_type(&self) -> &'static str {
            "mock"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn CompletionBackend>, BackendError> {
            let name = config["name"].as_str().unwrap_or("mock-backend").to_string();
            Ok(Arc::new(MockBackend { name }))
        }

        fn validate_config(&self, _config: &JsonValue) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(MockBackendFactory));

        assert!(registry.has_backend("mock"));
        assert!(!registry.has_backend("unknown"));

        let config = serde_json::json!({"name": "test-mock"});
        let backend = registry.create("mock", &config);
        assert!(backend.is_ok());
        assert_eq!(backend.unwrap().name(), "test-mock");
    }

    #[test]
    fn test_registry_unknown_backend() {
        let registry = BackendRegistry::new();
        let result = registry.create("unknown", &serde_json::json!({}));

        match result {
            Err(BackendError::NotConfigured(msg)) => {
                assert!(msg.contains("unknown backend type"));
            }
            _ => panic!("expected NotConfigured error"),
        }
    }

    #[test]
    fn test_registry_available_types() {
        let mut registry = BackendRegistry::new();
        assert!(registry.available_types().is_empty());

        registry.register(Arc::new(MockBackendFactory));
        assert_eq!(registry.available_types(), vec!["mock"]);
    }
}
