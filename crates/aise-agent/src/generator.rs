use aise_core::{AiseError, AiseResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Model used by the built-in agents unless told otherwise.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Opaque text-generation service.
///
/// Calls may be slow and may fail; agents convert failures through their
/// shared error path.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name the generator is registered under.
    fn name(&self) -> &str;

    /// Produce at most `max_tokens` tokens of text for `prompt`.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> AiseResult<String>;
}

/// Stand-in generator that echoes the prompt.
///
/// Output is `"Response to: <prompt>"` cut to `max_tokens` whitespace tokens.
pub struct PlaceholderGenerator {
    name: String,
}

impl PlaceholderGenerator {
    /// A placeholder registered as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

#[async_trait]
impl TextGenerator for PlaceholderGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> AiseResult<String> {
        let full = format!("Response to: {prompt}");
        let limit = usize::try_from(max_tokens).unwrap_or(usize::MAX);
        Ok(full.split_whitespace().take(limit).collect::<Vec<_>>().join(" "))
    }
}

/// Named generators available to agents.
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn TextGenerator>>,
}

impl GeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Registry holding a placeholder generator under [`DEFAULT_MODEL`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlaceholderGenerator::default()));
        registry
    }

    /// Add or replace the generator under its own name.
    pub fn register(&mut self, generator: Arc<dyn TextGenerator>) {
        let name = generator.name().to_string();
        info!(model = %name, "Registered text generator");
        self.generators.insert(name, generator);
    }

    /// Look up a generator; unknown names are a config error.
    pub fn get(&self, name: &str) -> AiseResult<Arc<dyn TextGenerator>> {
        self.generators
            .get(name)
            .cloned()
            .ok_or_else(|| AiseError::Config(format!("Model {name} not found")))
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Whether no generator is registered.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
