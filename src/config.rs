//! Configuration for the retrieval evaluator.
//!
//! Supports a YAML config file, a `.env` file and environment variables.
//! Environment variables take precedence over config file values, and the
//! CLI may override the evaluation settings on top of that.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "SEARCH_EVAL_CONFIG";

/// Output file used by keyword-mode runs.
pub const KEYWORD_OUTPUT_FILENAME: &str = "evaluation_results.json";

/// Output file used by hybrid-mode runs.
pub const HYBRID_OUTPUT_FILENAME: &str = "evaluation_results_formatted.json";

/// How documents are retrieved from the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Plain full-text search.
    #[default]
    Keyword,
    /// Full-text plus vector search, reranked by the semantic ranker.
    Hybrid,
}

impl FromStr for RetrievalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" => Ok(RetrievalMode::Keyword),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            other => Err(format!(
                "unknown retrieval mode '{}' (expected 'keyword' or 'hybrid')",
                other
            )),
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMode::Keyword => write!(f, "keyword"),
            RetrievalMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Search index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Service endpoint (e.g., "https://my-service.search.windows.net")
    pub endpoint: String,

    /// Name of the index to query
    pub index: String,

    /// Admin or query key. Left raw here; cleaned by the credential resolver.
    pub api_key: Option<String>,

    /// REST API version
    pub api_version: String,

    /// Semantic ranker configuration (hybrid mode)
    pub semantic_configuration: Option<String>,

    /// Vector field queried in hybrid mode
    pub vector_field: String,

    /// Nearest neighbours requested from the vector query
    pub vector_k: usize,

    /// Dimensionality of the index vector field
    pub dimensions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index: String::new(),
            api_key: None,
            api_version: "2023-11-01".to_string(),
            semantic_configuration: None,
            vector_field: "text_vector".to_string(),
            vector_k: 50,
            dimensions: 3072,
        }
    }
}

/// Azure OpenAI configuration shared by the judge and the embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Resource endpoint (e.g., "https://my-resource.openai.azure.com")
    pub endpoint: String,

    /// Chat deployment used by the judge
    pub deployment: String,

    /// Embedding deployment used in hybrid mode
    pub embedding_deployment: Option<String>,

    /// API key. Only the connectivity check uses it.
    pub api_key: Option<String>,

    /// REST API version
    pub api_version: String,

    /// Maximum tokens for judge responses
    pub max_tokens: u32,

    /// Temperature for judge responses
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            embedding_deployment: None,
            api_key: None,
            api_version: "2024-02-15-preview".to_string(),
            max_tokens: 800,
            temperature: 0.0,
        }
    }
}

/// Evaluation run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Retrieval mode
    pub mode: RetrievalMode,

    /// Documents retrieved per query
    pub top_k: Option<usize>,

    /// Results file; defaults per mode
    pub output: Option<PathBuf>,

    /// Include the annotated context in each record; defaults per mode
    pub debug_context: Option<bool>,
}

impl EvalConfig {
    /// Number of documents to retrieve per query.
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(3)
    }

    /// Where the run writes its results.
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| match self.mode {
            RetrievalMode::Keyword => PathBuf::from(KEYWORD_OUTPUT_FILENAME),
            RetrievalMode::Hybrid => PathBuf::from(HYBRID_OUTPUT_FILENAME),
        })
    }

    /// Whether records carry the annotated debug context.
    pub fn debug_context(&self) -> bool {
        self.debug_context
            .unwrap_or(self.mode == RetrievalMode::Hybrid)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Search index settings
    pub search: SearchConfig,
    /// Azure OpenAI settings
    pub openai: OpenAiConfig,
    /// Evaluation run settings
    pub eval: EvalConfig,
}

impl Config {
    /// Load configuration from the config file, `.env` and the environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (including those loaded from `.env`)
    /// 2. Config file (`SEARCH_EVAL_CONFIG` or ~/.config/search-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        // A missing .env file is not an error
        let _ = dotenv::dotenv();

        let mut config = Config::default();

        let explicit = env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        if let Some(path) = Self::resolve_config_path(explicit)? {
            log::debug!("Loading config file {}", path.display());
            config = Self::load_from_file(&path)?;
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Pick the config file to read.
    ///
    /// A path named explicitly must exist. The default location is only
    /// used when a file is present there.
    pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        match explicit {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => Err(EvalError::Config(format!(
                "Config file '{}' named by {} does not exist",
                path.display(),
                CONFIG_PATH_VAR
            ))),
            None => Ok(Self::config_file_path().filter(|path| path.exists())),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Override values from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = v;
        }
        if let Some(v) = lookup("AZURE_SEARCH_INDEX") {
            self.search.index = v;
        }
        if let Some(v) = lookup("AZURE_SEARCH_KEY") {
            self.search.api_key = Some(v);
        }
        if let Some(v) = lookup("AZURE_SEARCH_SEMANTIC_CONFIG") {
            self.search.semantic_configuration = Some(v);
        }
        if let Some(v) = lookup("AZURE_SEARCH_VECTOR_FIELD") {
            self.search.vector_field = v;
        }
        if let Some(v) = lookup("AZURE_SEARCH_API_VERSION") {
            self.search.api_version = v;
        }

        if let Some(v) = lookup("AZURE_OPENAI_ENDPOINT") {
            self.openai.endpoint = v;
        }
        if let Some(v) = lookup("AZURE_OPENAI_DEPLOYMENT") {
            self.openai.deployment = v;
        }
        if let Some(v) = lookup("AZURE_OPENAI_EMBEDDING_DEPLOYMENT") {
            self.openai.embedding_deployment = Some(v);
        }
        if let Some(v) = lookup("AZURE_OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("AZURE_OPENAI_API_VERSION") {
            self.openai.api_version = v;
        }

        if let Some(v) = lookup("EVAL_RETRIEVAL_MODE") {
            self.eval.mode = v.parse().map_err(EvalError::InvalidConfig)?;
        }
        if let Some(v) = lookup("EVAL_TOP_K") {
            let top_k = v
                .trim()
                .parse()
                .map_err(|_| EvalError::InvalidConfig(format!("EVAL_TOP_K '{}' is not a number", v)))?;
            self.eval.top_k = Some(top_k);
        }
        if let Some(v) = lookup("EVAL_OUTPUT") {
            self.eval.output = Some(PathBuf::from(v));
        }

        Ok(())
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "search-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate the search index settings.
    pub fn validate_search(&self) -> Result<()> {
        require_url(&self.search.endpoint, "Search endpoint", "AZURE_SEARCH_ENDPOINT")?;

        if self.search.index.trim().is_empty() {
            return Err(EvalError::Config(
                "Search index is required. Set AZURE_SEARCH_INDEX environment variable or add to config file.".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the Azure OpenAI chat settings.
    pub fn validate_openai(&self) -> Result<()> {
        require_url(&self.openai.endpoint, "Azure OpenAI endpoint", "AZURE_OPENAI_ENDPOINT")?;

        if self.openai.deployment.trim().is_empty() {
            return Err(EvalError::Config(
                "Judge deployment is required. Set AZURE_OPENAI_DEPLOYMENT environment variable or add to config file.".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate everything an evaluation run needs.
    pub fn validate(&self) -> Result<()> {
        self.validate_search()?;
        self.validate_openai()?;

        if self.eval.top_k() == 0 {
            return Err(EvalError::InvalidConfig("top_k must be at least 1".to_string()));
        }

        if self.eval.mode == RetrievalMode::Hybrid {
            let has_embedding = self
                .openai
                .embedding_deployment
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
            if !has_embedding {
                return Err(EvalError::Config(
                    "Hybrid mode requires an embedding deployment. Set AZURE_OPENAI_EMBEDDING_DEPLOYMENT.".to_string(),
                ));
            }

            let has_semantic = self
                .search
                .semantic_configuration
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
            if !has_semantic {
                return Err(EvalError::Config(
                    "Hybrid mode requires a semantic configuration. Set AZURE_SEARCH_SEMANTIC_CONFIG.".to_string(),
                ));
            }

            if self.search.vector_field.trim().is_empty() {
                return Err(EvalError::InvalidConfig("vector_field must not be empty".to_string()));
            }
            if self.search.vector_k == 0 {
                return Err(EvalError::InvalidConfig("vector_k must be at least 1".to_string()));
            }
            if self.search.dimensions == 0 {
                return Err(EvalError::InvalidConfig("dimensions must be at least 1".to_string()));
            }
        }

        Ok(())
    }
}

fn require_url(value: &str, what: &str, var: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EvalError::Config(format!(
            "{} is required. Set {} environment variable or add to config file.",
            what, var
        )));
    }
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(EvalError::InvalidConfig(format!(
            "{} '{}' must be an http(s) URL",
            what, value
        )));
    }
    Ok(())
}
