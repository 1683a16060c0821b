//! Configuration for a recipe-extraction run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share a config between the eager and streaming entry points, log it,
//! and diff two runs to understand why their outputs differ.

use crate::error::RecipeExtractError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default model identifier sent to the extraction service.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Default service endpoint (OpenAI-compatible).
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for a recipe-extraction run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2recipes::RunConfig;
///
/// let config = RunConfig::builder()
///     .model("gpt-4.1-mini")
///     .pages_per_chunk(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Model identifier for the structured-completion request.
    /// Default: `gpt-4.1-mini`.
    pub model: String,

    /// Base URL of the extraction service. Default: `https://api.openai.com/v1`.
    ///
    /// Any OpenAI-compatible gateway that implements the files and
    /// responses endpoints works; a trailing slash is stripped.
    pub base_url: String,

    /// Pages per chunk. Default: 2, minimum 1.
    ///
    /// Each chunk is a closed page range `[start, start + n - 1]`, clamped
    /// to the document's last page, so the final chunk may be narrower.
    /// The checkpoint records pages rather than chunk indices, which keeps
    /// resumed runs correct even if this knob changed in between.
    pub pages_per_chunk: usize,

    /// Custom extraction prompt. If `None`, uses the built-in default.
    pub prompt: Option<String>,

    /// Cap on tokens the model may generate per chunk. Default: `None`
    /// (the service default applies).
    pub max_output_tokens: Option<u32>,

    /// Per-call timeout for the extraction service, in seconds.
    ///
    /// Default: `None`, meaning no timeout is enforced and the call is
    /// assumed to return or error on its own. Set this when running
    /// against gateways that can hang.
    pub api_timeout_secs: Option<u64>,

    /// Directory for the checkpoint file. Default: `None`, meaning the
    /// process working directory (where the original tool kept it).
    pub checkpoint_dir: Option<PathBuf>,

    /// Progress callback invoked as the run advances. Default: `None`.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pages_per_chunk: 2,
            prompt: None,
            max_output_tokens: None,
            api_timeout_secs: None,
            checkpoint_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("pages_per_chunk", &self.pages_per_chunk)
            .field("prompt", &self.prompt.as_ref().map(|_| "<custom>"))
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("checkpoint_dir", &self.checkpoint_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RunProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn pages_per_chunk(mut self, n: usize) -> Self {
        self.config.pages_per_chunk = n.max(1);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, RecipeExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(RecipeExtractError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(RecipeExtractError::InvalidConfig(format!(
                "Base URL must be an HTTP/HTTPS URL, got '{}'",
                c.base_url
            )));
        }
        if c.pages_per_chunk == 0 {
            return Err(RecipeExtractError::InvalidConfig(
                "Pages per chunk must be >= 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RunConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.pages_per_chunk, 2);
        assert!(c.prompt.is_none());
        assert!(c.api_timeout_secs.is_none());
        assert!(c.checkpoint_dir.is_none());
    }

    #[test]
    fn pages_per_chunk_clamped_to_one() {
        let c = RunConfig::builder().pages_per_chunk(0).build().unwrap();
        assert_eq!(c.pages_per_chunk, 1);
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let c = RunConfig::builder()
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn empty_model_rejected() {
        let err = RunConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("Model identifier"));
    }

    #[test]
    fn non_http_base_url_rejected() {
        let err = RunConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Base URL"));
    }
}
