use anyhow::Context;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: String,
    pub root: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_base: String,
    pub api_key_env: String,
    /// Takes precedence over `api_key_env` when set.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub bind: String,
    pub transport_limit_bytes: usize,
    /// Skip the model entirely and draft the site from the request. Responses
    /// are flagged `demo: true`.
    pub demo_mode: bool,
    pub drafts_dir: String,
    pub save_artifacts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: "2026-10-01".into(),
            root: ".".into(),
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            timeout_secs: 60,
            api_base: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            api_key: None,
            bind: "127.0.0.1:8787".into(),
            transport_limit_bytes: 5 * 1024 * 1024,
            demo_mode: false,
            drafts_dir: ".sitecraft/drafts".into(),
            save_artifacts: false,
        }
    }
}

impl Config {
    /// Defaults, overlaid with the TOML file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    /// The explicit key if configured, else the env var named by `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn drafts_path(&self) -> PathBuf {
        Path::new(&self.root).join(&self.drafts_dir)
    }
}
