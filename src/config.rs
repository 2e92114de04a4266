//! Configuration parsing and validation.
//!
//! papis-qa reads a TOML file (default `{config_home}/papisqa/config.toml`).
//! Every section is optional; a missing file at the default location yields
//! the defaults below. The library directory is the one setting without a
//! usable default: it comes from `[library].dir` or `PAPIS_LIBRARY_DIR`.
//!
//! ```toml
//! [library]
//! name = "papers"
//! dir = "~/Documents/papers"
//!
//! [index]
//! dir = "~/.config/papis"      # where `{library.name}.qa` lives
//!
//! [models]
//! provider = "openai"          # or "ollama"
//! llm = "gpt-4o"
//! embedding = "text-embedding-3-small"
//!
//! [chunking]
//! max_tokens = 700
//!
//! [providers]
//! timeout_secs = 60
//! max_retries = 5
//! ```

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `[library].dir` is not set.
pub const LIBRARY_DIR_ENV: &str = "PAPIS_LIBRARY_DIR";

/// Extension of the persisted index file.
pub const INDEX_EXTENSION: &str = "qa";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_library_name")]
    pub name: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: default_library_name(),
            dir: None,
        }
    }
}

fn default_library_name() -> String {
    "papers".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// Directory holding the index; defaults to `{config_home}/papis`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm")]
    pub llm: String,
    #[serde(default = "default_embedding")]
    pub embedding: String,
    /// Base URL override (Ollama host, or an OpenAI-compatible endpoint).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            llm: default_llm(),
            embedding: default_embedding(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_llm() -> String {
    "gpt-4o".to_string()
}
fn default_embedding() -> String {
    "text-embedding-3-small".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}

/// The platform configuration directory (`~/.config` on Linux).
pub fn config_home() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("cannot determine the configuration directory"))
}

/// Default config file location: `{config_home}/papisqa/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_home()?.join("papisqa").join("config.toml"))
}

impl Config {
    /// Directory of the papis library to index.
    pub fn library_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.library.dir {
            return Ok(expand_home(dir));
        }
        match std::env::var_os(LIBRARY_DIR_ENV) {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => bail!(
                "no library directory configured: set [library].dir or {}",
                LIBRARY_DIR_ENV
            ),
        }
    }

    /// Location of the persisted index: `{index_dir}/{library}.qa`.
    pub fn index_path(&self) -> Result<PathBuf> {
        let dir = match &self.index.dir {
            Some(dir) => expand_home(dir),
            None => config_home()?.join("papis"),
        };
        Ok(dir.join(format!("{}.{}", self.library.name, INDEX_EXTENSION)))
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Load the configuration.
///
/// With `path = None` the default location is tried and a missing file
/// falls back to defaults. An explicitly given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => {
            let path = default_config_path()?;
            if path.exists() {
                parse_file(&path)?
            } else {
                Config::default()
            }
        }
    };
    validate(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }
    if config.library.name.trim().is_empty() {
        bail!("library.name must not be empty");
    }
    match config.models.provider.as_str() {
        "openai" | "ollama" => {}
        other => bail!(
            "Unknown model provider: '{}'. Must be openai or ollama.",
            other
        ),
    }
    if config.models.llm.trim().is_empty() || config.models.embedding.trim().is_empty() {
        bail!("models.llm and models.embedding must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_tmp, path) = write_config("");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.library.name, "papers");
        assert_eq!(config.models.llm, "gpt-4o");
        assert_eq!(config.models.embedding, "text-embedding-3-small");
        assert_eq!(config.chunking.max_tokens, 700);
    }

    #[test]
    fn index_path_uses_library_name() {
        let (_tmp, path) =
            write_config("[library]\nname = \"physics\"\n\n[index]\ndir = \"/var/lib/papisqa\"\n");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(
            config.index_path().unwrap(),
            PathBuf::from("/var/lib/papisqa/physics.qa")
        );
    }

    #[test]
    fn rejects_unknown_provider() {
        let (_tmp, path) = write_config("[models]\nprovider = \"magic\"\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Unknown model provider"));
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let (_tmp, path) = write_config("[chunking]\nmax_tokens = 0\n");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn configured_library_dir_wins() {
        let (_tmp, path) = write_config("[library]\ndir = \"/srv/papers\"\n");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.library_dir().unwrap(), PathBuf::from("/srv/papers"));
    }
}
