use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Root configuration structure, deserialized from `.pgscan/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wildcard input expansion.
    pub inputs: InputsConfig,
    /// Manifest augmentation.
    pub manifest: ManifestConfig,
    /// Registry client settings.
    pub registry: RegistryConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// File-name pattern used when a wildcard input has no file-name part.
    /// Supports `*` and `?`.
    pub default_pattern: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            default_pattern: "*.??proj".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// XML namespace of the packaging manifest schema.
    pub namespace: String,
    /// Environment variable holding the source repository URI.
    pub repository_uri_var: String,
    /// Environment variable holding the source revision.
    pub source_version_var: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            namespace: "http://schemas.microsoft.com/packaging/2010/07/nuspec.xsd".to_string(),
            repository_uri_var: "BUILD_REPOSITORY_URI".to_string(),
            source_version_var: "BUILD_SOURCEVERSION".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// `User-Agent` header sent to the registry.
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("pgscan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<working_dir>/.pgscan/config.toml`
/// 3. `~/.config/pgscan/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = working_dir.join(".pgscan").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("pgscan").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Source repository provenance taken from the build environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    pub repository_uri: Option<String>,
    pub source_version: Option<String>,
}

impl BuildMetadata {
    pub fn from_env(config: &ManifestConfig) -> Self {
        Self {
            repository_uri: std::env::var(&config.repository_uri_var).ok(),
            source_version: std::env::var(&config.source_version_var).ok(),
        }
    }
}
