/// `load_config` module: reads the static YAML config and injects the access token
/// from the environment.
///
/// This is the only place where user-supplied YAML is parsed. Every section is
/// optional; anything left out falls back to the defaults in `repodoc-core`.
/// Limits may be tightened but never raised: pages hold at most 100 repositories,
/// trees stop at 5 levels and at most 50 files are read per repository.
///
/// ```yaml
/// api:
///   base_url: https://api.github.com
/// limits:
///   page_size: 100
///   max_depth: 5
///   recurse_depth: 3
///   max_files_per_repo: 50
/// pacing:
///   page_delay_ms: 100
///   entry_delay_ms: 50
///   repository_delay_ms: 500
/// output:
///   primary: /home/octocat/docs/repository_database.json
///   secondary: ./repository_database.json
/// ```
///
/// The token is never read from YAML. It comes from `GITHUB_TOKEN`, which `main`
/// may have loaded from a `.env` file.
use anyhow::Result;
use repodoc_core::config::{
    GeneratorConfig, Limits, OutputConfig, PacingConfig, DEFAULT_API_BASE_URL,
};
use repodoc_core::session::Credential;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug)]
pub struct CliConfig {
    pub generator: GeneratorConfig,
    pub credential: Option<Credential>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        ApiSection {
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    api: ApiSection,
    limits: Limits,
    pacing: PacingConfig,
    output: OutputConfig,
}

impl From<RawConfig> for GeneratorConfig {
    fn from(raw: RawConfig) -> Self {
        GeneratorConfig {
            api_base_url: raw.api.base_url,
            limits: raw.limits,
            pacing: raw.pacing,
            output: raw.output,
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects the access token from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid config that keeps every default.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    if let Err(e) = raw.limits.validate() {
        error!(error = %e, config_path = ?path_ref, "Config limits out of range");
        return Err(anyhow::anyhow!("Invalid config {:?}: {e}", path_ref));
    }

    Ok(with_secrets(raw.into()))
}

/// Defaults only, for when no config file is given.
pub fn default_config() -> CliConfig {
    info!("No config file given, using defaults");
    with_secrets(GeneratorConfig::default())
}

fn with_secrets(generator: GeneratorConfig) -> CliConfig {
    let credential = std::env::var(TOKEN_ENV_VAR).ok().and_then(Credential::new);
    if credential.is_none() {
        warn!(env_var = TOKEN_ENV_VAR, "No access token in the environment");
    }
    generator.trace_loaded();
    CliConfig { generator, credential }
}
