use crate::config::ProbeConfig;
use crate::contract::Target;
use crate::map::MapOptions;
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Environment variable that overrides the file's `concurrency`.
pub const CONCURRENCY_ENV: &str = "ASYNC_FLOW_CONCURRENCY";

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    concurrency: Option<i64>,
    #[serde(default)]
    targets: Vec<TargetYaml>,
}

#[derive(Deserialize)]
struct TargetYaml {
    name: String,
    url: String,
}

/// Loads a static YAML config file and applies the concurrency override from the
/// environment. Returns a fully merged ProbeConfig or an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProbeConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "[CONFIG] Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "[CONFIG] Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let concurrency = match std::env::var(CONCURRENCY_ENV) {
        Ok(var) => match var.trim().parse::<i64>() {
            Ok(value) => {
                info!(value, "[CONFIG] {} found in env, overriding file", CONCURRENCY_ENV);
                Some(value)
            }
            Err(e) => {
                error!(error = ?e, var = ?var, "[CONFIG] {} must be a valid integer", CONCURRENCY_ENV);
                anyhow::bail!("{CONCURRENCY_ENV} must be a valid integer: {e}");
            }
        },
        Err(_) => static_conf.concurrency,
    };

    let targets: Vec<Target> = static_conf
        .targets
        .into_iter()
        .map(|t| Target {
            name: t.name,
            url: t.url,
        })
        .collect();

    let config = ProbeConfig {
        options: normalise_concurrency(concurrency),
        targets,
    };
    config.trace_loaded();
    Ok(config)
}

/// Non-positive caps mean "unbounded".
pub fn normalise_concurrency(concurrency: Option<i64>) -> MapOptions {
    match concurrency {
        Some(value) if value > 0 => MapOptions::with_concurrency(value as usize),
        Some(value) => {
            warn!(value, "[CONFIG] Non-positive concurrency, running unbounded");
            MapOptions::unbounded()
        }
        None => MapOptions::unbounded(),
    }
}
