//! Configuration loading for the heatmapper.
//!
//! A YAML file holds a full or partial `HeatmapConfig`; missing fields take
//! their defaults. Values may reference the environment with `${VAR}` or
//! `${VAR:-default}`. Without a file the `HEATMAP_*` variables are used.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use diversity_heatmap::{config::parse_bins, HeatmapConfig, WeightSelection};

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub cell_size: Option<f64>,
    pub smoothing: Option<f64>,
    pub bins: Option<String>,
    pub weight: Option<String>,
}

/// Resolve the effective configuration: YAML file (or environment), then
/// command-line overrides.
pub fn resolve_config(path: Option<&str>, overrides: &Overrides) -> Result<HeatmapConfig> {
    let mut config = match path {
        Some(path) => load_heatmap_config(path)?,
        None => HeatmapConfig::from_env(),
    };

    if let Some(cell_size) = overrides.cell_size {
        config.cell_size = cell_size;
    }
    if let Some(sigma) = overrides.smoothing {
        config.smoothing_bandwidth = sigma;
    }
    if let Some(bins) = &overrides.bins {
        let bins = parse_bins(bins).with_context(|| format!("Invalid --bins value {:?}, expected NXxNY", bins))?;
        config.bins = Some(bins);
    }
    if let Some(weight) = &overrides.weight {
        config.weight = WeightSelection::from_name(weight)?;
    }

    config.validate()?;
    Ok(config)
}

/// Load and parse a heatmap YAML file with environment variable substitution.
pub fn load_heatmap_config<P: AsRef<Path>>(path: P) -> Result<HeatmapConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read heatmap config from {:?}", path.as_ref()))?;

    let expanded = expand_env_vars(&content)?;

    // An empty document means "all defaults".
    if expanded.trim().is_empty() {
        return Ok(HeatmapConfig::default());
    }

    let config: HeatmapConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse heatmap config from {:?}", path.as_ref()))?;

    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
