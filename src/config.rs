//! Shell configuration (`sakura.toml`).
//!
//! ```toml
//! [dump]
//! ast = false
//! sakir = true
//!
//! [gc]
//! heap_limit = 1048576
//! ```
//!
//! All sections and keys are optional; a missing file means defaults.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub gc: GcConfig,
}

/// Which intermediate forms `run` prints by default. Per-invocation flags
/// turn additional dumps on.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DumpConfig {
    #[serde(default)]
    pub ast: bool,
    #[serde(default)]
    pub sakir: bool,
    #[serde(default)]
    pub rawllvm: bool,
    #[serde(default)]
    pub llvmir: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GcConfig {
    /// Initial soft heap limit in bytes for the GC runtime.
    #[serde(default = "default_heap_limit")]
    pub heap_limit: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            heap_limit: default_heap_limit(),
        }
    }
}

fn default_heap_limit() -> usize {
    sakura_runtime::gc::DEFAULT_HEAP_LIMIT
}

impl Config {
    /// Loads configuration from `path`, or from `./sakura.toml` when no path
    /// is given, or defaults when neither exists.
    pub fn load(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
        let candidate = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(format!(
                        "Configuration file '{}' does not exist",
                        explicit.display()
                    )
                    .into());
                }
                explicit.to_path_buf()
            }
            None => {
                let implicit = Path::new("sakura.toml");
                if !implicit.exists() {
                    return Ok(Config::default());
                }
                implicit.to_path_buf()
            }
        };
        let text = std::fs::read_to_string(&candidate)?;
        let config = toml::from_str(&text)?;
        log::debug!("loaded configuration from {}", candidate.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.dump.ast);
        assert!(!config.dump.sakir);
        assert_eq!(config.gc.heap_limit, sakura_runtime::gc::DEFAULT_HEAP_LIMIT);
    }

    #[test]
    fn sections_override_selectively() {
        let config: Config = toml::from_str("[dump]\nsakir = true\n[gc]\nheap_limit = 4096\n").unwrap();
        assert!(config.dump.sakir);
        assert!(!config.dump.ast);
        assert_eq!(config.gc.heap_limit, 4096);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(None).unwrap();
        assert!(!config.dump.llvmir);
    }
}
