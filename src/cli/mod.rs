pub mod bench;
pub mod check;
pub mod eval;

use std::path::{Path, PathBuf};
use std::process;

use treecalc::{EngineConfig, Strategy};

fn load_config(toml_path: &Path) -> EngineConfig {
    match EngineConfig::load(toml_path) {
        Ok(config) => {
            log::info!("loaded {}", toml_path.display());
            config
        }
        Err(d) => {
            eprintln!("error: {}: {}", toml_path.display(), d.message);
            process::exit(1);
        }
    }
}

/// Resolve the engine configuration: an explicit `--config` file, else a
/// treecalc.toml in the working directory or its ancestors, else defaults.
/// Command-line flags override file values.
pub fn resolve_config(
    explicit: Option<&PathBuf>,
    strategy: Option<Strategy>,
    step_limit: Option<u64>,
) -> EngineConfig {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                eprintln!("error: config file '{}' not found", path.display());
                process::exit(1);
            }
            load_config(path)
        }
        None => std::env::current_dir()
            .ok()
            .and_then(|dir| EngineConfig::find(&dir))
            .map(|path| load_config(&path))
            .unwrap_or_default(),
    };
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    if step_limit.is_some() {
        config.step_limit = step_limit;
    }
    config
}

/// Strategies named on the command line, or all of them.
pub fn selected_strategies(requested: &[Strategy]) -> Vec<Strategy> {
    if requested.is_empty() {
        Strategy::ALL.to_vec()
    } else {
        let mut out = Vec::new();
        for s in requested {
            if !out.contains(s) {
                out.push(*s);
            }
        }
        out
    }
}
