use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;
use crate::eval::Strategy;
use crate::span::Span;

/// File name searched for by [`EngineConfig::find`].
pub const CONFIG_FILE: &str = "treecalc.toml";

/// Evaluator settings shared by the library, the CLI and the benches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Strategy used when the caller does not pick one.
    pub strategy: Strategy,
    /// Abort after this many rewrites. `None` runs to completion.
    pub step_limit: Option<u64>,
    /// Initial record capacity of the arena evaluator.
    pub arena_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Stack,
            step_limit: None,
            arena_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Load settings from a treecalc.toml file.
    ///
    /// Only the `[engine]` section is read; unknown keys are ignored.
    pub fn load(toml_path: &Path) -> Result<EngineConfig, Diagnostic> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", toml_path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse(&content)
    }

    /// Section-aware minimal TOML parsing.
    pub fn parse(content: &str) -> Result<EngineConfig, Diagnostic> {
        let mut config = EngineConfig::default();
        let mut current_section = String::new();
        let mut offset = 0usize;

        for line in content.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();

            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current_section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }
            if current_section != "engine" {
                continue;
            }
            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim().trim_matches('"');
            // strip a trailing comment
            let value = value.split('#').next().unwrap_or("").trim();
            let span = Span::at(line_start, line.trim_end().len());

            match key {
                "strategy" => {
                    config.strategy = value
                        .trim_matches('"')
                        .parse()
                        .map_err(|e: String| Diagnostic::error(e, span))?;
                }
                "step_limit" => {
                    config.step_limit = match value.trim_matches('"') {
                        "none" | "unlimited" => None,
                        n => Some(parse_number(key, n, span)? as u64),
                    };
                }
                "arena_capacity" => {
                    let capacity = parse_number(key, value, span)?;
                    if capacity == 0 {
                        return Err(Diagnostic::error(
                            "'arena_capacity' must be at least 1".to_string(),
                            span,
                        ));
                    }
                    config.arena_capacity = capacity;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Try to find a treecalc.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}

fn parse_number(key: &str, value: &str, span: Span) -> Result<usize, Diagnostic> {
    value.replace('_', "").parse::<usize>().map_err(|_| {
        Diagnostic::error(
            format!("'{}' expects a non-negative integer, found '{}'", key, value),
            span,
        )
    })
}
