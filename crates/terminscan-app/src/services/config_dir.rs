// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration file resolution.

use std::path::{Path, PathBuf};

use terminscan_core::PipelineConfig;
use terminscan_core::error::Result;
use tracing::{debug, info};

const CONFIG_FILENAME: &str = "config.toml";

/// Return the application config directory. Not created here.
pub fn config_dir() -> PathBuf {
    config_base().join("terminscan")
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

fn config_base() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from(".")
}

/// Load the pipeline configuration.
///
/// An explicit path must exist. Without one the default location is tried
/// and built-in defaults are used when nothing is there.
pub fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "Loading configuration");
        return PipelineConfig::load(path);
    }
    let path = default_config_path();
    if path.exists() {
        info!(path = %path.display(), "Loading configuration");
        PipelineConfig::load(&path)
    } else {
        debug!(path = %path.display(), "No configuration file; using defaults");
        Ok(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminscan_core::error::TerminError;

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("terminscan/config.toml"));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[parser]\ndefault_duration_minutes = 45\n").expect("write");
        let config = load_config(Some(path.as_path())).expect("load");
        assert_eq!(config.parser.default_duration_minutes, 45);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/terminscan.toml")));
        assert!(matches!(result, Err(TerminError::Io(_))));
    }
}
