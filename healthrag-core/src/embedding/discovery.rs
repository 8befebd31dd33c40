//! Model cache discovery
//!
//! Decides where fastembed downloads and looks up ONNX models.

use std::path::{Path, PathBuf};

/// Environment variable overriding every other cache location
pub const MODELS_PATH_ENV: &str = "HEALTHRAG_MODELS_PATH";

/// Find the model cache directory with priority:
/// 1. HEALTHRAG_MODELS_PATH environment variable
/// 2. `embedding.cache_dir` from the config
/// 3. User home directory (~/.healthrag/models)
/// 4. `.fastembed_cache` in the working directory
pub fn find_model_cache_dir(configured: Option<&Path>) -> PathBuf {
    if let Ok(models_path) = std::env::var(MODELS_PATH_ENV) {
        if !models_path.trim().is_empty() {
            log::info!("Using {}: {}", MODELS_PATH_ENV, models_path);
            return PathBuf::from(models_path);
        }
        log::warn!("{} is set but empty, ignoring", MODELS_PATH_ENV);
    }

    if let Some(dir) = configured {
        log::info!("Using configured model cache: {}", dir.display());
        return dir.to_path_buf();
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        let user_path = PathBuf::from(home).join(".healthrag").join("models");
        log::debug!("Using user model cache: {}", user_path.display());
        return user_path;
    }

    PathBuf::from(".fastembed_cache")
}
