use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory")]
    NoHome,

    #[error("home_dir must be absolute after expansion, got '{0}'")]
    NotAbsolute(String),

    #[error("failed to create home_dir '{path}'")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn platform_home() -> Result<PathBuf, HomeDirError> {
    dirs::home_dir()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(HomeDirError::NoHome)
}

/// Expand a leading `~` (alone or followed by a separator) into the platform home.
fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the server home directory.
///
/// - `None` => `<platform home>/<default_subdir>`
/// - `Some("~/x")` => `<platform home>/x`
/// - relative paths are rejected, absolute paths are kept.
///
/// When `create` is set the directory is created (including parents).
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_home()?.join(default_subdir),
    };

    if !path.is_absolute() {
        return Err(HomeDirError::NotAbsolute(path.to_string_lossy().into_owned()));
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_string_lossy().into_owned(),
        source,
    })
}
