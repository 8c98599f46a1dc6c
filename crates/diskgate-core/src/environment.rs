//! Host environment detection
//!
//! On Colab, download links get an attachment disposition and skip the HEAD
//! check. Downloads there land in a local cache directory when no path is
//! given.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

const COLAB_VARS: &[&str] = &["COLAB_RELEASE_TAG", "COLAB_GPU"];
const COLAB_CACHE_DIR: &str = "/content/yadisk_cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Colab,
    Jupyter,
    Standalone,
}

impl Environment {
    /// Detect from the process environment
    pub fn detect() -> Self {
        Self::from_vars(std::env::vars().map(|(key, _)| key))
    }

    /// Detect from a set of variable names
    pub fn from_vars<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut jupyter = false;
        for name in names {
            let name = name.as_ref();
            if COLAB_VARS.contains(&name) {
                return Environment::Colab;
            }
            if name == "JPY_PARENT_PID" || name.starts_with("JUPYTER_") {
                jupyter = true;
            }
        }
        if jupyter {
            Environment::Jupyter
        } else {
            Environment::Standalone
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Colab => "colab",
            Environment::Jupyter => "jupyter",
            Environment::Standalone => "standalone",
        }
    }

    pub fn is_colab(&self) -> bool {
        matches!(self, Environment::Colab)
    }

    /// Where downloads are saved when the caller gives no local path
    pub fn default_cache_dir(&self) -> Option<PathBuf> {
        match self {
            Environment::Colab => Some(PathBuf::from(COLAB_CACHE_DIR)),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection() {
        assert_eq!(Environment::from_vars(["HOME", "COLAB_GPU"]), Environment::Colab);
        assert_eq!(
            Environment::from_vars(["JPY_PARENT_PID", "COLAB_RELEASE_TAG"]),
            Environment::Colab
        );
        assert_eq!(Environment::from_vars(["JPY_PARENT_PID"]), Environment::Jupyter);
        assert_eq!(
            Environment::from_vars(["JUPYTER_SERVER_ROOT"]),
            Environment::Jupyter
        );
        assert_eq!(Environment::from_vars(["HOME", "PATH"]), Environment::Standalone);
        assert_eq!(Environment::from_vars(Vec::<String>::new()), Environment::Standalone);
    }

    #[test]
    fn test_cache_dir_only_on_colab() {
        assert_eq!(
            Environment::Colab.default_cache_dir(),
            Some(PathBuf::from("/content/yadisk_cache"))
        );
        assert_eq!(Environment::Jupyter.default_cache_dir(), None);
        assert!(!Environment::Jupyter.is_colab());
        assert!(!Environment::Standalone.is_colab());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Environment::Colab).unwrap(),
            serde_json::json!("colab")
        );
    }
}
