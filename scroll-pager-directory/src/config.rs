use std::{
    fs,
    path::{Path, PathBuf},
};

use scroll_pager::Threshold;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{DEFAULT_API_URL, DEFAULT_PAGE_SIZE};
use crate::error::{DirectoryError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "user-directory.toml";
const ENV_PREFIX: &str = "DIRECTORY__";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub page_size: u32,
    /// Visible fraction of the last card that triggers the next page.
    pub threshold: f32,
    pub skeleton_count: usize,
    pub viewport_rows: u32,
    pub width: usize,
    /// Upper bound on back-to-back loads while the sentinel stays visible after a step.
    pub fill_rounds: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            threshold: 0.2,
            skeleton_count: 5,
            viewport_rows: 24,
            width: 48,
            fill_rounds: 4,
        }
    }
}

impl Settings {
    /// Loads defaults, then the TOML file, then `DIRECTORY__*` environment variables.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.normalize();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_toml(&raw).map_err(|source| DirectoryError::Config {
            path: PathBuf::from(path),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies `DIRECTORY__*` overrides read through `lookup`. Unparsable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("API_URL") {
            self.api_url = v;
        }
        if let Some(v) = var("PAGE_SIZE") {
            match v.parse() {
                Ok(parsed) => self.page_size = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid DIRECTORY__PAGE_SIZE"),
            }
        }
        if let Some(v) = var("THRESHOLD") {
            match v.parse() {
                Ok(parsed) => self.threshold = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid DIRECTORY__THRESHOLD"),
            }
        }
        if let Some(v) = var("VIEWPORT_ROWS") {
            match v.parse() {
                Ok(parsed) => self.viewport_rows = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid DIRECTORY__VIEWPORT_ROWS"),
            }
        }
    }

    /// Clamps values into their usable ranges.
    pub fn normalize(&mut self) {
        self.threshold = Threshold::new(self.threshold).get();
        self.page_size = self.page_size.max(1);
        self.viewport_rows = self.viewport_rows.max(1);
        self.width = self.width.max(16);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_the_directory_page() {
        let settings = Settings::default();
        assert_eq!(settings.api_url, "https://randomuser.me/api/");
        assert_eq!(settings.page_size, 5);
        assert_eq!(settings.threshold, 0.2);
        assert_eq!(settings.skeleton_count, 5);
    }

    #[test]
    fn toml_overrides_defaults_partially() {
        let settings = Settings::from_toml("page_size = 10\nviewport_rows = 40\n").unwrap();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.viewport_rows, 40);
        assert_eq!(settings.threshold, 0.2);
    }

    #[test]
    fn env_overrides_toml_and_skips_garbage() {
        let mut settings = Settings::from_toml("page_size = 10").unwrap();
        let env: HashMap<&str, &str> = [
            ("DIRECTORY__API_URL", "http://localhost:9000/api/"),
            ("DIRECTORY__PAGE_SIZE", "many"),
            ("DIRECTORY__THRESHOLD", "0.5"),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_url, "http://localhost:9000/api/");
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.threshold, 0.5);
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let mut settings = Settings {
            threshold: 3.0,
            page_size: 0,
            ..Settings::default()
        };
        settings.normalize();
        assert_eq!(settings.threshold, 1.0);
        assert_eq!(settings.page_size, 1);

        settings.threshold = f32::NAN;
        settings.normalize();
        assert_eq!(settings.threshold, 1.0);

        settings.threshold = -0.5;
        settings.normalize();
        assert_eq!(settings.threshold, 0.0);

        settings.threshold = 0.35;
        settings.normalize();
        assert_eq!(settings.threshold, 0.35);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, DirectoryError::Io { .. }));
    }
}
