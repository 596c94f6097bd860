//! Run configuration for the postcode matcher.

use crate::error::{MatchError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default acceptance radius for a nearest-postcode match, in metres.
pub const DEFAULT_MAX_MATCH_DISTANCE_M: f64 = 500.0;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MatchConfig {
    /// Property table (id, latitude, longitude)
    pub properties_path: PathBuf,

    /// Postcode gazetteer (postcode, latitude, longitude)
    pub postcodes_path: PathBuf,

    /// Where the property -> postcode table is written
    pub output_path: PathBuf,

    /// Matches further than this are kept in the output without a postcode (default: 500)
    #[serde(default = "default_max_match_distance")]
    pub max_match_distance_m: f64,

    /// Run the query phase on the rayon pool (default: false)
    #[serde(default)]
    pub parallel: bool,
}

fn default_max_match_distance() -> f64 {
    DEFAULT_MAX_MATCH_DISTANCE_M
}

/// Field-by-field overrides, typically from the command line.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub properties_path: Option<PathBuf>,
    pub postcodes_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub max_match_distance_m: Option<f64>,
    pub parallel: Option<bool>,
}

impl MatchConfig {
    pub fn new(
        properties_path: impl Into<PathBuf>,
        postcodes_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            properties_path: properties_path.into(),
            postcodes_path: postcodes_path.into(),
            output_path: output_path.into(),
            max_match_distance_m: DEFAULT_MAX_MATCH_DISTANCE_M,
            parallel: false,
        }
    }

    /// Load configuration from a TOML file. Relative paths in the file are
    /// taken relative to the file's own directory. Not validated; see
    /// [`Self::resolve`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MatchError::io(path, e))?;
        let mut config: Self = toml::from_str(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.properties_path,
            &mut self.postcodes_path,
            &mut self.output_path,
        ] {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = base.join(&*path);
            }
        }
    }

    /// Build a config from an optional file plus overrides. Without a file,
    /// all three paths must be supplied as overrides.
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => {
                let missing = |name: &str| {
                    MatchError::Config(format!("{name} is required when no config file is given"))
                };
                Self::new(
                    overrides
                        .properties_path
                        .clone()
                        .ok_or_else(|| missing("properties path"))?,
                    overrides
                        .postcodes_path
                        .clone()
                        .ok_or_else(|| missing("postcodes path"))?,
                    overrides
                        .output_path
                        .clone()
                        .ok_or_else(|| missing("output path"))?,
                )
            }
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(p) = overrides.properties_path {
            self.properties_path = p;
        }
        if let Some(p) = overrides.postcodes_path {
            self.postcodes_path = p;
        }
        if let Some(p) = overrides.output_path {
            self.output_path = p;
        }
        if let Some(d) = overrides.max_match_distance_m {
            self.max_match_distance_m = d;
        }
        if let Some(p) = overrides.parallel {
            self.parallel = p;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.max_match_distance_m.is_finite() || self.max_match_distance_m < 0.0 {
            return Err(MatchError::Config(format!(
                "max_match_distance_m must be a non-negative number, got {}",
                self.max_match_distance_m
            )));
        }
        for (name, path) in [
            ("properties_path", &self.properties_path),
            ("postcodes_path", &self.postcodes_path),
            ("output_path", &self.output_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(MatchError::Config(format!("{name} cannot be empty")));
            }
        }
        Ok(())
    }
}
