use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::uri::ParseMode;

/// Default capacity of every inter-stage queue
pub const QUEUE_CAPACITY: usize = 1024;

/// Default file the results are mirrored to when saving
pub const RESULTS_FILE: &str = "results.txt";

/// Prefix of environment variables read by [`Options::load`]
pub const ENV_PREFIX: &str = "URLBITS";

/// Which view of each URI a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Host (with port, if any)
    Domains,
    /// Query parameter names
    Keys,
    /// Whole query maps as JSON objects
    #[serde(rename = "kv")]
    KeyValues,
    /// Paths other than `""` and `"/"`
    Paths,
    /// Userinfo credentials
    User,
    /// Query parameter values
    Values,
    /// Every component as indented JSON
    #[default]
    Full,
}

/// Independent mode switches, as given on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub domains: bool,
    pub keys: bool,
    pub kv: bool,
    pub paths: bool,
    pub user: bool,
    pub values: bool,
}

impl ModeFlags {
    pub fn any(&self) -> bool {
        self.domains || self.keys || self.kv || self.paths || self.user || self.values
    }
}

impl Mode {
    /// Resolves the switches to a single mode
    ///
    /// When several are set the first one in the order domains, keys, kv,
    /// paths, user, values wins. None set means [`Mode::Full`].
    pub fn from_flags(flags: ModeFlags) -> Self {
        if flags.domains {
            Mode::Domains
        } else if flags.keys {
            Mode::Keys
        } else if flags.kv {
            Mode::KeyValues
        } else if flags.paths {
            Mode::Paths
        } else if flags.user {
            Mode::User
        } else if flags.values {
            Mode::Values
        } else {
            Mode::Full
        }
    }
}

/// Immutable settings for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub mode: Mode,
    pub parse_mode: ParseMode,
    /// Drop URIs missing a scheme or a host
    pub validate: bool,
    /// Report every dropped record
    pub verbose: bool,
    /// Mirror the output to `output`
    pub save: bool,
    pub output: PathBuf,
    pub queue_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Full,
            parse_mode: ParseMode::Request,
            validate: false,
            verbose: false,
            save: false,
            output: PathBuf::from(RESULTS_FILE),
            queue_capacity: QUEUE_CAPACITY,
        }
    }
}

impl Options {
    /// Loads options from an optional config file, then `URLBITS_*`
    /// environment variables, falling back to the defaults for anything unset
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let settings = builder.build().context("Failed to read configuration")?;
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_selects_full_record() {
        assert_eq!(Mode::from_flags(ModeFlags::default()), Mode::Full);
        assert!(!ModeFlags::default().any());
    }

    #[test]
    fn test_flag_priority_order() {
        let all = ModeFlags {
            domains: true,
            keys: true,
            kv: true,
            paths: true,
            user: true,
            values: true,
        };
        assert_eq!(Mode::from_flags(all), Mode::Domains);
        assert_eq!(
            Mode::from_flags(ModeFlags { domains: false, ..all }),
            Mode::Keys
        );
        assert_eq!(
            Mode::from_flags(ModeFlags { paths: true, values: true, ..ModeFlags::default() }),
            Mode::Paths
        );
        assert_eq!(
            Mode::from_flags(ModeFlags { values: true, ..ModeFlags::default() }),
            Mode::Values
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("urlbits-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "mode = \"kv\"\nvalidate = true\nqueue_capacity = 8\nparse_mode = \"reference\"\n",
        )
        .unwrap();

        let options = Options::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(options.mode, Mode::KeyValues);
        assert_eq!(options.parse_mode, ParseMode::Reference);
        assert!(options.validate);
        assert!(!options.verbose);
        assert_eq!(options.queue_capacity, 8);
        assert_eq!(options.output, PathBuf::from(RESULTS_FILE));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("urlbits-{}.toml", uuid::Uuid::new_v4()));
        assert!(Options::load(Some(&path)).is_err());
    }
}
