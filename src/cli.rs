use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::config::{Mode, ModeFlags, Options};
use crate::uri::ParseMode;

/// Extract hosts, paths, query keys and values, or credentials from a stream
/// of URLs, one per line.
///
/// Mode switches are checked in the order domains, keys, kv, paths, user,
/// values; the first one set wins. Without any, every URL is printed as an
/// indented JSON record.
#[derive(Parser, Debug)]
#[command(name = "urlbits", version)]
pub struct Args {
    /// Output domains (host and port)
    #[arg(long)]
    pub domains: bool,

    /// Output query keys
    #[arg(long)]
    pub keys: bool,

    /// Output query keys and values as JSON objects
    #[arg(long)]
    pub kv: bool,

    /// Output paths
    #[arg(long)]
    pub paths: bool,

    /// Output username and password
    #[arg(long)]
    pub user: bool,

    /// Output query values
    #[arg(long)]
    pub values: bool,

    /// Strip out URLs without a scheme and host (--validate=false turns a
    /// configured validation off)
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub validate: Option<bool>,

    /// Report every line that is dropped, and why
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub verbose: Option<bool>,

    /// Save output to a file as well
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub save: Option<bool>,

    /// File used by --save [default: results.txt]
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Read URLs from FILE instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Accept relative references and split off #fragments
    #[arg(long)]
    pub reference: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write logs to a timestamped file in DIR instead of stderr
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            domains: self.domains,
            keys: self.keys,
            kv: self.kv,
            paths: self.paths,
            user: self.user,
            values: self.values,
        }
    }

    /// Layers the command line over the loaded configuration
    ///
    /// Only settings given on the command line are replaced. A mode switch
    /// replaces the configured mode.
    pub fn apply(&self, mut options: Options) -> Options {
        let flags = self.mode_flags();
        if flags.any() {
            options.mode = Mode::from_flags(flags);
        }
        if self.reference {
            options.parse_mode = ParseMode::Reference;
        }
        if let Some(validate) = self.validate {
            options.validate = validate;
        }
        if let Some(verbose) = self.verbose {
            options.verbose = verbose;
        }
        if let Some(save) = self.save {
            options.save = save;
        }
        if let Some(output) = &self.output {
            options.output = output.clone();
        }
        options
    }

    /// Final run options: configuration file, then environment, then flags
    pub fn options(&self) -> Result<Options> {
        Ok(self.apply(Options::load(self.config.as_deref())?))
    }
}
