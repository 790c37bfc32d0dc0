//! Command line parsing

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Interactive viewer for binary STL meshes
#[derive(Parser, Debug, PartialEq)]
#[command(name = "stlview", version, about)]
pub struct Cli {
    /// Binary STL file to display
    #[arg(value_name = "STL_FILE")]
    pub stl_file: PathBuf,
}

/// Outcome of argument parsing that is not a usable [`Cli`]
#[derive(Debug)]
pub enum CliExit {
    /// `--help` or `--version`; clap prints and exits successfully
    Info(clap::Error),
    /// Wrong arguments; print usage and fail
    Usage(String),
}

impl Cli {
    pub fn parse_args<I, T>(args: I) -> Result<Self, CliExit>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|err| match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliExit::Info(err),
            _ => CliExit::Usage(Self::command().render_usage().to_string()),
        })
    }
}
