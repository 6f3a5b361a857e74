use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "graphcop",
    version,
    about = "Checks field layout in graphql-ruby type classes"
)]
pub struct Args {
    /// Files or directories to lint
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Read source from stdin, using PATH for display and Include/Exclude matching
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// List all built-in cop names, one per line, then exit
    #[arg(long)]
    pub list_cops: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
