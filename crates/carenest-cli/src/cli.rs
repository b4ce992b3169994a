use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CareNest: search and live updates for a child's care records.
#[derive(Parser, Debug)]
#[command(name = "carenest", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search every record category of one child.
    Search {
        /// Child profile id.
        #[arg(long)]
        child: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Query text. Reads queries line by line from stdin when omitted.
        query: Option<String>,
    },

    /// Follow record changes and who else is online until Ctrl-C.
    Watch {
        /// Child profile id.
        #[arg(long)]
        child: String,

        /// Presence key; a random session id when omitted.
        #[arg(long)]
        user: Option<String>,

        /// Display name announced to other caregivers.
        #[arg(long)]
        name: Option<String>,

        /// Do not print change toasts.
        #[arg(long)]
        quiet: bool,
    },

    /// Print the effective configuration as JSON.
    Config,
}

pub fn parse() -> Args {
    Args::parse()
}
