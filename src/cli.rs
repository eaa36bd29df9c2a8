use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "webaudit", about = "Single-shot website audit engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP audit server
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Audit a single URL and print the report as JSON
    Audit {
        /// Target URL (scheme optional, https assumed)
        url: String,

        /// Skip the in-process cache
        #[arg(long)]
        nocache: bool,

        /// Persist the report and include share links
        #[arg(long)]
        snapshot: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}
