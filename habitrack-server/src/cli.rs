use chrono::NaiveDate;
use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml, optional)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5151 or config.listen_port)
  RUST_LOG    (default: info)

The `backfill` command runs one auto-complete pass and exits.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "habitrack-server",
    version,
    about = "Habitrack server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fill missing check-ins for auto-complete habits, then exit
    Backfill {
        /// Date to treat as today (YYYY-MM-DD); defaults to the configured timezone's date
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}
