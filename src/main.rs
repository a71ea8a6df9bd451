//! docqa command-line entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use docqa::cli::{Cli, execute};
use docqa::config::ConfigProvider;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so answers and MCP stdio traffic stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ConfigProvider::from_env();
    match execute(&cli, &config) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = std::io::stdout().lock();
                let _ = write!(stdout, "{output}");
                let _ = stdout.flush();
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Error: {e}");
            ExitCode::FAILURE
        }
    }
}
