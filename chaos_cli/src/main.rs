mod commands;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chaos-prometheus")]
#[command(about = "Prometheus probes, push-gateway control and threshold checks for chaos experiments", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (YAML, TOML, or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Secrets file (YAML, TOML, or JSON)
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    /// Prometheus base URL, overrides the configuration file
    #[arg(long, global = true, env = "PROMETHEUS_BASE_URL")]
    prometheus_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the discovery document
    Discover {
        /// Skip system information
        #[arg(long)]
        no_system: bool,
    },

    /// Run an instant query
    Query {
        query: String,

        /// Evaluation time (RFC 3339, unix seconds, or e.g. "5 minutes ago")
        #[arg(short, long)]
        when: Option<String>,

        /// Evaluation timeout in seconds
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Run a range query
    QueryRange {
        query: String,

        #[arg(short, long)]
        start: String,

        #[arg(short, long, default_value = "now")]
        end: String,

        /// Resolution in seconds (0 lets the server decide)
        #[arg(long, default_value_t = 1)]
        step: u64,

        #[arg(short, long)]
        timeout: Option<f64>,

        #[arg(long)]
        json: bool,
    },

    /// Run an instant query that yields exactly one value and print it
    QueryValue {
        query: String,

        #[arg(short, long)]
        when: Option<String>,

        #[arg(short, long)]
        timeout: Option<f64>,
    },

    /// Check query results against a threshold
    #[command(group(clap::ArgGroup::new("bound").required(true).args(["below", "above"])))]
    Verify {
        query: String,

        /// Every value must be strictly below this
        #[arg(long)]
        below: Option<f64>,

        /// Every value must be strictly above this
        #[arg(long)]
        above: Option<f64>,

        #[arg(short, long, conflicts_with_all = ["start", "end"])]
        when: Option<String>,

        /// Check a range instead of an instant
        #[arg(long, requires = "end")]
        start: Option<String>,

        #[arg(long, requires = "start")]
        end: Option<String>,

        #[arg(long, default_value_t = 1)]
        step: u64,
    },

    /// Record or compare against a saved baseline
    Baseline {
        #[command(subcommand)]
        action: commands::baseline::BaselineAction,
    },

    /// Push lifecycle metrics for a finished run to the push gateway
    Control {
        /// Journal of the finished run (JSON)
        #[arg(short, long)]
        journal: PathBuf,

        /// Experiment document, used to derive the experiment reference
        #[arg(short, long)]
        experiment: Option<PathBuf>,

        #[arg(long)]
        pushgateway_url: Option<String>,

        #[arg(long)]
        job: Option<String>,

        /// Grouping key entries as label=value
        #[arg(short, long)]
        grouping: Vec<String>,

        #[arg(long)]
        trace_id: Option<String>,

        #[arg(long)]
        experiment_ref: Option<String>,

        #[arg(long)]
        verify_tls: Option<String>,
    },
}

fn init_tracing(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &cli.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if cli.log_json {
                builder.json().with_writer(writer).with_ansi(false).init();
            } else {
                builder.with_writer(writer).with_ansi(false).init();
            }
            Ok(Some(guard))
        }
        None => {
            if cli.log_json {
                builder.json().with_writer(std::io::stderr).init();
            } else {
                builder.with_writer(std::io::stderr).init();
            }
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; the guard flushes the log file on exit
    let _guard = init_tracing(&cli)?;

    let settings = commands::Settings::load(
        cli.config.as_deref(),
        cli.secrets.as_deref(),
        cli.prometheus_url.as_deref(),
    )
    .await?;

    match cli.command {
        Commands::Discover { no_system } => {
            commands::discover::execute(!no_system)?;
        }

        Commands::Query {
            query,
            when,
            timeout,
            json,
        } => {
            commands::query::instant(&settings, query, when, timeout, json).await?;
        }

        Commands::QueryRange {
            query,
            start,
            end,
            step,
            timeout,
            json,
        } => {
            commands::query::range(&settings, query, start, end, step, timeout, json).await?;
        }

        Commands::QueryValue {
            query,
            when,
            timeout,
        } => {
            commands::query::value(&settings, query, when, timeout).await?;
        }

        Commands::Verify {
            query,
            below,
            above,
            when,
            start,
            end,
            step,
        } => {
            let window = start.zip(end);
            commands::verify::execute(&settings, query, below, above, when, window, step).await?;
        }

        Commands::Baseline { action } => {
            commands::baseline::execute(&settings, action).await?;
        }

        Commands::Control {
            journal,
            experiment,
            pushgateway_url,
            job,
            grouping,
            trace_id,
            experiment_ref,
            verify_tls,
        } => {
            let args = commands::control::build_args(
                pushgateway_url,
                job,
                grouping,
                trace_id,
                experiment_ref,
                verify_tls,
            )?;
            commands::control::execute(&settings, journal, experiment, args).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verify_requires_a_bound() {
        assert!(Cli::try_parse_from(["chaos-prometheus", "verify", "up"]).is_err());
        assert!(Cli::try_parse_from(["chaos-prometheus", "verify", "up", "--below", "1", "--above", "0"]).is_err());
        assert!(Cli::try_parse_from(["chaos-prometheus", "verify", "up", "--below", "1"]).is_ok());
    }

    #[test]
    fn test_verify_when_conflicts_with_window() {
        let parsed = Cli::try_parse_from([
            "chaos-prometheus", "verify", "up", "--below", "1", "--when", "now", "--start",
            "1 hour ago", "--end", "now",
        ]);
        assert!(parsed.is_err());

        assert!(Cli::try_parse_from([
            "chaos-prometheus", "verify", "up", "--below", "1", "--start", "1 hour ago", "--end",
            "now",
        ])
        .is_ok());
        assert!(Cli::try_parse_from([
            "chaos-prometheus", "verify", "up", "--below", "1", "--when", "5 minutes ago",
        ])
        .is_ok());
    }
}
