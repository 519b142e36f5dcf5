//! Ferret: federated search from the command line
//!
//! Each stdin line is a committed query. The sections printed so far are
//! redrawn, ordered by provider priority, as each provider answers.

use anyhow::{bail, Result};
use ferret::{
    client::{ClientRouter, GithubClient, HttpProviderClient},
    config::{self, DiscoveryMode, Settings},
    metrics::Metrics,
    providers::{ProviderDiscovery, StaticDiscovery},
    query::{InputEvent, QueryNormalizer},
    render::TerminalSink,
    search::Session,
};
use futures::Stream;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

enum Command {
    Run {
        config: Option<PathBuf>,
        page: Option<u32>,
    },
    Help,
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, page) = match parse_args(std::env::args().skip(1))? {
        Command::Run { config, page } => (config, page),
        Command::Help => {
            print_usage();
            return Ok(());
        }
        Command::Version => {
            println!("ferret {}", ferret::VERSION);
            return Ok(());
        }
    };

    // Load configuration
    let mut settings = config::load(config.as_deref())?;
    if let Some(page) = page {
        settings.outgoing.page = page;
    }

    // Initialize logging; stdout is reserved for results
    init_logging(settings.general.debug);
    info!("Starting ferret v{}", ferret::VERSION);

    // Initialize clients
    let server = HttpProviderClient::with_settings(&settings.outgoing)?;
    info!("Search server: {}", server.base_url());
    let client = build_router(&settings, &server)?;

    let discovery: Box<dyn ProviderDiscovery> = match settings.discovery {
        DiscoveryMode::Static => Box::new(StaticDiscovery::from_settings(&settings)),
        DiscoveryMode::Remote => Box::new(server),
    };

    // Start the session; a refused start has already alerted the terminal
    let metrics = Arc::new(Metrics::new());
    let session = match Session::start(
        &settings,
        discovery.as_ref(),
        Arc::new(client),
        TerminalSink::stdout(),
        metrics.clone(),
    )
    .await
    {
        Ok(session) => session,
        Err(e) => return Err(e.error.into()),
    };

    let normalizer = QueryNormalizer::new(&settings.search);
    let tokens = normalizer.into_stream(stdin_events(settings.search.commit_key.clone()));
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            futures::future::pending::<()>().await;
        }
    };
    session.run_until(tokens, interrupted).await;

    print_metrics(&metrics);
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut config = None;
    let mut page = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-c" | "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => bail!("{} requires a file argument", arg),
            },
            "-p" | "--page" => match args.next().map(|n| n.parse::<u32>()) {
                Some(Ok(n)) if n > 0 => page = Some(n),
                Some(_) => bail!("invalid page number, it should be greater than 0"),
                None => bail!("{} requires a number", arg),
            },
            other => bail!("unknown argument: {} (see --help)", other),
        }
    }

    Ok(Command::Run { config, page })
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The GitHub provider goes straight to the GitHub API unless providers come
/// from the server, which then serves every provider itself
fn build_router(settings: &Settings, server: &HttpProviderClient) -> Result<ClientRouter> {
    let mut router = ClientRouter::new().with_fallback(Arc::new(server.clone()));

    if settings.discovery == DiscoveryMode::Static {
        let github = GithubClient::new(&settings.github, &settings.outgoing)?;
        router = router.with_route("github", Arc::new(github));
    }

    Ok(router)
}

/// One key-commit event per stdin line
fn stdin_events(commit_key: String) -> impl Stream<Item = InputEvent> {
    let lines = BufReader::new(tokio::io::stdin()).lines();

    futures::stream::unfold(lines, move |mut lines| {
        let key = commit_key.clone();
        async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((InputEvent::key_up(line, key), lines)),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    None
                }
            }
        }
    })
}

fn print_metrics(metrics: &Metrics) {
    eprintln!("\n{} searches", metrics.get_total_cycles());
    for (name, stats) in metrics.get_all_stats() {
        let avg = stats
            .avg_response_time
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "{:<12} dispatched {:>4}  cancelled {:>4}  discarded {:>4}  \
             ok {:>4}  failed {:>4}  avg {:>7}  reliability {:.1}%",
            name,
            stats.dispatched,
            stats.cancelled,
            stats.discarded,
            stats.successes,
            stats.failures,
            avg,
            stats.reliability
        );
    }
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
Ferret v{}
Federated search across your providers

USAGE:
    ferret [OPTIONS]

Reads one query per line from stdin and prints the results of every
provider, highest priority first. Ctrl-C cancels pending lookups and exits.

OPTIONS:
    -c, --config <FILE>    Path to configuration file
    -p, --page <N>         Result page to request from providers (default 1)
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    FERRET_SETTINGS_PATH       Path to ferret.yml
    FERRET_DEBUG               Enable debug logging (1/true/yes/on)
    FERRET_SERVER_URL          Ferret search server URL
    FERRET_SEARCH_TIMEOUT      Provider call timeout (e.g. 5000ms, 5s)
    FERRET_GITHUB_URL          GitHub API URL
    FERRET_GITHUB_TOKEN        GitHub API token
    FERRET_GITHUB_SEARCH_USER  Restrict GitHub code search to this user
    RUST_LOG                   Log filter (overrides FERRET_DEBUG)
"#,
        ferret::VERSION
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_page() {
        match parse(&["-c", "ferret.yml", "--page", "2"]).unwrap() {
            Command::Run { config, page } => {
                assert_eq!(config, Some(PathBuf::from("ferret.yml")));
                assert_eq!(page, Some(2));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_page() {
        assert!(parse(&["--page", "0"]).is_err());
        assert!(parse(&["-p", "two"]).is_err());
        assert!(parse(&["-p"]).is_err());
    }
}
