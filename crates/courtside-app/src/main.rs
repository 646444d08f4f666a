// Court-side display server entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database
// 4. Serve polls until Ctrl+C, or print a single snapshot

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{error, info};

use courtside_app::config;
use courtside_app::service::{LiveService, PollRequest};
use courtside_app::ws_server;
use courtside_core::db::Database;

const USAGE: &str = "usage: courtside [serve | snapshot <session_id> [sim_time_iso]]";

enum Command {
    Serve,
    Snapshot {
        session_id: i64,
        sim_time_iso: Option<String>,
    },
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args.first().map(String::as_str) {
        None | Some("serve") => Ok(Command::Serve),
        Some("snapshot") => {
            let Some(raw_id) = args.get(1) else {
                bail!("missing session id\n{USAGE}");
            };
            let session_id = raw_id
                .parse()
                .with_context(|| format!("invalid session id `{raw_id}`"))?;
            Ok(Command::Snapshot {
                session_id,
                sim_time_iso: args.get(2).cloned(),
            })
        }
        Some(other) => bail!("unknown command `{other}`\n{USAGE}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    // 1. Initialize tracing
    init_tracing()?;
    info!("Courtside starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: timezone={}, alert window {}s/{}s",
        config.timezone.name(),
        config.alert_window.lead_seconds,
        config.alert_window.lag_seconds
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let service = Arc::new(LiveService::new(db, config.live_settings()));

    // 4. Run the requested command
    match command {
        Command::Snapshot {
            session_id,
            sim_time_iso,
        } => {
            let request = PollRequest {
                session_id,
                sim_time_iso,
            };
            let response = service.poll(&request, Utc::now());
            let json = serde_json::to_string_pretty(&response)
                .context("failed to serialize snapshot")?;
            println!("{json}");
        }
        Command::Serve => {
            let port = config.ws_port;
            let server = tokio::spawn(async move {
                if let Err(e) = ws_server::run(port, service).await {
                    error!("WebSocket server error: {e}");
                }
            });
            info!("Ready. WebSocket server listening on 127.0.0.1:{port}");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;

            // The server loops forever.
            server.abort();
        }
    }

    info!("Courtside shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping stdout clean for snapshot
/// output.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("courtside=info,courtside_app=info,courtside_core=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
