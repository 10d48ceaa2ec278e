mod attendance;
mod clock;
mod config;
mod filters;
mod ipc;
mod timetable;

use std::io::{self, BufRead, Write};

use config::CampusConfig;

fn init_tracing(filter: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // stdout carries the protocol; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = CampusConfig::from_env();
    init_tracing(&config.log_filter)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        utc_offset_minutes = config.utc_offset_minutes,
        default_window = %config.default_window,
        grid_start = %config.grid_start,
        grid_end = %config.grid_end,
        grid_step_minutes = config.grid_step_minutes,
        "campusd ready"
    );

    let mut state = ipc::AppState { config };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "bad request line");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
