use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use chatrelay::config::ServerSettings;
use chatrelay::log::{FacadeLogSink, LogLevel, LogSink};
use chatrelay::signaling::run::{CONFIG_ENV_VAR, load_config, run_signaling_server};

/// Presence and call-signaling relay for the chat app.
///
/// Settings come from an INI-style file (`--config` or `CHATRELAY_CONFIG`);
/// flags given here override it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<String>,

    /// Listen address, e.g. 0.0.0.0:5000
    #[arg(short, long)]
    bind: Option<String>,

    /// trace | debug | info | warn | error (RUST_LOG still wins when set)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[chatrelay_server] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let mut settings = ServerSettings::from_config(&config)?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_filter().as_str()),
    )
    .init();

    let log: Arc<dyn LogSink> = Arc::new(FacadeLogSink);
    log::info!(
        "starting on {} ({})",
        settings.bind_addr,
        if settings.tls.is_some() { "wss" } else { "ws" }
    );
    run_signaling_server(&settings, log)?;
    Ok(())
}
