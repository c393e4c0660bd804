//! sockcu
//!
//! Connect the terminal to a Unix domain stream socket.

use std::path::{Path, PathBuf};

use clap::Parser;
use sockcu::config::{Config, ConfigError};
use sockcu::error::{RelayError, Result, EX_OK, EX_USAGE};
use sockcu::{Connection, RawMode, Session, ShutdownSignals, Termination, TrafficLog};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// sockcu - cu-style console client for Unix domain stream sockets.
///
/// Type CR ~ . (return, tilde, period) to disconnect.
#[derive(Parser, Debug)]
#[command(name = "sockcu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path of the Unix stream socket to connect to
    #[arg(value_name = "SOCKET")]
    pub socket: PathBuf,

    /// Append everything received from the socket to FILE
    #[arg(short, long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Escape character of the CR <char> . disconnect sequence
    #[arg(short, long, value_name = "CHAR")]
    pub escape_char: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write diagnostics to FILE instead of stderr
    #[arg(long, value_name = "FILE")]
    pub trace_file: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here too.
            let code = if e.use_stderr() { EX_USAGE } else { EX_OK };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match run(&cli) {
        Ok(termination) => {
            eprintln!("[{}]", termination);
            std::process::exit(EX_OK);
        }
        Err(e) => {
            eprintln!("sockcu: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Everything between argument parsing and process exit.
///
/// Returns only after the terminal has been restored and diagnostics flushed.
fn run(cli: &Cli) -> Result<Termination> {
    let config = load_config(cli)?;
    let _trace_guard = init_tracing(cli, &config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(RelayError::Runtime)?;

    let result = runtime.block_on(relay(cli, &config));

    // A blocking stdin read may still be parked on the runtime's thread pool.
    runtime.shutdown_background();

    if let Err(e) = &result {
        tracing::error!("{}", e);
    }
    result
}

/// Load the config file and apply environment and command line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let mut config = loaded.map_err(|e| ConfigError::Load(format!("{:#}", e)))?;

    config.apply_env_overrides();

    if let Some(escape_char) = &cli.escape_char {
        config.session.escape_char = escape_char.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Install the tracing subscriber.
///
/// The returned guard must outlive every log call; dropping it flushes the
/// file writer.
fn init_tracing(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };

    let Some(path) = cli.trace_file.as_ref().or(config.logging.file.as_ref()) else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let appender = trace_appender(path)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

/// Open a non-rotating appender for `path`.
fn trace_appender(path: &Path) -> Result<RollingFileAppender> {
    let log_file_error = |message: String| RelayError::LogFile {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, message),
    };

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| log_file_error("not a file name".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| log_file_error(e.to_string()))
}

/// Open the log, connect, go raw, relay, restore.
async fn relay(cli: &Cli, config: &Config) -> Result<Termination> {
    let log = match cli.log.as_ref().or(config.session.log_file.as_ref()) {
        Some(path) => Some(TrafficLog::open(path).await?),
        None => None,
    };

    let connection = Connection::connect(&cli.socket).await?;
    let detector = config.escape_detector()?;

    let raw = RawMode::enter(std::io::stdin())?;
    let mut signals = ShutdownSignals::install()?;

    let (remote_in, remote_out) = connection.into_split();
    let mut session = Session::new(tokio::io::stdin(), tokio::io::stdout(), remote_in, remote_out)
        .with_detector(detector)
        .with_buffer_size(config.session.buffer_size);
    if let Some(log) = log {
        session = session.with_log(log);
    }

    let result = session.run(signals.recv()).await;

    if let Err(e) = raw.restore() {
        tracing::warn!("Failed to restore terminal: {}", e);
    }

    result
}
