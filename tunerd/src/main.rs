//! tunerd: streaming proxy for a fixed pool of remote-controlled TV tuners.
//!
//! Each playback request picks a tuner, has the remote-control service tune
//! it to the requested channel, and relays the tuner's transport stream as
//! the HTTP response body. The tuner is stopped and returned to the pool
//! when the client disconnects or the stream ends.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

mod logging;
mod remote;
mod tuner;
mod web;

use remote::{HomeAssistantRemote, RemoteConfig};
use tuner::{Allocator, ExplicitSelection, HttpSource, TunerDescriptor, TunerRegistry};

const DEFAULT_LISTEN: &str = "0.0.0.0:7654";
const DEFAULT_CONFIG_FILE: &str = "tunerd.toml";

/// tunerd - tuner pool streaming proxy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Number of days to keep log files
    #[arg(long)]
    log_retention_days: Option<u64>,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    logging: LoggingSection,
    #[serde(default)]
    remote: RemoteSection,
    #[serde(default)]
    timeouts: TimeoutSection,
    #[serde(default)]
    allocator: AllocatorSection,
    #[serde(default)]
    tuners: Vec<TunerSection>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct ServerSection {
    listen: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct RemoteSection {
    base_url: Option<String>,
    token: Option<String>,
    content_id_prefix: Option<String>,
    stop_command: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct TimeoutSection {
    connect_secs: Option<u64>,
    response_secs: Option<u64>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct AllocatorSection {
    #[serde(default)]
    explicit_selection: ExplicitSelection,
}

#[derive(Debug, serde::Deserialize)]
struct TunerSection {
    name: String,
    url: String,
    /// Remote-control device name; defaults to `name`.
    device: Option<String>,
}

impl ConfigFile {
    fn remote_config(&self) -> RemoteConfig {
        let defaults = RemoteConfig::default();
        RemoteConfig {
            base_url: self.remote.base_url.clone().unwrap_or(defaults.base_url),
            token: self.remote.token.clone(),
            content_id_prefix: self
                .remote
                .content_id_prefix
                .clone()
                .unwrap_or(defaults.content_id_prefix),
            stop_command: self.remote.stop_command.clone().unwrap_or(defaults.stop_command),
            connect_timeout: self
                .timeouts
                .connect_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            response_timeout: self
                .timeouts
                .response_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.response_timeout),
        }
    }

    fn tuner_descriptors(&self) -> Result<Vec<TunerDescriptor>, Box<dyn std::error::Error>> {
        if self.tuners.is_empty() {
            return Err("no tuners configured; add at least one [[tuners]] entry".into());
        }

        let mut descriptors = Vec::with_capacity(self.tuners.len());
        for tuner in &self.tuners {
            if tuner.name.is_empty() || tuner.url.is_empty() {
                return Err("every [[tuners]] entry needs a name and a url".into());
            }
            if descriptors.iter().any(|d: &TunerDescriptor| d.name == tuner.name) {
                return Err(format!("duplicate tuner name: {}", tuner.name).into());
            }
            let device = tuner.device.clone().unwrap_or_else(|| tuner.name.clone());
            descriptors.push(TunerDescriptor::new(tuner.name.clone(), device, tuner.url.clone()));
        }
        Ok(descriptors)
    }

    fn listen_addr(
        &self,
        cli: Option<SocketAddr>,
    ) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        if let Some(addr) = cli {
            return Ok(addr);
        }
        let addr = self.server.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
        addr.parse::<SocketAddr>()
            .map_err(|e| format!("invalid listen address {:?}: {}", addr, e).into())
    }
}

fn load_config(path: &PathBuf) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config file: explicit path > ./tunerd.toml > defaults
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        default_path.exists().then_some(default_path)
    });
    let file_config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file {}: {}", path.display(), e);
                return Err(e);
            }
        },
        None => ConfigFile::default(),
    };

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| file_config.logging.log_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let log_retention_days = args
        .log_retention_days
        .or(file_config.logging.retention_days)
        .unwrap_or(7);
    let _log_guard = logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )?;

    let listen_addr = file_config.listen_addr(args.listen)?;
    let descriptors = match file_config.tuner_descriptors() {
        Ok(d) => d,
        Err(e) => {
            error!("Invalid tuner configuration: {}", e);
            return Err(e);
        }
    };
    let remote_config = file_config.remote_config();
    let explicit_selection = file_config.allocator.explicit_selection;

    info!("tunerd starting...");
    info!("  Listen address: {}", listen_addr);
    info!("  Remote control: {}", remote_config.base_url);
    info!("  Explicit selection: {:?}", explicit_selection);
    for (index, d) in descriptors.iter().enumerate() {
        info!("  Tuner {}: {} (device {}) <- {}", index, d.name, d.device, d.url);
    }

    let remote = Arc::new(HomeAssistantRemote::new(&remote_config)?);
    let source = Arc::new(HttpSource::new(
        remote_config.connect_timeout,
        remote_config.response_timeout,
    )?);
    let registry = Arc::new(TunerRegistry::new(descriptors));
    let allocator = Arc::new(Allocator::new(registry, remote, source, explicit_selection));
    let state = Arc::new(web::WebState::new(allocator));

    if let Err(e) = web::start_web_server(listen_addr, state).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
