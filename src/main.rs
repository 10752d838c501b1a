//! Command-line entry point: serve the regular files of a directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use microstatic::{DirectorySource, HttpServer, ResponseRegistry, ServerConfig, ServerError};

/// Serve every regular file of a directory over HTTP/1.1, one thread, no copies per request.
#[derive(Debug, Parser)]
#[command(name = "microstatic", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "MICROSTATIC_PORT")]
    port: Option<u16>,

    /// Directory whose files are served (overrides the config file)
    #[arg(short, long, env = "MICROSTATIC_DIR")]
    dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, env = "MICROSTATIC_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(port) = self.port {
            config.addr.set_port(port);
        }
        if let Some(dir) = &self.dir {
            config.response_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), ServerError> {
    let config = cli.server_config()?;
    let registry = ResponseRegistry::build(DirectorySource::new(&config.response_dir), config.registry_limits())?;

    let mut server = HttpServer::bind(config, registry)?;
    server.run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
