//! `configmgr` - runs the Config CRUD server and the reconciler.

use std::path::PathBuf;
use std::process::ExitCode;

use configmgr::App;
use configmgr_config::{ConfigError, ConfigLoader, ManagerConfig, ENV_PREFIX};
use configmgr_plugin::ShutdownSignal;
use tracing::{error, info};

const DEFAULT_CONFIG_FILE: &str = "configmgr.toml";

struct Args {
    config: Option<PathBuf>,
    development: bool,
}

enum Command {
    Run(Args),
    Exit(ExitCode),
}

impl Args {
    fn parse() -> Command {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            config: None,
            development: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => parsed.config = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("--config requires a path");
                        return Command::Exit(ExitCode::from(2));
                    }
                },
                "--dev" => parsed.development = true,
                "--help" | "-h" => {
                    print_help();
                    return Command::Exit(ExitCode::SUCCESS);
                }
                "--version" | "-V" => {
                    println!("configmgr {}", env!("CARGO_PKG_VERSION"));
                    return Command::Exit(ExitCode::SUCCESS);
                }
                other => {
                    eprintln!("unknown argument: {other}");
                    eprintln!("use --help for usage information");
                    return Command::Exit(ExitCode::from(2));
                }
            }
        }

        Command::Run(parsed)
    }
}

fn print_help() {
    println!(
        r"configmgr - Config resource reconciler and CRUD server

USAGE:
    configmgr [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Configuration file (TOML or JSON).
                           Defaults to ./{DEFAULT_CONFIG_FILE} when present.
        --dev              Start from development defaults (debug, pretty logs)
    -h, --help             Print help
    -V, --version          Print version

ENVIRONMENT:
    {ENV_PREFIX}__SECTION__KEY overrides a file value, for example
    {ENV_PREFIX}__SERVER__HTTP_ADDR=127.0.0.1:9000
    {ENV_PREFIX}__PLUGIN__NAMESPACE=ns1
    {ENV_PREFIX}__OPERATOR__RESYNC_INTERVAL_SECS=300
    {ENV_PREFIX}__AUTHORIZATION__MODE=rbac
    {ENV_PREFIX}__TELEMETRY__LOGGING__LEVEL=debug

    A .env file in the working directory is loaded first."
    );
}

fn load_config(args: &Args) -> Result<ManagerConfig, ConfigError> {
    let mut loader = ConfigLoader::new().with_dotenv()?;
    if args.development {
        loader = loader.with_development();
    }
    loader = match &args.config {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE)?,
    };
    loader.with_env_prefix(ENV_PREFIX).load()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::parse() {
        Command::Run(args) => args,
        Command::Exit(code) => return code,
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _telemetry = match configmgr_telemetry::init_telemetry(&config.telemetry_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize telemetry: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.http_addr,
        namespace = %config.plugin.namespace,
        operator = config.operator.enabled,
        "starting configmgr"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build application");
            return ExitCode::FAILURE;
        }
    };

    match app.run(ShutdownSignal::with_os_signals()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "configmgr failed");
            ExitCode::FAILURE
        }
    }
}
