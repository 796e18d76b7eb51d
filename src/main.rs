//! yubikey-validate - check a YubiKey OTP against the Yubico validation servers.

use std::env;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yubikey_validate::config::Settings;
use yubikey_validate::{QuorumMode, ValidateResult, ValidationService, Verdict};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

/// Exit code for a fatal error (no verdict).
const EXIT_ERROR: u8 = 2;

/// Parsed command line.
#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    api_key: Option<String>,
    client_id: Option<String>,
    multi: bool,
    first: bool,
    insecure: bool,
    json: bool,
    otp: Option<String>,
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().skip(1).collect();

    if raw.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if raw.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run '{} --help' for usage.", NAME);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let Some(otp) = args.otp.clone() else {
        eprintln!("No OTP specified");
        return ExitCode::from(EXIT_ERROR);
    };

    // Load configuration
    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // Initialize logging based on configuration
    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    info!("Starting {} v{}", NAME, VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match runtime.block_on(run(&settings, &otp)) {
        Ok(verdict) => {
            if let Err(e) = print_verdict(&verdict, args.json) {
                error!(error = %e, "Failed to print verdict");
                return ExitCode::from(EXIT_ERROR);
            }
            if verdict.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!(error = %e, "Validation failed");
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run one check with the effective settings.
async fn run(settings: &Settings, otp: &str) -> Result<Verdict, Box<dyn std::error::Error>> {
    let service = ValidationService::from_settings(settings)?;
    Ok(service.check(otp, settings.quorum.multi_host).await?)
}

/// Load the config file (if any) and apply command line overrides.
fn load_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if let Some(api_key) = &args.api_key {
        settings.credentials.api_key = Some(api_key.clone());
    }
    if let Some(client_id) = &args.client_id {
        settings.credentials.client_id = Some(client_id.clone());
    }
    if args.multi {
        settings.quorum.multi_host = true;
    }
    if args.first {
        settings.quorum.mode = QuorumMode::AnyFirst;
    }
    if args.insecure {
        settings.transport.secure = false;
    }

    settings.validate()?;
    Ok(settings)
}

fn print_verdict(verdict: &Verdict, json: bool) -> ValidateResult<()> {
    println!("{}", render_verdict(verdict, json)?);
    Ok(())
}

fn render_verdict(verdict: &Verdict, json: bool) -> ValidateResult<String> {
    if json {
        Ok(serde_json::to_string_pretty(verdict)?)
    } else {
        Ok(verdict.success.to_string())
    }
}

/// Parse command line arguments (simple std::env approach).
fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = raw.iter();

    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {}", name))
        };

        match arg.as_str() {
            "-c" | "--config" => args.config = Some(value(arg.as_str())?),
            "--api-key" => args.api_key = Some(value(arg.as_str())?),
            "--client-id" => args.client_id = Some(value(arg.as_str())?),
            "--multi" => args.multi = true,
            "--first" => args.first = true,
            "--insecure" => args.insecure = true,
            "--json" => args.json = true,
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    args.config = Some(path.to_string());
                } else if other.starts_with('-') {
                    return Err(format!("Unknown option '{}'", other));
                } else if args.otp.is_some() {
                    return Err("Only one OTP may be given".to_string());
                } else {
                    args.otp = Some(other.to_string());
                }
            }
        }
    }

    Ok(args)
}

/// Initialize logging based on settings. Logs go to stderr; stdout carries
/// the verdict.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Validate a YubiKey OTP against the Yubico validation servers.

USAGE:
    {} [OPTIONS] <OTP>

OPTIONS:
    -c, --config <PATH>      Path to a TOML configuration file
        --api-key <BASE64>   API key (overrides the config file)
        --client-id <ID>     Client ID (overrides the config file)
        --multi              Query every host in the pool
        --first              Let the fastest host decide
        --insecure           Use http instead of https
        --json               Print the full verdict as JSON
    -h, --help               Print help information
    -V, --version            Print version information

EXIT STATUS:
    0 valid OTP, 1 invalid OTP, 2 error
"#,
        NAME, VERSION, NAME
    );
}
