//! dubhe command-line client.
//!
//! `dubhe-client call` invokes one method on a remote service through the
//! generic entry point and prints the decoded reply as JSON on stdout.
//! Diagnostics go through `tracing`, enabled with `RUST_LOG`.

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing_subscriber::{fmt, EnvFilter};

use dubhe_client::client::Client;
use dubhe_client::config::{self, ClientConfig};
use dubhe_client::render::value_to_json;

#[derive(FromArgs)]
/// Generic client for dubbo-protocol services.
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Call(CallArgs),
}

/// call a remote method and print the reply as JSON
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
struct CallArgs {
    /// path to a YAML config file
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// provider address, overriding the config
    #[argh(option)]
    addr: Option<String>,

    /// fully qualified service interface, or an alias from the config
    #[argh(option, short = 's')]
    service: String,

    /// service version, overriding the alias or the 1.0.0 default
    #[argh(option)]
    version: Option<String>,

    /// method name, sent verbatim
    #[argh(option, short = 'm')]
    method: String,

    /// request timeout in milliseconds, overriding the config
    #[argh(option)]
    timeout_ms: Option<u64>,

    /// arguments as JSON; a single JSON array is spread as the argument list
    #[argh(positional)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli: Cli = argh::from_env();
    match cli.command {
        Command::Call(args) => call(args).await,
    }
}

async fn call(args: CallArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => {
            config::load_from_file(path).with_context(|| format!("loading config {path}"))?
        }
        None => ClientConfig::default(),
    };
    if let Some(addr) = args.addr {
        cfg.client.address = addr;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        cfg.client.request_timeout_ms = timeout_ms;
    }

    let arguments = parse_arguments(&args.args)?;

    // --service may name an alias from the config instead of an interface.
    let alias = cfg.services.iter().find(|s| s.alias == args.service).cloned();
    let (interface, version) = match alias {
        Some(entry) => (entry.interface, args.version.unwrap_or(entry.version)),
        None => (
            args.service,
            args.version.unwrap_or_else(|| "1.0.0".to_owned()),
        ),
    };

    let mut client = Client::connect(cfg)
        .await
        .context("connecting to provider")?;
    let value = client
        .service(interface)
        .version(version)
        .invoke(&args.method, arguments)
        .await
        .context("invoking method")?;

    println!("{}", serde_json::to_string_pretty(&value_to_json(&value))?);
    Ok(())
}

fn parse_arguments(raw: &[String]) -> Result<Vec<serde_json::Value>> {
    if raw.len() == 1 {
        let parsed: serde_json::Value = serde_json::from_str(&raw[0])
            .with_context(|| format!("argument is not valid JSON: {}", raw[0]))?;
        return Ok(match parsed {
            serde_json::Value::Array(items) => items,
            single => vec![single],
        });
    }
    raw.iter()
        .map(|arg| {
            serde_json::from_str(arg).with_context(|| format!("argument is not valid JSON: {arg}"))
        })
        .collect()
}
