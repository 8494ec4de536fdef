//! keyguard-proxy: forwards chat and text-to-speech requests from a browser
//! frontend to an OpenAI-compatible API, holding the API key server-side.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use keyguard_proxy::{
    config::{AppConfig, LogFormat},
    run_server, EntryPoint,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "keyguard-proxy")]
#[command(version)]
#[command(about = "Credential-hiding proxy for chat completion and text-to-speech APIs")]
#[command(long_about = "
keyguard-proxy sits between a browser frontend and an OpenAI-compatible API:
  - POST /api/chat  {systemPrompt?, userPrompt, model?} -> {text}
  - POST /api/tts   {text, voice?, model?}              -> audio/mpeg
  - GET  /api/health (server mode only)

The API key is read from OPENAI_API_KEY (or OPENAI_API_TOKEN) and never
leaves the server.

Example usage:
  keyguard-proxy serve --port 3000
  keyguard-proxy serve --mode function
  keyguard-proxy check-config
")]
struct Cli {
    /// Path to an optional YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy
    Serve {
        /// Override listen port
        #[arg(short, long)]
        port: Option<u16>,
        /// Override upstream base URL (e.g., "https://api.openai.com")
        #[arg(long)]
        upstream_url: Option<String>,
        /// Entry point to expose
        #[arg(long, value_enum, default_value_t = EntryPoint::Server)]
        mode: EntryPoint,
    },

    /// Validate configuration and print the effective values
    CheckConfig,

    /// Test the credential against the upstream API
    TestUpstream,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is normal
    let _ = dotenv::dotenv();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(cli.log_level, config.logging.format);

    match cli.command {
        Commands::Serve {
            port,
            upstream_url,
            mode,
        } => {
            serve(config, port, upstream_url, mode).await?;
        }
        Commands::CheckConfig => {
            check_config(&config)?;
        }
        Commands::TestUpstream => {
            test_upstream(&config).await?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: Option<LogLevel>, format: LogFormat) {
    let level_filter = if let Some(level) = log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter));

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// File (optional) then environment overlay
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_or_default(path)?;
    config.apply_env()?;
    Ok(config)
}

async fn serve(
    mut config: AppConfig,
    port_override: Option<u16>,
    upstream_url_override: Option<String>,
    mode: EntryPoint,
) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.server.port = port;
    }
    if let Some(url) = upstream_url_override {
        config.upstream.url = url;
    }
    config.validate()?;

    run_server(config, mode)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))
}

fn check_config(config: &AppConfig) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        eprintln!("✗ Configuration error: {}", e);
        std::process::exit(1);
    }

    println!("✓ Configuration is valid\n");
    println!("Server:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!("  Max body: {} bytes", config.server.max_body_bytes);
    println!("\nUpstream:");
    println!("  URL: {}", config.upstream.base_url());
    println!(
        "  Credential: {}",
        if config.upstream.credential().is_some() { "set" } else { "NOT SET" }
    );
    println!("  TTS model: {}", config.upstream.tts_model);
    println!("  TTS voice: {}", config.upstream.tts_voice);
    for mode in [EntryPoint::Server, EntryPoint::Function] {
        let model = config
            .upstream
            .chat_model
            .as_deref()
            .unwrap_or(mode.default_chat_model());
        println!("  Chat model ({}): {}", mode, model);
    }
    println!("\nLogging:");
    println!("  Format: {:?}", config.logging.format);
    Ok(())
}

async fn test_upstream(config: &AppConfig) -> anyhow::Result<()> {
    let Some(api_key) = config.upstream.credential() else {
        println!("✗ No credential: set OPENAI_API_KEY or OPENAI_API_TOKEN");
        std::process::exit(1);
    };

    let models_url = config.upstream.models_url();
    println!("Testing upstream: {}", models_url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    match client.get(&models_url).bearer_auth(api_key).send().await {
        Ok(resp) if resp.status().is_success() => {
            println!("✓ Upstream is reachable and the credential was accepted");
            if let Ok(json) = resp.json::<serde_json::Value>().await {
                if let Some(data) = json.get("data").and_then(|d| d.as_array()) {
                    println!("  Available models: {}", data.len());
                }
            }
        }
        Ok(resp) => {
            println!("✗ Upstream returned error status: {}", resp.status());
            std::process::exit(1);
        }
        Err(e) => {
            println!("✗ Failed to connect to upstream: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
