use anyhow::Context;
use clap::{Parser, Subcommand};
use smsgate::msg::{MsgId, OutgoingMessage};
use smsgate::urn::Urn;

#[derive(Parser)]
#[command(name = "smsgate")]
#[command(about = "smsgate CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (HTTP webhooks for every configured channel).
    Gateway {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 15252)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message through a configured channel and print the resulting status as JSON.
    Send {
        /// Config file path (default: SMSGATE_CONFIG_PATH or ~/.smsgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Channel uuid from the config.
        #[arg(long, value_name = "UUID")]
        channel: uuid::Uuid,

        /// Destination phone number (international or national for the channel's country).
        #[arg(long, value_name = "NUMBER")]
        to: String,

        /// Message text; split into segments as needed.
        #[arg(long)]
        text: String,

        /// Message id recorded on the status.
        #[arg(long, default_value_t = 1)]
        id: i64,

        /// Attachment as `content-type:url` or a bare URL; repeatable. URLs are appended to the text.
        #[arg(long = "attachment", value_name = "ATTACHMENT")]
        attachments: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("smsgate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            channel,
            to,
            text,
            id,
            attachments,
        }) => {
            if let Err(e) = run_send(config, channel, &to, text, id, attachments).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(smsgate::config::default_config_path);
    let dir = smsgate::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = smsgate::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    smsgate::gateway::run_gateway(config, path).await
}

async fn run_send(
    config_path: Option<std::path::PathBuf>,
    channel_uuid: uuid::Uuid,
    to: &str,
    text: String,
    id: i64,
    attachments: Vec<String>,
) -> anyhow::Result<()> {
    let (config, _) = smsgate::config::load_config(config_path)?;
    let channel_type = config
        .channels
        .iter()
        .find(|c| c.uuid == channel_uuid)
        .map(|c| c.channel_type.clone())
        .with_context(|| format!("channel {} not in config", channel_uuid))?;

    let state = smsgate::gateway::build_state(config).await?;
    let channel = state.backend.get_channel(&channel_type, channel_uuid).await?;
    let handler = state
        .registry
        .get(&channel_type)
        .await
        .with_context(|| format!("no handler registered for channel type {}", channel_type))?;

    let msg = OutgoingMessage {
        id: MsgId(id),
        urn: Urn::tel_for_country(to, channel.country.as_deref()),
        channel,
        text,
        attachments,
    };
    let status = handler.send(&msg).await?;
    state.backend.write_msg_status(&status).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
