use anyhow::{Context, Result};
use client::{
    ClientOptions, CommandOptions, ComponentClient, DeviceClient, DiscoveryClient,
    DiscoveryOptions, MessageBusClient, Outcome, ProfileClient, ScheduleClient, SharedBus,
    StatusOptions, XrtClient,
};
use library::communication::implementation::redis::RedisBus;
use options::{Command, LogFormat, MainOptions};
use serde::Serialize;
use std::sync::Arc;
use structopt::StructOpt;
use tracing::{debug, info, warn};

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let options = init();

    let bus: SharedBus = Arc::new(RedisBus::open(&options.redis.url)?);
    let client = Arc::new(
        MessageBusClient::new(
            bus,
            options.topics.request_topic.clone(),
            options.topics.reply_topic.clone(),
            options.response_timeout,
            client_options(&options),
        )
        .await?,
    );

    let interrupted = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending requests");
            interrupted.shutdown();
        }
    });

    let result = run(&client, options.command).await;
    client.close().await?;

    result
}

fn init() -> MainOptions {
    let options = MainOptions::from_args();

    let formatter = tracing_subscriber::fmt()
        .with_env_filter(options.log.as_str())
        .with_writer(std::io::stderr);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    debug!(?options, "Parsed options");

    options
}

fn client_options(options: &MainOptions) -> ClientOptions {
    let command = options.topics.command_topic.clone().map(CommandOptions::new);

    let mut discovery = DiscoveryOptions::new(options.discovery_duration, options.discovery_timeout);
    if let Some(topic) = &options.topics.discovery_topic {
        discovery = discovery.with_subscription(topic.clone(), |message| {
            info!(topic = %message.received_topic, payload = %String::from_utf8_lossy(&message.payload), "Discovery announcement");
        });
    }

    let status = options.topics.status_topic.clone().map(|topic| {
        StatusOptions::new(topic, |message| {
            info!(topic = %message.received_topic, payload = %String::from_utf8_lossy(&message.payload), "Status notification");
        })
    });

    ClientOptions::new(command, Some(discovery), status)
}

async fn run(client: &MessageBusClient, command: Command) -> Result<()> {
    match command {
        Command::Devices => print(client.all_devices().await),
        Command::Device { name } => print(client.device_by_name(&name).await),
        Command::Profiles => print(client.all_device_profiles().await),
        Command::Profile { name } => print(client.device_profile_by_name(&name).await),
        Command::Schedules => print(client.all_schedules().await),
        Command::Discover => print(client.trigger_discovery().await),
        Command::Components { category, window } => {
            print(client.discover_components(&category, window).await)
        }
        Command::Lua { file } => {
            let script = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;

            print(client.update_lua_script(&script).await)
        }
    }
}

fn print<T: Serialize>(outcome: Outcome<T>) -> Result<()> {
    match outcome? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => warn!("Request has been cancelled"),
    }

    Ok(())
}
