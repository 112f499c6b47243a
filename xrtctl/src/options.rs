use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = "Command line client for the XRT management API")]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "warn,xrtctl=info",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Format of log output
    #[structopt(
        long,
        global = true,
        env,
        default_value = "text",
        possible_values = &["text", "compact", "json"],
        value_name = "format"
    )]
    pub log_format: LogFormat,

    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[structopt(flatten)]
    pub topics: TopicOptions,

    /// Milliseconds to wait for a reply
    #[structopt(long, global = true, env, default_value = "5000", parse(try_from_str = parse_millis), value_name = "ms")]
    pub response_timeout: Duration,

    /// Milliseconds the node searches for devices during a discovery
    #[structopt(long, global = true, env, default_value = "10000", parse(try_from_str = parse_millis), value_name = "ms")]
    pub discovery_duration: Duration,

    /// Additional milliseconds the node may take to finish a discovery
    #[structopt(long, global = true, env, default_value = "5000", parse(try_from_str = parse_millis), value_name = "ms")]
    pub discovery_timeout: Duration,

    #[structopt(subcommand)]
    pub command: Command,
}

/// Options for connecting to the Redis server
#[derive(Debug, StructOpt)]
pub struct RedisOptions {
    /// Redis server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        global = true,
        default_value = "redis://localhost/",
        value_name = "url"
    )]
    pub url: String,
}

/// Topics the XRT node listens and replies on
#[derive(Debug, StructOpt)]
pub struct TopicOptions {
    /// Topic management requests are published on
    #[structopt(long, global = true, env = "XRT_REQUEST_TOPIC", default_value = "xrt/request")]
    pub request_topic: String,

    /// Topic the node replies on
    #[structopt(long, global = true, env = "XRT_REPLY_TOPIC", default_value = "xrt/reply")]
    pub reply_topic: String,

    /// Topic component management requests are published on
    #[structopt(long, global = true, env = "XRT_COMMAND_TOPIC")]
    pub command_topic: Option<String>,

    /// Topic on which discovered devices are announced
    #[structopt(long, global = true, env = "XRT_DISCOVERY_TOPIC")]
    pub discovery_topic: Option<String>,

    /// Topic on which nodes publish their status
    #[structopt(long, global = true, env = "XRT_STATUS_TOPIC")]
    pub status_topic: Option<String>,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Lists the names of all devices
    Devices,
    /// Shows a single device
    Device { name: String },
    /// Lists the names of all device profiles
    Profiles,
    /// Shows a single device profile
    Profile { name: String },
    /// Lists the names of all schedules
    Schedules,
    /// Makes the node search for new devices
    Discover,
    /// Lists the components of a category on every node
    Components {
        category: String,

        /// Milliseconds to collect replies for
        #[structopt(long, default_value = "3000", parse(try_from_str = parse_millis), value_name = "ms")]
        window: Duration,
    },
    /// Replaces the script of the Lua transformation component
    Lua {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

fn parse_millis(src: &str) -> Result<Duration, ParseIntError> {
    let millis = src.parse::<u64>()?;
    Ok(Duration::from_millis(millis))
}
