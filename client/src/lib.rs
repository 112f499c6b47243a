//! Client for the XRT management API
//!
//! The [`MessageBusClient`] publishes management requests on a [`MessageBus`](library::communication::bus::MessageBus)
//! and correlates the replies arriving on its reply topic. Every operation either yields a
//! decoded result, `Ok(None)` when the client has been shut down in the meantime, or an
//! [`XrtError`] whose [`ErrorKind`] tells timeouts, transport failures and remote failures apart.
//!
//! ```ignore
//! let bus: SharedBus = Arc::new(RedisBus::open("redis://localhost/")?);
//! let client = MessageBusClient::new(bus, "xrt/request", "xrt/reply", Duration::from_secs(5), ClientOptions::default()).await?;
//!
//! if let Some(devices) = client.all_devices().await? {
//!     println!("{:?}", devices);
//! }
//! ```
#![deny(missing_docs)]

mod client;
mod component;
mod device;
mod discovery;
mod error;
mod options;
mod profile;
mod schedule;

pub use client::{MessageBusClient, Outcome, SharedBus, XrtClient};
pub use component::ComponentClient;
pub use device::DeviceClient;
pub use discovery::DiscoveryClient;
pub use error::{ErrorKind, XrtError};
pub use options::{ClientOptions, CommandOptions, DiscoveryOptions, StatusOptions};
pub use profile::ProfileClient;
pub use schedule::ScheduleClient;
