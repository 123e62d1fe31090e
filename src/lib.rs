//! Client-side connectivity core for managed IoT devices.
//!
//! A device registers (or connects directly with a connection string), opens
//! one session towards its hub, keeps its reported twin properties reconciled
//! with the desired ones, answers methods and messages, and sends telemetry.
//! The whole startup sequence runs in the background; every public call on
//! [`DeviceClient`] waits for it and replays its outcome.

mod climate;
mod config;
mod device;
mod errors;
mod handlers;
mod provisioning;
mod session;
mod simulator;
mod twin;
mod value;
pub mod utils;

pub use climate::*;
pub use config::*;
pub use device::*;
pub use errors::*;
pub use handlers::*;
pub use provisioning::*;
pub use session::*;
pub use simulator::*;
pub use twin::*;
pub use utils::cancel::CallOptions;
pub use value::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
