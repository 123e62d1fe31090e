//! The connectivity orchestrator.
//!
//! ## Key Responsibilities
//! - Runs the startup sequence once, in the background, as soon as the device
//!   is built: registration, session creation, handler installation, open
//! - Replays the single connect outcome to every caller (fail-once)
//! - Routes inbound status changes, desired patches, method invocations and
//!   point-to-point messages to the [`HandlerRegistry`]
//! - Owns the process-wide cancellation token and the session handle, and
//!   releases both during [`DeviceClient::shutdown`]
//!
//! ## Example
//! ```ignore
//! let device = DeviceBuilder::from_config(&config)?
//!     .handlers(registry)
//!     .registration_client(registrar)
//!     .session_factory(factory)
//!     .start()?;
//!
//! device.send_telemetry(r#"{"temperature":21.5}"#, CallOptions::default()).await?;
//! device.shutdown().await?;
//! ```
//!
//! [`HandlerRegistry`]: crate::HandlerRegistry

mod builder;
mod client;
mod connect;
mod state;
pub use builder::*;
pub use client::*;
pub use state::*;

#[cfg(test)]
mod builder_test;
