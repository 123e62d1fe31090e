//! Reference climate device.
//!
//! Wires a temperature and a humidity source to a [`DeviceClient`]: the
//! `telemetryInterval` and `temperature` desired properties, the `reboot`
//! method, a logging message handler, and a telemetry loop paced by the
//! current interval.

mod sensor;


pub use sensor::*;

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::CallOptions;
use crate::DeviceClient;
use crate::Error;
use crate::HandlerError;
use crate::HandlerRegistry;
use crate::MethodResponse;
use crate::PropertyValue;
use crate::Result;
use crate::TelemetryConfig;

pub const TELEMETRY_INTERVAL: &str = "telemetryInterval";
pub const TEMPERATURE: &str = "temperature";
pub const REBOOT: &str = "reboot";

/// Interval shared between the property handler and the telemetry loop
#[derive(Debug)]
struct Interval {
    current_ms: AtomicU64,
    min_ms: u64,
    max_ms: u64,
}

impl Interval {
    /// Non-positive requests keep the current interval; others are clamped.
    fn apply(
        &self,
        value: &PropertyValue,
    ) -> std::result::Result<PropertyValue, HandlerError> {
        let requested = value.to_i64()?;
        if requested > 0 {
            let clamped = (requested as u64).clamp(self.min_ms, self.max_ms);
            if clamped != requested as u64 {
                debug!(requested, clamped, "Telemetry interval clamped.");
            }
            self.current_ms.store(clamped, Ordering::Release);
        } else {
            debug!(requested, "Ignoring non-positive telemetry interval.");
        }
        let current = self.current_ms.load(Ordering::Acquire);
        Ok(PropertyValue::Integer(current as i64))
    }
}

pub struct ClimateDevice {
    interval: Arc<Interval>,
    temperature: TemperatureSource,
    humidity: HumiditySource,
}

impl ClimateDevice {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            interval: Arc::new(Interval {
                current_ms: AtomicU64::new(config.interval_ms),
                min_ms: config.min_interval_ms,
                max_ms: config.max_interval_ms,
            }),
            temperature: TemperatureSource::new(0.0, 100.0),
            humidity: HumiditySource::new(0.0, 100.0),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval.current_ms.load(Ordering::Acquire))
    }

    /// Handler tables to hand to [`DeviceBuilder::handlers`](crate::DeviceBuilder::handlers).
    pub fn handlers(&self) -> HandlerRegistry {
        let interval = self.interval.clone();

        HandlerRegistry::builder()
            .property(TELEMETRY_INTERVAL, move |value, _| {
                let interval = interval.clone();
                async move { interval.apply(&value) }
            })
            .property(TEMPERATURE, |value, _| async move {
                trace!(%value, "temperature");
                Ok(value)
            })
            .method(REBOOT, |_, _| async { Ok(MethodResponse::new(202, "{}")) })
            .message(|body| async move {
                info!(%body, "Message received.");
                Ok(())
            })
            .build()
    }

    /// One `{"temperature": .., "humidity": ..}` sample
    pub fn sample(&self) -> serde_json::Value {
        serde_json::json!({
            "temperature": self.temperature.next(),
            "humidity": self.humidity.next(),
        })
    }

    /// Sends one sample per interval until the device shuts down.
    ///
    /// Per-call transport failures are logged and the loop keeps going. A
    /// failed connect sequence ends the loop with its error.
    pub async fn run(
        &self,
        client: &DeviceClient,
    ) -> Result<()> {
        let shutdown = client.shutdown_token();
        info!(interval = ?self.interval(), "Telemetry loop started.");

        loop {
            let payload = self.sample().to_string();
            match client.send_telemetry(payload, CallOptions::default()).await {
                Ok(()) => trace!("Telemetry sent."),
                Err(Error::Canceled) => break,
                Err(e @ Error::Connect(_)) => return Err(e),
                Err(e) => warn!(error = %e, "Failed to send telemetry."),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval()) => {}
            }
        }

        info!("Telemetry loop stopped.");
        Ok(())
    }
}
