use chrono::DateTime;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;

/// One sensor sample in the shape every telemetry consumer understands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTelemetry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub unit: &'static str,
    pub value: f64,
}

pub trait TelemetrySource: Send + Sync {
    fn next(&self) -> CanonicalTelemetry;
}

/// Uniform sample in `[min, max)`; an inverted range collapses towards `min`
fn sample(
    min: f64,
    max: f64,
) -> f64 {
    rand::thread_rng().gen::<f64>() * (max - min) + min
}

#[derive(Debug, Clone, Copy)]
pub struct TemperatureSource {
    pub min: f64,
    pub max: f64,
}

impl TemperatureSource {
    pub fn new(
        min: f64,
        max: f64,
    ) -> Self {
        Self { min, max }
    }
}

impl TelemetrySource for TemperatureSource {
    fn next(&self) -> CanonicalTelemetry {
        CanonicalTelemetry {
            timestamp: Utc::now(),
            kind: "temperature",
            unit: "degreeCelsius",
            value: sample(self.min, self.max),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HumiditySource {
    min: f64,
    max: f64,
}

impl HumiditySource {
    const FLOOR: f64 = 0.0;
    const CEILING: f64 = 100.0;

    /// Both bounds are clamped to a relative humidity in `[0, 100]`.
    pub fn new(
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            min: min.clamp(Self::FLOOR, Self::CEILING),
            max: max.clamp(Self::FLOOR, Self::CEILING),
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl TelemetrySource for HumiditySource {
    fn next(&self) -> CanonicalTelemetry {
        CanonicalTelemetry {
            timestamp: Utc::now(),
            kind: "humidity",
            unit: "percent",
            value: sample(self.min, self.max),
        }
    }
}
