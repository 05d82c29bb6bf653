//! 24-hour extrapolation of a hazard score.

use crate::logging::DataSource;
use crate::model::Trend;
use crate::snapshot::SourceReadings;
use serde::{Deserialize, Serialize};

/// Latest discharge above this (m³/s) counts as high.
pub const HIGH_DISCHARGE_M3S: f64 = 500.0;
/// Surface moisture above this (m³/m³) counts as saturated.
pub const SATURATED_SOIL: f64 = 0.35;

const BASE_CONFIDENCE: u8 = 60;
const CONFIDENCE_PER_SOURCE: u8 = 10;
const MAX_CONFIDENCE: u8 = 95;

/// Boosting conditions and source availability for one site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionFlags {
    pub high_discharge: bool,
    pub saturated_soil: bool,
    pub seismic_activity: bool,
    pub has_weather_data: bool,
    pub has_soil_data: bool,
    pub has_discharge_data: bool,
    pub has_seismic_data: bool,
}

impl PredictionFlags {
    pub fn from_readings(readings: &SourceReadings) -> Self {
        Self {
            high_discharge: readings.discharge_latest() > HIGH_DISCHARGE_M3S,
            saturated_soil: readings.surface_moisture() > SATURATED_SOIL,
            seismic_activity: readings.quake_count() > 0,
            has_weather_data: readings.is_available(DataSource::Forecast),
            has_soil_data: readings.is_available(DataSource::Soil),
            has_discharge_data: readings.is_available(DataSource::Discharge),
            has_seismic_data: readings.is_available(DataSource::Seismic),
        }
    }

    /// 60, plus 10 per available source category, capped at 95.
    pub fn confidence(&self) -> u8 {
        let available = [
            self.has_weather_data,
            self.has_soil_data,
            self.has_discharge_data,
            self.has_seismic_data,
        ]
        .iter()
        .filter(|f| **f)
        .count() as u8;
        (BASE_CONFIDENCE + available * CONFIDENCE_PER_SOURCE).min(MAX_CONFIDENCE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub current: u8,
    pub predicted_24h: u8,
    pub trend: Trend,
    /// `predicted_24h - current`
    pub change: i16,
    pub confidence: u8,
}

pub fn predict_24h(current: u8, trend: Trend, flags: &PredictionFlags) -> Prediction {
    let mut delta: i16 = match trend {
        Trend::Increasing => 12,
        Trend::Stable => 3,
        Trend::Decreasing => -8,
    };
    if flags.high_discharge {
        delta += 5;
    }
    if flags.saturated_soil {
        delta += 4;
    }
    if flags.seismic_activity {
        delta += 3;
    }

    let current_i = i16::from(current.min(100));
    let predicted = (current_i + delta).clamp(0, 100);

    Prediction {
        current,
        predicted_24h: predicted as u8,
        trend,
        change: predicted - current_i,
        confidence: flags.confidence(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::usgs_quakes::SeismicActivity;
    use crate::model::SourceError;

    #[test]
    fn test_trend_contributions() {
        let flags = PredictionFlags::default();
        assert_eq!(predict_24h(50, Trend::Increasing, &flags).predicted_24h, 62);
        assert_eq!(predict_24h(50, Trend::Stable, &flags).predicted_24h, 53);
        let down = predict_24h(50, Trend::Decreasing, &flags);
        assert_eq!(down.predicted_24h, 42);
        assert_eq!(down.change, -8);
    }

    #[test]
    fn test_boosts_stack_and_clamp() {
        let flags = PredictionFlags {
            high_discharge: true,
            saturated_soil: true,
            seismic_activity: true,
            ..Default::default()
        };
        let p = predict_24h(40, Trend::Increasing, &flags);
        assert_eq!(p.predicted_24h, 64);
        assert_eq!(p.change, 24);

        let p = predict_24h(95, Trend::Increasing, &flags);
        assert_eq!(p.predicted_24h, 100);
        assert_eq!(p.change, 5);

        let p = predict_24h(3, Trend::Decreasing, &PredictionFlags::default());
        assert_eq!(p.predicted_24h, 0);
        assert_eq!(p.change, -3);
    }

    #[test]
    fn test_confidence_caps_at_95() {
        let mut flags = PredictionFlags::default();
        assert_eq!(flags.confidence(), 60);
        flags.has_weather_data = true;
        flags.has_soil_data = true;
        assert_eq!(flags.confidence(), 80);
        flags.has_discharge_data = true;
        flags.has_seismic_data = true;
        assert_eq!(flags.confidence(), 95);
    }

    #[test]
    fn test_flags_from_degraded_readings() {
        let mut readings = SourceReadings::all_failed(SourceError::Request("refused".into()));
        assert_eq!(PredictionFlags::from_readings(&readings), PredictionFlags::default());

        readings.seismic = Ok(SeismicActivity {
            events: vec![],
            count: 0,
            max_magnitude: 0.0,
        });
        let flags = PredictionFlags::from_readings(&readings);
        assert!(flags.has_seismic_data);
        assert!(!flags.seismic_activity);
        assert_eq!(flags.confidence(), 70);
    }
}
