use crate::{detail::DeviceResolver, error::Result};
use gateway_core::model::DeviceStatus;
use serde::{Deserialize, Serialize};

pub const TEMP_UNIT: &str = "°C";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub temperature: f64,
    pub humidity: i64,
    pub battery_percentage: i64,
    pub status_text: String,
    pub temp_unit: String,
}

impl SensorData {
    /// Reads `va_temperature` (tenths of a degree), `va_humidity` and
    /// `battery_percentage`; absent or non-numeric points read as zero.
    pub fn from_status(status: &[DeviceStatus]) -> Self {
        let mut temperature = 0.0;
        let mut humidity = 0;
        let mut battery_percentage = 0;
        for s in status {
            match s.code.as_str() {
                "va_temperature" => temperature = s.value.as_f64().map(|v| v / 10.0).unwrap_or(0.0),
                "va_humidity" => humidity = s.value.as_i64().unwrap_or(0),
                "battery_percentage" => battery_percentage = s.value.as_i64().unwrap_or(0),
                _ => {}
            }
        }

        let status_text = format!("{}, {}", temperature_text(temperature), humidity_text(humidity));
        Self { temperature, humidity, battery_percentage, status_text, temp_unit: TEMP_UNIT.to_string() }
    }
}

fn temperature_text(celsius: f64) -> &'static str {
    if celsius > 28.0 {
        "Temperature hot"
    } else if celsius < 18.0 {
        "Temperature cold"
    } else {
        "Temperature comfortable"
    }
}

fn humidity_text(percent: i64) -> &'static str {
    if percent > 60 {
        "Air moist"
    } else if percent < 30 {
        "Air dry"
    } else {
        "Air comfortable"
    }
}

#[derive(Clone)]
pub struct SensorReader {
    resolver: DeviceResolver,
}

impl SensorReader {
    pub fn new(resolver: DeviceResolver) -> Self {
        Self { resolver }
    }

    pub async fn read(&self, access_token: &str, device_id: &str) -> Result<SensorData> {
        let device = self.resolver.get_device_by_id(access_token, device_id).await?;
        Ok(SensorData::from_status(&device.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_and_moist() {
        let data = SensorData::from_status(&[
            DeviceStatus::new("va_temperature", 294),
            DeviceStatus::new("va_humidity", 82),
            DeviceStatus::new("battery_percentage", 77),
        ]);
        assert!((data.temperature - 29.4).abs() < 1e-9);
        assert_eq!(data.humidity, 82);
        assert_eq!(data.battery_percentage, 77);
        assert_eq!(data.status_text, "Temperature hot, Air moist");
        assert_eq!(data.temp_unit, "°C");
    }

    #[test]
    fn float_encodings_are_accepted() {
        let data = SensorData::from_status(&[
            DeviceStatus::new("va_temperature", 150.0),
            DeviceStatus::new("va_humidity", 25.0),
        ]);
        assert_eq!(data.temperature, 15.0);
        assert_eq!(data.humidity, 25);
        assert_eq!(data.status_text, "Temperature cold, Air dry");
    }

    #[test]
    fn boundaries_are_comfortable() {
        let data = SensorData::from_status(&[
            DeviceStatus::new("va_temperature", 280),
            DeviceStatus::new("va_humidity", 60),
        ]);
        assert_eq!(data.status_text, "Temperature comfortable, Air comfortable");
    }

    #[test]
    fn missing_points_read_as_zero() {
        let data = SensorData::from_status(&[DeviceStatus::new("va_temperature", "n/a")]);
        assert_eq!(data.temperature, 0.0);
        assert_eq!(data.battery_percentage, 0);
        assert_eq!(data.status_text, "Temperature cold, Air dry");
    }
}
