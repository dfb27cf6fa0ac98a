use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::configs::Settings;
use crate::error::{PipelineError, Result};
use crate::loggers::DiagnosticSink;
use crate::records::{RowRecord, ToRow};
use crate::retrieve::JsonFetch;
use crate::store::FileStore;

use super::{lenient_f64, now_iso, save_capture, Source};

pub const BASE_URL: &str = "https://wttr.in/";

#[derive(Debug, Deserialize)]
struct WeatherDesc {
    value: String,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C", deserialize_with = "lenient_f64")]
    temp_c: f64,
    #[serde(rename = "temp_F", deserialize_with = "lenient_f64")]
    temp_f: f64,
    #[serde(deserialize_with = "lenient_f64")]
    humidity: f64,
    #[serde(rename = "windspeedKmph", deserialize_with = "lenient_f64")]
    windspeed_kmph: f64,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<WeatherDesc>,
}

#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub condition: String,
    pub humidity: f64,
    pub wind_speed_kmph: f64,
    pub collected_at: String,
}

impl ToRow for WeatherRecord {
    fn to_row(&self) -> RowRecord {
        RowRecord::new()
            .with("city", self.city.as_str())
            .with("temperature_c", self.temperature_c)
            .with("temperature_f", self.temperature_f)
            .with("condition", self.condition.as_str())
            .with("humidity", self.humidity)
            .with("wind_speed_kmph", self.wind_speed_kmph)
            .with("collected_at", self.collected_at.as_str())
    }
}

/// Reads the first `current_condition` of a `?format=j1` body.
pub fn parse_conditions(city: &str, body: Value) -> Result<WeatherRecord> {
    let response: WttrResponse = serde_json::from_value(body)
        .map_err(|e| PipelineError::Payload(format!("wttr.in {city}: {e}")))?;
    let current = response
        .current_condition
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Payload(format!("wttr.in {city}: no current_condition")))?;

    Ok(WeatherRecord {
        city: city.to_string(),
        temperature_c: current.temp_c,
        temperature_f: current.temp_f,
        condition: current
            .weather_desc
            .into_iter()
            .next()
            .map(|d| d.value)
            .unwrap_or_else(|| "Unknown".to_string()),
        humidity: current.humidity,
        wind_speed_kmph: current.windspeed_kmph,
        collected_at: now_iso(),
    })
}

/// Collects current conditions city by city and saves a raw capture.
///
/// A city that fails is logged as a warning and skipped. The capture is saved
/// even when every city failed, so downstream sees an empty run rather than
/// yesterday's data.
pub async fn collect_weather<F: JsonFetch>(
    api: &F,
    store: &FileStore,
    settings: &Settings,
    sink: &dyn DiagnosticSink,
) -> Vec<WeatherRecord> {
    let stage = Source::Weather.name();
    sink.info(stage, "Collecting weather data...", None);

    let query = [("format", "j1".to_string())];
    let mut records = Vec::with_capacity(settings.weather_cities.len());

    for city in &settings.weather_cities {
        let result = match api.get_json(city, &query).await {
            Ok(body) => parse_conditions(city, body),
            Err(e) => Err(e),
        };
        match result {
            Ok(record) => records.push(record),
            Err(e) => sink.warn(
                stage,
                &format!("Error collecting weather for {city}: {e}"),
                Some(json!({ "city": city })),
            ),
        }
    }

    if let Err(e) = save_capture(store, Source::Weather, &records, sink) {
        sink.error(stage, &format!("Error saving weather data: {e}"), None);
        return Vec::new();
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_numbers_are_coerced() {
        let body = json!({
            "current_condition": [{
                "temp_C": "10",
                "temp_F": "50",
                "humidity": "80",
                "windspeedKmph": "13",
                "weatherDesc": [{ "value": "Light rain" }]
            }]
        });
        let record = parse_conditions("Seattle", body).unwrap();
        assert_eq!(record.city, "Seattle");
        assert_eq!(record.temperature_c, 10.0);
        assert_eq!(record.temperature_f, 50.0);
        assert_eq!(record.humidity, 80.0);
        assert_eq!(record.condition, "Light rain");
    }

    #[test]
    fn empty_conditions_are_an_error() {
        let err = parse_conditions("Nowhere", json!({ "current_condition": [] })).unwrap_err();
        assert!(matches!(err, PipelineError::Payload(_)));
    }
}
