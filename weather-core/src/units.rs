//! Unit conversion. Everything upstream of the response layer works in
//! Kelvin and metres per second; these helpers run only when shaping output.

use serde::Serialize;

use crate::error::{Result, WeatherError};

const KELVIN_OFFSET: f64 = 273.15;
const MPS_PER_MPH: f64 = 0.447_04;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + KELVIN_OFFSET
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    celsius_to_fahrenheit(kelvin_to_celsius(kelvin))
}

pub fn fahrenheit_to_kelvin(fahrenheit: f64) -> f64 {
    celsius_to_kelvin(fahrenheit_to_celsius(fahrenheit))
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps / MPS_PER_MPH
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * MPS_PER_MPH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Kelvin,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol.trim().trim_start_matches('°').to_ascii_lowercase().as_str() {
            "k" | "kelvin" => Ok(TemperatureUnit::Kelvin),
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(WeatherError::InvalidUnit(symbol.to_string())),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Kelvin => "K",
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    if from == to {
        return value;
    }

    let kelvin = match from {
        TemperatureUnit::Kelvin => value,
        TemperatureUnit::Celsius => celsius_to_kelvin(value),
        TemperatureUnit::Fahrenheit => fahrenheit_to_kelvin(value),
    };

    match to {
        TemperatureUnit::Kelvin => kelvin,
        TemperatureUnit::Celsius => kelvin_to_celsius(kelvin),
        TemperatureUnit::Fahrenheit => kelvin_to_fahrenheit(kelvin),
    }
}

/// Display unit system selected by the `units` request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// `None` or a blank value selects metric.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(UnitSystem::default());
        };

        match raw.to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(WeatherError::InvalidUnit(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_unit(self) -> TemperatureUnit {
        match self {
            UnitSystem::Metric => TemperatureUnit::Celsius,
            UnitSystem::Imperial => TemperatureUnit::Fahrenheit,
        }
    }

    pub fn temperature(self, kelvin: f64) -> f64 {
        convert_temperature(kelvin, TemperatureUnit::Kelvin, self.temperature_unit())
    }

    pub fn wind_speed(self, mps: f64) -> f64 {
        match self {
            UnitSystem::Metric => mps,
            UnitSystem::Imperial => mps_to_mph(mps),
        }
    }

    pub fn wind_speed_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn representative_celsius() -> impl Iterator<Item = f64> {
        (-50..=50).step_by(5).map(f64::from).chain([-12.34, 0.5, 36.6])
    }

    #[test]
    fn celsius_kelvin_round_trip() {
        for celsius in representative_celsius() {
            let back = kelvin_to_celsius(celsius_to_kelvin(celsius));
            assert!((back - celsius).abs() < EPSILON, "{celsius} -> {back}");
        }
    }

    #[test]
    fn kelvin_to_fahrenheit_agrees_with_celsius_path() {
        for celsius in representative_celsius() {
            let via_kelvin = kelvin_to_fahrenheit(celsius_to_kelvin(celsius));
            let direct = celsius_to_fahrenheit(celsius);
            assert!((via_kelvin - direct).abs() < EPSILON);

            let back = fahrenheit_to_celsius(via_kelvin);
            assert!((back - celsius).abs() < EPSILON);
        }
    }

    #[test]
    fn known_reference_points() {
        assert!((kelvin_to_celsius(273.15)).abs() < EPSILON);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < EPSILON);
        assert!((celsius_to_fahrenheit(-40.0) + 40.0).abs() < EPSILON);
        assert!((fahrenheit_to_kelvin(32.0) - 273.15).abs() < EPSILON);
        assert!((mps_to_mph(10.0) - 22.369_362_9).abs() < 1e-6);
        assert!((mph_to_mps(mps_to_mph(4.2)) - 4.2).abs() < EPSILON);
    }

    #[test]
    fn convert_temperature_between_any_pair() {
        let value = convert_temperature(20.0, TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit);
        assert!((value - 68.0).abs() < EPSILON);

        let value = convert_temperature(68.0, TemperatureUnit::Fahrenheit, TemperatureUnit::Kelvin);
        assert!((value - 293.15).abs() < EPSILON);

        let value = convert_temperature(1.5, TemperatureUnit::Kelvin, TemperatureUnit::Kelvin);
        assert_eq!(value, 1.5);
    }

    #[test]
    fn temperature_symbols_parse() {
        assert_eq!(TemperatureUnit::from_symbol("K").unwrap(), TemperatureUnit::Kelvin);
        assert_eq!(TemperatureUnit::from_symbol("°C").unwrap(), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::from_symbol("f").unwrap(), TemperatureUnit::Fahrenheit);

        let err = TemperatureUnit::from_symbol("R").unwrap_err();
        assert_eq!(err, WeatherError::InvalidUnit("R".into()));
    }

    #[test]
    fn unit_system_parse_defaults_to_metric() {
        assert_eq!(UnitSystem::parse(None).unwrap(), UnitSystem::Metric);
        assert_eq!(UnitSystem::parse(Some("")).unwrap(), UnitSystem::Metric);
        assert_eq!(UnitSystem::parse(Some("Imperial")).unwrap(), UnitSystem::Imperial);
        assert_eq!(UnitSystem::parse(Some("kelvin")).unwrap_err().kind(), "InvalidUnit");
    }

    #[test]
    fn unit_system_formats_kelvin_and_wind() {
        assert!((UnitSystem::Metric.temperature(293.15) - 20.0).abs() < EPSILON);
        assert!((UnitSystem::Imperial.temperature(293.15) - 68.0).abs() < EPSILON);
        assert_eq!(UnitSystem::Metric.wind_speed(3.0), 3.0);
        assert_eq!(UnitSystem::Imperial.wind_speed_label(), "mph");
    }
}
