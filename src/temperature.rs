// SPDX-License-Identifier: GPL-3.0-or-later
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[serde(alias = "c")]
    Celsius,
    #[serde(alias = "f")]
    Fahrenheit,
}

impl Default for TemperatureUnit {
    fn default() -> Self {
        Self::Celsius
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        })
    }
}

impl FromStr for TemperatureUnit {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_ascii_lowercase() as &str {
            "celsius" | "c" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" | "f" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err("unknown temperature unit"),
        }
    }
}

/// A temperature tagged with the unit it was given in.
///
/// Configuration files can give temperatures as a bare number (Celsius) or as a single entry map
/// of unit to value, ex: `{ fahrenheit = 98.6 }`.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(from = "DeserializedTemperature")]
pub enum Temperature {
    Celsius(f32),
    Fahrenheit(f32),
}

impl Temperature {
    /// Get the temperature in Celsius.
    pub fn in_celsius(&self) -> f32 {
        match self {
            Self::Celsius(c) => *c,
            Self::Fahrenheit(f) => (f - 32.0) * 5.0 / 9.0,
        }
    }

    /// Get the temperature in Fahrenheit.
    pub fn in_fahrenheit(&self) -> f32 {
        match self {
            Self::Celsius(c) => c * 1.8 + 32.0,
            Self::Fahrenheit(f) => *f,
        }
    }

    pub fn as_unit(self, unit: TemperatureUnit) -> Self {
        match unit {
            TemperatureUnit::Celsius => Self::Celsius(self.in_celsius()),
            TemperatureUnit::Fahrenheit => Self::Fahrenheit(self.in_fahrenheit()),
        }
    }

    pub fn unit(&self) -> TemperatureUnit {
        match self {
            Temperature::Celsius(_) => TemperatureUnit::Celsius,
            Temperature::Fahrenheit(_) => TemperatureUnit::Fahrenheit,
        }
    }

    fn value(&self) -> f32 {
        match self {
            Temperature::Celsius(c) => *c,
            Temperature::Fahrenheit(f) => *f,
        }
    }
}

impl PartialEq for Temperature {
    fn eq(&self, other: &Self) -> bool {
        // Always compare in celsius.
        self.in_celsius().eq(&other.in_celsius())
    }
}

impl fmt::Display for Temperature {
    /// Format the temperature like a plain number, with the unit letter appended (ex: `36.6C`).
    /// Precision is passed through, so `{:.1}` works as expected.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value(), fmt)?;
        write!(fmt, "{}", self.unit())
    }
}

impl From<f32> for Temperature {
    fn from(value: f32) -> Self {
        Self::Celsius(value)
    }
}

// Accept either a raw number or a map of a unit to a number.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(untagged)]
enum DeserializedTemperature {
    Number(f32),
    Wrapped(TaggedTemperature),
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaggedTemperature {
    #[serde(alias = "c", alias = "C")]
    Celsius(f32),

    #[serde(alias = "f", alias = "F")]
    Fahrenheit(f32),
}

impl From<DeserializedTemperature> for Temperature {
    fn from(maybe_wrapped: DeserializedTemperature) -> Self {
        match maybe_wrapped {
            DeserializedTemperature::Number(temperature) => temperature.into(),
            DeserializedTemperature::Wrapped(TaggedTemperature::Celsius(c)) => Self::Celsius(c),
            DeserializedTemperature::Wrapped(TaggedTemperature::Fahrenheit(f)) => {
                Self::Fahrenheit(f)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::{Temperature, TemperatureUnit};
    use float_cmp::{approx_eq, F32Margin};

    #[test]
    fn fahrenheit_in_celsius() {
        assert!(approx_eq!(
            f32,
            Temperature::Fahrenheit(-40.0).in_celsius(),
            -40.0,
            F32Margin::default()
        ));
        assert!(approx_eq!(
            f32,
            Temperature::Fahrenheit(212.0).in_celsius(),
            100.0,
            F32Margin::default()
        ));
    }

    #[test]
    fn celsius_in_fahrenheit() {
        assert!(approx_eq!(
            f32,
            Temperature::Celsius(0.0).in_fahrenheit(),
            32.0,
            F32Margin::default()
        ));
        assert!(approx_eq!(
            f32,
            Temperature::Celsius(100.0).in_fahrenheit(),
            212.0,
            F32Margin::default()
        ));
    }

    #[test]
    fn label_format() {
        assert_eq!(format!("{:.1}", Temperature::Celsius(36.64)), "36.6C");
        let hot = Temperature::Celsius(40.0).as_unit(TemperatureUnit::Fahrenheit);
        assert_eq!(format!("{:.1}", hot), "104.0F");
    }

    #[derive(Debug, Deserialize)]
    struct TemperatureTest {
        temp: Temperature,
    }

    #[test]
    fn deserialize_float() {
        let wrapper: TemperatureTest =
            toml::from_str("temp = 1.5").expect("A float to be deserialized as a temperature");
        assert_eq!(wrapper.temp.value(), 1.5);
        assert_eq!(wrapper.temp.unit(), TemperatureUnit::Celsius);
    }

    #[test]
    fn deserialize_integer() {
        let wrapper: TemperatureTest =
            toml::from_str("temp = 25").expect("An integer be deserialized as a temperature");
        assert_eq!(wrapper.temp.value(), 25.0);
        assert_eq!(wrapper.temp.unit(), TemperatureUnit::Celsius);
    }

    #[test]
    fn deserialize_fahrenheit() {
        let wrapper: TemperatureTest = toml::from_str(r#"temp = { "fahrenheit" = 113.0 }"#)
            .expect("A map of Fahrenheit to a float to deserialize");
        assert_eq!(wrapper.temp.unit(), TemperatureUnit::Fahrenheit);
        assert!(approx_eq!(
            f32,
            wrapper.temp.in_celsius(),
            45.0,
            F32Margin::default()
        ));
    }
}
