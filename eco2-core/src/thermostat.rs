//! Device record - everything we know about one thermostat

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A set-point temperature, stored in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_degrees_celsius(degrees: f64) -> Self {
        Self(degrees)
    }

    pub fn in_degrees_celsius(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°C", self.0)
    }
}

/// A from/to pair, used for vacation periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Period {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

impl Period {
    pub fn new(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> Self {
        Self { from, to }
    }
}

/// One thermostat as stored in the registry
///
/// Payload fields (`name`, `temperature`, `settings`, `schedule*`,
/// `battery_level`) are raw characteristic values encoded with
/// [`eco2_proto::encode_value`]. They are refreshed by every successful read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Thermostat {
    #[serde(default)]
    pub serial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<String>,

    /// Set-point waiting to be written to the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_set_point_temperature: Option<Temperature>,

    /// Guards `updated_vacation_period`
    #[serde(default)]
    pub has_updated_vacation_period: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_vacation_period: Option<Period>,
}

/// Payload fields captured from characteristics during a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SecretKey,
    BatteryLevel,
    Name,
    Temperature,
    Settings,
    Schedule1,
    Schedule2,
    Schedule3,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::SecretKey => "secret key",
            Field::BatteryLevel => "battery level",
            Field::Name => "name",
            Field::Temperature => "temperature",
            Field::Settings => "settings",
            Field::Schedule1 => "schedule 1",
            Field::Schedule2 => "schedule 2",
            Field::Schedule3 => "schedule 3",
        };
        f.write_str(name)
    }
}

impl Thermostat {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            ..Self::default()
        }
    }

    /// True when the timer button no longer needs to be pushed
    pub fn has_secret_and_uuid(&self) -> bool {
        fn present(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }
        present(&self.secret_key) && present(&self.uuid)
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::SecretKey => &self.secret_key,
            Field::BatteryLevel => &self.battery_level,
            Field::Name => &self.name,
            Field::Temperature => &self.temperature,
            Field::Settings => &self.settings,
            Field::Schedule1 => &self.schedule1,
            Field::Schedule2 => &self.schedule2,
            Field::Schedule3 => &self.schedule3,
        };
        value.as_deref()
    }

    pub fn set_field(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::SecretKey => &mut self.secret_key,
            Field::BatteryLevel => &mut self.battery_level,
            Field::Name => &mut self.name,
            Field::Temperature => &mut self.temperature,
            Field::Settings => &mut self.settings,
            Field::Schedule1 => &mut self.schedule1,
            Field::Schedule2 => &mut self.schedule2,
            Field::Schedule3 => &mut self.schedule3,
        };
        *slot = value;
    }

    /// Battery level in percent, decoded from the captured payload
    pub fn battery_percent(&self) -> Option<u8> {
        let bytes = eco2_proto::decode_value(self.battery_level.as_deref()?).ok()?;
        bytes.first().copied()
    }

    /// Pending vacation period, honouring the guard flag
    pub fn pending_vacation(&self) -> Option<&Period> {
        if self.has_updated_vacation_period {
            self.updated_vacation_period.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_and_uuid_requires_both() {
        let mut t = Thermostat::new("T1");
        assert!(!t.has_secret_and_uuid());

        t.secret_key = Some("ABC".to_string());
        assert!(!t.has_secret_and_uuid());

        t.uuid = Some(String::new());
        assert!(!t.has_secret_and_uuid());

        t.uuid = Some("5D7000A0-0D45-41FC-B6AD-08CB8BC149B9".to_string());
        assert!(t.has_secret_and_uuid());

        t.secret_key = None;
        assert!(!t.has_secret_and_uuid());
    }

    #[test]
    fn fields_round_trip_through_setters() {
        let mut t = Thermostat::new("T1");
        t.set_field(Field::Schedule2, Some("01-02".to_string()));
        assert_eq!(t.field(Field::Schedule2), Some("01-02"));
        assert_eq!(t.schedule2.as_deref(), Some("01-02"));
        t.set_field(Field::Schedule2, None);
        assert_eq!(t.field(Field::Schedule2), None);
    }

    #[test]
    fn battery_percent_decodes_first_byte() {
        let mut t = Thermostat::new("T1");
        assert_eq!(t.battery_percent(), None);
        t.battery_level = Some("55".to_string());
        assert_eq!(t.battery_percent(), Some(0x55));
        t.battery_level = Some("garbage".to_string());
        assert_eq!(t.battery_percent(), None);
    }

    #[test]
    fn vacation_is_hidden_without_flag() {
        let from = DateTime::parse_from_rfc3339("2026-12-20T08:00:00+01:00").unwrap();
        let to = DateTime::parse_from_rfc3339("2027-01-02T18:00:00+01:00").unwrap();
        let mut t = Thermostat::new("T1");
        t.updated_vacation_period = Some(Period::new(from, to));
        assert_eq!(t.pending_vacation(), None);
        t.has_updated_vacation_period = true;
        assert_eq!(t.pending_vacation(), Some(&Period::new(from, to)));
    }
}
