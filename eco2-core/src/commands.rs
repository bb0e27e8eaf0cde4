//! Registry-only commands - staging values without talking to the device
//!
//! Each command saves the registry before returning. On error the registry
//! passed in is left as it was.

use chrono::{DateTime, FixedOffset};

use crate::registry::{Registry, RegistryError};
use crate::thermostat::{Period, Temperature, Thermostat};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no thermostat with serial {0}, read it first")]
    UnknownThermostat(String),
    #[error("set-point must be a finite number of degrees, got {0}")]
    InvalidTemperature(f64),
    #[error("vacation cannot end ({to}) before it starts ({from})")]
    InvalidPeriod {
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Forget everything about `serial`, secret key included
///
/// Returns whether the registry knew the thermostat.
pub fn forget(registry: &mut Registry, serial: &str) -> Result<bool, CommandError> {
    let mut next = registry.clone();
    if !next.remove_with_serial(serial) {
        return Ok(false);
    }
    next.save()?;
    *registry = next;
    tracing::info!(serial, "forgot thermostat");
    Ok(true)
}

/// Stage a new set-point temperature
pub fn set_temperature(
    registry: &mut Registry,
    serial: &str,
    degrees: f64,
) -> Result<(), CommandError> {
    if !degrees.is_finite() {
        return Err(CommandError::InvalidTemperature(degrees));
    }
    update(registry, serial, |thermostat| {
        thermostat.updated_set_point_temperature = Some(Temperature::from_degrees_celsius(degrees));
    })
}

/// Stage a vacation period
pub fn set_vacation(
    registry: &mut Registry,
    serial: &str,
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> Result<(), CommandError> {
    if to < from {
        return Err(CommandError::InvalidPeriod { from, to });
    }
    update(registry, serial, |thermostat| {
        thermostat.has_updated_vacation_period = true;
        thermostat.updated_vacation_period = Some(Period::new(from, to));
    })
}

/// Drop a staged vacation period
pub fn cancel_vacation(registry: &mut Registry, serial: &str) -> Result<(), CommandError> {
    update(registry, serial, |thermostat| {
        thermostat.has_updated_vacation_period = false;
        thermostat.updated_vacation_period = None;
    })
}

fn update<F>(registry: &mut Registry, serial: &str, f: F) -> Result<(), CommandError>
where
    F: FnOnce(&mut Thermostat),
{
    let mut next = registry.clone();
    let thermostat = next
        .get_mut(serial)
        .ok_or_else(|| CommandError::UnknownThermostat(serial.to_string()))?;
    f(thermostat);
    next.save()?;
    *registry = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(dir: &tempfile::TempDir, serials: &[&str]) -> Registry {
        let mut registry = Registry::empty(dir.path().join("thermostats.xml"));
        for serial in serials {
            registry.commit(Thermostat::new(serial));
        }
        registry
    }

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn set_temperature_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1"]);

        set_temperature(&mut registry, "T1", 21.5).unwrap();

        let read = Registry::load(registry.path()).unwrap();
        let thermostat = read.get("T1").unwrap();
        assert_eq!(
            thermostat.updated_set_point_temperature,
            Some(Temperature::from_degrees_celsius(21.5))
        );
    }

    #[test]
    fn set_temperature_rejects_nan() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1"]);
        assert!(matches!(
            set_temperature(&mut registry, "T1", f64::NAN),
            Err(CommandError::InvalidTemperature(_))
        ));
        assert!(!registry.path().exists());
    }

    #[test]
    fn staging_needs_a_known_thermostat() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1"]);
        assert!(matches!(
            set_temperature(&mut registry, "T9", 20.0),
            Err(CommandError::UnknownThermostat(serial)) if serial == "T9"
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("T9").is_none());
    }

    #[test]
    fn vacation_can_be_set_and_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1"]);
        let from = date("2026-12-20T08:00:00+01:00");
        let to = date("2027-01-02T18:00:00+01:00");

        set_vacation(&mut registry, "T1", from, to).unwrap();
        let read = Registry::load(registry.path()).unwrap();
        assert_eq!(
            read.get("T1").and_then(Thermostat::pending_vacation),
            Some(&Period::new(from, to))
        );

        cancel_vacation(&mut registry, "T1").unwrap();
        let read = Registry::load(registry.path()).unwrap();
        let thermostat = read.get("T1").unwrap();
        assert!(!thermostat.has_updated_vacation_period);
        assert_eq!(thermostat.updated_vacation_period, None);
    }

    #[test]
    fn vacation_must_not_end_before_it_starts() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1"]);
        let result = set_vacation(
            &mut registry,
            "T1",
            date("2027-01-02T18:00:00+01:00"),
            date("2026-12-20T08:00:00+01:00"),
        );
        assert!(matches!(result, Err(CommandError::InvalidPeriod { .. })));
        assert!(!registry.get("T1").unwrap().has_updated_vacation_period);
    }

    #[test]
    fn forget_removes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_with(&dir, &["T1", "T2"]);

        assert!(forget(&mut registry, "T1").unwrap());
        assert!(!forget(&mut registry, "T1").unwrap());

        let read = Registry::load(registry.path()).unwrap();
        let serials: Vec<_> = read.iter().map(|t| t.serial.clone()).collect();
        assert_eq!(serials, vec!["T2".to_string()]);
    }
}
