//! Eco2 core library
//!
//! Pairs with Eco2 Bluetooth thermostats, reads their state and keeps it in a
//! registry keyed by serial number. The bluetooth transport is plugged in
//! through [`PeripheralAccessor`]; `eco2-ble` provides one backed by btleplug.
//!
//! # Example
//!
//! ```ignore
//! use eco2_core::{Registry, read_thermostat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let home = eco2_core::eco2_home()?;
//!     let mut registry = Registry::load(eco2_core::registry_path(&home))?;
//!     let mut accessor = eco2_ble::BtleAccessor::new().await?;
//!
//!     let report = read_thermostat(&mut accessor, &mut registry, "0:04:2F:06:24:D1").await?;
//!     println!("battery: {:?}%", report.thermostat.battery_percent());
//!     Ok(())
//! }
//! ```

mod accessor;
mod commands;
mod error;
mod home;
mod registry;
mod session;
mod thermostat;

#[cfg(test)]
mod mock;

pub use accessor::{
    AccessorError, Characteristic, ConnectedPeripheral, PeripheralAccessor, Service,
    characteristic_with_uuid,
};
pub use commands::{CommandError, cancel_vacation, forget, set_temperature, set_vacation};
pub use error::{ErrorKind, SyncError};
pub use home::{HomeError, REGISTRY_FILE, eco2_home, ensure_home, registry_path};
pub use registry::{Registry, RegistryError};
pub use session::{OnMissing, Session, SessionOutcome, Step, SyncReport, read_thermostat};
pub use thermostat::{Field, Period, Temperature, Thermostat};
