//! Eco2 BLE transport
//!
//! btleplug implementation of [`eco2_core::PeripheralAccessor`], plus scanning
//! for nearby thermostats.
//!
//! # Example
//!
//! ```ignore
//! use eco2_ble::{BtleAccessor, scan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let accessor = BtleAccessor::new().await?;
//!     for found in scan(accessor.adapter(), std::time::Duration::from_secs(5)).await? {
//!         println!("{} ({})", found.name, found.id);
//!     }
//!     Ok(())
//! }
//! ```

mod ble;

pub use ble::{BtleAccessor, DEFAULT_SCAN_DURATION, DiscoveredPeripheral, get_adapter, scan};
