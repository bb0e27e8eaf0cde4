//! btleplug backed peripheral accessor

use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use eco2_core::{AccessorError, Characteristic, ConnectedPeripheral, PeripheralAccessor, Service};
use eco2_proto::ble::{ADVERTISED_NAME_SUFFIX, MAIN_SERVICE_UUID};
use uuid::Uuid;

/// How long to listen for advertisements before picking a peripheral
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// A peripheral seen during a scan
#[derive(Debug, Clone)]
pub struct DiscoveredPeripheral {
    pub name: String,
    pub id: String,
    pub rssi: Option<i16>,
    pub is_eco2: bool,
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, AccessorError> {
    let manager = Manager::new().await.map_err(AccessorError::backend)?;
    let adapters = manager.adapters().await.map_err(AccessorError::backend)?;
    adapters.into_iter().next().ok_or(AccessorError::NoAdapter)
}

/// Scan for BLE peripherals
///
/// Eco2 thermostats have `is_eco2 = true`.
pub async fn scan(
    adapter: &Adapter,
    duration: Duration,
) -> Result<Vec<DiscoveredPeripheral>, AccessorError> {
    let peripherals = scan_peripherals(adapter, duration).await?;

    let mut found = Vec::new();
    for peripheral in peripherals {
        if let Some(props) = peripheral
            .properties()
            .await
            .map_err(AccessorError::backend)?
        {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let is_eco2 = is_eco2(&name, &props.services);
            found.push(DiscoveredPeripheral {
                id: peripheral.id().to_string(),
                rssi: props.rssi,
                is_eco2,
                name,
            });
        }
    }

    Ok(found)
}

async fn scan_peripherals(
    adapter: &Adapter,
    duration: Duration,
) -> Result<Vec<Peripheral>, AccessorError> {
    tracing::debug!(?duration, "scanning");
    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(AccessorError::backend)?;
    tokio::time::sleep(duration).await;

    let peripherals = adapter.peripherals().await;
    adapter.stop_scan().await.map_err(AccessorError::backend)?;
    peripherals.map_err(AccessorError::backend)
}

fn is_eco2(name: &str, services: &[Uuid]) -> bool {
    services.contains(&MAIN_SERVICE_UUID) || name.ends_with(ADVERTISED_NAME_SUFFIX)
}

/// Thermostats advertise their serial inside the local name
fn name_matches(advertised: &str, serial: &str) -> bool {
    !serial.is_empty() && advertised.contains(serial)
}

/// [`PeripheralAccessor`] over the first Bluetooth adapter
pub struct BtleAccessor {
    adapter: Adapter,
    scan_duration: Duration,
    connected: Option<Peripheral>,
}

impl BtleAccessor {
    pub async fn new() -> Result<Self, AccessorError> {
        Ok(Self::with_adapter(get_adapter().await?))
    }

    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan_duration: DEFAULT_SCAN_DURATION,
            connected: None,
        }
    }

    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Find by last known identifier first, then by advertised name
    async fn find(&self, name: &str, id: Option<&str>) -> Result<Peripheral, AccessorError> {
        let peripherals = scan_peripherals(&self.adapter, self.scan_duration).await?;

        if let Some(id) = id {
            if let Some(p) = peripherals.iter().find(|p| p.id().to_string() == id) {
                tracing::debug!(id, "found peripheral by identifier");
                return Ok(p.clone());
            }
            tracing::info!(id, "last known identifier not seen, matching by name");
        }

        for peripheral in peripherals {
            let props = peripheral
                .properties()
                .await
                .map_err(AccessorError::backend)?;
            let advertised = props.and_then(|p| p.local_name).unwrap_or_default();
            if name_matches(&advertised, name) {
                tracing::debug!(advertised = %advertised, "found peripheral by name");
                return Ok(peripheral);
            }
        }

        Err(AccessorError::PeripheralNotFound {
            name: name.to_string(),
        })
    }

    fn peripheral(&self) -> Result<&Peripheral, AccessorError> {
        self.connected.as_ref().ok_or(AccessorError::NotConnected)
    }

    fn platform_characteristic(
        &self,
        service: &Service,
        characteristic: &Characteristic,
    ) -> Result<btleplug::api::Characteristic, AccessorError> {
        self.peripheral()?
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic.uuid && c.service_uuid == service.uuid)
            .ok_or(AccessorError::CharacteristicUnavailable {
                uuid: characteristic.uuid,
                service_uuid: service.uuid,
            })
    }
}

#[async_trait::async_trait]
impl PeripheralAccessor for BtleAccessor {
    async fn connect(
        &mut self,
        name: &str,
        id: Option<&str>,
    ) -> Result<ConnectedPeripheral, AccessorError> {
        let peripheral = self.find(name, id).await?;

        peripheral.connect().await.map_err(AccessorError::backend)?;
        peripheral
            .discover_services()
            .await
            .map_err(AccessorError::backend)?;

        let advertised = peripheral
            .properties()
            .await
            .map_err(AccessorError::backend)?
            .and_then(|p| p.local_name);
        let services = peripheral
            .services()
            .into_iter()
            .map(|s| Service { uuid: s.uuid })
            .collect();

        let connected = ConnectedPeripheral {
            id: peripheral.id().to_string(),
            name: advertised,
            services,
        };
        self.connected = Some(peripheral);
        Ok(connected)
    }

    async fn discover_characteristics(
        &mut self,
        service: &Service,
    ) -> Result<Vec<Characteristic>, AccessorError> {
        let characteristics = self
            .peripheral()?
            .services()
            .into_iter()
            .filter(|s| s.uuid == service.uuid)
            .flat_map(|s| s.characteristics)
            .map(|c| Characteristic {
                uuid: c.uuid,
                service_uuid: c.service_uuid,
            })
            .collect();
        Ok(characteristics)
    }

    async fn read_characteristic_value(
        &mut self,
        service: &Service,
        characteristic: &Characteristic,
    ) -> Result<Vec<u8>, AccessorError> {
        let target = self.platform_characteristic(service, characteristic)?;
        self.peripheral()?
            .read(&target)
            .await
            .map_err(AccessorError::backend)
    }

    async fn write_characteristic_value(
        &mut self,
        service: &Service,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<(), AccessorError> {
        let target = self.platform_characteristic(service, characteristic)?;
        self.peripheral()?
            .write(&target, value, WriteType::WithResponse)
            .await
            .map_err(AccessorError::backend)
    }

    async fn disconnect(&mut self) -> Result<(), AccessorError> {
        let peripheral = self.connected.take().ok_or(AccessorError::NotConnected)?;
        peripheral
            .disconnect()
            .await
            .map_err(AccessorError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_eco2_by_service_or_name() {
        assert!(is_eco2("whatever", &[MAIN_SERVICE_UUID]));
        assert!(is_eco2("0;0:04:2F:06:24:D1;eTRV", &[]));
        assert!(!is_eco2("Flower care", &[]));
    }

    #[test]
    fn matches_serial_inside_advertised_name() {
        assert!(name_matches("0;0:04:2F:06:24:D1;eTRV", "0:04:2F:06:24:D1"));
        assert!(!name_matches("0;0:04:2F:06:24:D1;eTRV", "0:04:2F:06:24:D2"));
        assert!(!name_matches("anything", ""));
    }
}
