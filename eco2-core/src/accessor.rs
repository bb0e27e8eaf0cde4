//! Peripheral accessor - the transport seam between the sync workflow and BLE
//!
//! Implementations live outside this crate (`eco2-ble` for btleplug). Every
//! call is awaited before the next one is issued; the thermostat firmware
//! answers GATT requests strictly in order.

use uuid::Uuid;

/// A GATT service found on a connected peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub uuid: Uuid,
}

/// A GATT characteristic inside a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub service_uuid: Uuid,
}

/// A peripheral after a successful connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPeripheral {
    /// Transport identifier of the connection (address, or platform UUID on macOS)
    pub id: String,
    /// Advertised local name, when the platform reported one
    pub name: Option<String>,
    pub services: Vec<Service>,
}

impl ConnectedPeripheral {
    pub fn service(&self, uuid: Uuid) -> Option<&Service> {
        self.services.iter().find(|s| s.uuid == uuid)
    }
}

/// Find a characteristic by UUID in an enumerated list
pub fn characteristic_with_uuid(
    characteristics: &[Characteristic],
    uuid: Uuid,
) -> Option<&Characteristic> {
    characteristics.iter().find(|c| c.uuid == uuid)
}

#[derive(Debug, thiserror::Error)]
pub enum AccessorError {
    #[error("no bluetooth adapter found")]
    NoAdapter,
    #[error("no peripheral named {name} found")]
    PeripheralNotFound { name: String },
    #[error("not connected to a peripheral")]
    NotConnected,
    #[error("characteristic {uuid} is not available in service {service_uuid}")]
    CharacteristicUnavailable { uuid: Uuid, service_uuid: Uuid },
    #[error("bluetooth error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AccessorError {
    /// Wrap an error raised by the underlying bluetooth stack
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(e))
    }
}

/// Operations the sync workflow needs from a BLE transport
#[async_trait::async_trait]
pub trait PeripheralAccessor: Send {
    /// Connect to the peripheral with identifier `id`, or advertising `name`
    /// when `id` is unknown or no longer visible
    async fn connect(
        &mut self,
        name: &str,
        id: Option<&str>,
    ) -> Result<ConnectedPeripheral, AccessorError>;

    async fn discover_characteristics(
        &mut self,
        service: &Service,
    ) -> Result<Vec<Characteristic>, AccessorError>;

    async fn read_characteristic_value(
        &mut self,
        service: &Service,
        characteristic: &Characteristic,
    ) -> Result<Vec<u8>, AccessorError>;

    async fn write_characteristic_value(
        &mut self,
        service: &Service,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<(), AccessorError>;

    async fn disconnect(&mut self) -> Result<(), AccessorError>;
}
