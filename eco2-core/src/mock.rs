//! Scripted peripheral accessor for session tests

use std::collections::HashMap;
use std::path::PathBuf;

use eco2_proto::ble::{
    BATTERY_LEVEL_UUID, BATTERY_SERVICE_UUID, DEVICE_NAME_UUID, MAIN_SERVICE_UUID, PIN_CODE_UUID,
    SCHEDULE_1_UUID, SCHEDULE_2_UUID, SCHEDULE_3_UUID, SECRET_KEY_UUID, SETTINGS_UUID,
    TEMPERATURE_UUID,
};
use uuid::Uuid;

use crate::accessor::{
    AccessorError, Characteristic, ConnectedPeripheral, PeripheralAccessor, Service,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect { name: String, id: Option<String> },
    Discover(Uuid),
    Read(Uuid),
    Write(Uuid, Vec<u8>),
    Disconnect,
}

pub struct MockAccessor {
    peripheral: ConnectedPeripheral,
    characteristics: HashMap<Uuid, Vec<Characteristic>>,
    values: HashMap<Uuid, Vec<u8>>,
    fail_connect: bool,
    fail_read: Option<Uuid>,
    fail_discover: Option<Uuid>,
    fail_write: bool,
    fail_disconnect: bool,
    probe: Option<PathBuf>,
    pub calls: Vec<Call>,
    /// Whether the probed file existed when disconnect was called
    pub probe_at_disconnect: Option<bool>,
}

impl MockAccessor {
    /// An unlocked Eco2 thermostat exposing every characteristic
    pub fn thermostat(id: &str) -> Self {
        let main = [
            (PIN_CODE_UUID, vec![]),
            (SECRET_KEY_UUID, vec![0x01, 0xAF, 0x3C]),
            (DEVICE_NAME_UUID, vec![0x4B, 0x69]),
            (TEMPERATURE_UUID, vec![0x2C, 0x28]),
            (SETTINGS_UUID, vec![0x0A, 0x0B, 0x0C]),
            (SCHEDULE_1_UUID, vec![0x11]),
            (SCHEDULE_2_UUID, vec![0x12]),
            (SCHEDULE_3_UUID, vec![0x13]),
        ];
        let battery = [(BATTERY_LEVEL_UUID, vec![0x55])];

        let mut characteristics: HashMap<Uuid, Vec<Characteristic>> = HashMap::new();
        let mut values: HashMap<Uuid, Vec<u8>> = HashMap::new();
        for (service_uuid, entries) in [
            (MAIN_SERVICE_UUID, main.to_vec()),
            (BATTERY_SERVICE_UUID, battery.to_vec()),
        ] {
            let list: Vec<Characteristic> = entries
                .iter()
                .map(|(uuid, _)| Characteristic {
                    uuid: *uuid,
                    service_uuid,
                })
                .collect();
            characteristics.insert(service_uuid, list);
            values.extend(entries);
        }

        Self {
            peripheral: ConnectedPeripheral {
                id: id.to_string(),
                name: Some(format!("0;{id};eTRV")),
                services: vec![
                    Service {
                        uuid: MAIN_SERVICE_UUID,
                    },
                    Service {
                        uuid: BATTERY_SERVICE_UUID,
                    },
                ],
            },
            characteristics,
            values,
            fail_connect: false,
            fail_read: None,
            fail_discover: None,
            fail_write: false,
            fail_disconnect: false,
            probe: None,
            calls: Vec::new(),
            probe_at_disconnect: None,
        }
    }

    pub fn without_service(mut self, uuid: Uuid) -> Self {
        self.peripheral.services.retain(|s| s.uuid != uuid);
        self
    }

    pub fn without_characteristic(mut self, uuid: Uuid) -> Self {
        for list in self.characteristics.values_mut() {
            list.retain(|c| c.uuid != uuid);
        }
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_read(mut self, uuid: Uuid) -> Self {
        self.fail_read = Some(uuid);
        self
    }

    /// Answer reads of `uuid` with `value`
    pub fn with_value(mut self, uuid: Uuid, value: Vec<u8>) -> Self {
        self.values.insert(uuid, value);
        self
    }

    /// Fail characteristic discovery on service `uuid`
    pub fn failing_discover(mut self, uuid: Uuid) -> Self {
        self.fail_discover = Some(uuid);
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Read(..)))
            .count()
    }

    /// Record whether `path` exists at the moment of disconnect
    pub fn probing(mut self, path: PathBuf) -> Self {
        self.probe = Some(path);
        self
    }

    pub fn writes(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Write(..)))
            .collect()
    }

    pub fn disconnected(&self) -> bool {
        self.calls.contains(&Call::Disconnect)
    }
}

fn failure(what: &str) -> AccessorError {
    AccessorError::backend(std::io::Error::other(what.to_string()))
}

#[async_trait::async_trait]
impl PeripheralAccessor for MockAccessor {
    async fn connect(
        &mut self,
        name: &str,
        id: Option<&str>,
    ) -> Result<ConnectedPeripheral, AccessorError> {
        self.calls.push(Call::Connect {
            name: name.to_string(),
            id: id.map(str::to_string),
        });
        if self.fail_connect {
            return Err(AccessorError::PeripheralNotFound {
                name: name.to_string(),
            });
        }
        Ok(self.peripheral.clone())
    }

    async fn discover_characteristics(
        &mut self,
        service: &Service,
    ) -> Result<Vec<Characteristic>, AccessorError> {
        self.calls.push(Call::Discover(service.uuid));
        if self.fail_discover == Some(service.uuid) {
            return Err(failure("discovery interrupted"));
        }
        Ok(self
            .characteristics
            .get(&service.uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_characteristic_value(
        &mut self,
        _service: &Service,
        characteristic: &Characteristic,
    ) -> Result<Vec<u8>, AccessorError> {
        self.calls.push(Call::Read(characteristic.uuid));
        if self.fail_read == Some(characteristic.uuid) {
            return Err(failure("read timed out"));
        }
        self.values
            .get(&characteristic.uuid)
            .cloned()
            .ok_or(AccessorError::CharacteristicUnavailable {
                uuid: characteristic.uuid,
                service_uuid: characteristic.service_uuid,
            })
    }

    async fn write_characteristic_value(
        &mut self,
        _service: &Service,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<(), AccessorError> {
        self.calls.push(Call::Write(characteristic.uuid, value.to_vec()));
        if self.fail_write {
            return Err(failure("write not acknowledged"));
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), AccessorError> {
        self.calls.push(Call::Disconnect);
        self.probe_at_disconnect = self.probe.as_ref().map(|p| p.exists());
        if self.fail_disconnect {
            return Err(AccessorError::NotConnected);
        }
        Ok(())
    }
}
