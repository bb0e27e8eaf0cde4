//! BLE GATT identifiers spoken by Eco2 thermostats
//!
//! The thermostat keeps everything except the battery level in one vendor
//! service. The battery level lives in the standard GATT battery service.

use uuid::Uuid;

/// Vendor service carrying the pin code, secret key and all thermostat data
pub const MAIN_SERVICE_UUID: Uuid = Uuid::from_u128(0x10020000_2749_0001_0000_00805f9b042f);

/// Standard GATT battery service (0x180F)
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// Pin code characteristic (write). Accepting a write here unlocks all reads.
pub const PIN_CODE_UUID: Uuid = Uuid::from_u128(0x10020001_2749_0001_0000_00805f9b042f);

/// Settings characteristic (read)
pub const SETTINGS_UUID: Uuid = Uuid::from_u128(0x10020003_2749_0001_0000_00805f9b042f);

/// Temperature characteristic (read)
pub const TEMPERATURE_UUID: Uuid = Uuid::from_u128(0x10020005_2749_0001_0000_00805f9b042f);

/// Device name characteristic (read)
pub const DEVICE_NAME_UUID: Uuid = Uuid::from_u128(0x10020006_2749_0001_0000_00805f9b042f);

/// Secret key characteristic (read)
///
/// Only exposed during the session that follows a push on the timer button.
pub const SECRET_KEY_UUID: Uuid = Uuid::from_u128(0x1002000b_2749_0001_0000_00805f9b042f);

/// Schedule characteristics, one per block of weekdays (read)
pub const SCHEDULE_1_UUID: Uuid = Uuid::from_u128(0x1002000c_2749_0001_0000_00805f9b042f);
pub const SCHEDULE_2_UUID: Uuid = Uuid::from_u128(0x1002000d_2749_0001_0000_00805f9b042f);
pub const SCHEDULE_3_UUID: Uuid = Uuid::from_u128(0x1002000e_2749_0001_0000_00805f9b042f);

/// Standard GATT battery level characteristic (0x2A19), one byte percentage
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);

/// Value written to the pin code characteristic to unlock the thermostat
///
/// Thermostats ship without a pin code, which the firmware represents as
/// four zero bytes.
pub const UNLOCK_PIN: [u8; 4] = [0, 0, 0, 0];

/// Suffix of the advertised local name of Eco2 thermostats
pub const ADVERTISED_NAME_SUFFIX: &str = ";eTRV";

/// Human readable label for a known characteristic, used in log lines
pub fn characteristic_label(uuid: &Uuid) -> Option<&'static str> {
    let label = match *uuid {
        PIN_CODE_UUID => "pin code",
        SETTINGS_UUID => "settings",
        TEMPERATURE_UUID => "temperature",
        DEVICE_NAME_UUID => "device name",
        SECRET_KEY_UUID => "secret key",
        SCHEDULE_1_UUID => "schedule 1",
        SCHEDULE_2_UUID => "schedule 2",
        SCHEDULE_3_UUID => "schedule 3",
        BATTERY_LEVEL_UUID => "battery level",
        _ => return None,
    };
    Some(label)
}
