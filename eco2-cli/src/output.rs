//! Console output

use eco2_ble::DiscoveredPeripheral;
use eco2_core::{Registry, SyncReport, Thermostat};

pub fn print_scan(found: &[DiscoveredPeripheral]) {
    println!("\nFound {} devices:", found.len());
    for peripheral in found {
        let rssi = peripheral
            .rssi
            .map(|r| format!("{r} dBm"))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if peripheral.is_eco2 { " [ECO2]" } else { "" };
        println!(
            "  {} ({}) RSSI: {}{}",
            peripheral.name, peripheral.id, rssi, marker
        );
    }
}

pub fn print_report(report: &SyncReport) {
    let thermostat = &report.thermostat;
    println!("Read {}", thermostat.serial);
    if report.secret_read {
        println!("  secret key: read from thermostat");
    } else {
        println!("  secret key: kept from registry");
    }
    println!("  battery:    {}", battery(thermostat));
    for field in &report.absent {
        println!("  {field}: not exposed by this thermostat");
    }
}

pub fn print_list(registry: &Registry) {
    if registry.is_empty() {
        println!("No thermostats, run `eco2 read <serial>` first");
        return;
    }

    for thermostat in registry.iter() {
        let paired = if thermostat.has_secret_and_uuid() {
            "paired"
        } else {
            "not paired"
        };
        println!(
            "  {} ({}) battery: {} [{}]",
            thermostat.serial,
            thermostat.uuid.as_deref().unwrap_or("-"),
            battery(thermostat),
            paired
        );
    }
}

pub fn print_thermostat(thermostat: &Thermostat) {
    let show = |label: &str, value: Option<&str>| {
        println!("{label:<24}{}", value.unwrap_or("-"));
    };

    show("Serial", Some(thermostat.serial.as_str()));
    show("UUID", thermostat.uuid.as_deref());
    show(
        "Secret key",
        thermostat.secret_key.as_ref().map(|_| "stored"),
    );
    show("Battery", Some(battery(thermostat).as_str()));
    show("Name", thermostat.name.as_deref());
    show("Temperature", thermostat.temperature.as_deref());
    show("Settings", thermostat.settings.as_deref());
    show("Schedule 1", thermostat.schedule1.as_deref());
    show("Schedule 2", thermostat.schedule2.as_deref());
    show("Schedule 3", thermostat.schedule3.as_deref());

    let set_point = thermostat
        .updated_set_point_temperature
        .map(|t| t.to_string());
    show("Pending set-point", set_point.as_deref());

    let vacation = thermostat
        .pending_vacation()
        .map(|p| format!("{} - {}", p.from, p.to));
    show("Pending vacation", vacation.as_deref());
}

fn battery(thermostat: &Thermostat) -> String {
    thermostat
        .battery_percent()
        .map(|p| format!("{p}%"))
        .unwrap_or_else(|| "-".to_string())
}
