//! CSV export.

use std::io::Write;

use anyhow::Result;
use sfrhome_core::Device;

/// Exported columns, in order.
pub const CSV_COLUMNS: &[&str] = &[
    "id",
    "deviceType",
    "name",
    "status",
    "batteryLevel",
    "deviceMac",
    "signalLevel",
    "categories",
    "brand",
    "video_url",
];

/// Writes one header row and one row per device. Missing values are
/// written as empty cells.
pub fn write_csv<W: Write>(writer: W, devices: &[Device]) -> Result<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    csv.write_record(CSV_COLUMNS)?;

    for device in devices {
        csv.write_record([
            cell(device.id.as_ref()),
            cell(device.device_type.as_ref()),
            cell(device.name.as_ref()),
            cell(device.status.as_ref()),
            cell(device.battery_level.as_ref()),
            cell(device.device_mac.as_ref()),
            cell(device.signal_level.as_ref()),
            cell(device.categories.as_ref()),
            cell(device.brand.as_ref()),
            cell(device.video_url.as_ref()),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

fn cell(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}
