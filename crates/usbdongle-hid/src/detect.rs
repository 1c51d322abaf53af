//! Dongle detection via USB enumeration.

use rusb::UsbContext;
use tracing::{debug, info};
use usbdongle_core::DongleFamily;

use crate::error::HidResult;
use crate::transport::DeviceDescriptor;

/// List every attached device of a supported family.
///
/// # Errors
/// Returns an error if libusb cannot be initialised.
pub fn find_dongles() -> HidResult<Vec<DeviceDescriptor>> {
    let context = rusb::Context::new()?;
    let devices = match context.devices() {
        Ok(d) => d,
        Err(e) => {
            debug!(error = %e, "Failed to enumerate USB devices");
            return Ok(Vec::new());
        }
    };

    let mut found = Vec::new();
    for device in devices.iter() {
        let Ok(desc) = device.device_descriptor() else {
            continue;
        };

        let Some(family) = DongleFamily::from_ids(desc.vendor_id(), desc.product_id()) else {
            continue;
        };

        let product_name = read_product_name(&device, &desc);
        info!(
            model = family.capabilities().model_name,
            bus = device.bus_number(),
            address = device.address(),
            "Dongle detected via USB"
        );

        found.push(DeviceDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            bus_number: device.bus_number(),
            address: device.address(),
            product_name,
        });
    }

    if found.is_empty() {
        debug!("No supported dongle found");
    }
    Ok(found)
}

/// The first attached dongle, if any.
///
/// # Errors
/// Returns an error if libusb cannot be initialised.
pub fn find_first_dongle() -> HidResult<Option<DeviceDescriptor>> {
    Ok(find_dongles()?.into_iter().next())
}

fn read_product_name<T: UsbContext>(
    device: &rusb::Device<T>,
    desc: &rusb::DeviceDescriptor,
) -> Option<String> {
    desc.product_string_index()?;
    let handle = device.open().ok()?;
    handle.read_product_string_ascii(desc).ok()
}
