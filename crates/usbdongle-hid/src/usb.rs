//! rusb-backed transport using interrupt transfers.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, Direction, TransferType, UsbContext};
use tracing::{debug, info, warn};

use crate::codec::{REPORT_LENGTH, Report};
use crate::error::{HidError, HidResult};
use crate::transport::{DeviceDescriptor, Transport};

/// USB interface class code for HID.
const HID_CLASS: u8 = 0x03;

/// Where reports go on the device.
///
/// Anything left unset is discovered from the active configuration: the first
/// HID interface and its interrupt endpoints.
#[derive(Debug, Clone)]
pub struct UsbConfig {
    pub interface: Option<u8>,
    pub endpoint_in: Option<u8>,
    pub endpoint_out: Option<u8>,
    pub write_timeout: Duration,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            interface: None,
            endpoint_in: None,
            endpoint_out: None,
            write_timeout: Duration::from_secs(1),
        }
    }
}

/// An open, claimed device.
pub struct UsbHandle {
    handle: DeviceHandle<Context>,
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
}

/// Interface number and interrupt endpoints resolved for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoints {
    interface: u8,
    endpoint_in: u8,
    endpoint_out: u8,
}

pub struct UsbTransport {
    context: Context,
    config: UsbConfig,
}

impl UsbTransport {
    /// # Errors
    /// Returns an error if libusb cannot be initialised.
    pub fn new(config: UsbConfig) -> HidResult<Self> {
        Ok(Self { context: Context::new()?, config })
    }

    fn find_device(&self, descriptor: &DeviceDescriptor) -> HidResult<Device<Context>> {
        for device in self.context.devices()?.iter() {
            if device.bus_number() != descriptor.bus_number || device.address() != descriptor.address {
                continue;
            }
            let desc = device.device_descriptor()?;
            if desc.vendor_id() == descriptor.vendor_id && desc.product_id() == descriptor.product_id {
                return Ok(device);
            }
        }
        Err(HidError::DeviceNotFound)
    }

    fn resolve_endpoints(&self, device: &Device<Context>) -> HidResult<Endpoints> {
        let config = device.active_config_descriptor()?;

        for interface in config.interfaces() {
            for setting in interface.descriptors() {
                let number = setting.interface_number();
                let wanted = match self.config.interface {
                    Some(configured) => configured == number,
                    None => setting.class_code() == HID_CLASS,
                };
                if !wanted {
                    continue;
                }

                let mut endpoint_in = self.config.endpoint_in;
                let mut endpoint_out = self.config.endpoint_out;
                for endpoint in setting.endpoint_descriptors() {
                    if endpoint.transfer_type() != TransferType::Interrupt {
                        continue;
                    }
                    match endpoint.direction() {
                        Direction::In => endpoint_in = endpoint_in.or(Some(endpoint.address())),
                        Direction::Out => endpoint_out = endpoint_out.or(Some(endpoint.address())),
                    }
                }

                if let (Some(endpoint_in), Some(endpoint_out)) = (endpoint_in, endpoint_out) {
                    return Ok(Endpoints { interface: number, endpoint_in, endpoint_out });
                }
            }
        }

        Err(HidError::DeviceNotFound)
    }

    fn try_open(&self, descriptor: &DeviceDescriptor) -> HidResult<UsbHandle> {
        let device = self.find_device(descriptor)?;
        let endpoints = self.resolve_endpoints(&device)?;

        let mut handle = device.open().map_err(|e| match e {
            rusb::Error::Access => HidError::PermissionDenied,
            other => HidError::UsbError(other),
        })?;

        // Not supported on every platform; claiming may still succeed
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!(error = %e, "Kernel driver auto-detach unavailable");
        }
        handle.claim_interface(endpoints.interface)?;

        debug!(
            interface = endpoints.interface,
            endpoint_in = endpoints.endpoint_in,
            endpoint_out = endpoints.endpoint_out,
            "Claimed control interface"
        );

        Ok(UsbHandle {
            handle,
            interface: endpoints.interface,
            endpoint_in: endpoints.endpoint_in,
            endpoint_out: endpoints.endpoint_out,
        })
    }
}

impl Transport for UsbTransport {
    type Handle = UsbHandle;

    fn open(&self, device: &DeviceDescriptor) -> Option<UsbHandle> {
        match self.try_open(device) {
            Ok(handle) => {
                info!(bus = device.bus_number, address = device.address, "Opened dongle");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, bus = device.bus_number, address = device.address, "Failed to open dongle");
                None
            }
        }
    }

    fn send(&self, handle: &mut UsbHandle, report: &Report) -> HidResult<()> {
        let sent =
            handle.handle.write_interrupt(handle.endpoint_out, report.as_bytes(), self.config.write_timeout)?;
        if sent == REPORT_LENGTH {
            Ok(())
        } else {
            Err(HidError::ShortWrite { sent, expected: REPORT_LENGTH })
        }
    }

    fn receive(&self, handle: &mut UsbHandle, timeout: Duration) -> HidResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; REPORT_LENGTH];
        match handle.handle.read_interrupt(handle.endpoint_in, &mut buf, timeout) {
            Ok(len) => {
                buf.truncate(len);
                Ok(Some(buf))
            }
            Err(rusb::Error::Timeout) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self, mut handle: UsbHandle) {
        if let Err(e) = handle.handle.release_interface(handle.interface) {
            debug!(error = %e, interface = handle.interface, "Failed to release interface");
        }
    }
}
