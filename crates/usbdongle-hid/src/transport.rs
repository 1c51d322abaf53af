//! Transport contract and scoped device sessions.

use std::time::Duration;

use tracing::{debug, warn};
use usbdongle_core::{Error, Result};

use crate::codec::Report;
use crate::error::HidResult;

/// Where an attached device lives on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
    pub product_name: Option<String>,
}

/// Raw report exchange with a device.
///
/// All calls block. A handle is only ever used by one caller at a time.
#[cfg_attr(test, mockall::automock(type Handle = u8;))]
pub trait Transport: Send {
    type Handle: Send;

    /// Open the device, or `None` if it is gone or cannot be opened.
    fn open(&self, device: &DeviceDescriptor) -> Option<Self::Handle>;

    /// # Errors
    /// Returns an error if the report could not be written in full.
    fn send(&self, handle: &mut Self::Handle, report: &Report) -> HidResult<()>;

    /// Wait up to `timeout` for one report. `Ok(None)` means nothing arrived.
    ///
    /// # Errors
    /// Returns an error if the read failed.
    fn receive(&self, handle: &mut Self::Handle, timeout: Duration) -> HidResult<Option<Vec<u8>>>;

    fn close(&self, handle: Self::Handle);
}

/// An open handle that is closed when the session is dropped.
pub struct Session<'a, T: Transport> {
    transport: &'a T,
    handle: Option<T::Handle>,
}

impl<T: Transport> std::fmt::Debug for Session<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("open", &self.handle.is_some()).finish_non_exhaustive()
    }
}

impl<'a, T: Transport> Session<'a, T> {
    /// # Errors
    /// Returns [`Error::TransportUnavailable`] if the device cannot be opened.
    pub fn open(transport: &'a T, device: &DeviceDescriptor) -> Result<Self> {
        let handle = transport.open(device).ok_or(Error::TransportUnavailable)?;
        debug!(bus = device.bus_number, address = device.address, "Session opened");
        Ok(Self { transport, handle: Some(handle) })
    }

    fn handle(&mut self) -> Result<&mut T::Handle> {
        self.handle.as_mut().ok_or(Error::TransportUnavailable)
    }

    /// # Errors
    /// Returns the transport failure collapsed into an [`Error`].
    pub fn send(&mut self, report: &Report) -> Result<()> {
        debug!(report = ?report, "Sending report");
        let transport = self.transport;
        transport.send(self.handle()?, report).map_err(|e| {
            warn!(error = %e, report = ?report, "Send failed");
            Error::from(e)
        })
    }

    /// # Errors
    /// Returns [`Error::Timeout`] if nothing arrives within `timeout`, or the
    /// transport failure collapsed into an [`Error`].
    pub fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let transport = self.transport;
        match transport.receive(self.handle()?, timeout) {
            Ok(Some(bytes)) => {
                debug!(len = bytes.len(), "Received report");
                Ok(bytes)
            }
            Ok(None) => {
                warn!(timeout = ?timeout, "Timed out waiting for report");
                Err(Error::Timeout)
            }
            Err(e) => {
                warn!(error = %e, "Receive failed");
                Err(e.into())
            }
        }
    }

    /// Send a query and wait for its response.
    ///
    /// # Errors
    /// Fails like [`Self::send`] or [`Self::receive`].
    pub fn request(&mut self, report: &Report, timeout: Duration) -> Result<Vec<u8>> {
        self.send(report)?;
        self.receive(timeout)
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.transport.close(handle);
            debug!("Session closed");
        }
    }
}
