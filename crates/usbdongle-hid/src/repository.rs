//! Device orchestration: identity, refresh and single feature changes.

use std::time::Duration;

use tracing::{debug, info, warn};
use usbdongle_core::{DongleFamily, Error, FeatureValue, Result, UsbDongle};

use crate::codec::{decode_telemetry, encode_get, encode_set};
use crate::command::{GetCommand, refresh_sequence, volume_sequence};
use crate::transport::{DeviceDescriptor, Session, Transport};

/// How long to wait for each telemetry response.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Runs command sequences against one transport.
///
/// Every public operation opens its own [`Session`] and closes it before
/// returning, whatever the outcome. Inputs are never modified; success
/// yields a fresh snapshot and failure yields only the error.
pub struct DongleRepository<T: Transport> {
    transport: T,
    receive_timeout: Duration,
}

impl<T: Transport> DongleRepository<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, receive_timeout: DEFAULT_RECEIVE_TIMEOUT }
    }

    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Map a device to its default-state snapshot. Never touches the transport.
    pub fn resolve_identity(&self, device: &DeviceDescriptor) -> UsbDongle {
        let dongle = UsbDongle::from_ids(device.vendor_id, device.product_id);
        if !dongle.is_supported() {
            debug!(
                vendor_id = format_args!("{:04x}", device.vendor_id),
                product_id = format_args!("{:04x}", device.product_id),
                "Unsupported USB device"
            );
        }
        dongle
    }

    /// Query every telemetry value of the family and merge them into a new
    /// snapshot. The first failing step aborts the whole refresh.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] without any transport call for
    /// an unsupported dongle, otherwise the first transport or decode failure.
    pub fn refresh_state(&self, dongle: &UsbDongle, device: &DeviceDescriptor) -> Result<UsbDongle> {
        let family = dongle.family().ok_or(Error::UnsupportedUsbDongle)?;
        let next = self.query(dongle, family, device, refresh_sequence(family))?;
        info!(model = dongle.model_name(), "Refreshed dongle state");
        Ok(next)
    }

    /// Re-read only the volume level (and mode, where the family has one).
    ///
    /// # Errors
    /// Fails like [`Self::refresh_state`].
    pub fn refresh_volume(&self, dongle: &UsbDongle, device: &DeviceDescriptor) -> Result<UsbDongle> {
        let family = dongle.family().ok_or(Error::UnsupportedUsbDongle)?;
        let next = self.query(dongle, family, device, volume_sequence(family))?;
        debug!(
            model = dongle.model_name(),
            level = next.volume_level().map(|level| level.value()),
            "Refreshed volume"
        );
        Ok(next)
    }

    fn query(
        &self,
        dongle: &UsbDongle,
        family: DongleFamily,
        device: &DeviceDescriptor,
        gets: &[GetCommand],
    ) -> Result<UsbDongle> {
        let mut session = Session::open(&self.transport, device)?;

        let mut next = dongle.clone();
        for &get in gets {
            let report = encode_get(family, get)?;
            let response = session.request(&report, self.receive_timeout)?;
            let telemetry = decode_telemetry(family, get, &response).inspect_err(|e| {
                warn!(error = %e, query = ?get, "Malformed telemetry response");
            })?;
            next = next.with_telemetry(telemetry)?;
        }
        Ok(next)
    }

    /// Send one set command.
    ///
    /// Volume levels are clamped to the snapshot's current range before they
    /// are encoded, so the device and the returned snapshot always agree.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUsbDongle`] or [`Error::UnsupportedFeature`]
    /// before any transport call, otherwise the transport failure.
    pub fn set_feature(
        &self,
        dongle: &UsbDongle,
        device: &DeviceDescriptor,
        value: FeatureValue,
    ) -> Result<UsbDongle> {
        let family = dongle.family().ok_or(Error::UnsupportedUsbDongle)?;
        let next = dongle.with_feature(value)?;
        let value = next.feature_value(value.kind()).unwrap_or(value);

        let mut session = Session::open(&self.transport, device)?;
        self.send_set(&mut session, family, &value)?;
        Ok(next)
    }

    /// One hardware volume step louder.
    ///
    /// # Errors
    /// Fails like [`Self::set_feature`].
    pub fn volume_up(&self, dongle: &UsbDongle, device: &DeviceDescriptor, step: u8) -> Result<UsbDongle> {
        self.step_volume(dongle, device, step, true)
    }

    /// One hardware volume step quieter.
    ///
    /// # Errors
    /// Fails like [`Self::set_feature`].
    pub fn volume_down(&self, dongle: &UsbDongle, device: &DeviceDescriptor, step: u8) -> Result<UsbDongle> {
        self.step_volume(dongle, device, step, false)
    }

    fn step_volume(
        &self,
        dongle: &UsbDongle,
        device: &DeviceDescriptor,
        step: u8,
        louder: bool,
    ) -> Result<UsbDongle> {
        let (Some(control), Some(range), Some(level)) =
            (dongle.volume_control(), dongle.volume_range(), dongle.volume_level())
        else {
            return Err(Error::UnsupportedUsbDongle);
        };

        let target = if louder {
            control.step_up(level, range, step)
        } else {
            control.step_down(level, range, step)
        };

        if target == level {
            debug!(level = level.value(), louder, "Volume already at limit");
            return Ok(dongle.clone());
        }

        self.set_feature(dongle, device, FeatureValue::VolumeLevel(target))
    }

    /// Encode and send one set command on an open session.
    pub(crate) fn send_set(
        &self,
        session: &mut Session<'_, T>,
        family: DongleFamily,
        value: &FeatureValue,
    ) -> Result<()> {
        let report = encode_set(family, value)?;
        debug!(feature = %value.kind(), raw = value.to_raw(), "Setting feature");
        session.send(&report)
    }

    pub(crate) fn open_session(&self, device: &DeviceDescriptor) -> Result<Session<'_, T>> {
        Session::open(&self.transport, device)
    }
}
