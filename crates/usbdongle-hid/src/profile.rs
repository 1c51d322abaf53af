//! Replaying saved profiles onto a device.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use usbdongle_core::{Error, Profile, UsbDongle};

use crate::repository::DongleRepository;
use crate::transport::{DeviceDescriptor, Transport};

/// A profile apply that stopped early.
///
/// `dongle` reflects every command that was sent before the failure and
/// nothing after it. Commands already sent stay applied on the device.
#[derive(Debug, Error)]
#[error("Profile apply stopped: {source}")]
pub struct ApplyError {
    pub dongle: UsbDongle,
    pub source: Error,
}

impl From<ApplyError> for Error {
    fn from(error: ApplyError) -> Self {
        error.source
    }
}

impl<T: Transport> DongleRepository<T> {
    /// Replay `profile` onto the device, one set command at a time.
    ///
    /// # Errors
    /// Returns an [`ApplyError`] carrying the partially applied snapshot. A
    /// profile for another device fails with
    /// [`Error::UnsupportedUsbDongle`] before any transport call.
    pub fn apply_profile(
        &self,
        dongle: &UsbDongle,
        device: &DeviceDescriptor,
        profile: &Profile,
    ) -> Result<UsbDongle, ApplyError> {
        self.apply_profile_cancellable(dongle, device, profile, &CancellationToken::new())
    }

    /// Like [`Self::apply_profile`], but checks `cancel` before each command.
    ///
    /// # Errors
    /// As [`Self::apply_profile`]; cancellation yields [`Error::Cancelled`].
    pub fn apply_profile_cancellable(
        &self,
        dongle: &UsbDongle,
        device: &DeviceDescriptor,
        profile: &Profile,
        cancel: &CancellationToken,
    ) -> Result<UsbDongle, ApplyError> {
        let unchanged = |source| ApplyError { dongle: dongle.clone(), source };

        let family = match dongle.family() {
            Some(family) if profile.matches(dongle) => family,
            _ => {
                warn!(
                    profile = %profile.name,
                    model = dongle.model_name(),
                    "Profile does not belong to this dongle"
                );
                return Err(unchanged(Error::UnsupportedUsbDongle));
            }
        };

        let sequence = profile.apply_sequence().map_err(unchanged)?;
        let mut session = self.open_session(device).map_err(unchanged)?;

        let mut current = dongle.clone();
        for (index, value) in sequence.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(profile = %profile.name, applied = index, "Profile apply cancelled");
                return Err(ApplyError { dongle: current, source: Error::Cancelled });
            }

            let step = current
                .with_feature(*value)
                .and_then(|next| self.send_set(&mut session, family, value).map(|()| next));

            match step {
                Ok(next) => current = next,
                Err(source) => {
                    warn!(
                        profile = %profile.name,
                        feature = %value.kind(),
                        applied = index,
                        error = %source,
                        "Profile apply failed"
                    );
                    return Err(ApplyError { dongle: current, source });
                }
            }
        }

        info!(profile = %profile.name, commands = sequence.len(), "Profile applied");
        Ok(current)
    }
}
