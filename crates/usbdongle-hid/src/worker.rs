//! Async front end that keeps the last known-good snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use usbdongle_core::{Error, FeatureValue, Profile, Result, UsbDongle};

use crate::profile::ApplyError;
use crate::repository::DongleRepository;
use crate::transport::{DeviceDescriptor, Transport};

/// Runs repository operations on tokio's blocking pool.
///
/// Operations are serialized by the repository lock, so only one command
/// sequence is ever in flight per device. The snapshot is read and replaced
/// while that lock is held.
pub struct DongleWorker<T: Transport> {
    repository: Arc<Mutex<DongleRepository<T>>>,
    device: DeviceDescriptor,
    snapshot: Arc<ArcSwap<UsbDongle>>,
}

impl<T: Transport> Clone for DongleWorker<T> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            device: self.device.clone(),
            snapshot: Arc::clone(&self.snapshot),
        }
    }
}

impl<T: Transport + 'static> DongleWorker<T> {
    /// Start from the device's default-state snapshot.
    pub fn new(repository: DongleRepository<T>, device: DeviceDescriptor) -> Self {
        let dongle = repository.resolve_identity(&device);
        Self {
            repository: Arc::new(Mutex::new(repository)),
            device,
            snapshot: Arc::new(ArcSwap::from_pointee(dongle)),
        }
    }

    /// The last known-good snapshot.
    pub fn snapshot(&self) -> Arc<UsbDongle> {
        self.snapshot.load_full()
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    async fn run<F>(&self, operation: &'static str, op: F) -> Result<Arc<UsbDongle>>
    where
        F: FnOnce(&DongleRepository<T>, &UsbDongle, &DeviceDescriptor) -> Result<UsbDongle> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        let snapshot = Arc::clone(&self.snapshot);
        let device = self.device.clone();

        tokio::task::spawn_blocking(move || {
            let repository = repository.lock();
            let current = snapshot.load_full();
            match op(&repository, &current, &device) {
                Ok(next) => {
                    let next = Arc::new(next);
                    snapshot.store(Arc::clone(&next));
                    Ok(next)
                }
                Err(e) => {
                    warn!(operation, error = %e, "Dongle operation failed, keeping last snapshot");
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| Error::TransportIo(format!("I/O task failed: {e}")))?
    }

    /// # Errors
    /// See [`DongleRepository::refresh_state`].
    pub async fn refresh(&self) -> Result<Arc<UsbDongle>> {
        self.run("refresh", |repository, dongle, device| repository.refresh_state(dongle, device))
            .await
    }

    /// # Errors
    /// See [`DongleRepository::refresh_volume`].
    pub async fn refresh_volume(&self) -> Result<Arc<UsbDongle>> {
        self.run("refresh_volume", |repository, dongle, device| {
            repository.refresh_volume(dongle, device)
        })
        .await
    }

    /// # Errors
    /// See [`DongleRepository::set_feature`].
    pub async fn set_feature(&self, value: FeatureValue) -> Result<Arc<UsbDongle>> {
        self.run("set_feature", move |repository, dongle, device| {
            repository.set_feature(dongle, device, value)
        })
        .await
    }

    /// # Errors
    /// See [`DongleRepository::volume_up`].
    pub async fn volume_up(&self, step: u8) -> Result<Arc<UsbDongle>> {
        self.run("volume_up", move |repository, dongle, device| {
            repository.volume_up(dongle, device, step)
        })
        .await
    }

    /// # Errors
    /// See [`DongleRepository::volume_down`].
    pub async fn volume_down(&self, step: u8) -> Result<Arc<UsbDongle>> {
        self.run("volume_down", move |repository, dongle, device| {
            repository.volume_down(dongle, device, step)
        })
        .await
    }

    /// Apply a profile. A partially applied profile still replaces the
    /// snapshot, since those commands reached the device.
    ///
    /// # Errors
    /// See [`DongleRepository::apply_profile_cancellable`].
    pub async fn apply_profile(
        &self,
        profile: Profile,
        cancel: CancellationToken,
    ) -> std::result::Result<Arc<UsbDongle>, ApplyError> {
        let repository = Arc::clone(&self.repository);
        let snapshot = Arc::clone(&self.snapshot);
        let device = self.device.clone();
        let fallback = self.snapshot();

        let joined = tokio::task::spawn_blocking(move || {
            let repository = repository.lock();
            let current = snapshot.load_full();
            let result = repository.apply_profile_cancellable(&current, &device, &profile, &cancel);
            let reached = match &result {
                Ok(next) => next,
                Err(error) => &error.dongle,
            };
            if reached != current.as_ref() {
                snapshot.store(Arc::new(reached.clone()));
            }
            result.map(Arc::new)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => Err(ApplyError {
                dongle: fallback.as_ref().clone(),
                source: Error::TransportIo(format!("I/O task failed: {e}")),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use usbdongle_core::{DacMode, FeatureKind, Filter, Gain, SpdifOut};

    use super::*;
    use crate::codec::tests::response;
    use crate::testing::{FakeTransport, descriptor};

    #[tokio::test]
    async fn test_success_replaces_snapshot() {
        let worker = DongleWorker::new(DongleRepository::new(FakeTransport::default()), descriptor());

        let next = worker.set_feature(FeatureValue::Gain(Gain::High)).await.unwrap();

        assert_eq!(worker.snapshot(), next);
        assert_eq!(
            worker.snapshot().feature_value(FeatureKind::Gain),
            Some(FeatureValue::Gain(Gain::High))
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_snapshot() {
        let transport = FakeTransport::default().fail_send_at(1);
        let worker = DongleWorker::new(DongleRepository::new(transport), descriptor());
        worker.set_feature(FeatureValue::SpdifOut(SpdifOut::new(true))).await.unwrap();
        let before = worker.snapshot();

        let result = worker.set_feature(FeatureValue::Gain(Gain::High)).await;

        assert_matches!(result, Err(Error::TransportIo(_)));
        assert_eq!(worker.snapshot(), before);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        // version answers, sample rate never does
        let transport = FakeTransport::default()
            .respond([0xc7, 0xa5, 0xa0], response([0xc7, 0xa5, 0xa0], &[2, 10]));
        let worker = DongleWorker::new(DongleRepository::new(transport), descriptor());
        worker.set_feature(FeatureValue::Gain(Gain::High)).await.unwrap();
        let before = worker.snapshot();

        let result = worker.refresh().await;

        assert_matches!(result, Err(Error::Timeout));
        assert_eq!(worker.snapshot(), before);
    }

    #[tokio::test]
    async fn test_refresh_volume_resyncs_before_step() {
        let transport = FakeTransport::default()
            .respond([0xc7, 0xa5, 0xa2], response([0xc7, 0xa5, 0xa2], &[70, 0]));
        let worker = DongleWorker::new(DongleRepository::new(transport), descriptor());

        worker.refresh_volume().await.unwrap();
        let stepped = worker.volume_up(1).await.unwrap();

        assert_eq!(stepped.volume_level().unwrap().value(), 71);
    }

    #[tokio::test]
    async fn test_operations_chain_on_latest_snapshot() {
        let worker = DongleWorker::new(DongleRepository::new(FakeTransport::default()), descriptor());

        worker.volume_up(5).await.unwrap();
        worker.volume_up(5).await.unwrap();
        worker.volume_down(2).await.unwrap();

        assert_eq!(worker.snapshot().volume_level().unwrap().value(), 38);
    }

    #[tokio::test]
    async fn test_partial_profile_updates_snapshot() {
        let transport = FakeTransport::default().fail_send_at(2);
        let worker = DongleWorker::new(DongleRepository::new(transport), descriptor());
        let target = worker
            .snapshot()
            .with_feature(FeatureValue::Filter(Filter::NonOversampling))
            .and_then(|d| d.with_feature(FeatureValue::DacMode(DacMode::ClassH)))
            .unwrap();
        let profile = Profile::capture(&target, "Target").unwrap();

        let error = worker.apply_profile(profile, CancellationToken::new()).await.unwrap_err();

        assert_matches!(error.source, Error::TransportIo(_));
        let snapshot = worker.snapshot();
        assert_eq!(snapshot.as_ref(), &error.dongle);
        assert_eq!(
            snapshot.feature_value(FeatureKind::Filter),
            Some(FeatureValue::Filter(Filter::NonOversampling))
        );
        assert_eq!(
            snapshot.feature_value(FeatureKind::DacMode),
            Some(FeatureValue::DacMode(DacMode::ClassAB))
        );
    }
}
