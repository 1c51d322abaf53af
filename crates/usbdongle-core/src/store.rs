//! Persistence contract for saved profiles.

use crate::profile::Profile;

/// Read/write access to saved profiles.
///
/// Profiles are keyed by `(vendor_id, product_id, name)`. Implementations
/// bring their own error type so storage failures stay distinguishable from
/// device failures.
pub trait ProfileStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All profiles for one device model, sorted by name ascending.
    ///
    /// # Errors
    /// Returns the store's error if the profiles cannot be read.
    fn list_profiles(&self, vendor_id: u16, product_id: u16) -> Result<Vec<Profile>, Self::Error>;

    /// # Errors
    /// Returns the store's error if the profile cannot be read.
    fn find_profile(
        &self,
        vendor_id: u16,
        product_id: u16,
        name: &str,
    ) -> Result<Option<Profile>, Self::Error>;

    /// Insert a profile, or replace the one with the same key.
    ///
    /// # Errors
    /// Returns the store's error if the profile cannot be written.
    fn upsert(&self, profile: &Profile) -> Result<(), Self::Error>;

    /// Delete a profile by key. Deleting a missing profile is not an error.
    ///
    /// # Errors
    /// Returns the store's error if the profile cannot be deleted.
    fn delete(&self, profile: &Profile) -> Result<(), Self::Error>;
}
