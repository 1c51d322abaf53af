//! Profile queries.

use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;
use usbdongle_core::{Profile, ProfileStore};

use crate::{Database, DbError, DbResult};

const PROFILE_COLUMNS: &str = "name, vendor_id, product_id, channel_balance, dac_mode_id,
    display_brightness, display_timeout, filter_id, firmware_version, gain_id, hid_mode_id,
    indicator_state_id, is_display_invert_enabled, is_hardware_mute_enabled,
    is_spdif_out_enabled, sample_rate, volume_level, volume_mode_id";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        name: row.get(0)?,
        vendor_id: row.get(1)?,
        product_id: row.get(2)?,
        channel_balance: row.get(3)?,
        dac_mode_id: row.get(4)?,
        display_brightness: row.get(5)?,
        display_timeout: row.get(6)?,
        filter_id: row.get(7)?,
        firmware_version: row.get(8)?,
        gain_id: row.get(9)?,
        hid_mode_id: row.get(10)?,
        indicator_state_id: row.get(11)?,
        is_display_invert_enabled: row.get(12)?,
        is_hardware_mute_enabled: row.get(13)?,
        is_spdif_out_enabled: row.get(14)?,
        sample_rate: row.get(15)?,
        volume_level: row.get(16)?,
        volume_mode_id: row.get(17)?,
    })
}

impl ProfileStore for Database {
    type Error = DbError;

    fn list_profiles(&self, vendor_id: u16, product_id: u16) -> DbResult<Vec<Profile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles
             WHERE vendor_id = ? AND product_id = ?
             ORDER BY name ASC"
        ))?;

        let profiles = stmt
            .query_map(params![vendor_id, product_id], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(profiles)
    }

    fn find_profile(&self, vendor_id: u16, product_id: u16, name: &str) -> DbResult<Option<Profile>> {
        let profile = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles
                     WHERE vendor_id = ? AND product_id = ? AND name = ?"
                ),
                params![vendor_id, product_id, name],
                profile_from_row,
            )
            .optional()?;

        Ok(profile)
    }

    fn upsert(&self, profile: &Profile) -> DbResult<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO profiles ({PROFILE_COLUMNS}, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
                 ON CONFLICT(vendor_id, product_id, name) DO UPDATE SET
                    channel_balance = excluded.channel_balance,
                    dac_mode_id = excluded.dac_mode_id,
                    display_brightness = excluded.display_brightness,
                    display_timeout = excluded.display_timeout,
                    filter_id = excluded.filter_id,
                    firmware_version = excluded.firmware_version,
                    gain_id = excluded.gain_id,
                    hid_mode_id = excluded.hid_mode_id,
                    indicator_state_id = excluded.indicator_state_id,
                    is_display_invert_enabled = excluded.is_display_invert_enabled,
                    is_hardware_mute_enabled = excluded.is_hardware_mute_enabled,
                    is_spdif_out_enabled = excluded.is_spdif_out_enabled,
                    sample_rate = excluded.sample_rate,
                    volume_level = excluded.volume_level,
                    volume_mode_id = excluded.volume_mode_id,
                    updated_at = datetime('now')"
            ),
            params![
                profile.name,
                profile.vendor_id,
                profile.product_id,
                profile.channel_balance,
                profile.dac_mode_id,
                profile.display_brightness,
                profile.display_timeout,
                profile.filter_id,
                profile.firmware_version,
                profile.gain_id,
                profile.hid_mode_id,
                profile.indicator_state_id,
                profile.is_display_invert_enabled,
                profile.is_hardware_mute_enabled,
                profile.is_spdif_out_enabled,
                profile.sample_rate,
                profile.volume_level,
                profile.volume_mode_id,
            ],
        )?;

        debug!(name = %profile.name, "Saved profile");
        Ok(())
    }

    fn delete(&self, profile: &Profile) -> DbResult<()> {
        let deleted = self.conn().execute(
            "DELETE FROM profiles WHERE vendor_id = ? AND product_id = ? AND name = ?",
            params![profile.vendor_id, profile.product_id, profile.name],
        )?;

        debug!(name = %profile.name, deleted, "Deleted profile");
        Ok(())
    }
}
