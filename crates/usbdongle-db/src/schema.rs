//! Database schema definition.

/// Version 1: saved profiles.
///
/// The schema version itself lives in `PRAGMA user_version`.
pub const SCHEMA_V1: &str = r"
-- Saved profiles, one row per (device model, name)
CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    vendor_id INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    channel_balance INTEGER NOT NULL,
    dac_mode_id INTEGER NOT NULL,
    display_brightness INTEGER NOT NULL,
    display_timeout INTEGER NOT NULL,
    filter_id INTEGER NOT NULL,
    firmware_version TEXT NOT NULL,
    gain_id INTEGER NOT NULL,
    hid_mode_id INTEGER NOT NULL,
    indicator_state_id INTEGER NOT NULL,
    is_display_invert_enabled BOOLEAN NOT NULL,
    is_hardware_mute_enabled BOOLEAN NOT NULL,
    is_spdif_out_enabled BOOLEAN NOT NULL,
    sample_rate TEXT NOT NULL,
    volume_level INTEGER NOT NULL,
    volume_mode_id INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (vendor_id, product_id, name)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_profiles_device ON profiles(vendor_id, product_id);
";
