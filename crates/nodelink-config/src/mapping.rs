//! Per-slave pixel layout mappings, with a default row-major generator.
//!
//! Ported from the light-control backend's `get_or_create_mapping`: when no
//! mapping document exists yet for a slave, a row-major grid is synthesized
//! from its pixel count alone, capped at 20 columns wide.

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, store::ConfigStore};

/// Maximum row width used when synthesizing a default layout.
const DEFAULT_MAX_WIDTH: u32 = 20;

/// One pixel's position within a slave's layout grid, and its mapping to
/// the archive's per-slave pixel index and the slave's own MCU channel
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Column within the slave's layout grid.
    pub x: u32,
    /// Row within the slave's layout grid.
    pub y: u32,
    /// Index into the archive's per-slave pixel data.
    pub pxld_id: u32,
    /// Index into the slave's own MCU channel numbering.
    pub mcu_id: u32,
}

/// A slave's pixel layout document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveMapping {
    /// Document schema version (2 includes `ox`/`oy`).
    pub version: u32,
    /// Slave this mapping belongs to.
    pub slave_id: u32,
    /// Grid width.
    pub w: u32,
    /// Grid height.
    pub h: u32,
    /// Grid origin X, in the combined layout's coordinate space.
    pub ox: i32,
    /// Grid origin Y, in the combined layout's coordinate space.
    pub oy: i32,
    /// Ordered pixel-position entries.
    pub map: Vec<MapEntry>,
}

/// Build the default row-major layout for a slave with `pixel_count`
/// pixels: width is `min(20, max(1, pixel_count))`, height is the number of
/// rows needed to place every pixel, and origin is `(0, 0)`.
#[must_use]
pub fn default_mapping(slave_id: u32, pixel_count: u32) -> SlaveMapping {
    let w = DEFAULT_MAX_WIDTH.min(pixel_count.max(1));
    let h = pixel_count.div_ceil(w).max(1);

    let mut map = Vec::with_capacity(pixel_count as usize);
    'rows: for y in 0..h {
        for x in 0..w {
            let pxld_id = y * w + x;
            if pxld_id >= pixel_count {
                break 'rows;
            }
            map.push(MapEntry { x, y, pxld_id, mcu_id: pxld_id });
        }
    }

    SlaveMapping { version: 2, slave_id, w, h, ox: 0, oy: 0, map }
}

/// Filename a slave's mapping document is stored under.
#[must_use]
pub fn mapping_filename(slave_id: u32) -> String {
    format!("mapping_slave_{slave_id}.json")
}

/// Load a slave's mapping document, synthesizing (and persisting) the
/// default row-major layout on first access.
///
/// # Errors
///
/// Returns [`ConfigError`] if the document exists but is unreadable or
/// malformed, or if a freshly synthesized default cannot be saved.
pub fn get_or_create_mapping(store: &ConfigStore, slave_id: u32, pixel_count: u32) -> Result<SlaveMapping, ConfigError> {
    let name = mapping_filename(slave_id);
    if store.exists(&name) {
        return store.load(&name, default_mapping(slave_id, pixel_count));
    }
    let mapping = default_mapping(slave_id, pixel_count);
    store.save(&name, &mapping)?;
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_width_caps_at_twenty() {
        let mapping = default_mapping(3, 100);
        assert_eq!(mapping.w, 20);
        assert_eq!(mapping.h, 5);
        assert_eq!(mapping.map.len(), 100);
    }

    #[test]
    fn default_width_is_at_least_one_for_zero_pixels() {
        let mapping = default_mapping(0, 0);
        assert_eq!(mapping.w, 1);
        assert!(mapping.map.is_empty());
    }

    #[test]
    fn small_pixel_count_is_single_row() {
        let mapping = default_mapping(1, 7);
        assert_eq!(mapping.w, 7);
        assert_eq!(mapping.h, 1);
        assert_eq!(mapping.map.len(), 7);
        assert_eq!(mapping.map[3], MapEntry { x: 3, y: 0, pxld_id: 3, mcu_id: 3 });
    }

    #[test]
    fn get_or_create_persists_default_on_first_access() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path()).expect("open");
        let mapping = get_or_create_mapping(&store, 1, 10).expect("creates");
        assert_eq!(mapping.slave_id, 1);
        assert!(store.exists(&mapping_filename(1)));

        let reloaded = get_or_create_mapping(&store, 1, 999).expect("loads existing");
        assert_eq!(reloaded, mapping, "existing document must win over a new pixel_count");
    }
}
