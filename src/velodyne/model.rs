//! Supported Velodyne sensor models and their product-id mapping.

use crate::error::{Error, Result};

/// A supported Velodyne sensor model, identified by the product id byte
/// that trails every packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Vlp16,
    Vlp32c,
    Vls128,
    Hdl64,
    Hdl32e,
}

impl Model {
    /// Resolves a packet's trailing product id byte to a supported model.
    ///
    /// Product ids 216 and 232 are Velodyne-reserved values for the VLP-16
    /// and VLP-32c respectively that this crate does not decode; they fail
    /// the same as any other unrecognized id.
    pub fn from_product_id(id: u8) -> Result<Self> {
        match id {
            34 => Ok(Model::Vlp16),
            40 => Ok(Model::Vlp32c),
            161 | 128 => Ok(Model::Vls128),
            64 => Ok(Model::Hdl64),
            32 => Ok(Model::Hdl32e),
            other => Err(Error::UnsupportedModel(other)),
        }
    }

    /// Human-readable model name, matching the vendor's own naming.
    pub fn name(self) -> &'static str {
        match self {
            Model::Vlp16 => "VLP-16",
            Model::Vlp32c => "VLP-32c",
            Model::Vls128 => "VLS-128",
            Model::Hdl64 => "HDL-64",
            Model::Hdl32e => "HDL-32E",
        }
    }

    /// Length of this model's per-channel calibration arrays, before
    /// tiling. The VLP-16 fires its 16 physical lasers twice per firing
    /// block, so its calibration arrays are supplied already doubled to 32
    /// entries.
    pub fn channel_count(self) -> usize {
        match self {
            Model::Vlp16 => crate::velodyne::consts::vlp_16::CHANNEL_COUNT,
            Model::Vlp32c => crate::velodyne::consts::vlp_32c::CHANNEL_COUNT,
            Model::Vls128 => crate::velodyne::consts::vls_128::CHANNEL_COUNT,
            Model::Hdl64 => crate::velodyne::consts::hdl_64::CHANNEL_COUNT,
            Model::Hdl32e => crate::velodyne::consts::hdl_32e::CHANNEL_COUNT,
        }
    }

    /// Bytes consumed per firing row when reshaping the 1200-byte firing
    /// region.
    pub fn parse_row_len(self) -> usize {
        match self {
            Model::Vlp16 => crate::velodyne::consts::vlp_16::PARSE_ROW_LEN,
            Model::Vlp32c => crate::velodyne::consts::vlp_32c::PARSE_ROW_LEN,
            Model::Vls128 => crate::velodyne::consts::vls_128::PARSE_ROW_LEN,
            Model::Hdl64 => crate::velodyne::consts::hdl_64::PARSE_ROW_LEN,
            Model::Hdl32e => crate::velodyne::consts::hdl_32e::PARSE_ROW_LEN,
        }
    }

    /// Number of whole-array repeats applied to each calibration table to
    /// cover every point produced by a packet's firing rows.
    ///
    /// This is `np.tile`-style whole-array tiling, not per-element repeat:
    /// the channel-ordered table is concatenated with itself this many
    /// times.
    pub fn tile_multiplier(self) -> usize {
        match self {
            Model::Vlp16 => crate::velodyne::consts::vlp_16::TILE_MULTIPLIER,
            Model::Vlp32c => crate::velodyne::consts::vlp_32c::TILE_MULTIPLIER,
            Model::Vls128 => crate::velodyne::consts::vls_128::TILE_MULTIPLIER,
            Model::Hdl64 => crate::velodyne::consts::hdl_64::TILE_MULTIPLIER,
            Model::Hdl32e => crate::velodyne::consts::hdl_32e::TILE_MULTIPLIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_supported_product_id() {
        assert_eq!(Model::from_product_id(34).unwrap(), Model::Vlp16);
        assert_eq!(Model::from_product_id(40).unwrap(), Model::Vlp32c);
        assert_eq!(Model::from_product_id(161).unwrap(), Model::Vls128);
        assert_eq!(Model::from_product_id(128).unwrap(), Model::Vls128);
        assert_eq!(Model::from_product_id(64).unwrap(), Model::Hdl64);
        assert_eq!(Model::from_product_id(32).unwrap(), Model::Hdl32e);
    }

    #[test]
    fn rejects_reserved_and_unknown_ids() {
        for id in [216u8, 232, 99, 0] {
            assert!(matches!(
                Model::from_product_id(id),
                Err(Error::UnsupportedModel(found)) if found == id
            ));
        }
    }
}
