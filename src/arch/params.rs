//! Architecture parameter types and configuration loading

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config_error;
use crate::error::{io_context, ForgeResult};

/// Environment variable naming a JSON architecture file
pub const ARCH_FILE_ENV: &str = "NPUFORGE_ARCH_FILE";

/// Hardware dimensions of the target accelerator
///
/// The serialized form also accepts the key names used by the older
/// compiler flow (`dpes`, `vrf_depth`, `mrf_depth`); keys this crate does not
/// use, such as `max_tag`, are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchParams {
    /// Number of tiles
    pub tiles: usize,
    /// Compute units (dot-product engines) per tile
    #[serde(alias = "dpes")]
    pub compute_units: usize,
    /// Lanes per compute unit
    pub lanes: usize,
    /// Depth in words of every vector bank
    #[serde(alias = "vrf_depth")]
    pub vector_depth: usize,
    /// Depth in words of the weight bank
    #[serde(alias = "mrf_depth")]
    pub weight_depth: usize,
}

/// Preset architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchPreset {
    /// The reference build: 7 tiles of 40 compute units with 40 lanes
    Reference,
    /// Small configuration used for unit-level experiments
    Tiny,
}

impl ArchPreset {
    fn params(self) -> ArchParams {
        match self {
            ArchPreset::Reference => ArchParams {
                tiles: 7,
                compute_units: 40,
                lanes: 40,
                vector_depth: 512,
                weight_depth: 1024,
            },
            ArchPreset::Tiny => ArchParams {
                tiles: 2,
                compute_units: 4,
                lanes: 4,
                vector_depth: 16,
                weight_depth: 32,
            },
        }
    }
}

impl Default for ArchParams {
    fn default() -> Self {
        ArchPreset::Reference.params()
    }
}

impl ArchParams {
    /// Create validated architecture parameters
    pub fn new(
        tiles: usize,
        compute_units: usize,
        lanes: usize,
        vector_depth: usize,
        weight_depth: usize,
    ) -> ForgeResult<Self> {
        let params = ArchParams {
            tiles,
            compute_units,
            lanes,
            vector_depth,
            weight_depth,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create parameters from a preset
    pub fn from_preset(preset: ArchPreset) -> Self {
        preset.params()
    }

    /// Set tile count
    pub fn with_tiles(mut self, tiles: usize) -> Self {
        self.tiles = tiles;
        self
    }

    /// Set compute units per tile
    pub fn with_compute_units(mut self, compute_units: usize) -> Self {
        self.compute_units = compute_units;
        self
    }

    /// Set lanes per compute unit
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    /// Set vector bank depth
    pub fn with_vector_depth(mut self, vector_depth: usize) -> Self {
        self.vector_depth = vector_depth;
        self
    }

    /// Set weight bank depth
    pub fn with_weight_depth(mut self, weight_depth: usize) -> Self {
        self.weight_depth = weight_depth;
        self
    }

    /// Check that every dimension is positive and every storage array is addressable
    pub fn validate(&self) -> ForgeResult<()> {
        let fields = [
            ("tiles", self.tiles),
            ("compute_units", self.compute_units),
            ("lanes", self.lanes),
            ("vector_depth", self.vector_depth),
            ("weight_depth", self.weight_depth),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(config_error!("{} must be positive", name));
            }
        }

        let arrays: [(&str, &[usize]); 3] = [
            (
                "weight storage",
                &[self.tiles, self.compute_units, self.weight_depth, self.lanes],
            ),
            ("primary vector storage", &[self.tiles, self.vector_depth, self.lanes]),
            ("auxiliary vector storage", &[self.vector_depth, self.lanes]),
        ];
        for (name, dims) in arrays {
            let elements = dims
                .iter()
                .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
                .filter(|&n| n <= isize::MAX as usize);
            if elements.is_none() {
                return Err(config_error!(
                    "{} of {:?} elements is too large to allocate",
                    name,
                    dims
                ));
            }
        }
        Ok(())
    }

    /// Elements held by one primary-vector word across all tiles
    pub fn vector_word_width(&self) -> usize {
        self.tiles * self.lanes
    }

    /// Elements processed by one tile per word (compute units × lanes)
    pub fn units_per_tile_word(&self) -> usize {
        self.compute_units * self.lanes
    }

    /// Parse and validate parameters from JSON text
    pub fn from_json_str(json: &str) -> ForgeResult<Self> {
        let params: ArchParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> ForgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load parameters from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> ForgeResult<Self> {
        let mut file = std::fs::File::open(path.as_ref())
            .map_err(|e| io_context(e, "opening architecture file"))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| io_context(e, "reading architecture file"))?;

        let params = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.as_ref().display(), ?params, "Loaded architecture parameters");
        Ok(params)
    }

    /// Save parameters to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ForgeResult<()> {
        let json = self.to_json()?;

        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| io_context(e, "creating architecture directory"))?;
        }

        let mut file = std::fs::File::create(path.as_ref())
            .map_err(|e| io_context(e, "creating architecture file"))?;
        file.write_all(json.as_bytes())
            .map_err(|e| io_context(e, "writing architecture file"))?;

        Ok(())
    }

    /// Load from the file named by `NPUFORGE_ARCH_FILE`, or fall back to the reference preset
    pub fn from_env() -> ForgeResult<Self> {
        match std::env::var(ARCH_FILE_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_reference() {
        let params = ArchParams::default();
        assert_eq!(params, ArchParams::from_preset(ArchPreset::Reference));
        assert_eq!(params.tiles, 7);
        assert_eq!(params.compute_units, 40);
        assert_eq!(params.lanes, 40);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_unaddressable_storage() {
        let huge = usize::MAX / 2;
        let invalid = vec![
            ArchParams::new(2, 4, 4, huge, 32),
            ArchParams::new(2, 4, 4, 16, huge),
            ArchParams::new(huge, 4, 4, 16, 32),
            ArchParams::new(2, 4, 1 << 62, 16, 32),
        ];
        for result in invalid {
            let err = result.unwrap_err();
            assert!(err.is_user_error());
            assert!(err.to_string().contains("too large"), "{}", err);
        }
        assert!(ArchParams::new(1, 1, 1, 1 << 20, 1 << 20).is_ok());
    }

    #[test]
    fn test_new_rejects_zero_fields() {
        assert!(ArchParams::new(2, 4, 4, 16, 32).is_ok());

        let invalid = vec![
            ArchParams::new(0, 4, 4, 16, 32),
            ArchParams::new(2, 0, 4, 16, 32),
            ArchParams::new(2, 4, 0, 16, 32),
            ArchParams::new(2, 4, 4, 0, 32),
            ArchParams::new(2, 4, 4, 16, 0),
        ];
        for result in invalid {
            assert!(result.unwrap_err().is_user_error());
        }
    }

    #[test]
    fn test_builder() {
        let params = ArchParams::default()
            .with_tiles(2)
            .with_compute_units(4)
            .with_lanes(4)
            .with_vector_depth(16)
            .with_weight_depth(32);
        assert_eq!(params, ArchParams::from_preset(ArchPreset::Tiny));
    }

    #[test]
    fn test_derived_widths() {
        let params = ArchParams::from_preset(ArchPreset::Tiny);
        assert_eq!(params.vector_word_width(), 8);
        assert_eq!(params.units_per_tile_word(), 16);
    }

    #[test]
    fn test_json_accepts_legacy_keys() {
        let json = r#"{
            "tiles": 2, "dpes": 4, "lanes": 4,
            "vrf_depth": 16, "mrf_depth": 32, "max_tag": 16
        }"#;
        let params = ArchParams::from_json_str(json).unwrap();
        assert_eq!(params, ArchParams::from_preset(ArchPreset::Tiny));
    }

    #[test]
    fn test_json_round_trip_validates() {
        let json = ArchParams::default().to_json().unwrap();
        assert_eq!(ArchParams::from_json_str(&json).unwrap(), ArchParams::default());

        let bad = r#"{"tiles":0,"compute_units":4,"lanes":4,"vector_depth":16,"weight_depth":32}"#;
        assert!(ArchParams::from_json_str(bad).is_err());
    }
}
