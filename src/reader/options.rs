use serde::{Deserialize, Serialize};

/// How much format-specific metadata a reader records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataLevel {
    /// Only what is needed to read pixels; metadata tables stay empty
    Minimum,
    /// Everything except overlays and regions of interest
    NoOverlays,
    #[default]
    All,
}

/// Reader configuration. Settable only while no file is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Normalize floating-point pixel data to [0, 1]
    pub normalized: bool,
    /// Drop complex values and strip markup from metadata tables
    pub metadata_filtered: bool,
    /// Merge global and per-series tables into the metadata store
    pub original_metadata_populated: bool,
    /// Treat every pyramid level as its own series
    pub flattened_resolutions: bool,
    /// Let a reader pull in companion files of a multi-file dataset
    pub group_files: bool,
    pub metadata_level: MetadataLevel,
    /// Validate the metadata store after parsing (failures are logged)
    pub validate: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            normalized: false,
            metadata_filtered: false,
            original_metadata_populated: false,
            flattened_resolutions: true,
            group_files: true,
            metadata_level: MetadataLevel::All,
            validate: false,
        }
    }
}

impl ReaderOptions {
    pub fn with_flattened_resolutions(mut self, flattened: bool) -> Self {
        self.flattened_resolutions = flattened;
        self
    }

    pub fn with_metadata_filtered(mut self, filtered: bool) -> Self {
        self.metadata_filtered = filtered;
        self
    }

    pub fn with_original_metadata(mut self, populated: bool) -> Self {
        self.original_metadata_populated = populated;
        self
    }

    pub fn with_metadata_level(mut self, level: MetadataLevel) -> Self {
        self.metadata_level = level;
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Whether table entries go through the filtering rules.
    pub fn filters_entries(&self) -> bool {
        self.metadata_filtered || self.original_metadata_populated
    }
}
