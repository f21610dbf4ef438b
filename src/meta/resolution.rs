//! Two-level (series x resolution) container of [`CoreMetadata`].
//!
//! Each series holds its pyramid levels in order, level 0 being the full
//! resolution. A flat "core index" addresses every (series, resolution) pair
//! by concatenating the series in order:
//!
//! ```text
//! series 0: [r0 r1 r2]   series 1: [r0]
//! core:      0  1  2               3
//! ```
//!
//! The container keeps `resolution_count` of each series' first entry equal to
//! the number of levels in that series (and 1 on every other level), so the
//! flat form produced by [`CoreMetadataList::flatten`] can be regrouped.

use serde::{Deserialize, Serialize};

use super::CoreMetadata;
use crate::error::FormatError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreMetadataList {
    series: Vec<Vec<CoreMetadata>>,
}

impl CoreMetadataList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container with a single series holding a single entry.
    pub fn single(core: CoreMetadata) -> Self {
        let mut list = Self::new();
        list.add_series(core);
        list
    }

    // =========================================================================
    // Shape
    // =========================================================================

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Number of resolutions in `series` (0 if the series does not exist).
    pub fn size(&self, series: usize) -> usize {
        self.series.get(series).map_or(0, Vec::len)
    }

    /// Total number of entries across all series.
    pub fn flattened_size(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Resolution counts of every series, in order.
    pub fn resolution_counts(&self) -> Vec<usize> {
        self.series.iter().map(Vec::len).collect()
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn get(&self, series: usize, resolution: usize) -> Option<&CoreMetadata> {
        self.series.get(series)?.get(resolution)
    }

    pub fn get_mut(&mut self, series: usize, resolution: usize) -> Option<&mut CoreMetadata> {
        self.series.get_mut(series)?.get_mut(resolution)
    }

    /// Entry at a flat core index.
    pub fn get_flat(&self, core_index: usize) -> Result<&CoreMetadata, FormatError> {
        let (series, resolution) = self.flattened_indexes(core_index)?;
        Ok(&self.series[series][resolution])
    }

    pub fn get_flat_mut(&mut self, core_index: usize) -> Result<&mut CoreMetadata, FormatError> {
        let (series, resolution) = self.flattened_indexes(core_index)?;
        Ok(&mut self.series[series][resolution])
    }

    /// Iterate over every entry in flat order.
    pub fn iter(&self) -> impl Iterator<Item = &CoreMetadata> {
        self.series.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CoreMetadata> {
        self.series.iter_mut().flatten()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a new series whose full resolution is `core`.
    pub fn add_series(&mut self, core: CoreMetadata) -> usize {
        self.series.push(vec![core]);
        let series = self.series.len() - 1;
        self.sync_resolution_count(series);
        series
    }

    /// Append a resolution to an existing series.
    pub fn add_resolution(&mut self, series: usize, core: CoreMetadata) -> Result<usize, FormatError> {
        let limit = self.series.len();
        let levels = self
            .series
            .get_mut(series)
            .ok_or_else(|| FormatError::invalid_index("series", series, limit))?;
        levels.push(core);
        let resolution = levels.len() - 1;
        self.sync_resolution_count(series);
        Ok(resolution)
    }

    /// Insert a new series at position `series`, shifting later series.
    pub fn insert_series(&mut self, series: usize, core: CoreMetadata) -> Result<(), FormatError> {
        if series > self.series.len() {
            return Err(FormatError::invalid_index(
                "series",
                series,
                self.series.len() + 1,
            ));
        }
        self.series.insert(series, vec![core]);
        self.sync_resolution_count(series);
        Ok(())
    }

    /// Insert a resolution into an existing series at position `resolution`.
    pub fn insert_resolution(
        &mut self,
        series: usize,
        resolution: usize,
        core: CoreMetadata,
    ) -> Result<(), FormatError> {
        let limit = self.series.len();
        let levels = self
            .series
            .get_mut(series)
            .ok_or_else(|| FormatError::invalid_index("series", series, limit))?;
        if resolution > levels.len() {
            return Err(FormatError::invalid_index(
                "resolution",
                resolution,
                levels.len() + 1,
            ));
        }
        levels.insert(resolution, core);
        self.sync_resolution_count(series);
        Ok(())
    }

    /// Replace the entry at (series, resolution).
    pub fn set(
        &mut self,
        series: usize,
        resolution: usize,
        core: CoreMetadata,
    ) -> Result<(), FormatError> {
        let (series_limit, levels) = (self.series.len(), self.size(series));
        let slot = self
            .series
            .get_mut(series)
            .ok_or_else(|| FormatError::invalid_index("series", series, series_limit))?
            .get_mut(resolution)
            .ok_or_else(|| FormatError::invalid_index("resolution", resolution, levels))?;
        *slot = core;
        self.sync_resolution_count(series);
        Ok(())
    }

    /// Sort each series' resolutions by descending (sizeZ, sizeY, sizeX).
    ///
    /// Repairs pyramids whose levels were appended out of size order.
    pub fn reorder(&mut self) {
        for series in 0..self.series.len() {
            self.series[series].sort_by(|a, b| {
                (b.size_z, b.size_y, b.size_x).cmp(&(a.size_z, a.size_y, a.size_x))
            });
            self.sync_resolution_count(series);
        }
    }

    fn sync_resolution_count(&mut self, series: usize) {
        if let Some(levels) = self.series.get_mut(series) {
            let count = levels.len();
            for (i, core) in levels.iter_mut().enumerate() {
                core.resolution_count = if i == 0 { count } else { 1 };
            }
        }
    }

    // =========================================================================
    // Flat addressing
    // =========================================================================

    /// Flat core index of (series, resolution).
    pub fn flattened_index(&self, series: usize, resolution: usize) -> Result<usize, FormatError> {
        if series >= self.series.len() {
            return Err(FormatError::invalid_index(
                "series",
                series,
                self.series.len(),
            ));
        }
        let levels = self.series[series].len();
        if resolution >= levels {
            return Err(FormatError::invalid_index("resolution", resolution, levels));
        }
        let before: usize = self.series[..series].iter().map(Vec::len).sum();
        Ok(before + resolution)
    }

    /// (series, resolution) of a flat core index.
    pub fn flattened_indexes(&self, core_index: usize) -> Result<(usize, usize), FormatError> {
        let mut remaining = core_index;
        for (series, levels) in self.series.iter().enumerate() {
            if remaining < levels.len() {
                return Ok((series, remaining));
            }
            remaining -= levels.len();
        }
        Err(FormatError::invalid_index(
            "core",
            core_index,
            self.flattened_size(),
        ))
    }

    /// Concatenate every resolution of every series.
    ///
    /// The first entry of each series carries that series' resolution count.
    pub fn flatten(&self) -> Vec<CoreMetadata> {
        self.series.iter().flatten().cloned().collect()
    }

    /// Regroup a flat list produced by [`flatten`](Self::flatten).
    ///
    /// Each group starts at an entry whose `resolution_count` gives the group
    /// length; a count of zero is read as one, and a count running past the
    /// end of the list takes the remaining entries.
    pub fn unflatten(flat: Vec<CoreMetadata>) -> Self {
        let mut list = Self::new();
        let mut entries = flat.into_iter();
        while let Some(first) = entries.next() {
            let count = first.resolution_count.max(1);
            let mut levels = vec![first];
            for _ in 1..count {
                match entries.next() {
                    Some(entry) => levels.push(entry),
                    None => break,
                }
            }
            list.series.push(levels);
            let series = list.series.len() - 1;
            list.sync_resolution_count(series);
        }
        list
    }
}
