//! Coordinates addressing images along named axes

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Time point axis
pub const T: &str = "time";
/// Z-slice axis
pub const Z: &str = "z";
/// Channel axis
pub const CHANNEL: &str = "channel";
/// Stage position axis
pub const STAGE_POSITION: &str = "position";

/// Immutable position of an image along zero or more named axes.
///
/// Axes are kept sorted by name, so two coordinates built with the same
/// axis/index pairs in a different order are equal and hash identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coords {
    indices: BTreeMap<String, usize>,
}

impl Coords {
    /// Start building a new coordinate
    pub fn builder() -> CoordsBuilder {
        CoordsBuilder::default()
    }

    /// Builder pre-populated with this coordinate's axes
    pub fn copy_builder(&self) -> CoordsBuilder {
        CoordsBuilder {
            indices: self.indices.clone(),
        }
    }

    /// Copy with a single axis set to `index`
    pub fn copy_with_index(&self, axis: impl Into<String>, index: usize) -> Self {
        self.copy_builder().index(axis, index).build()
    }

    /// Copy with the named axes dropped. Axes not present are ignored.
    pub fn copy_removing_axes<S: AsRef<str>>(&self, axes: &[S]) -> Self {
        let mut indices = self.indices.clone();
        for axis in axes {
            indices.remove(axis.as_ref());
        }
        Self { indices }
    }

    /// True if this coordinate, with `ignore_axes` dropped, equals `other`.
    ///
    /// Same answer as `self.copy_removing_axes(ignore_axes) == *other`
    /// without building the reduced coordinate.
    pub fn matches_ignoring_axes<S: AsRef<str>>(&self, other: &Coords, ignore_axes: &[S]) -> bool {
        self.iter()
            .filter(|(axis, _)| !ignore_axes.iter().any(|ignored| ignored.as_ref() == *axis))
            .eq(other.iter())
    }

    /// Index along `axis`, if the axis is present
    pub fn index(&self, axis: &str) -> Option<usize> {
        self.indices.get(axis).copied()
    }

    pub fn has_axis(&self, axis: &str) -> bool {
        self.indices.contains_key(axis)
    }

    /// Axis names in sorted order
    pub fn axes(&self) -> impl Iterator<Item = &str> + '_ {
        self.indices.keys().map(String::as_str)
    }

    /// Axis/index pairs in axis-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.indices.iter().map(|(axis, &index)| (axis.as_str(), index))
    }

    /// Number of axes
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Reject coordinates carrying an empty axis name
    pub fn validate(&self) -> Result<()> {
        if self.indices.keys().any(|axis| axis.trim().is_empty()) {
            return Err(StoreError::InvalidCoordinate(format!(
                "empty axis name in {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indices.is_empty() {
            return write!(f, "<empty>");
        }
        let mut first = true;
        for (axis, index) in &self.indices {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}={}", axis, index)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for Coords {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self {
            indices: iter
                .into_iter()
                .map(|(axis, index)| (axis.into(), index))
                .collect(),
        }
    }
}

/// Builder for [`Coords`]
#[derive(Debug, Clone, Default)]
pub struct CoordsBuilder {
    indices: BTreeMap<String, usize>,
}

impl CoordsBuilder {
    /// Set the index for an axis, replacing any previous value
    pub fn index(mut self, axis: impl Into<String>, index: usize) -> Self {
        self.indices.insert(axis.into(), index);
        self
    }

    /// Drop an axis from the coordinate under construction
    pub fn remove_axis(mut self, axis: &str) -> Self {
        self.indices.remove(axis);
        self
    }

    pub fn t(self, index: usize) -> Self {
        self.index(T, index)
    }

    pub fn z(self, index: usize) -> Self {
        self.index(Z, index)
    }

    pub fn channel(self, index: usize) -> Self {
        self.index(CHANNEL, index)
    }

    pub fn stage_position(self, index: usize) -> Self {
        self.index(STAGE_POSITION, index)
    }

    pub fn build(self) -> Coords {
        Coords {
            indices: self.indices,
        }
    }
}
