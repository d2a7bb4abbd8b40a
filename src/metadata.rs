//! Dataset-level summary metadata

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptive data about a whole dataset.
///
/// Summary metadata is published by whoever drives the acquisition and
/// replaced wholesale on every update. Its axis order is what the producer
/// *declared*; it is not derived from the coordinates actually stored and
/// may list axes no image uses (or miss axes that images do use).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryMetadata {
    /// Axis names in display order
    pub axis_order: Vec<String>,

    /// Dataset name or file prefix
    pub prefix: Option<String>,

    /// Channel names, indexed by channel axis position
    pub channel_names: Vec<String>,

    /// Z step size in micrometers
    pub z_step_um: Option<f64>,

    /// Acquisition start
    pub start_date: Option<DateTime<Utc>>,

    /// Free-form key-value pairs
    pub user_data: HashMap<String, String>,
}

impl SummaryMetadata {
    /// Create metadata with the given axis order
    pub fn new<S: Into<String>>(axis_order: impl IntoIterator<Item = S>) -> Self {
        Self {
            axis_order: axis_order.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the dataset prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set channel names
    pub fn with_channel_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.channel_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the z step
    pub fn with_z_step_um(mut self, step: f64) -> Self {
        self.z_step_um = Some(step);
        self
    }

    /// Stamp the acquisition start with the current time
    pub fn started_now(mut self) -> Self {
        self.start_date = Some(Utc::now());
        self
    }

    /// Add user data
    pub fn add_user_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.user_data.insert(key.into(), value.into());
    }

    /// Get user data
    pub fn get_user_data(&self, key: &str) -> Option<&str> {
        self.user_data.get(key).map(|s| s.as_str())
    }

    /// Ordered axis names
    pub fn ordered_axes(&self) -> &[String] {
        &self.axis_order
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
