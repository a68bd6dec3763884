//! Data-item metadata consumed from the device model.

use serde::{Deserialize, Serialize};

/// Category of a data item; selects the base requirement schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Sample,
    Event,
    Condition,
}

/// One sensor/signal definition from the device model.
///
/// The adapter core only reads these; they are produced by the device-model
/// loader and handed out through a [`DataItemDictionary`]
/// (crate::DataItemDictionary). The boolean predicates mirror the device
/// model's sub-type flags and pick the requirement schema together with
/// [`Category`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    id: String,
    #[serde(default)]
    device: Option<String>,
    category: Category,
    #[serde(default)]
    time_series: bool,
    #[serde(default)]
    three_d: bool,
    #[serde(default)]
    message: bool,
    #[serde(default)]
    alarm: bool,
    #[serde(default)]
    data_set: bool,
    #[serde(default)]
    table: bool,
    #[serde(default)]
    asset_changed: bool,
    #[serde(default)]
    asset_removed: bool,
    #[serde(default)]
    reset_trigger: bool,
}

impl DataItem {
    /// Create a data item with no sub-type flags set.
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            device: None,
            category,
            time_series: false,
            three_d: false,
            message: false,
            alarm: false,
            data_set: false,
            table: false,
            asset_changed: false,
            asset_removed: false,
            reset_trigger: false,
        }
    }

    /// Shorthand for a `Sample` item.
    pub fn sample(id: impl Into<String>) -> Self {
        Self::new(id, Category::Sample)
    }

    /// Shorthand for an `Event` item.
    pub fn event(id: impl Into<String>) -> Self {
        Self::new(id, Category::Event)
    }

    /// Shorthand for a `Condition` item.
    pub fn condition(id: impl Into<String>) -> Self {
        Self::new(id, Category::Condition)
    }

    /// Attach the owning device's name.
    pub fn on_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn time_series(mut self) -> Self {
        self.time_series = true;
        self
    }

    pub fn three_d(mut self) -> Self {
        self.three_d = true;
        self
    }

    pub fn message(mut self) -> Self {
        self.message = true;
        self
    }

    pub fn alarm(mut self) -> Self {
        self.alarm = true;
        self
    }

    pub fn data_set(mut self) -> Self {
        self.data_set = true;
        self
    }

    pub fn table(mut self) -> Self {
        self.table = true;
        self
    }

    pub fn asset_changed(mut self) -> Self {
        self.asset_changed = true;
        self
    }

    pub fn asset_removed(mut self) -> Self {
        self.asset_removed = true;
        self
    }

    pub fn reset_trigger(mut self) -> Self {
        self.reset_trigger = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn is_sample(&self) -> bool {
        self.category == Category::Sample
    }

    pub fn is_event(&self) -> bool {
        self.category == Category::Event
    }

    pub fn is_condition(&self) -> bool {
        self.category == Category::Condition
    }

    pub fn is_time_series(&self) -> bool {
        self.time_series
    }

    pub fn is_3d(&self) -> bool {
        self.three_d
    }

    pub fn is_message(&self) -> bool {
        self.message
    }

    pub fn is_alarm(&self) -> bool {
        self.alarm
    }

    pub fn is_data_set(&self) -> bool {
        self.data_set
    }

    pub fn is_table(&self) -> bool {
        self.table
    }

    pub fn is_asset_changed(&self) -> bool {
        self.asset_changed
    }

    pub fn is_asset_removed(&self) -> bool {
        self.asset_removed
    }

    pub fn has_reset_trigger(&self) -> bool {
        self.reset_trigger
    }
}
