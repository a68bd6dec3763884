//! Requirement schemas: the ordered field lists each data-item shape expects.

use crate::types::{Category, DataItem, ValueType};

/// One expected field of an observation: its name, conversion target, and
/// whether the observation is invalid without it.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
}

impl Requirement {
    const fn new(name: &'static str, value_type: ValueType, required: bool) -> Self {
        Self { name, value_type, required }
    }
}

const CONDITION: &[Requirement] = &[
    Requirement::new("level", ValueType::String, true),
    Requirement::new("nativeCode", ValueType::String, false),
    Requirement::new("nativeSeverity", ValueType::String, false),
    Requirement::new("qualifier", ValueType::String, false),
    Requirement::new("VALUE", ValueType::String, false),
];

const ALARM: &[Requirement] = &[
    Requirement::new("code", ValueType::String, true),
    Requirement::new("nativeCode", ValueType::String, false),
    Requirement::new("severity", ValueType::String, false),
    Requirement::new("state", ValueType::String, true),
    Requirement::new("VALUE", ValueType::String, false),
];

const MESSAGE: &[Requirement] = &[
    Requirement::new("nativeCode", ValueType::String, false),
    Requirement::new("VALUE", ValueType::String, false),
];

const DATA_SET: &[Requirement] = &[Requirement::new("VALUE", ValueType::DataSet, false)];

const ASSET_EVENT: &[Requirement] = &[
    Requirement::new("assetType", ValueType::String, false),
    Requirement::new("VALUE", ValueType::String, false),
];

const EVENT: &[Requirement] = &[Requirement::new("VALUE", ValueType::String, false)];

const TIME_SERIES: &[Requirement] = &[
    Requirement::new("sampleCount", ValueType::Integer, true),
    Requirement::new("sampleRate", ValueType::Double, true),
    Requirement::new("VALUE", ValueType::Vector, true),
];

const THREE_SPACE_SAMPLE: &[Requirement] = &[Requirement::new("VALUE", ValueType::Vector, false)];

const SAMPLE: &[Requirement] = &[Requirement::new("VALUE", ValueType::Double, false)];

/// Select the requirement schema for a data item from its category and
/// sub-type flags. Total: every category resolves to a schema.
pub fn requirements_for(item: &DataItem) -> &'static [Requirement] {
    match item.category() {
        Category::Sample => {
            if item.is_time_series() {
                TIME_SERIES
            } else if item.is_3d() {
                THREE_SPACE_SAMPLE
            } else {
                SAMPLE
            }
        }
        Category::Event => {
            if item.is_message() {
                MESSAGE
            } else if item.is_alarm() {
                ALARM
            } else if item.is_data_set() || item.is_table() {
                DATA_SET
            } else if item.is_asset_changed() || item.is_asset_removed() {
                ASSET_EVENT
            } else {
                EVENT
            }
        }
        Category::Condition => CONDITION,
    }
}
