//! Core types for SHDR data representation.
//!
//! The type system mirrors the protocol's layers:
//! - [`TimestampedTokens`] is a tokenized frame with its resolved timestamp,
//!   the unit that flows from the connector into the mapper.
//! - [`DataItem`] describes one sensor/signal from the device model: an id,
//!   a [`Category`], and the sub-type predicates that select a requirement
//!   schema.
//! - [`Value`] is the tagged union a property converts into; [`DataSet`]
//!   models the `key=value` set/table representation.
//! - [`Observation`], [`AssetCommand`] and [`Entity`] are what the mapper
//!   emits downstream.

mod data_item;
mod frame;
mod observation;
mod value;

pub use data_item::{Category, DataItem};
pub use frame::TimestampedTokens;
pub use observation::{AssetCommand, Entity, Observation, Properties};
pub use value::{DataSet, DataSetValue, Value, ValueType};
