//! Collaborator seams: the data-item dictionary and the asset XML parser.
//!
//! The device model that defines data items lives outside this crate; the
//! mapper only performs lookups through [`DataItemDictionary`]. Lookups are
//! re-resolved on every frame, never cached, so a device-model reload takes
//! effect on the next line. [`StaticDictionary`] is a plain in-memory
//! implementation for tests and for callers without a model loader.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AdapterError;
use crate::types::DataItem;

/// Read-only lookup of data items by key, optionally scoped to a device.
pub trait DataItemDictionary: Send + Sync {
    /// Resolve a data item by key. `device` is the `<device>:` prefix from
    /// the wire, if the line carried one.
    fn data_item(&self, device: Option<&str>, key: &str) -> Option<Arc<DataItem>>;

    /// Resolve a device name for logging context.
    fn device_name(&self, prefix: Option<&str>) -> Option<String> {
        prefix.map(str::to_string)
    }
}

/// Parser for asset XML bodies arriving on `@ASSET@` commands.
///
/// The adapter never interprets asset XML itself; it hands the body to this
/// collaborator for validation and forwards the raw body downstream. `parse`
/// may return the asset id it found in the body and pushes any problems into
/// `errors` — a non-empty error list drops the command.
pub trait AssetXmlParser: Send + Sync {
    fn parse(
        &self,
        root: &str,
        body: &str,
        version: &str,
        errors: &mut Vec<AdapterError>,
    ) -> Option<String>;
}

/// Asset parser that accepts any body unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawAssetXml;

impl AssetXmlParser for RawAssetXml {
    fn parse(
        &self,
        _root: &str,
        _body: &str,
        _version: &str,
        _errors: &mut Vec<AdapterError>,
    ) -> Option<String> {
        None
    }
}

/// In-memory dictionary backed by a `HashMap`, keyed by data-item id.
///
/// An item registered with a device name only resolves for that device (or
/// for unprefixed keys); items without one resolve for any prefix.
#[derive(Debug, Clone, Default)]
pub struct StaticDictionary {
    items: HashMap<String, Arc<DataItem>>,
}

impl StaticDictionary {
    pub fn builder() -> StaticDictionaryBuilder {
        StaticDictionaryBuilder { items: HashMap::new() }
    }
}

impl DataItemDictionary for StaticDictionary {
    fn data_item(&self, device: Option<&str>, key: &str) -> Option<Arc<DataItem>> {
        let item = self.items.get(key)?;
        match (device, item.device()) {
            (Some(prefix), Some(owner)) if prefix != owner => None,
            _ => Some(Arc::clone(item)),
        }
    }
}

/// Builder for [`StaticDictionary`].
#[derive(Debug, Default)]
pub struct StaticDictionaryBuilder {
    items: HashMap<String, Arc<DataItem>>,
}

impl StaticDictionaryBuilder {
    /// Register a data item under its id.
    pub fn item(mut self, item: DataItem) -> Self {
        self.items.insert(item.id().to_string(), Arc::new(item));
        self
    }

    pub fn build(self) -> StaticDictionary {
        StaticDictionary { items: self.items }
    }
}
