//! Token mapper: classifies token streams into observations and asset
//! commands.
//!
//! The mapper walks a tokenized frame left to right. A token opening with
//! `@` starts the asset micro-grammar; anything else is a data-item key
//! whose requirement schema decides how many of the following tokens are
//! consumed as fields. Mapping failures are scoped as tightly as possible:
//! a conversion problem drops one property, a bad entity drops that entity,
//! and only an unknown data-item key abandons the rest of the frame (there
//! is no way to tell fields from keys once the schema is unknown).

mod requirements;

pub use requirements::{Requirement, requirements_for};

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::dictionary::{AssetXmlParser, DataItemDictionary};
use crate::error::{AdapterError, Result};
use crate::types::{
    AssetCommand, DataItem, Entity, Observation, Properties, TimestampedTokens, Value,
};

const ASSET_ROOT: &str = "Asset";
const MTCONNECT_VERSION: &str = "1.7";

/// Maps tokenized frames against the data-item dictionary.
///
/// One mapper lives inside each connector session task; `log_once` keeps the
/// unknown-key noise down across the frames of a session.
pub struct TokenMapper {
    dictionary: Arc<dyn DataItemDictionary>,
    asset_parser: Arc<dyn AssetXmlParser>,
    log_once: HashSet<String>,
}

impl TokenMapper {
    pub fn new(
        dictionary: Arc<dyn DataItemDictionary>,
        asset_parser: Arc<dyn AssetXmlParser>,
    ) -> Self {
        Self { dictionary, asset_parser, log_once: HashSet::new() }
    }

    /// Map one frame into zero or more entities.
    ///
    /// Frames can carry several observations back to back; the loop keeps
    /// consuming until the tokens run out or an unknown key forces a resync
    /// at the next frame.
    pub fn map_frame(&mut self, frame: &TimestampedTokens) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut pos = 0usize;

        while pos < frame.tokens.len() {
            if frame.tokens[pos].starts_with('@') {
                match self.map_asset(frame, &mut pos) {
                    Ok(Some(entity)) => entities.push(entity),
                    Ok(None) => {}
                    Err(error) => warn!(%error, "could not map asset command"),
                }
            } else {
                match self.map_observation(frame, &mut pos) {
                    Ok(entity) => entities.push(entity),
                    Err(AdapterError::UnknownDataItem { .. }) => break,
                    Err(error) => error!(%error, "could not create observation"),
                }
            }
        }

        entities
    }

    /// Decode one `@…@` command and its arguments.
    fn map_asset(&self, frame: &TimestampedTokens, pos: &mut usize) -> Result<Option<Entity>> {
        let command = frame.tokens[*pos].clone();
        *pos += 1;

        let command = match command.as_str() {
            "@ASSET@" => {
                let asset_id = take(frame, pos)
                    .ok_or_else(|| truncated(&command))?
                    .to_string();
                let asset_type = take(frame, pos)
                    .ok_or_else(|| truncated(&command))?
                    .to_string();
                let body = take(frame, pos).ok_or_else(|| truncated(&command))?.to_string();

                let mut errors = Vec::new();
                self.asset_parser.parse(ASSET_ROOT, &body, MTCONNECT_VERSION, &mut errors);
                if !errors.is_empty() {
                    for error in &errors {
                        warn!(%error, asset_id, "error while parsing asset body");
                    }
                    return Ok(None);
                }

                AssetCommand::Definition { asset_id, asset_type, body }
            }
            "@REMOVE_ALL_ASSETS@" => {
                let asset_type = take(frame, pos).map(str::to_string);
                AssetCommand::RemoveAll { asset_type }
            }
            "@REMOVE_ASSET@" => {
                let asset_id =
                    take(frame, pos).ok_or_else(|| truncated(&command))?.to_string();
                AssetCommand::Remove { asset_id }
            }
            _ => return Err(AdapterError::UnknownAssetCommand { command }),
        };

        Ok(Some(Entity::Asset { timestamp: frame.timestamp, command }))
    }

    /// Map one data-item key and its schema-defined fields.
    fn map_observation(&mut self, frame: &TimestampedTokens, pos: &mut usize) -> Result<Entity> {
        let key_token = &frame.tokens[*pos];
        *pos += 1;

        let (device, key) = split_key(key_token);
        let Some(item) = self.dictionary.data_item(device, key) else {
            let device_name = self.dictionary.device_name(device);
            if self.log_once.contains(key) {
                trace!(device = ?device_name, key, "could not find data item");
            } else {
                warn!(device = ?device_name, key, "could not find data item");
                self.log_once.insert(key.to_string());
            }
            return Err(AdapterError::unknown_data_item(device, key));
        };

        let reqs = requirements_for(&item);
        let (properties, unavailable, consumed) =
            zip_properties(&item, reqs, &frame.tokens[*pos..]);
        *pos += consumed;

        if !unavailable {
            if let Some(missing) = reqs.iter().find(|req| req.required && !properties.contains(req.name)) {
                return Err(AdapterError::UnresolvedRequirements {
                    data_item: item.id().to_string(),
                    field: missing.name,
                });
            }
        }

        Ok(Entity::Observation(Observation {
            data_item_id: item.id().to_string(),
            timestamp: frame.timestamp,
            duration: frame.duration,
            unavailable,
            properties,
        }))
    }
}

/// Pair schema fields with tokens positionally.
///
/// Empty tokens leave the previous value untouched. `UNAVAILABLE` on the
/// value-bearing fields marks the whole observation unavailable. Conversion
/// failures drop the one property and keep going.
fn zip_properties(
    item: &DataItem,
    reqs: &'static [Requirement],
    tokens: &[String],
) -> (Properties, bool, usize) {
    let mut properties = Properties::new();
    let mut unavailable = false;
    let mut consumed = 0usize;

    for (req, token) in reqs.iter().zip(tokens) {
        consumed += 1;

        if token.is_empty() {
            continue;
        }
        if (req.name == "VALUE" || req.name == "level") && token.eq_ignore_ascii_case("UNAVAILABLE")
        {
            unavailable = true;
            continue;
        }

        let value_token = extract_reset_trigger(item, token, &mut properties);
        match Value::convert(&value_token, req.value_type, item.is_table()) {
            Ok(value) => properties.insert(req.name, value),
            Err(error) => warn!(field = req.name, %error, "cannot convert value"),
        }
    }

    (properties, unavailable, consumed)
}

/// Split a reset trigger off a value token.
///
/// Samples carry the trigger as a `value:TRIGGER` suffix. Everything else
/// uses the `:TRIGGER value` form: the trigger slice starts at byte 1 and
/// runs to the first whitespace, so a trigger written without its leading
/// colon silently loses its first character. Long-standing wire behavior,
/// kept for compatibility. Without any whitespace the full token stays the
/// value.
fn extract_reset_trigger<'t>(
    item: &DataItem,
    token: &'t str,
    properties: &mut Properties,
) -> Cow<'t, str> {
    if !(item.has_reset_trigger() || item.is_table() || item.is_data_set()) {
        return Cow::Borrowed(token);
    }
    let Some(colon) = token.find(':') else {
        return Cow::Borrowed(token);
    };

    let (trigger, value) = if item.is_sample() {
        (token[colon + 1..].to_string(), Cow::Borrowed(&token[..colon]))
    } else {
        match token[colon..].find([' ', '\t']).map(|offset| colon + offset) {
            Some(ws) => (
                token.get(1..ws).unwrap_or_default().to_string(),
                Cow::Owned(token[ws + 1..].to_string()),
            ),
            None => (token.get(1..).unwrap_or_default().to_string(), Cow::Borrowed(token)),
        }
    };

    properties.insert("resetTriggered", Value::String(trigger.to_ascii_uppercase()));
    value
}

/// Split an optional `<device>:` prefix off a data-item key.
fn split_key(token: &str) -> (Option<&str>, &str) {
    match token.find(':') {
        Some(colon) => (Some(&token[..colon]), &token[colon + 1..]),
        None => (None, token),
    }
}

fn take<'f>(frame: &'f TimestampedTokens, pos: &mut usize) -> Option<&'f str> {
    let token = frame.tokens.get(*pos)?;
    *pos += 1;
    Some(token.as_str())
}

fn truncated(command: &str) -> AdapterError {
    AdapterError::UnknownAssetCommand { command: format!("{command} (truncated)") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{RawAssetXml, StaticDictionary};
    use crate::types::{DataSetValue, Value};
    use chrono::{DateTime, Utc};

    fn timestamp() -> DateTime<Utc> {
        "2021-01-19T12:00:00Z".parse().unwrap()
    }

    fn frame(parts: &[&str]) -> TimestampedTokens {
        TimestampedTokens {
            timestamp: timestamp(),
            duration: None,
            tokens: parts.iter().map(|part| part.to_string()).collect(),
        }
    }

    fn mapper() -> TokenMapper {
        let dictionary = StaticDictionary::builder()
            .item(DataItem::sample("Xact"))
            .item(DataItem::sample("Yact"))
            .item(DataItem::sample("Xts").time_series())
            .item(DataItem::sample("Ppos").three_d())
            .item(DataItem::sample("Amp").reset_trigger())
            .item(DataItem::event("mode"))
            .item(DataItem::event("alarmX").alarm())
            .item(DataItem::event("msg").message())
            .item(DataItem::event("vars").data_set())
            .item(DataItem::event("wear").table())
            .item(DataItem::condition("temp_cond"))
            .item(DataItem::sample("Zact").on_device("VMC-3Axis"))
            .build();
        TokenMapper::new(Arc::new(dictionary), Arc::new(RawAssetXml))
    }

    #[test]
    fn maps_a_scalar_sample() {
        let entities = mapper().map_frame(&frame(&["Xact", "3.14"]));
        assert_eq!(entities.len(), 1);

        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.data_item_id, "Xact");
        assert_eq!(observation.value(), Some(&Value::Double(3.14)));
        assert!(!observation.unavailable);
    }

    #[test]
    fn maps_several_observations_per_frame() {
        let entities = mapper().map_frame(&frame(&["Xact", "1.5", "Yact", "2.5"]));
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].as_observation().unwrap().data_item_id, "Yact");
    }

    #[test]
    fn maps_an_alarm_with_positional_fields() {
        let entities = mapper().map_frame(&frame(&[
            "alarmX",
            "OVERTEMP",
            "",
            "HIGH",
            "ACTIVE",
            "coolant too hot",
        ]));
        assert_eq!(entities.len(), 1);

        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.properties.get("code"), Some(&Value::String("OVERTEMP".into())));
        assert_eq!(observation.properties.get("nativeCode"), None);
        assert_eq!(observation.properties.get("severity"), Some(&Value::String("HIGH".into())));
        assert_eq!(observation.properties.get("state"), Some(&Value::String("ACTIVE".into())));
        assert_eq!(observation.value(), Some(&Value::String("coolant too hot".into())));

        let order: Vec<&str> = observation.properties.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["code", "severity", "state", "VALUE"]);
    }

    #[test]
    fn alarm_without_required_state_is_dropped() {
        let entities = mapper().map_frame(&frame(&["alarmX", "OVERTEMP"]));
        assert!(entities.is_empty());
    }

    #[test]
    fn unknown_key_skips_the_rest_of_the_frame() {
        let mut mapper = mapper();
        let entities = mapper.map_frame(&frame(&["Zz", "1", "Xact", "3.14"]));
        assert!(entities.is_empty());

        // the key is remembered for quieter logging, not resolution
        let entities = mapper.map_frame(&frame(&["Zz", "1"]));
        assert!(entities.is_empty());
        assert!(mapper.log_once.contains("Zz"));
    }

    #[test]
    fn unavailable_marks_the_observation() {
        let entities = mapper().map_frame(&frame(&["Xact", "unavailable"]));
        let observation = entities[0].as_observation().unwrap();
        assert!(observation.unavailable);
        assert_eq!(observation.value(), None);
    }

    #[test]
    fn unavailable_condition_skips_required_level() {
        let entities = mapper().map_frame(&frame(&["temp_cond", "UNAVAILABLE"]));
        assert_eq!(entities.len(), 1);
        assert!(entities[0].as_observation().unwrap().unavailable);
    }

    #[test]
    fn condition_with_level_and_text() {
        let entities = mapper()
            .map_frame(&frame(&["temp_cond", "WARNING", "OT1", "1", "HIGH", "spindle warm"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.properties.get("level"), Some(&Value::String("WARNING".into())));
        assert_eq!(observation.properties.get("qualifier"), Some(&Value::String("HIGH".into())));
        assert_eq!(observation.value(), Some(&Value::String("spindle warm".into())));
    }

    #[test]
    fn maps_a_time_series() {
        let entities = mapper().map_frame(&frame(&["Xts", "3", "100", "1.1 2.2 3.3"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.properties.get("sampleCount"), Some(&Value::Integer(3)));
        assert_eq!(observation.properties.get("sampleRate"), Some(&Value::Double(100.0)));
        assert_eq!(observation.value(), Some(&Value::Vector(vec![1.1, 2.2, 3.3])));
    }

    #[test]
    fn conversion_failure_drops_only_that_property() {
        let entities = mapper().map_frame(&frame(&["Xts", "three", "100", "1.1 2.2"]));
        // sampleCount is required and failed to convert
        assert!(entities.is_empty());

        let entities = mapper().map_frame(&frame(&["Xact", "fast", "mode", "AUTO"]));
        assert_eq!(entities.len(), 2);
        let broken = entities[0].as_observation().unwrap();
        assert_eq!(broken.value(), None);
        assert!(!broken.unavailable);
        assert_eq!(entities[1].as_observation().unwrap().value(),
            Some(&Value::String("AUTO".into())));
    }

    #[test]
    fn sample_reset_trigger_is_a_suffix() {
        let entities = mapper().map_frame(&frame(&["Amp", "3.14:DAY"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.value(), Some(&Value::Double(3.14)));
        assert_eq!(
            observation.properties.get("resetTriggered"),
            Some(&Value::String("DAY".into()))
        );
    }

    #[test]
    fn data_set_reset_trigger_is_a_prefix() {
        let entities = mapper().map_frame(&frame(&["vars", ":MANUAL a=1 b=2"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(
            observation.properties.get("resetTriggered"),
            Some(&Value::String("MANUAL".into()))
        );
        let Some(Value::DataSet(set)) = observation.value() else { panic!("expected data set") };
        assert_eq!(set.get("a"), Some(&DataSetValue::Integer(1)));
        assert_eq!(set.get("b"), Some(&DataSetValue::Integer(2)));
    }

    // The prefix form drops the first character of the trigger even when the
    // leading colon is missing; deployed adapters depend on it.
    #[test]
    fn prefix_trigger_without_colon_keeps_wire_behavior() {
        let entities = mapper().map_frame(&frame(&["vars", "DAY:x a=1"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(
            observation.properties.get("resetTriggered"),
            Some(&Value::String("AY:X".into()))
        );
        let Some(Value::DataSet(set)) = observation.value() else { panic!("expected data set") };
        assert_eq!(set.get("a"), Some(&DataSetValue::Integer(1)));
    }

    #[test]
    fn maps_a_table_with_nested_rows() {
        let entities = mapper().map_frame(&frame(&["wear", "t1={offset=1.5 len=12} t2={offset=2}"]));
        let observation = entities[0].as_observation().unwrap();
        let Some(Value::DataSet(set)) = observation.value() else { panic!("expected table") };
        let Some(DataSetValue::Table(row)) = set.get("t1") else { panic!("expected row") };
        assert_eq!(row.get("offset"), Some(&DataSetValue::Double(1.5)));
    }

    #[test]
    fn empty_fields_preserve_previous_values() {
        let entities = mapper().map_frame(&frame(&["msg", "", "hello there"]));
        let observation = entities[0].as_observation().unwrap();
        assert_eq!(observation.properties.get("nativeCode"), None);
        assert_eq!(observation.value(), Some(&Value::String("hello there".into())));
    }

    #[test]
    fn device_prefix_scopes_the_lookup() {
        let entities = mapper().map_frame(&frame(&["VMC-3Axis:Zact", "7.5"]));
        assert_eq!(entities[0].as_observation().unwrap().data_item_id, "Zact");

        let entities = mapper().map_frame(&frame(&["Other:Zact", "7.5"]));
        assert!(entities.is_empty());
    }

    #[test]
    fn duration_is_attached_to_observations() {
        let mut with_duration = frame(&["Xact", "3.14"]);
        with_duration.duration = Some(1.5);
        let entities = mapper().map_frame(&with_duration);
        assert_eq!(entities[0].as_observation().unwrap().duration, Some(1.5));
    }

    #[test]
    fn maps_asset_definition() {
        let entities = mapper().map_frame(&frame(&[
            "@ASSET@",
            "T-1234",
            "CuttingTool",
            "<CuttingTool>...</CuttingTool>",
        ]));
        assert_eq!(entities.len(), 1);
        let Entity::Asset { command, .. } = &entities[0] else { panic!("expected asset") };
        assert_eq!(
            command,
            &AssetCommand::Definition {
                asset_id: "T-1234".into(),
                asset_type: "CuttingTool".into(),
                body: "<CuttingTool>...</CuttingTool>".into(),
            }
        );
    }

    #[test]
    fn maps_asset_removal_commands() {
        let entities = mapper().map_frame(&frame(&["@REMOVE_ASSET@", "T-1234"]));
        let Entity::Asset { command, .. } = &entities[0] else { panic!("expected asset") };
        assert_eq!(command, &AssetCommand::Remove { asset_id: "T-1234".into() });

        let entities = mapper().map_frame(&frame(&["@REMOVE_ALL_ASSETS@", "CuttingTool"]));
        let Entity::Asset { command, .. } = &entities[0] else { panic!("expected asset") };
        assert_eq!(command, &AssetCommand::RemoveAll { asset_type: Some("CuttingTool".into()) });

        let entities = mapper().map_frame(&frame(&["@REMOVE_ALL_ASSETS@"]));
        let Entity::Asset { command, .. } = &entities[0] else { panic!("expected asset") };
        assert_eq!(command, &AssetCommand::RemoveAll { asset_type: None });
    }

    #[test]
    fn unknown_asset_command_is_skipped() {
        let entities = mapper().map_frame(&frame(&["@FROB@", "Xact", "3.14"]));
        // the command is dropped; mapping resumes at the next token
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].as_observation().unwrap().data_item_id, "Xact");
    }

    #[test]
    fn rejecting_asset_parser_drops_the_definition() {
        struct Rejecting;
        impl AssetXmlParser for Rejecting {
            fn parse(
                &self,
                _root: &str,
                _body: &str,
                _version: &str,
                errors: &mut Vec<AdapterError>,
            ) -> Option<String> {
                errors.push(AdapterError::UnknownAssetCommand { command: "bad body".into() });
                None
            }
        }

        let dictionary = StaticDictionary::builder().build();
        let mut mapper = TokenMapper::new(Arc::new(dictionary), Arc::new(Rejecting));
        let entities = mapper.map_frame(&frame(&["@ASSET@", "T-1", "CuttingTool", "<bad/>"]));
        assert!(entities.is_empty());
    }
}
