// ── Complex value codec ──
//
// Complex datapoint values travel as nested objects on the vendor side and
// as flat dot-path attributes on the platform side. `flatten` goes inbound,
// `reconstruct` goes outbound. The path is the sole identity of a leaf;
// key order never matters.

use std::collections::BTreeMap;

use crate::error::{CoreError, LookupKind};
use crate::model::{DataValue, FlatValues};

/// Path separator shared by both directions.
pub const SEPARATOR: char = '.';

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

/// Flatten a nested value into dot-path leaves under `prefix`.
///
/// Objects are recursed into; anything else is a terminal stored under the
/// accumulated path. A terminal at the top level lands under `prefix`
/// itself.
pub fn flatten(value: &DataValue, prefix: &str) -> FlatValues {
    let mut out = FlatValues::new();
    flatten_into(value, prefix, &mut out);
    out
}

fn flatten_into(value: &DataValue, path: &str, out: &mut FlatValues) {
    match value {
        DataValue::Object(map) => {
            for (key, child) in map {
                flatten_into(child, &join(path, key), out);
            }
        }
        terminal => {
            out.insert(path.to_owned(), terminal.clone());
        }
    }
}

/// Rebuild a nested object from flat values, restricted to `names`.
///
/// Names containing the separator are grouped by their first segment and
/// reconstructed recursively; plain names are assigned directly. Names
/// without a value in `flat` are skipped. When a plain name collides with
/// a group of the same first segment, the group wins.
pub fn reconstruct(flat: &FlatValues, names: &[String]) -> DataValue {
    let mut terminals: BTreeMap<String, DataValue> = BTreeMap::new();
    let mut groups: BTreeMap<String, (FlatValues, Vec<String>)> = BTreeMap::new();

    for name in names {
        let Some(value) = flat.get(name) else {
            continue;
        };
        match name.split_once(SEPARATOR) {
            Some((head, rest)) => {
                let (bucket, bucket_names) = groups.entry(head.to_owned()).or_default();
                bucket.insert(rest.to_owned(), value.clone());
                bucket_names.push(rest.to_owned());
            }
            None => {
                terminals.insert(name.clone(), value.clone());
            }
        }
    }

    let mut object = terminals;
    for (head, (bucket, bucket_names)) in groups {
        object.insert(head, reconstruct(&bucket, &bucket_names));
    }
    DataValue::Object(object)
}

/// Decode an inbound value for a datapoint into flat attribute data.
///
/// Objects are flattened under `prefix`. A non-object value is only valid
/// when the datapoint has exactly one attribute, which then receives it.
pub fn decode_value(
    value: &DataValue,
    prefix: &str,
    attributes: &[String],
) -> Result<FlatValues, CoreError> {
    if value.is_object() {
        return Ok(flatten(value, prefix));
    }
    match attributes {
        [only] => Ok(FlatValues::from([(only.clone(), value.clone())])),
        _ => Err(CoreError::inconsistent(format!(
            "received non-complex value {value} for {prefix:?}, which has {} attributes",
            attributes.len()
        ))),
    }
}

/// Encode the platform's flat data for one datapoint into the value the
/// vendor expects.
///
/// Attribute names are relative to `prefix`. A datapoint whose single
/// attribute is the prefix itself carries a plain value; anything else is
/// rebuilt into an object. Every attribute must have a value.
pub fn encode_datapoint(
    attributes: &[String],
    prefix: &str,
    flat: &FlatValues,
) -> Result<DataValue, CoreError> {
    if let [only] = attributes {
        if only == prefix {
            return flat
                .get(only)
                .cloned()
                .ok_or_else(|| CoreError::lookup(LookupKind::Attribute, only.clone()));
        }
    }

    let mut relative = FlatValues::new();
    let mut names = Vec::with_capacity(attributes.len());
    for name in attributes {
        let value = flat
            .get(name)
            .ok_or_else(|| CoreError::lookup(LookupKind::Attribute, name.clone()))?;
        let stripped = strip_prefix(name, prefix).to_owned();
        relative.insert(stripped.clone(), value.clone());
        names.push(stripped);
    }
    Ok(reconstruct(&relative, &names))
}

fn strip_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return name;
    }
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(name)
}
