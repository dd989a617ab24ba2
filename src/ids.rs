//! Identifier value types and the `props:globals:locals` token grammar.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref ID_TOKEN: Regex = Regex::new(r"^([A-Za-z]+)([0-9]+)$").unwrap();
}

/// A local identifier's value: either a single bound value, or an aggregate
/// of several values observed for the same key within one record (a
/// concatenation of sub-identifiers at that hop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdValue {
    Single(String),
    Aggregate(Vec<String>),
}

/// Parse a dot-separated group of `(letters)(digits)` tokens into a
/// multi-map preserving the order in which each key's values were seen.
/// Tokens that don't match the grammar are skipped silently.
fn parse_token_group(group: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    if group.is_empty() {
        return out;
    }
    for token in group.split('.') {
        if token.is_empty() {
            continue;
        }
        if let Some(caps) = ID_TOKEN.captures(token) {
            let key = caps[1].to_string();
            let val = caps[2].to_string();
            out.entry(key).or_default().push(val);
        }
    }
    out
}

/// Collapse a multi-map of key -> values into single string values, keeping
/// only the first occurrence of each key. Used for `properties` and
/// `global_ids`, which are not expected to repeat.
fn collapse_first(group: HashMap<String, Vec<String>>) -> HashMap<String, String> {
    group
        .into_iter()
        .map(|(k, mut vs)| (k, vs.remove(0)))
        .collect()
}

/// Collapse a multi-map of key -> values into `IdValue`s, preserving
/// repeated values as an `Aggregate` (this is how concatenation at a hop is
/// encoded, per the `local_ids` parsing rules).
fn collapse_local(group: HashMap<String, Vec<String>>) -> HashMap<String, IdValue> {
    group
        .into_iter()
        .map(|(k, mut vs)| {
            if vs.len() == 1 {
                (k, IdValue::Single(vs.remove(0)))
            } else {
                (k, IdValue::Aggregate(vs))
            }
        })
        .collect()
}

/// The three canonicalized groups parsed out of one `props:globals:locals` blob.
pub struct ParsedIds {
    pub properties: HashMap<String, String>,
    pub global_ids: HashMap<String, String>,
    pub local_ids: HashMap<String, IdValue>,
}

/// Parse the `IDBLOB` field of a trace line (`props:globals:locals`).
/// Any of the three groups may be empty; extra `:`-separated groups beyond
/// the third are ignored.
pub fn parse_id_blob(blob: &str) -> ParsedIds {
    let mut parts = blob.splitn(3, ':');
    let props = parts.next().unwrap_or("");
    let globals = parts.next().unwrap_or("");
    let locals = parts.next().unwrap_or("");

    ParsedIds {
        properties: collapse_first(parse_token_group(props)),
        global_ids: collapse_first(parse_token_group(globals)),
        local_ids: collapse_local(parse_token_group(locals)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_groups() {
        let ParsedIds {
            properties,
            global_ids,
            local_ids,
        } = parse_id_blob("len64:rnti1:sn5");
        assert_eq!(properties.get("len"), Some(&"64".to_string()));
        assert_eq!(global_ids.get("rnti"), Some(&"1".to_string()));
        assert_eq!(local_ids.get("sn"), Some(&IdValue::Single("5".to_string())));
    }

    #[test]
    fn repeated_local_key_becomes_aggregate() {
        let ParsedIds { local_ids, .. } = parse_id_blob(":rnti1:sn5.sn6");
        assert_eq!(
            local_ids.get("sn"),
            Some(&IdValue::Aggregate(vec!["5".to_string(), "6".to_string()]))
        );
    }

    #[test]
    fn skips_unmatched_tokens() {
        let ParsedIds { local_ids, .. } = parse_id_blob(":: .sn5.???");
        assert_eq!(local_ids.get("sn"), Some(&IdValue::Single("5".to_string())));
        assert_eq!(local_ids.len(), 1);
    }
}
