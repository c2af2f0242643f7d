//! The product / command sub-mappings that make up `PRODUCTLIST` and
//! `COMMANDLIST`.

use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::EnvValue;

/// The three technology families a product can belong to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TechnologyFamily {
    Shi,
    Rad,
    Test,
}

/// The canonical product family a `TYPE` resolves to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProductFamily {
    Data,
    Bulletin,
    Alert,
    Test,
    Unknown,
}

/// The classification a product carries once a product rule has promoted it;
/// replaces `TYPE` after validation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub technology_family: TechnologyFamily,
    pub technology_type: String,
    pub product_family: ProductFamily,
    pub product_type: String,
    /// Only present for filtered-waveform products (ARRIVAL, SLSD, ORIGIN, EVENT).
    pub filter: Option<String>,
}

/// One product statement's worth of data, before or after validation.
///
/// Before validation, `type_` carries the raw `TYPE` keyword (e.g.
/// `WAVEFORM`) and `classification` is `None`; a product rule consumes
/// `type_`/`subtype`/`format`/`subformat` and fills `classification` in their
/// place. `fields` is the ordered, still-generic map of every other
/// environment variable seen on the statement — the worklist the semantic
/// validator drains one rule at a time, with [`EnvValue::Raw`] standing in
/// for anything not yet claimed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct ProductDict {
    #[cfg_attr(feature = "serde", serde(rename = "TYPE", skip_serializing_if = "Option::is_none"))]
    pub type_: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub subtype: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub format: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub subformat: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub classification: Option<Classification>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub fields: IndexMap<String, EnvValue>,
}

impl ProductDict {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: Some(type_.into()),
            subtype: None,
            format: None,
            subformat: None,
            classification: None,
            fields: IndexMap::new(),
        }
    }

    /// The keys still awaiting a rule: every field name currently on the map.
    pub fn worklist(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worklist_reflects_insertion_order() {
        let mut p = ProductDict::new("WAVEFORM");
        p.fields.insert("TIME".into(), EnvValue::Raw("2020".into()));
        p.fields.insert("STA_LIST".into(), EnvValue::Raw("ABC".into()));
        assert_eq!(p.worklist(), vec!["TIME".to_string(), "STA_LIST".to_string()]);
    }
}

/// `SUBSCR_PROD` or `UNSUBSCRIBE`, the only two subscription commands.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CommandKind {
    SubscrProd,
    Unsubscribe,
}

/// One entry of `COMMANDLIST`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct CommandDict {
    pub command: CommandKind,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub fields: IndexMap<String, EnvValue>,
}

impl CommandDict {
    pub fn new(command: CommandKind) -> Self {
        Self {
            command,
            fields: IndexMap::new(),
        }
    }

    pub fn worklist(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }
}
