//! Range, location, and frequency value types shared by product dictionaries.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A range endpoint that was elided in the source text and must be resolved
/// against a per-field minimum/maximum table (e.g. LAT's `MIN` is `-90.0`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Sentinel {
    Min,
    Max,
}

/// One endpoint of a [`Range`]: either a concrete value or a [`Sentinel`] to
/// be resolved by the rule that owns the field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Bound<T> {
    Sentinel(Sentinel),
    Value(T),
}

impl<T> Bound<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Bound::Value(v) => Some(v),
            Bound::Sentinel(_) => None,
        }
    }
}

/// `{START: v, END: v}` as produced for every ranged parameter (TIME, LAT,
/// LON, DEPTH, MAG, MBMINUSMS, DEPTHMINUSERROR, EVENTSTADIST).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Range<T> {
    pub start: Bound<T>,
    pub end: Bound<T>,
}

impl<T> Range<T> {
    pub fn new(start: Bound<T>, end: Bound<T>) -> Self {
        Self { start, end }
    }
}

/// A type-level expression of the mutual exclusion between geographic and
/// station-list constraints: a product can carry one or the other, never
/// both, and the enum makes that an invariant instead of two `Option` fields.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "TYPE", rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub enum Loc {
    Geo { lat: Range<f64>, lon: Range<f64> },
    StaList { stations: Vec<String> },
}

/// A subscription's delivery cadence.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FreqPolicy {
    Immediate,
    Daily,
    Continuous,
    Custom,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct Frequency {
    pub policy: FreqPolicy,
    /// Only set when `policy` is `Custom`.
    pub value: Option<String>,
}

/// A single environment-variable value, tagged by the shape its rule produced.
///
/// [`EnvValue::Raw`] is the escape hatch for anything the rule engine has not
/// yet claimed: fields still hold their literal text until the matching
/// [`crate::error::SemanticError`]-returning rule runs and replaces the entry
/// with a typed variant (or removes it from the product's field map outright).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Clone, Debug, PartialEq)]
pub enum EnvValue {
    Number(f64),
    NumberRange(Range<f64>),
    /// `TIME start TO end` as parsed, before `DateRule` has run the endpoints
    /// through [`crate::time::imsdate_to_datetime`]. Replaced by
    /// [`EnvValue::DateRange`] once validation succeeds.
    RawDateRange(Range<String>),
    DateRange(Range<DateTime<Utc>>),
    Id(String),
    List(Vec<String>),
    IntList(Vec<i64>),
    Bool(bool),
    Loc(Loc),
    Frequency(Frequency),
    Raw(String),
}

impl EnvValue {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            EnvValue::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            EnvValue::Id(s) => Some(s),
            EnvValue::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            EnvValue::List(items) => Some(items),
            _ => None,
        }
    }
}
