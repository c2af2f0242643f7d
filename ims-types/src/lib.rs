//! Misuse-resistant data types for the IMS2.0 monitoring-archive
//! request/subscription language.
//!
//! This crate only defines shapes: [`error`] for the three error kinds the
//! pipeline can raise, [`time`] for the date grammar shared by every ranged
//! date field, and [`msg`]/[`product`]/[`value`]/[`message`] for the message
//! dictionary itself. Tokenizing, parsing, and validating text into these
//! types lives in `ims-parser`.
#![deny(missing_debug_implementations)]

pub mod error;
pub mod message;
pub mod msg;
pub mod product;
pub mod time;
pub mod value;

pub use error::Error;
pub use message::ValidatedMessage;
pub use msg::{MsgInfo, MsgType, ProdId, RefId, TargetInfo, TargetKind};
pub use product::{Classification, CommandDict, CommandKind, ProductDict, ProductFamily, TechnologyFamily};
pub use value::{Bound, EnvValue, FreqPolicy, Frequency, Loc, Range, Sentinel};
