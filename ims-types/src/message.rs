//! The crate's top-level output type.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    msg::{MsgInfo, TargetInfo},
    product::{CommandDict, ProductDict},
};

/// A fully parsed and semantically validated message.
///
/// Produced by [`crate::Error`]-returning parse/validate entry points in
/// `ims-parser`; this crate only defines the shape.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedMessage {
    #[cfg_attr(feature = "serde", serde(rename = "MSGINFO"))]
    pub msg_info: MsgInfo,
    #[cfg_attr(feature = "serde", serde(rename = "TARGETINFO", skip_serializing_if = "Option::is_none"))]
    pub target_info: Option<TargetInfo>,
    pub ack: bool,
    #[cfg_attr(feature = "serde", serde(rename = "PRODUCTLIST", skip_serializing_if = "Vec::is_empty"))]
    pub product_list: Vec<ProductDict>,
    #[cfg_attr(feature = "serde", serde(rename = "COMMANDLIST", skip_serializing_if = "Vec::is_empty"))]
    pub command_list: Vec<CommandDict>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error_messages: Option<Vec<String>>,
}

impl ValidatedMessage {
    pub fn new(msg_info: MsgInfo) -> Self {
        Self {
            msg_info,
            target_info: None,
            ack: true,
            product_list: Vec::new(),
            command_list: Vec::new(),
            error_messages: None,
        }
    }
}
