//! Header-level message metadata (`MSGINFO` and its neighbors).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `MSG_TYPE`, lowercased on read, dispatches the whole remaining grammar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MsgType {
    Request,
    Subscription,
    Data,
}

/// `REF_ID <refstr> [<refsrc>] [PART <seqnum> [OF <totnum>]]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefId {
    pub ref_str: String,
    pub ref_src: Option<String>,
    pub seq_num: Option<String>,
    pub tot_num: Option<String>,
}

/// `PROD_ID <number> <number>`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProdId {
    pub prod_id: String,
    pub delivery_id: String,
}

/// Delivery target set by `E-MAIL <addr>` or `FTP <addr>`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TargetKind {
    Email,
    Ftp,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetInfo {
    pub kind: TargetKind,
    pub address: String,
}

/// The fixed header block every message carries.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Clone, Debug, PartialEq)]
pub struct MsgInfo {
    /// Always the language tag of this grammar.
    pub language: String,
    /// Lower-cased message format id, e.g. `ims2.0`.
    pub format: String,
    #[cfg_attr(feature = "serde", serde(rename = "TYPE"))]
    pub msg_type: MsgType,
    pub id: String,
    pub source: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "REFID"))]
    pub ref_id: Option<RefId>,
    #[cfg_attr(feature = "serde", serde(rename = "PRODID"))]
    pub prod_id: Option<ProdId>,
    pub application: Option<String>,
}

impl MsgInfo {
    pub const LANGUAGE: &'static str = "IMSLANGUAGE";
}
