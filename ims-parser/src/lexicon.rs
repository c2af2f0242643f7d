//! The fixed lexical catalog: every token kind the language defines, grouped
//! into the families the tokenizer uses to decide when a match must be
//! vetoed in favor of a later, more specific family.
//!
//! Families are tried in the order declared here. Within a family, literals
//! are tried before patterns are anywhere ambiguous, but in practice every
//! literal is a distinct fixed string so order inside a family does not
//! matter.

use once_cell::sync::Lazy;
use regex::Regex;

/// A coarse grouping used only to decide tokenizing precedence and the
/// context-sensitive veto (see `Tokenizer::next` in `tokenizer.rs`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Family {
    Head,
    Keyword,
    ShiProduct,
    RadProduct,
    TestProductFamily,
    SubscriptionCommand,
    Tail,
}

/// Every distinct lexical token the grammar recognizes, including the three
/// virtual kinds (`Data`, `WcId`, `Id`) that `Id` matches are sorted into
/// after the fact, and the synthetic `EndMarker` that terminates every
/// stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum TokenKind {
    // Head
    Datetime,

    // Keyword
    Begin,
    Stop,
    To,
    Of,
    Part,
    MsgType,
    MsgId,
    Lat,
    Lon,
    RefId,
    Application,
    Email,
    Ftp,
    TimeStamp,
    Time,
    StaList,
    BullType,
    MagType,
    MagPrefMb,
    MagPrefMs,
    Mag,
    ChanList,
    RelativeTo,
    Help,
    ProdId,
    EventList,
    ArrivalList,
    GroupBullList,
    OriginList,
    BeamList,
    AuxList,
    CommList,
    DepthConf,
    DepthKvalue,
    DepthThresh,
    DepthMinusError,
    Depth,
    EventStaDist,
    MbMinusMs,
    MsErr,
    MinMb,
    HydroCpThresh,
    HydroTeThresh,
    LocConf,
    MbErr,
    MbmsConf,
    MbmsSlope,
    MbmsThresh,
    MinDpSnrPp,
    MinDpSnrSp,
    MinMouveoutPp,
    MinMouveoutSp,
    MinNdef,
    MinNdpPp,
    MinNdpSp,
    MinNstaMs,
    MinWdepthThresh,
    RegConf,
    Ack,
    Freq,
    Immediate,
    Daily,
    Custom,
    Continuous,
    SendEmpty,
    SubscrList,
    SubscrName,
    SubscrResend,
    ProdIdList,
    Boolean,

    // ShiProduct
    Bulletin,
    Waveform,
    Slsd,
    Arrival,
    StaStatus,
    ChanStatus,
    Channel,
    WaveMission,
    WaveQuality,
    Station,
    Event,
    ExecSum,
    Comment,
    CommStatus,
    Origin,
    Outage,
    Response,
    Network,
    Detection,

    // RadProduct
    DetBkPhd,
    GasBkPhd,
    BlankPhd,
    CalibPhd,
    QcPhd,
    SphdP,
    SphdF,
    Rlr,
    Arr,
    Rrr,
    AlertFlow,
    AlertSystem,
    AlertTemp,
    AlertUps,
    Met,
    Rnps,
    Ssreb,
    Rmssoh,
    Armr,
    Fpeb,

    // TestProductFamily
    TestProduct,

    // SubscriptionCommand
    SubscrProd,
    Unsubscribe,

    // Tail
    MsgFormat,
    EmailAddr,
    Number,
    Comma,
    Colon,
    Minus,
    Newline,

    // Virtual Id-family kinds
    Id,
    WcId,
    Data,

    // Synthetic end-of-stream marker
    EndMarker,
}

impl TokenKind {
    pub fn family(self) -> Family {
        use Family::*;
        use TokenKind::*;
        match self {
            Datetime => Head,
            Begin | Stop | To | Of | Part | MsgType | MsgId | Lat | Lon | RefId | Application
            | Email | Ftp | TimeStamp | Time | StaList | BullType | MagType | MagPrefMb
            | MagPrefMs | Mag | ChanList | RelativeTo | Help | ProdId | EventList
            | ArrivalList | GroupBullList | OriginList | BeamList | AuxList | CommList
            | DepthConf | DepthKvalue | DepthThresh | DepthMinusError | Depth | EventStaDist
            | MbMinusMs | MsErr | MinMb | HydroCpThresh | HydroTeThresh | LocConf | MbErr
            | MbmsConf | MbmsSlope | MbmsThresh | MinDpSnrPp | MinDpSnrSp | MinMouveoutPp
            | MinMouveoutSp | MinNdef | MinNdpPp | MinNdpSp | MinNstaMs | MinWdepthThresh
            | RegConf | Ack | Freq | Immediate | Daily | Custom | Continuous | SendEmpty
            | SubscrList | SubscrName | SubscrResend | ProdIdList | Boolean => Keyword,
            Bulletin | Waveform | Slsd | Arrival | StaStatus | ChanStatus | Channel
            | WaveMission | WaveQuality | Station | Event | ExecSum | Comment | CommStatus
            | Origin | Outage | Response | Network | Detection => ShiProduct,
            DetBkPhd | GasBkPhd | BlankPhd | CalibPhd | QcPhd | SphdP | SphdF | Rlr | Arr
            | Rrr | AlertFlow | AlertSystem | AlertTemp | AlertUps | Met | Rnps | Ssreb
            | Rmssoh | Armr | Fpeb => RadProduct,
            TestProduct => TestProductFamily,
            SubscrProd | Unsubscribe => SubscriptionCommand,
            MsgFormat | EmailAddr | Number | Comma | Colon | Minus | Newline => Tail,
            Id | WcId | Data | EndMarker => Tail,
        }
    }

    /// Whether this kind is one of the "real" product names a request /
    /// subscription can name (excludes `Help`, which is grammatically
    /// accepted alongside RAD products but does not itself denote a
    /// product).
    pub fn is_product(self) -> bool {
        matches!(
            self.family(),
            Family::ShiProduct | Family::RadProduct | Family::TestProductFamily
        )
    }

    pub fn is_command(self) -> bool {
        matches!(self.family(), Family::SubscriptionCommand)
    }
}

pub(crate) static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((17|18|19|[2-9][0-9])\d\d)[-/.](0[1-9]|1[012]|[1-9])[-/.](0[1-9]|[12][0-9]|3[01]|[1-9])([tT ]?([0-1][0-9]|2[0-3]|[0-9])([:]?([0-5][0-9]|[0-9]))?([:]([0-5][0-9]|[0-9]))?([.]([0-9])+)?)?",
    )
    .expect("DATETIME_RE compiles")
});

pub(crate) static MSGFORMAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3}(\d+\.\d+)").expect("MSGFORMAT_RE compiles"));

pub(crate) static EMAILADDR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?",
    )
    .expect("EMAILADDR_RE compiles")
});

/// `HEXNUMBER|OCTNUMBER|FLOATNUMBER(j|J)?|DECNUMBER(j|J)?`, in that
/// precedence order so `0x1A` is not swallowed by the decimal branch.
pub(crate) static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0[xX][\da-fA-F]*[lL]?|0[0-7]*[lL]?|(\d+\.\d*|\.\d+)([eE][-+]?\d+)?[jJ]?|[0-9]\d*[lL]?[jJ]?)",
    )
    .expect("NUMBER_RE compiles")
});

pub(crate) static ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\d/*A-Za-z_+=()<>]([\w]|[\d/=<>:().@*+-])*").expect("ID_RE compiles")
});

pub(crate) static NEWLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\n+|(\r\n)+)").expect("NEWLINE_RE compiles"));

/// How a token's text is recognized: either a fixed literal (matched
/// case-insensitively) or a pattern.
pub(crate) enum Matcher {
    Literal(&'static str),
    Regex(&'static Lazy<Regex>),
}

pub(crate) const CATALOG: &[(TokenKind, Matcher)] = &[
    (TokenKind::Datetime, Matcher::Regex(&DATETIME_RE)),
    // Keyword
    (TokenKind::Begin, Matcher::Literal("BEGIN")),
    (TokenKind::Stop, Matcher::Literal("STOP")),
    (TokenKind::To, Matcher::Literal("TO")),
    (TokenKind::Of, Matcher::Literal("OF")),
    (TokenKind::Part, Matcher::Literal("PART")),
    (TokenKind::MsgType, Matcher::Literal("MSG_TYPE")),
    (TokenKind::MsgId, Matcher::Literal("MSG_ID")),
    (TokenKind::Lat, Matcher::Literal("LAT")),
    (TokenKind::Lon, Matcher::Literal("LON")),
    (TokenKind::RefId, Matcher::Literal("REF_ID")),
    (TokenKind::Application, Matcher::Literal("APPLICATION")),
    (TokenKind::Email, Matcher::Literal("E-MAIL")),
    (TokenKind::Ftp, Matcher::Literal("FTP")),
    (TokenKind::TimeStamp, Matcher::Literal("TIME_STAMP")),
    (TokenKind::Time, Matcher::Literal("TIME")),
    (TokenKind::StaList, Matcher::Literal("STA_LIST")),
    (TokenKind::BullType, Matcher::Literal("BULL_TYPE")),
    (TokenKind::MagType, Matcher::Literal("MAG_TYPE")),
    (TokenKind::MagPrefMb, Matcher::Literal("MAGPREF_MB")),
    (TokenKind::MagPrefMs, Matcher::Literal("MAGPREF_MS")),
    (TokenKind::Mag, Matcher::Literal("MAG")),
    (TokenKind::ChanList, Matcher::Literal("CHAN_LIST")),
    (TokenKind::RelativeTo, Matcher::Literal("RELATIVE_TO")),
    (TokenKind::Help, Matcher::Literal("HELP")),
    (TokenKind::ProdId, Matcher::Literal("PROD_ID")),
    (TokenKind::EventList, Matcher::Literal("EVENT_LIST")),
    (TokenKind::ArrivalList, Matcher::Literal("ARRIVAL_LIST")),
    (
        TokenKind::GroupBullList,
        Matcher::Literal("GROUP_BULL_LIST"),
    ),
    (TokenKind::OriginList, Matcher::Literal("ORIGIN_LIST")),
    (TokenKind::BeamList, Matcher::Literal("BEAM_LIST")),
    (TokenKind::AuxList, Matcher::Literal("AUX_LIST")),
    (TokenKind::CommList, Matcher::Literal("COMM_LIST")),
    (TokenKind::DepthConf, Matcher::Literal("DEPTH_CONF")),
    (TokenKind::DepthKvalue, Matcher::Literal("DEPTH_KVALUE")),
    (TokenKind::DepthThresh, Matcher::Literal("DEPTH_THRESH")),
    (
        TokenKind::DepthMinusError,
        Matcher::Literal("DEPTH_MINUS_ERROR"),
    ),
    (TokenKind::Depth, Matcher::Literal("DEPTH")),
    (TokenKind::EventStaDist, Matcher::Literal("EVENT_STA_DIST")),
    (TokenKind::MbMinusMs, Matcher::Literal("MB_MINUS_MS")),
    (TokenKind::MsErr, Matcher::Literal("MS_ERR")),
    (TokenKind::MinMb, Matcher::Literal("MIN_MB")),
    (
        TokenKind::HydroCpThresh,
        Matcher::Literal("HYDRO_CP_THRESH"),
    ),
    (
        TokenKind::HydroTeThresh,
        Matcher::Literal("HYDRO_TE_THRESH"),
    ),
    (TokenKind::LocConf, Matcher::Literal("LOC_CONF")),
    (TokenKind::MbErr, Matcher::Literal("MB_ERR")),
    (TokenKind::MbmsConf, Matcher::Literal("MBMS_CONF")),
    (TokenKind::MbmsSlope, Matcher::Literal("MBMS_SLOPE")),
    (TokenKind::MbmsThresh, Matcher::Literal("MBMS_THRESH")),
    (TokenKind::MinDpSnrPp, Matcher::Literal("MIN_DP_SNR_PP")),
    (TokenKind::MinDpSnrSp, Matcher::Literal("MIN_DP_SNR_SP")),
    (
        TokenKind::MinMouveoutPp,
        Matcher::Literal("MIN_MOUVEOUT_PP"),
    ),
    (
        TokenKind::MinMouveoutSp,
        Matcher::Literal("MIN_MOUVEOUT_SP"),
    ),
    (TokenKind::MinNdef, Matcher::Literal("MIN_NDEF")),
    (TokenKind::MinNdpPp, Matcher::Literal("MIN_NDP_PP")),
    (TokenKind::MinNdpSp, Matcher::Literal("MIN_NDP_SP")),
    (TokenKind::MinNstaMs, Matcher::Literal("MIN_NSTA_MS")),
    (
        TokenKind::MinWdepthThresh,
        Matcher::Literal("MIN_WDEPTH_THRESH"),
    ),
    (TokenKind::RegConf, Matcher::Literal("REG_CONF")),
    (TokenKind::Ack, Matcher::Literal("ACK")),
    (TokenKind::Freq, Matcher::Literal("FREQ")),
    (TokenKind::Immediate, Matcher::Literal("IMMEDIATE")),
    (TokenKind::Daily, Matcher::Literal("DAILY")),
    (TokenKind::Custom, Matcher::Literal("CUSTOM")),
    (TokenKind::Continuous, Matcher::Literal("CONTINUOUS")),
    (TokenKind::SendEmpty, Matcher::Literal("SEND_EMPTY")),
    (TokenKind::SubscrList, Matcher::Literal("SUBSCR_LIST")),
    (TokenKind::SubscrName, Matcher::Literal("SUBSCR_NAME")),
    (TokenKind::SubscrResend, Matcher::Literal("SUBSCR_RESEND")),
    (TokenKind::ProdIdList, Matcher::Literal("PRODID_LIST")),
    (TokenKind::Boolean, Matcher::Literal("TRUE")),
    (TokenKind::Boolean, Matcher::Literal("FALSE")),
    // ShiProduct
    (TokenKind::Bulletin, Matcher::Literal("BULLETIN")),
    (TokenKind::Waveform, Matcher::Literal("WAVEFORM")),
    (TokenKind::Slsd, Matcher::Literal("SLSD")),
    (TokenKind::Arrival, Matcher::Literal("ARRIVAL")),
    (TokenKind::StaStatus, Matcher::Literal("STA_STATUS")),
    (TokenKind::ChanStatus, Matcher::Literal("CHAN_STATUS")),
    (TokenKind::Channel, Matcher::Literal("CHANNEL")),
    (TokenKind::WaveMission, Matcher::Literal("WAVE_MISSION")),
    (TokenKind::WaveQuality, Matcher::Literal("WAVE_QUALITY")),
    (TokenKind::Station, Matcher::Literal("STATION")),
    (TokenKind::Event, Matcher::Literal("EVENT")),
    (TokenKind::ExecSum, Matcher::Literal("EXECSUM")),
    (TokenKind::Comment, Matcher::Literal("COMMENT")),
    (TokenKind::CommStatus, Matcher::Literal("COMM_STATUS")),
    (TokenKind::Origin, Matcher::Literal("ORIGIN")),
    (TokenKind::Outage, Matcher::Literal("OUTAGE")),
    (TokenKind::Response, Matcher::Literal("RESPONSE")),
    (TokenKind::Network, Matcher::Literal("NETWORK")),
    (TokenKind::Detection, Matcher::Literal("DETECTION")),
    // RadProduct
    (TokenKind::DetBkPhd, Matcher::Literal("DETBKPHD")),
    (TokenKind::GasBkPhd, Matcher::Literal("GASBKPHD")),
    (TokenKind::BlankPhd, Matcher::Literal("BLANKPHD")),
    (TokenKind::CalibPhd, Matcher::Literal("CALIBPHD")),
    (TokenKind::QcPhd, Matcher::Literal("QCPHD")),
    (TokenKind::SphdP, Matcher::Literal("SPHDP")),
    (TokenKind::SphdF, Matcher::Literal("SPHDF")),
    (TokenKind::Rlr, Matcher::Literal("RLR")),
    (TokenKind::Arr, Matcher::Literal("ARR")),
    (TokenKind::Rrr, Matcher::Literal("RRR")),
    (TokenKind::AlertFlow, Matcher::Literal("ALERT_FLOW")),
    (TokenKind::AlertSystem, Matcher::Literal("ALERT_SYSTEM")),
    (TokenKind::AlertTemp, Matcher::Literal("ALERT_TEMP")),
    (TokenKind::AlertUps, Matcher::Literal("ALERT_UPS")),
    (TokenKind::Met, Matcher::Literal("MET")),
    (TokenKind::Rnps, Matcher::Literal("RNPS")),
    (TokenKind::Ssreb, Matcher::Literal("SSREB")),
    (TokenKind::Rmssoh, Matcher::Literal("RMSSOH")),
    (TokenKind::Armr, Matcher::Literal("ARMR")),
    (TokenKind::Fpeb, Matcher::Literal("FPEB")),
    // TestProductFamily
    (TokenKind::TestProduct, Matcher::Literal("TEST_PRODUCT")),
    // SubscriptionCommand
    (TokenKind::SubscrProd, Matcher::Literal("SUBSCR_PROD")),
    (TokenKind::Unsubscribe, Matcher::Literal("UNSUBSCRIBE")),
    // Tail
    (TokenKind::MsgFormat, Matcher::Regex(&MSGFORMAT_RE)),
    (TokenKind::EmailAddr, Matcher::Regex(&EMAILADDR_RE)),
    (TokenKind::Number, Matcher::Regex(&NUMBER_RE)),
    (TokenKind::Comma, Matcher::Literal(",")),
    (TokenKind::Colon, Matcher::Literal(":")),
    (TokenKind::Minus, Matcher::Literal("-")),
    (TokenKind::Newline, Matcher::Regex(&NEWLINE_RE)),
    (TokenKind::Id, Matcher::Regex(&ID_RE)),
];

pub(crate) const IGNORED_LITERALS: &[char] = &[' ', '\x0c', '\t', '\x0b'];

/// Characters a `NUMBER` or `DATETIME` match must be followed by (or be at
/// end of line) for the match to stand; otherwise the tokenizer keeps trying
/// later catalog entries at the same position. Prevents `1234` in `1234ABC`
/// from being accepted as a number followed by a bare `ABC` id.
pub(crate) fn follows_number_ok(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => IGNORED_LITERALS.contains(&c) || c == '\n' || c == '\r' || c == ',',
    }
}

/// Characters a `KEYWORD`-family token (including `ShiProduct`, `RadProduct`,
/// `TestProductFamily`, `SubscriptionCommand`) must be followed by, or be at
/// end of line, to stand as that keyword rather than the prefix of a longer
/// identifier.
pub(crate) fn follows_keyword_ok(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => IGNORED_LITERALS.contains(&c) || c == ':' || c == '\n' || c == '\r',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_family_excludes_help() {
        assert!(!TokenKind::Help.is_product());
        assert!(TokenKind::Waveform.is_product());
        assert!(TokenKind::Arr.is_product());
        assert!(TokenKind::TestProduct.is_product());
    }

    #[test]
    fn prodid_list_literal_has_no_extra_underscore() {
        let entry = CATALOG
            .iter()
            .find(|(kind, _)| matches!(kind, TokenKind::ProdIdList))
            .expect("PRODID_LIST entry present");
        match entry.1 {
            Matcher::Literal(lit) => assert_eq!(lit, "PRODID_LIST"),
            Matcher::Regex(_) => panic!("expected literal matcher"),
        }
    }

    #[test]
    fn network_and_detection_are_shi_product() {
        assert_eq!(TokenKind::Network.family(), Family::ShiProduct);
        assert_eq!(TokenKind::Detection.family(), Family::ShiProduct);
    }
}
