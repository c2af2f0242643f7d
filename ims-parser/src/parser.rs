//! Recursive-descent parser: turns a token stream into the pre-validation
//! shapes from `ims_types` (header metadata, `ProductDict`/`CommandDict`
//! worklists). Semantic checking of the worklists happens afterward, in
//! [`crate::validator`].
//!
//! Each `parse_*` method here mirrors one production of the grammar and
//! tracks the tokenizer's "current token" explicitly (the tokenizer itself
//! is a stateless byte scanner; the parser is what remembers what it last
//! saw, the way the reference implementation's token cursor did).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use ims_types::error::Error;
use ims_types::message::ValidatedMessage;
use ims_types::msg::{MsgInfo, MsgType, ProdId, RefId, TargetInfo, TargetKind};
use ims_types::product::{CommandDict, CommandKind, ProductDict};
use ims_types::time::imsdate_to_datetime;
use ims_types::value::{Bound, EnvValue, FreqPolicy, Frequency, Range, Sentinel};

use crate::lexicon::{Family, TokenKind};
use crate::token::Token;
use crate::tokenizer::Tokenizer;

const SIMPLE_NUMBER_PARAMS: &[TokenKind] = &[
    TokenKind::DepthConf,
    TokenKind::DepthThresh,
    TokenKind::DepthKvalue,
    TokenKind::HydroCpThresh,
    TokenKind::HydroTeThresh,
    TokenKind::LocConf,
    TokenKind::MbErr,
    TokenKind::MbmsConf,
    TokenKind::MbmsSlope,
    TokenKind::MbmsThresh,
    TokenKind::MinDpSnrPp,
    TokenKind::MinDpSnrSp,
    TokenKind::MinMb,
    TokenKind::MinMouveoutPp,
    TokenKind::MinMouveoutSp,
    TokenKind::MinNdef,
    TokenKind::MinNdpPp,
    TokenKind::MinNdpSp,
    TokenKind::MinNstaMs,
    TokenKind::MinWdepthThresh,
    TokenKind::MsErr,
    TokenKind::RegConf,
];

const LIST_PARAMS: &[TokenKind] = &[
    TokenKind::StaList,
    TokenKind::ChanList,
    TokenKind::EventList,
    TokenKind::ArrivalList,
    TokenKind::BeamList,
    TokenKind::AuxList,
    TokenKind::CommList,
    TokenKind::GroupBullList,
    TokenKind::OriginList,
    TokenKind::MagType,
    TokenKind::SubscrList,
    TokenKind::ProdIdList,
];

fn is_product_token(kind: TokenKind) -> bool {
    matches!(kind.family(), Family::ShiProduct | Family::RadProduct | Family::TestProductFamily)
        || kind == TokenKind::Help
}

/// The dict key a field keyword is stored under. Mirrors the reference
/// grammar's naming convention: the key drops separators the keyword's own
/// literal carries (`STA_LIST` the token vs. `STALIST` the field).
fn env_key(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::BullType => "BULLTYPE",
        TokenKind::MagPrefMb => "MAGPREFMB",
        TokenKind::MagPrefMs => "MAGPREFMS",
        TokenKind::RelativeTo => "RELATIVETO",
        TokenKind::Mag => "MAG",
        TokenKind::Depth => "DEPTH",
        TokenKind::EventStaDist => "EVENTSTADIST",
        TokenKind::DepthMinusError => "DEPTHMINUSERROR",
        TokenKind::MbMinusMs => "MBMINUSMS",
        TokenKind::Lat => "LAT",
        TokenKind::Lon => "LON",
        TokenKind::StaList => "STALIST",
        TokenKind::ChanList => "CHANLIST",
        TokenKind::EventList => "EVENTLIST",
        TokenKind::ArrivalList => "ARRIVALLIST",
        TokenKind::BeamList => "BEAMLIST",
        TokenKind::AuxList => "AUXLIST",
        TokenKind::CommList => "COMMLIST",
        TokenKind::GroupBullList => "GROUPBULLLIST",
        TokenKind::OriginList => "ORIGINLIST",
        TokenKind::MagType => "MAGTYPE",
        TokenKind::SubscrList => "SUBSCRLIST",
        TokenKind::ProdIdList => "PRODIDLIST",
        TokenKind::DepthConf => "DEPTHCONF",
        TokenKind::DepthThresh => "DEPTHTHRESH",
        TokenKind::DepthKvalue => "DEPTHKVALUE",
        TokenKind::HydroCpThresh => "HYDROCPTHRESH",
        TokenKind::HydroTeThresh => "HYDROTETHRESH",
        TokenKind::LocConf => "LOCCONF",
        TokenKind::MbErr => "MBERR",
        TokenKind::MbmsConf => "MBMSCONF",
        TokenKind::MbmsSlope => "MBMSSLOPE",
        TokenKind::MbmsThresh => "MBMSTHRESH",
        TokenKind::MinDpSnrPp => "MINDPSNRPP",
        TokenKind::MinDpSnrSp => "MINDPSNRSP",
        TokenKind::MinMb => "MINMB",
        TokenKind::MinMouveoutPp => "MINMOUVEOUTPP",
        TokenKind::MinMouveoutSp => "MINMOUVEOUTSP",
        TokenKind::MinNdef => "MINNDEF",
        TokenKind::MinNdpPp => "MINNDPPP",
        TokenKind::MinNdpSp => "MINNDPSP",
        TokenKind::MinNstaMs => "MINNSTAMS",
        TokenKind::MinWdepthThresh => "MINWDEPTHTHRESH",
        TokenKind::MsErr => "MSERR",
        TokenKind::RegConf => "REGCONF",
        TokenKind::SubscrName => "SUBSCRNAME",
        other => unreachable!("env_key called on non field token {other:?}"),
    }
}

/// The dict key a product keyword is stored under as `TYPE`.
fn product_type_key(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Bulletin => "BULLETIN",
        TokenKind::Waveform => "WAVEFORM",
        TokenKind::Slsd => "SLSD",
        TokenKind::Arrival => "ARRIVAL",
        TokenKind::StaStatus => "STASTATUS",
        TokenKind::ChanStatus => "CHANSTATUS",
        TokenKind::Channel => "CHANNEL",
        TokenKind::WaveMission => "WAVEMISSION",
        TokenKind::WaveQuality => "WAVEQUALITY",
        TokenKind::Station => "STATION",
        TokenKind::Event => "EVENT",
        TokenKind::ExecSum => "EXECSUM",
        TokenKind::Comment => "COMMENT",
        TokenKind::CommStatus => "COMMSTATUS",
        TokenKind::Origin => "ORIGIN",
        TokenKind::Outage => "OUTAGE",
        TokenKind::Response => "RESPONSE",
        TokenKind::Network => "NETWORK",
        TokenKind::Detection => "DETECTION",
        TokenKind::DetBkPhd => "DETBKPHD",
        TokenKind::GasBkPhd => "GASBKPHD",
        TokenKind::BlankPhd => "BLANKPHD",
        TokenKind::CalibPhd => "CALIBPHD",
        TokenKind::QcPhd => "QCPHD",
        TokenKind::SphdP => "SPHDP",
        TokenKind::SphdF => "SPHDF",
        TokenKind::Rlr => "RLR",
        TokenKind::Arr => "ARR",
        TokenKind::Rrr => "RRR",
        TokenKind::AlertFlow => "ALERTFLOW",
        TokenKind::AlertSystem => "ALERTSYSTEM",
        TokenKind::AlertTemp => "ALERTTEMP",
        TokenKind::AlertUps => "ALERTUPS",
        TokenKind::Met => "MET",
        TokenKind::Rnps => "RNPS",
        TokenKind::Ssreb => "SSREB",
        TokenKind::Rmssoh => "RMSSOH",
        TokenKind::Armr => "ARMR",
        TokenKind::Fpeb => "FPEB",
        TokenKind::TestProduct => "TESTPRODUCT",
        TokenKind::Help => "HELP",
        other => unreachable!("product_type_key called on non product token {other:?}"),
    }
}

fn relative_to_value(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Origin => "ORIGIN".to_string(),
        TokenKind::Event => "EVENT".to_string(),
        TokenKind::Bulletin => "BULLETIN".to_string(),
        _ => tok.text.clone(),
    }
}

fn empty_product() -> ProductDict {
    ProductDict {
        type_: None,
        subtype: None,
        format: None,
        subformat: None,
        classification: None,
        fields: IndexMap::new(),
    }
}

struct ProductHeader {
    type_: String,
    subtype: Option<String>,
    format: Option<String>,
    subformat: Option<String>,
}

/// Parses `input` into a pre-validation [`ValidatedMessage`]: header fields
/// are fully typed, but `product_list`/`command_list` entries still carry
/// [`EnvValue::Raw`]-and-friends worklists for [`crate::validator`] to drain.
pub fn parse(input: &str) -> Result<ValidatedMessage, Error> {
    let mut parser = Parser::new(input);
    parser.parse_message()
}

struct Parser<'a> {
    tok: Tokenizer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            tok: Tokenizer::new(input),
            current: Token::new(TokenKind::EndMarker, "", 1, 0, 0),
        }
    }

    fn advance(&mut self) -> Result<(), Error> {
        self.current = self.tok.next()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        let t = self.tok.expect(kind)?;
        self.current = t.clone();
        Ok(t)
    }

    fn expect_one_of(&mut self, kinds: &[TokenKind]) -> Result<Token, Error> {
        let t = self.tok.expect_one_of(kinds)?;
        self.current = t.clone();
        Ok(t)
    }

    fn consume_while_next_in(&mut self, kinds: &[TokenKind]) -> Result<Token, Error> {
        let t = self.tok.consume_while_next_in(kinds)?;
        self.current = t.clone();
        Ok(t)
    }

    fn consume_while_current_in(&mut self, kinds: &[TokenKind]) -> Result<Token, Error> {
        let t = self.tok.consume_while_current_in(self.current.clone(), kinds)?;
        self.current = t.clone();
        Ok(t)
    }

    fn err_here(&self, message: impl Into<String>) -> Error {
        Error::from(self.tok.error_at(&self.current, message))
    }

    fn parse_message(&mut self) -> Result<ValidatedMessage, Error> {
        let mut msg = self.parse_header()?;

        match msg.msg_info.msg_type {
            MsgType::Request => {
                msg.product_list = self.parse_request_body()?;
            }
            MsgType::Subscription => {
                let (products, commands) = self.parse_subscription_body()?;
                msg.product_list = products;
                msg.command_list = commands;
            }
            MsgType::Data => {
                return Err(self.err_here("data messages are not supported"));
            }
        }

        Ok(msg)
    }

    fn parse_header(&mut self) -> Result<ValidatedMessage, Error> {
        self.expect(TokenKind::Begin)?;
        let format_tok = self.expect(TokenKind::MsgFormat)?;
        let format = format_tok.text.to_lowercase();

        self.consume_while_next_in(&[TokenKind::Newline])?;
        self.expect(TokenKind::MsgType)?;
        let type_tok = self.expect(TokenKind::Id)?;
        let msg_type = match type_tok.text.to_lowercase().as_str() {
            "request" => MsgType::Request,
            "subscription" => MsgType::Subscription,
            "data" => MsgType::Data,
            other => {
                return Err(Error::from(
                    self.tok.error_at(&type_tok, format!("unknown message type \"{other}\"")),
                ))
            }
        };

        self.consume_while_next_in(&[TokenKind::Newline])?;
        self.expect(TokenKind::MsgId)?;
        let id_tok = self.expect_one_of(&[
            TokenKind::Id,
            TokenKind::Number,
            TokenKind::EmailAddr,
            TokenKind::Datetime,
            TokenKind::Data,
        ])?;
        let id = id_tok.text.clone();

        self.advance()?;
        let mut source = None;
        if matches!(
            self.current.kind,
            TokenKind::Id | TokenKind::EmailAddr | TokenKind::Datetime | TokenKind::Data | TokenKind::Number
        ) {
            source = Some(self.current.text.clone());
            self.advance()?;
        } else if self.current.kind != TokenKind::Newline {
            return Err(self.err_here("expected a newline or a source"));
        }

        self.consume_while_current_in(&[TokenKind::Newline])?;

        let ref_id = if self.current.kind == TokenKind::RefId {
            let r = self.parse_ref_id()?;
            Some(r)
        } else {
            None
        };

        let prod_id = if self.current.kind == TokenKind::ProdId {
            let p = self.parse_prod_id()?;
            Some(p)
        } else {
            None
        };

        let mut application = None;
        if self.current.kind == TokenKind::Application {
            self.advance()?;
            if !matches!(self.current.kind, TokenKind::Id | TokenKind::Number) {
                return Err(self.err_here("expected an id or a number for the application name"));
            }
            application = Some(self.current.text.clone());
            self.consume_while_next_in(&[TokenKind::Newline])?;
        }

        let mut target_info = None;
        if matches!(self.current.kind, TokenKind::Email | TokenKind::Ftp) {
            let kind = if self.current.kind == TokenKind::Email {
                TargetKind::Email
            } else {
                TargetKind::Ftp
            };
            self.advance()?;
            if self.current.kind != TokenKind::EmailAddr {
                return Err(self.err_here("expected an email address"));
            }
            target_info = Some(TargetInfo {
                kind,
                address: self.current.text.to_lowercase(),
            });
            self.consume_while_next_in(&[TokenKind::Newline])?;
        }

        let mut ack = true;
        if self.current.kind == TokenKind::Ack {
            self.advance()?;
            ack = self.current.text == "true";
            self.consume_while_next_in(&[TokenKind::Newline])?;
        }

        let msg_info = MsgInfo {
            language: MsgInfo::LANGUAGE.to_string(),
            format,
            msg_type,
            id,
            source,
            ref_id,
            prod_id,
            application,
        };

        let mut msg = ValidatedMessage::new(msg_info);
        msg.target_info = target_info;
        msg.ack = ack;
        Ok(msg)
    }

    fn parse_ref_id(&mut self) -> Result<RefId, Error> {
        let str_tok = self.expect_one_of(&[TokenKind::Id, TokenKind::Number])?;
        let ref_str = str_tok.text.clone();

        self.advance()?;
        let mut ref_src = None;
        if matches!(self.current.kind, TokenKind::Id | TokenKind::Number) {
            ref_src = Some(self.current.text.clone());
            self.advance()?;
        }

        let mut seq_num = None;
        let mut tot_num = None;
        if self.current.kind == TokenKind::Part {
            self.advance()?;
            if !matches!(self.current.kind, TokenKind::Id | TokenKind::Number) {
                return Err(self.err_here("expected an id for the ref_id sequence number"));
            }
            seq_num = Some(self.current.text.clone());

            self.advance()?;
            if self.current.kind == TokenKind::Of {
                self.advance()?;
                if !matches!(self.current.kind, TokenKind::Id | TokenKind::Number) {
                    return Err(self.err_here("expected an id for the ref_id total number"));
                }
                tot_num = Some(self.current.text.clone());
                self.advance()?;
            }
        } else if self.current.kind != TokenKind::Newline {
            return Err(self.err_here("expected an id, a part, or a newline in the ref_id line"));
        }

        self.consume_while_current_in(&[TokenKind::Newline])?;

        Ok(RefId {
            ref_str,
            ref_src,
            seq_num,
            tot_num,
        })
    }

    fn parse_prod_id(&mut self) -> Result<ProdId, Error> {
        let prod_tok = self.expect(TokenKind::Number)?;
        let prod_id = prod_tok.text.clone();
        let delivery_tok = self.expect(TokenKind::Number)?;
        let delivery_id = delivery_tok.text.clone();
        self.consume_while_next_in(&[TokenKind::Newline])?;
        Ok(ProdId { prod_id, delivery_id })
    }

    /// `product_type [: subtype] [format[:subformat] | format subformat]`
    fn parse_complex_product(&mut self) -> Result<ProductHeader, Error> {
        let type_ = product_type_key(self.current.kind).to_string();
        let mut header = ProductHeader {
            type_,
            subtype: None,
            format: None,
            subformat: None,
        };

        self.advance()?;
        if self.current.kind == TokenKind::Newline {
            return Ok(header);
        }

        if self.current.kind == TokenKind::Colon {
            let id_tok = self.expect(TokenKind::Id)?;
            header.subtype = Some(id_tok.text.clone());
            self.advance()?;
        }

        if self.current.kind == TokenKind::Newline {
            return Ok(header);
        }

        if self.current.kind == TokenKind::MsgFormat {
            header.format = Some(self.current.text.clone());
            self.advance()?;

            if self.current.kind == TokenKind::Colon {
                self.advance()?;
                if self.current.kind == TokenKind::Id {
                    header.subformat = Some(self.current.text.clone());
                    self.expect(TokenKind::Newline)?;
                } else {
                    return Err(self.err_here("expected a subformat value"));
                }
            } else if self.current.kind == TokenKind::Id {
                header.subformat = Some(self.current.text.clone());
                self.expect(TokenKind::Newline)?;
            } else if self.current.kind != TokenKind::Newline {
                return Err(self.err_here("expected a subformat value or a newline"));
            }
        } else {
            return Err(self.err_here("expected a newline or a msg format (ex: ims2.0)"));
        }

        Ok(header)
    }

    fn parse_list(&mut self) -> Result<Vec<String>, Error> {
        let mut items = Vec::new();
        loop {
            self.advance()?;
            if matches!(self.current.kind, TokenKind::Id | TokenKind::WcId | TokenKind::Number) {
                items.push(self.current.text.clone());
                let sep = self.expect_one_of(&[TokenKind::Comma, TokenKind::Newline])?;
                if sep.kind == TokenKind::Newline {
                    break;
                }
            } else {
                return Err(self.err_here("expected a list id"));
            }
        }
        Ok(items)
    }

    fn parse_range(&mut self) -> Result<Range<f64>, Error> {
        self.advance()?;
        let start = if self.current.kind == TokenKind::Number {
            let v = self.parse_number_here()?;
            self.expect(TokenKind::To)?;
            Bound::Value(v)
        } else if self.current.kind == TokenKind::To {
            Bound::Sentinel(Sentinel::Min)
        } else {
            return Err(self.err_here("expected a number or to"));
        };

        self.advance()?;
        let end = if self.current.kind == TokenKind::Number {
            let v = self.parse_number_here()?;
            self.expect(TokenKind::Newline)?;
            Bound::Value(v)
        } else if self.current.kind == TokenKind::Newline {
            Bound::Sentinel(Sentinel::Max)
        } else {
            return Err(self.err_here("expected a number or newline"));
        };

        self.advance()?;
        Ok(Range::new(start, end))
    }

    fn parse_latlon(&mut self) -> Result<Range<f64>, Error> {
        self.advance()?;
        let start = match self.current.kind {
            TokenKind::Minus => {
                let num = self.expect(TokenKind::Number)?;
                let v = parse_signed(&num.text, &self.tok, &num)?;
                self.expect(TokenKind::To)?;
                Bound::Value(v)
            }
            TokenKind::Number => {
                let v = self.parse_number_here()?;
                self.expect(TokenKind::To)?;
                Bound::Value(v)
            }
            TokenKind::To => Bound::Sentinel(Sentinel::Min),
            _ => return Err(self.err_here("expected a number or to")),
        };

        self.advance()?;
        let end = match self.current.kind {
            TokenKind::Minus => {
                let num = self.expect(TokenKind::Number)?;
                let v = parse_signed(&num.text, &self.tok, &num)?;
                // The reference grammar does not require a terminator after a
                // negative end value; it simply moves on to the next token.
                self.advance()?;
                Bound::Value(v)
            }
            TokenKind::Number => {
                let v = self.parse_number_here()?;
                self.expect(TokenKind::Newline)?;
                Bound::Value(v)
            }
            TokenKind::Newline => Bound::Sentinel(Sentinel::Max),
            _ => return Err(self.err_here("expected a number or to")),
        };

        self.advance()?;
        Ok(Range::new(start, end))
    }

    fn parse_time(&mut self) -> Result<Range<String>, Error> {
        self.advance()?;
        if self.current.kind != TokenKind::Datetime {
            return Err(self.err_here("expected a datetime"));
        }
        let start = self.current.text.clone();

        self.expect(TokenKind::To)?;

        self.advance()?;
        if self.current.kind != TokenKind::Datetime {
            return Err(self.err_here("expected a datetime"));
        }
        let end = self.current.text.clone();

        self.expect(TokenKind::Newline)?;

        Ok(Range::new(Bound::Value(start), Bound::Value(end)))
    }

    fn parse_number_here(&self) -> Result<f64, Error> {
        self.current
            .text
            .parse()
            .map_err(|_| self.err_here("expected a numeric value"))
    }

    fn parse_frequency(&mut self) -> Result<Frequency, Error> {
        self.advance()?;
        let policy_tok = self.current.clone();
        let policy = match policy_tok.kind {
            TokenKind::Immediate => FreqPolicy::Immediate,
            TokenKind::Daily => FreqPolicy::Daily,
            TokenKind::Continuous => FreqPolicy::Continuous,
            TokenKind::Custom => FreqPolicy::Custom,
            _ => return Err(self.err_here("expected IMMEDIATE, DAILY, CONTINUOUS, or CUSTOM")),
        };

        let mut value = None;
        if policy_tok.kind == TokenKind::Custom {
            self.advance()?;
            if self.current.kind != TokenKind::Id {
                return Err(self.err_here("expected an id for the custom frequency parameter"));
            }
            value = Some(self.current.text.clone());
        }

        self.consume_while_next_in(&[TokenKind::Newline])?;
        Ok(Frequency { policy, value })
    }

    fn parse_request_body(&mut self) -> Result<Vec<ProductDict>, Error> {
        let mut current = empty_product();
        let mut products = Vec::new();

        while !matches!(self.current.kind, TokenKind::Stop | TokenKind::EndMarker) {
            if is_product_token(self.current.kind) {
                let header = self.parse_complex_product()?;
                current.type_ = Some(header.type_);
                if header.subtype.is_some() {
                    current.subtype = header.subtype;
                }
                if header.format.is_some() {
                    current.format = header.format;
                }
                if header.subformat.is_some() {
                    current.subformat = header.subformat;
                }
                products.push(current.clone());
            } else {
                self.parse_common_field(&mut current)?;
            }

            self.consume_while_current_in(&[TokenKind::Newline])?;
        }

        if self.current.kind != TokenKind::Stop {
            return Err(self.err_here("end of request reached without encountering a stop keyword"));
        }

        Ok(products)
    }

    fn parse_subscription_body(&mut self) -> Result<(Vec<ProductDict>, Vec<CommandDict>), Error> {
        let mut current = empty_product();
        let mut products = Vec::new();
        let mut commands = Vec::new();
        let mut desc_start = self.current.offset;

        while !matches!(self.current.kind, TokenKind::Stop | TokenKind::EndMarker) {
            if is_product_token(self.current.kind) {
                let header = self.parse_complex_product()?;
                current.type_ = Some(header.type_);
                if header.subtype.is_some() {
                    current.subtype = header.subtype;
                }
                if header.format.is_some() {
                    current.format = header.format;
                }
                if header.subformat.is_some() {
                    current.subformat = header.subformat;
                }

                let desc_end = self.current.offset;
                current
                    .fields
                    .insert("SUB_PRODUCT_DESC".to_string(), EnvValue::Raw(self.tok.slice(desc_start, desc_end).to_string()));
                desc_start = desc_end;

                products.push(current.clone());
            } else if self.current.kind.family() == Family::SubscriptionCommand {
                let command = match self.current.kind {
                    TokenKind::SubscrProd => CommandKind::SubscrProd,
                    TokenKind::Unsubscribe => CommandKind::Unsubscribe,
                    other => unreachable!("unexpected subscription command token {other:?}"),
                };
                let mut dict = CommandDict::new(command);
                dict.fields = current.fields.clone();
                commands.push(dict);
                current = empty_product();

                self.consume_while_next_in(&[TokenKind::Newline])?;
                desc_start = self.current.offset;
            } else if self.current.kind == TokenKind::SubscrName {
                self.advance()?;
                if self.current.kind != TokenKind::Id {
                    return Err(self.err_here("expected an id"));
                }
                current
                    .fields
                    .insert(env_key(TokenKind::SubscrName).to_string(), EnvValue::Id(self.current.text.clone()));
                self.consume_while_next_in(&[TokenKind::Newline])?;
            } else if self.current.kind == TokenKind::Freq {
                let freq = self.parse_frequency()?;
                current.fields.insert("FREQUENCY".to_string(), EnvValue::Frequency(freq.clone()));
                if let Some(last) = products.last_mut() {
                    last.fields.insert("FREQUENCY".to_string(), EnvValue::Frequency(freq));
                }
            } else {
                self.parse_common_field(&mut current)?;
            }

            self.consume_while_current_in(&[TokenKind::Newline])?;
        }

        if self.current.kind != TokenKind::Stop {
            return Err(self.err_here("end of request reached without encountering a stop keyword"));
        }

        Ok((products, commands))
    }

    /// Fields shared verbatim between request and subscription bodies: TIME,
    /// BULLTYPE/MAGPREFMB/MAGPREFMS, RELATIVETO, the ranged numeric fields,
    /// LAT/LON, the list params, the plain-number params, and TIMESTAMP.
    fn parse_common_field(&mut self, current: &mut ProductDict) -> Result<(), Error> {
        match self.current.kind {
            TokenKind::Time => {
                let range = self.parse_time()?;
                current.fields.insert("DATE".to_string(), EnvValue::RawDateRange(range));
            }
            TokenKind::BullType | TokenKind::MagPrefMb | TokenKind::MagPrefMs => {
                let key = env_key(self.current.kind);
                self.advance()?;
                if self.current.kind != TokenKind::Id {
                    return Err(self.err_here("expected an id qualifying the requested bulletin type"));
                }
                current.fields.insert(key.to_string(), EnvValue::Id(self.current.text.clone()));
                self.consume_while_next_in(&[TokenKind::Newline])?;
            }
            TokenKind::RelativeTo => {
                let tok = self.expect_one_of(&[TokenKind::Origin, TokenKind::Event, TokenKind::Bulletin, TokenKind::Id])?;
                current
                    .fields
                    .insert("RELATIVETO".to_string(), EnvValue::Id(relative_to_value(&tok)));
                self.consume_while_next_in(&[TokenKind::Newline])?;
            }
            TokenKind::Mag | TokenKind::Depth | TokenKind::EventStaDist | TokenKind::DepthMinusError | TokenKind::MbMinusMs => {
                let key = env_key(self.current.kind);
                let range = self.parse_range()?;
                current.fields.insert(key.to_string(), EnvValue::NumberRange(range));
            }
            TokenKind::Lat | TokenKind::Lon => {
                let key = env_key(self.current.kind);
                let range = self.parse_latlon()?;
                current.fields.insert(key.to_string(), EnvValue::NumberRange(range));
            }
            TokenKind::TimeStamp => {
                current.fields.insert("TIMESTAMP".to_string(), EnvValue::Bool(true));
                self.advance()?;
            }
            kind if LIST_PARAMS.contains(&kind) => {
                let key = env_key(kind);
                let items = self.parse_list()?;
                current.fields.insert(key.to_string(), EnvValue::List(items));
            }
            kind if SIMPLE_NUMBER_PARAMS.contains(&kind) => {
                let key = env_key(kind);
                self.advance()?;
                if self.current.kind != TokenKind::Number {
                    return Err(self.err_here("expected a number"));
                }
                let value = self.parse_number_here()?;
                current.fields.insert(key.to_string(), EnvValue::Number(value));
                self.consume_while_next_in(&[TokenKind::Newline])?;
            }
            _ => {
                return Err(self.err_here(format!(
                    "unknown or misplaced keyword \"{}\"",
                    self.current.text
                )))
            }
        }
        Ok(())
    }
}

fn parse_signed(digits: &str, tok: &Tokenizer<'_>, at: &Token) -> Result<f64, Error> {
    format!("-{digits}")
        .parse()
        .map_err(|_| Error::from(tok.error_at(at, "expected a numeric value")))
}

/// Converts a [`EnvValue::RawDateRange`] captured by the parser into a fully
/// resolved [`EnvValue::DateRange`]; used by `DateRule` in the validator.
pub(crate) fn resolve_date_range(range: &Range<String>) -> Result<Range<DateTime<Utc>>, ims_types::error::InvalidDateErrorAt> {
    let start = resolve_bound(&range.start)?;
    let end = resolve_bound(&range.end)?;
    Ok(Range::new(start, end))
}

fn resolve_bound(bound: &Bound<String>) -> Result<Bound<DateTime<Utc>>, ims_types::error::InvalidDateErrorAt> {
    match bound {
        Bound::Sentinel(s) => Ok(Bound::Sentinel(*s)),
        Bound::Value(text) => imsdate_to_datetime(text)
            .map(Bound::Value)
            .map_err(|e| ims_types::error::InvalidDateErrorAt(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(header: &str, rest: &str) -> String {
        format!("BEGIN IMS2.0\nMSG_TYPE request\nMSG_ID 1 ndc\n{header}\n{rest}\nSTOP\n")
    }

    #[test]
    fn parses_header_fields() {
        let text = "BEGIN IMS2.0\nMSG_TYPE request\nMSG_ID 1 ndc\nWAVEFORM\nTIME 2020-01-01 TO 2020-01-02\nSTOP\n";
        let msg = parse(text).expect("parses");
        assert_eq!(msg.msg_info.format, "ims2.0");
        assert_eq!(msg.msg_info.msg_type, MsgType::Request);
        assert_eq!(msg.msg_info.id, "1");
        assert_eq!(msg.msg_info.source.as_deref(), Some("ndc"));
    }

    #[test]
    fn product_inherits_fields_from_the_previous_product() {
        let text = body("WAVEFORM\nTIME 2020-01-01 TO 2020-01-02\nSTA_LIST ABC", "BULLETIN\nBULL_TYPE REB");
        let msg = parse(&text).expect("parses");
        assert_eq!(msg.product_list.len(), 2);
        assert!(msg.product_list[1].fields.contains_key("DATE"));
        assert!(msg.product_list[1].fields.contains_key("STALIST"));
    }

    #[test]
    fn sub_product_desc_is_the_verbatim_header_slice() {
        let text = "BEGIN IMS2.0\nMSG_TYPE subscription\nMSG_ID 1 ndc\nARR RMS2.0\nFREQ DAILY\nSTOP\n";
        let mut parser = Parser::new(text);
        let msg = parser.parse_message().expect("parses");
        let desc = match msg.product_list[0].fields.get("SUB_PRODUCT_DESC") {
            Some(EnvValue::Raw(s)) => s.clone(),
            other => panic!("expected a raw SUB_PRODUCT_DESC, got {other:?}"),
        };
        assert!(desc.contains("ARR RMS2.0"));
        match msg.product_list[0].fields.get("FREQUENCY") {
            Some(EnvValue::Frequency(freq)) => assert_eq!(freq.policy, FreqPolicy::Daily),
            other => panic!("expected a resolved FREQUENCY, got {other:?}"),
        }
    }

    #[test]
    fn rejects_a_data_message() {
        let text = "BEGIN IMS2.0\nMSG_TYPE data\nMSG_ID 1 ndc\nSTOP\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("data messages are not supported"));
    }

    #[test]
    fn lat_lon_rejects_a_missing_to() {
        let text = body("WAVEFORM\nTIME 2020-01-01 TO 2020-01-02", "LAT 0 5");
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("expected"));
    }
}
