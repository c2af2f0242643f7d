//! Tokenizer, recursive-descent parser, and semantic validator for the
//! IMS2.0 monitoring-archive request/subscription language.
//!
//! [`parse_message`] is the crate's single entry point: it turns the raw
//! text of a `BEGIN ims2.0` ... `STOP` message into a validated
//! [`ValidatedMessage`](ims_types::message::ValidatedMessage), running the
//! tokenizer, the grammar, and the semantic rule engine in sequence and
//! stopping at the first error any stage raises.
//!
//! ```
//! use ims_parser::parse_message;
//!
//! let text = "BEGIN IMS2.0\n\
//!              MSG_TYPE request\n\
//!              MSG_ID 1 example\n\
//!              WAVEFORM\n\
//!              TIME 2020/01/01 to 2020/01/02\n\
//!              STA_LIST ABC\n\
//!              STOP\n";
//!
//! let message = parse_message(text).unwrap();
//! assert_eq!(message.product_list.len(), 1);
//! ```

pub mod lexicon;
pub mod parser;
pub mod pretty;
pub mod token;
pub mod tokenizer;
pub mod validator;

pub use ims_types::error::Error;
pub use ims_types::message::ValidatedMessage;

/// Parses and validates `input`, producing a [`ValidatedMessage`] or the
/// first lexical, syntax, or semantic error encountered.
pub fn parse_message(input: &str) -> Result<ValidatedMessage, Error> {
    let message = parser::parse(input)?;
    log::debug!("parsed message with {} product(s), {} command(s)", message.product_list.len(), message.command_list.len());
    validator::validate(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_validates_a_minimal_request() {
        let text = "BEGIN IMS2.0\n\
                     MSG_TYPE request\n\
                     MSG_ID 1 example\n\
                     WAVEFORM\n\
                     TIME 2020/01/01 to 2020/01/02\n\
                     STA_LIST ABC\n\
                     STOP\n";
        let message = parse_message(text).expect("valid message");
        assert_eq!(message.product_list.len(), 1);
        assert_eq!(message.product_list[0].classification.as_ref().unwrap().product_type, "WAVEFORM");
    }

    #[test]
    fn reports_a_semantic_error_for_an_unknown_bulletin_type() {
        let text = "BEGIN IMS2.0\n\
                     MSG_TYPE request\n\
                     MSG_ID 1 example\n\
                     BULLETIN\n\
                     BULL_TYPE BOGUS\n\
                     TIME 2020/01/01 to 2020/01/02\n\
                     STOP\n";
        let err = parse_message(text).unwrap_err();
        assert!(err.to_string().contains("not a recognized bulletin type"));
    }
}
