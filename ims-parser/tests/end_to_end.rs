//! End-to-end scenarios driving the tokenizer, parser, and validator
//! together through the single [`ims_parser::parse_message`] entry point.

use ims_parser::parse_message;
use ims_types::msg::MsgType;
use ims_types::product::{ProductFamily, TechnologyFamily};
use ims_types::value::{Bound, EnvValue, Loc};

#[test]
fn minimal_waveform_request() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 42 any_ndc\n\
                 E-MAIL a@b.c\n\
                 WAVEFORM IMS2.0:CM6\n\
                 TIME 2020-01-01 TO 2020-01-02\n\
                 STA_LIST ABC\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    assert_eq!(message.product_list.len(), 1);
    let product = &message.product_list[0];

    let classification = product.classification.as_ref().unwrap();
    assert_eq!(classification.technology_family, TechnologyFamily::Shi);
    assert_eq!(classification.product_family, ProductFamily::Data);
    assert_eq!(classification.product_type, "WAVEFORM");
    assert_eq!(product.format.as_deref(), Some("IMS2.0"));
    assert_eq!(product.subformat.as_deref(), Some("CM6"));

    match product.fields.get("DATE") {
        Some(EnvValue::DateRange(range)) => {
            assert_eq!(range.start.value().unwrap().to_rfc3339(), "2020-01-01T00:00:00+00:00");
        }
        other => panic!("expected a resolved DATE range, got {other:?}"),
    }

    match product.fields.get("LOC") {
        Some(EnvValue::Loc(Loc::StaList { stations })) => assert_eq!(stations, &["ABC".to_string()]),
        other => panic!("expected LOC.STALIST, got {other:?}"),
    }
}

#[test]
fn latlon_with_sentinels() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 BULLETIN IMS2.0:SHORT\n\
                 BULL_TYPE REB\n\
                 TIME 2021-06-01 TO 2021-06-02\n\
                 LAT TO\n\
                 LON -180 TO 0\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    let product = &message.product_list[0];
    assert_eq!(product.classification.as_ref().unwrap().product_type, "REB");

    match product.fields.get("LOC") {
        Some(EnvValue::Loc(Loc::Geo { lat, lon })) => {
            assert_eq!(lat.start, Bound::Value(-90.0));
            assert_eq!(lat.end, Bound::Value(90.0));
            assert_eq!(lon.start, Bound::Value(-180.0));
            assert_eq!(lon.end, Bound::Value(0.0));
        }
        other => panic!("expected LOC.GEO, got {other:?}"),
    }
}

#[test]
fn lat_and_sta_list_conflict() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 42 any_ndc\n\
                 WAVEFORM IMS2.0:CM6\n\
                 TIME 2020-01-01 TO 2020-01-02\n\
                 STA_LIST ABC\n\
                 LAT 0 TO 10\n\
                 STOP\n";

    let err = parse_message(text).unwrap_err();
    assert!(err.to_string().contains("cannot have sta_list and a lat or lon"));
}

#[test]
fn ignored_nseb_variable_produces_an_advisory() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 WAVEFORM IMS2.0:CM6\n\
                 TIME 2020-01-01 TO 2020-01-02\n\
                 STA_LIST ABC\n\
                 LOC_CONF 0.9\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    let errors = message.error_messages.expect("an advisory was recorded");
    assert_eq!(errors, vec!["Ignore the following National Event Bulletin Env variables : LOC_CONF.".to_string()]);
    assert!(!message.product_list[0].fields.contains_key("LOCCONF"));
}

#[test]
fn subscription_with_custom_frequency() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE subscription\n\
                 MSG_ID 1 ndc\n\
                 ARR RMS2.0\n\
                 FREQ CUSTOM HOURLY\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    assert_eq!(message.msg_info.msg_type, MsgType::Subscription);
    let product = &message.product_list[0];

    match product.fields.get("FREQUENCY") {
        Some(EnvValue::Frequency(freq)) => {
            assert_eq!(freq.policy, ims_types::value::FreqPolicy::Custom);
            assert_eq!(freq.value.as_deref(), Some("HOURLY"));
        }
        other => panic!("expected FREQUENCY, got {other:?}"),
    }
    assert!(product.fields.contains_key("SUB_PRODUCT_DESC"));
}

#[test]
fn unsubscribe_command_with_a_subscr_list() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE subscription\n\
                 MSG_ID 1 ndc\n\
                 UNSUBSCRIBE\n\
                 SUBSCR_LIST 1,2,3\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    assert!(message.product_list.is_empty());
    assert_eq!(message.command_list.len(), 1);
    let command = &message.command_list[0];
    assert_eq!(command.command, ims_types::product::CommandKind::Unsubscribe);
    assert_eq!(command.fields.get("SUBSCRLIST"), Some(&EnvValue::IntList(vec![1, 2, 3])));
}

#[test]
fn illegal_character_reports_an_instrumented_lex_error() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 WAVEFORM\n\
                 # not a keyword\n\
                 STOP\n";

    let err = parse_message(text).unwrap_err();
    assert!(err.to_string().contains("illegal character"));
}

#[test]
fn radionuclide_format_is_preserved_when_valid() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE subscription\n\
                 MSG_ID 1 ndc\n\
                 ARR RMS1.0\n\
                 FREQ DAILY\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    assert_eq!(message.product_list[0].format.as_deref(), Some("RMS1.0"));
}

#[test]
fn waveform_without_sta_list_is_rejected() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 WAVEFORM IMS2.0:CM6\n\
                 TIME 2020-01-01 TO 2020-01-02\n\
                 STOP\n";

    let err = parse_message(text).unwrap_err();
    assert!(err.to_string().contains("STALIST"));
}

#[test]
fn alert_flow_without_date_is_rejected() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 ALERT_FLOW RMS2.0\n\
                 STOP\n";

    let err = parse_message(text).unwrap_err();
    assert!(err.to_string().contains("DATE"));
}

#[test]
fn channel_request_without_date_succeeds() {
    let text = "BEGIN IMS2.0\n\
                 MSG_TYPE request\n\
                 MSG_ID 1 ndc\n\
                 CHANNEL\n\
                 STOP\n";

    let message = parse_message(text).expect("message validates");
    assert_eq!(message.product_list[0].classification.as_ref().unwrap().product_type, "CHANNEL");
}

#[test]
fn arrival_accepts_beam_list_but_rejects_lat() {
    let accepted = "BEGIN IMS2.0\n\
                     MSG_TYPE request\n\
                     MSG_ID 1 ndc\n\
                     ARRIVAL\n\
                     BULL_TYPE REB\n\
                     TIME 2020-01-01 TO 2020-01-02\n\
                     BEAM_LIST BEAM1\n\
                     STOP\n";
    let message = parse_message(accepted).expect("message validates");
    assert_eq!(message.product_list[0].classification.as_ref().unwrap().product_type, "REB");

    let rejected = "BEGIN IMS2.0\n\
                     MSG_TYPE request\n\
                     MSG_ID 1 ndc\n\
                     ARRIVAL\n\
                     BULL_TYPE REB\n\
                     TIME 2020-01-01 TO 2020-01-02\n\
                     LAT -10 TO 10\n\
                     STOP\n";
    let err = parse_message(rejected).unwrap_err();
    assert!(err.to_string().contains("not supported"));
}
