//! The semantic validator: the rule engine that turns a parsed, still-raw
//! [`ProductDict`]/[`CommandDict`] worklist into a validated one.
//!
//! Each environment variable left on a product's [`ProductDict::worklist`] is
//! claimed by exactly one [`EnvRule`], looked up by field name in
//! [`env_rule`]. A rule validates its field(s), rewrites the value into its
//! final typed shape, and removes its name(s) from the worklist. A product's
//! `TYPE`/`SUBTYPE`/`FORMAT`/`SUBFORMAT` are claimed up front by a
//! [`ProductRule`], one per product family, which fills in [`Classification`]
//! in their place. Whatever is left on the worklist once the required and
//! optional rules for that product have run is a keyword the product does
//! not support.

use ims_types::error::{Error, SemanticError};
use ims_types::message::ValidatedMessage;
use ims_types::msg::MsgType;
use ims_types::product::{Classification, CommandDict, CommandKind, ProductDict, ProductFamily, TechnologyFamily};
use ims_types::value::{Bound, EnvValue, Loc, Range, Sentinel};

use crate::parser::resolve_date_range;

/// National Event Bulletin variables the reference grammar still accepts but
/// no longer acts on; stripped from every product before any other rule
/// runs, with an advisory recorded rather than an error raised.
const IGNORED_ENV: &[(&str, &str)] = &[
    ("DEPTHCONF", "DEPTH_CONF"),
    ("DEPTHKVALUE", "DEPTH_KVALUE"),
    ("DEPTHTHRESH", "DEPTH_THRESH"),
    ("HYDROCPTHRESH", "HYDRO_CP_THRESH"),
    ("HYDROTETHRESH", "HYDRO_TE_THRESH"),
    ("LOCCONF", "LOC_CONF"),
    ("MAGPREFMB", "MAGPREF_MB"),
    ("MAGPREFMS", "MAGPREF_MS"),
    ("MBERR", "MB_ERR"),
    ("MBMSCONF", "MBMS_CONF"),
    ("MBMSSLOPE", "MBMS_SLOPE"),
    ("MBMSTHRESH", "MBMS_THRESH"),
    ("MINDPSNRPP", "MIN_DP_SNR_PP"),
    ("MINDPSNRSP", "MIN_DP_SNR_SP"),
    ("MINMB", "MIN_MB"),
    ("MINMOUVEOUTPP", "MIN_MOUVEOUT_PP"),
    ("MINMOUVEOUTSP", "MIN_MOUVEOUT_SP"),
    ("MINNDEF", "MIN_NDEF"),
    ("MINNDPPP", "MIN_NDP_PP"),
    ("MINNDPSP", "MIN_NDP_SP"),
    ("MINNSTAMS", "MIN_NSTA_MS"),
    ("MINWDEPTHTHRESH", "MIN_WDEPTH_THRESH"),
    ("MSERR", "MS_ERR"),
    ("REGCONF", "REG_CONF"),
];

const SHI_FORMATS: &[&str] = &["IMS1.0", "IMS2.0", "GSE2.0"];
const FILTERED_FORMATS: &[&str] = &["IMS2.0", "GSE2.0"];
const RAD_FORMATS: &[&str] = &["RMS1.0", "RMS2.0", "GSE2.0"];
const TEST_FORMATS: &[&str] = &["IMS1.0", "IMS2.0", "GSE2.0"];
const WAVEFORM_SUBFORMATS: &[&str] = &["CM6", "CM7", "INT", "CSF"];
const BULLETIN_SUBFORMATS: &[&str] = &["SHORT", "LONG"];

const BULL_TYPES: &[&str] = &[
    "SEL1", "SEL2", "SEL3", "REB", "LEB", "SEB", "SSEB", "NEB", "NSEB", "IDC_SEL1", "IDC_SEL2", "IDC_SEL3", "IDC_REB",
    "IDC_LEB", "IDC_SEB", "IDC_SSEB", "IDC_NEB", "IDC_NSEB",
];

const RAD_DATA: &[&str] = &["BLANKPHD", "CALIBPHD", "DETBKPHD", "GASBKPHD", "QCPHD", "SPHDP", "SPHDF"];
const RAD_BULLETIN: &[&str] = &["ARR", "RRR", "RLR", "RNPS", "SSREB", "MET", "RMSSOH"];
const RAD_ALERT: &[&str] = &["ALERTFLOW", "ALERTSYSTEM", "ALERTTEMP", "ALERTUPS"];

const SIMPLE_WAVEFORM_PRODUCTS: &[&str] = &[
    "CHANNEL", "COMMENT", "NETWORK", "STATION", "EXECSUM", "OUTAGE", "RESPONSE", "STASTATUS", "CHANSTATUS",
    "WAVEMISSION", "WAVEQUALITY", "COMMSTATUS", "DETECTION",
];
const RAD_PRODUCTS: &[&str] = &[
    "DETBKPHD", "GASBKPHD", "BLANKPHD", "CALIBPHD", "QCPHD", "SPHDP", "SPHDF", "RLR", "ARR", "RRR", "ALERTFLOW",
    "ALERTSYSTEM", "ALERTTEMP", "ALERTUPS", "MET", "RNPS", "SSREB", "RMSSOH", "ARMR", "FPEB", "HELP",
];

/// The fields a product type requires and accepts, keyed on `TYPE`. Mirrors
/// the reference `REQUIRED_REQUEST_ENV_VAR`/`REQUIRED_SUBSCRIPTION_ENV_VAR`/
/// `OPTIONAL_ENV_VAR` tables one product type at a time: nothing here is
/// derived by family membership, since the reference tables aren't either
/// (e.g. `ARRIVAL` and `SLSD` take `BEAMLIST`/`CHANLIST`/`STALIST` but never
/// `LAT`/`LON`/`MAG`/`DEPTH`, while `BULLETIN`/`EVENT`/`ORIGIN` take the
/// reverse and never take `BEAMLIST`/`CHANLIST`).
struct EnvRequirements {
    /// Required on every product of this type, request or subscription.
    base: &'static [&'static str],
    /// Whether a request (as opposed to a subscription) also requires DATE.
    date_on_request: bool,
    /// Accepted but not required.
    optional: &'static [&'static str],
}

fn env_requirements(type_name: &str) -> Option<EnvRequirements> {
    let (base, date_on_request, optional): (&'static [&'static str], bool, &'static [&'static str]) = match type_name {
        "ARRIVAL" | "SLSD" => (&["BULLTYPE"], true, &["ARRIVALLIST", "BEAMLIST", "CHANLIST", "STALIST", "TIMESTAMP"]),
        "WAVEFORM" => (&["STALIST"], true, &["AUXLIST", "BEAMLIST", "CHANLIST", "RELATIVETO", "TIMESTAMP"]),
        "CHANNEL" => (&[], false, &["AUXLIST", "CHANLIST", "LAT", "LON", "STALIST", "TIMESTAMP"]),
        "CHANSTATUS" => (&[], true, &["AUXLIST", "CHANLIST", "STALIST", "TIMESTAMP"]),
        // WAVEMISSION/WAVEQUALITY have no reference-table entry; modeled on the
        // rest of the status-report family (CHANSTATUS/STASTATUS/COMMSTATUS).
        "WAVEMISSION" | "WAVEQUALITY" => (&[], true, &["AUXLIST", "CHANLIST", "STALIST", "TIMESTAMP"]),
        "COMMENT" => (&[], false, &["ARRIVALLIST", "EVENTLIST", "ORIGINLIST", "STALIST", "DATE", "TIMESTAMP"]),
        "COMMSTATUS" => (&[], true, &["COMMLIST", "TIMESTAMP"]),
        "EVENT" => (
            &["BULLTYPE"],
            true,
            &[
                "DEPTH",
                "DEPTHMINUSERROR",
                "EVENTLIST",
                "EVENTSTADIST",
                "GROUPBULLLIST",
                "LAT",
                "LON",
                "MAG",
                "MAGTYPE",
                "MBMINUSMS",
                "STALIST",
                "TIMESTAMP",
            ],
        ),
        "BULLETIN" => (
            &["BULLTYPE"],
            true,
            &[
                "ARRIVALLIST",
                "DEPTH",
                "DEPTHMINUSERROR",
                "EVENTLIST",
                "EVENTSTADIST",
                "GROUPBULLLIST",
                "LAT",
                "LON",
                "MAG",
                "MAGTYPE",
                "MBMINUSMS",
                "ORIGINLIST",
                "STALIST",
                "TIMESTAMP",
            ],
        ),
        "EXECSUM" => (
            &[],
            true,
            &[
                "DEPTH",
                "DEPTHMINUSERROR",
                "EVENTLIST",
                "EVENTSTADIST",
                "LAT",
                "LON",
                "MAG",
                "MAGTYPE",
                "ORIGINLIST",
                "STALIST",
                "TIMESTAMP",
            ],
        ),
        "NETWORK" => (&[], false, &["STALIST", "TIMESTAMP"]),
        "ORIGIN" => (
            &["BULLTYPE"],
            true,
            &[
                "DEPTH",
                "DEPTHMINUSERROR",
                "EVENTSTADIST",
                "LAT",
                "LON",
                "MAG",
                "MAGTYPE",
                "MBMINUSMS",
                "ORIGINLIST",
                "STALIST",
                "TIMESTAMP",
            ],
        ),
        "OUTAGE" => (&[], true, &["AUXLIST", "CHANLIST", "STALIST", "TIMESTAMP"]),
        "RESPONSE" => (&[], false, &["AUXLIST", "CHANLIST", "STALIST", "DATE", "TIMESTAMP"]),
        "STATION" => (&[], false, &["LAT", "LON", "STALIST", "TIMESTAMP"]),
        "STASTATUS" => (&[], true, &["AUXLIST", "STALIST", "TIMESTAMP"]),
        "DETECTION" => (&[], true, &["STALIST", "LAT", "LON", "TIMESTAMP"]),
        // Radionuclide family: DATE required on a request, STALIST/TIMESTAMP optional throughout.
        "ARR" | "RRR" | "RLR" | "SSREB" | "ALERTFLOW" | "ALERTSYSTEM" | "ALERTTEMP" | "ALERTUPS" | "BLANKPHD"
        | "CALIBPHD" | "DETBKPHD" | "GASBKPHD" | "QCPHD" | "SPHDP" | "SPHDF" | "MET" | "RMSSOH" | "RNPS" => {
            (&[], true, &["STALIST", "TIMESTAMP"])
        }
        // ARMR/FPEB/HELP have no reference-table entry; modeled on the rest of the radionuclide family.
        "ARMR" | "FPEB" => (&[], true, &["STALIST", "TIMESTAMP"]),
        "HELP" => (&[], false, &["STALIST", "TIMESTAMP"]),
        "TESTPRODUCT" => (&[], false, &[]),
        _ => return None,
    };
    Some(EnvRequirements { base, date_on_request, optional })
}

/// Validates every product and command in `message`, in place, returning the
/// validated message or the first [`SemanticError`] raised. A request's
/// products are held to the request's required-field table; a
/// subscription's are held to the looser, frequency-bearing one.
pub fn validate(mut message: ValidatedMessage) -> Result<ValidatedMessage, Error> {
    let is_subscription = matches!(message.msg_info.msg_type, MsgType::Subscription);
    let mut advisories = Vec::new();

    let mut validated = Vec::with_capacity(message.product_list.len());
    for product in message.product_list.drain(..) {
        let (product, product_advisories) = validate_product(product, is_subscription)?;
        for advisory in &product_advisories {
            log::warn!("{advisory}");
        }
        advisories.extend(product_advisories);
        validated.push(product);
    }
    message.product_list = validated;

    for command in message.command_list.iter_mut() {
        validate_command(command)?;
    }

    message.error_messages = if advisories.is_empty() { None } else { Some(advisories) };
    Ok(message)
}

fn validate_product(mut product: ProductDict, is_subscription: bool) -> Result<(ProductDict, Vec<String>), Error> {
    log::debug!("validating product {product:?}");
    let original = product.clone();
    let advisories = strip_ignored(&mut product);

    let type_name = product
        .type_
        .clone()
        .ok_or_else(|| Error::from(SemanticError::new("a product is missing its TYPE")))?;

    let rule = product_rule(&type_name)
        .ok_or_else(|| Error::from(SemanticError::new(format!("\"{type_name}\" is not a recognized product type"))))?;
    rule.apply(&mut product)?;

    let mut worklist = product.worklist();

    for env in required_env(&type_name, is_subscription) {
        if !worklist.iter().any(|w| w == env) {
            return Err(Error::from(SemanticError::new(format!(
                "product {type_name} is missing required environment variable {env}"
            ))));
        }
        dispatch(env, &mut worklist, &mut product, &original)?;
    }

    let optional = optional_env(&type_name, is_subscription);
    for env in worklist.clone() {
        if !worklist.iter().any(|w| w == &env) {
            // Already consumed by a sibling rule (e.g. LAT pulled in LON).
            continue;
        }
        if !optional.iter().any(|o| o == &env) {
            return Err(Error::from(SemanticError::new(format!(
                "keyword {env} is not supported by product {type_name}"
            ))));
        }
        dispatch(&env, &mut worklist, &mut product, &original)?;
    }

    if let Some(leftover) = worklist.first() {
        return Err(Error::from(SemanticError::new(format!(
            "keyword {leftover} is not supported by product {type_name}"
        ))));
    }

    Ok((product, advisories))
}

fn dispatch(env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, original: &ProductDict) -> Result<(), Error> {
    let rule = env_rule(env).unwrap_or_else(|| panic!("no rule registered for required/optional field {env}"));
    rule.check(env, worklist, product, original).map_err(Error::from)
}

fn strip_ignored(product: &mut ProductDict) -> Vec<String> {
    let mut hit = Vec::new();
    for (key, display) in IGNORED_ENV {
        if product.fields.shift_remove(*key).is_some() {
            hit.push(*display);
        }
    }
    if hit.is_empty() {
        Vec::new()
    } else {
        vec![format!(
            "Ignore the following National Event Bulletin Env variables : {}.",
            hit.join(", ")
        )]
    }
}

/// A subscription product requires `FREQUENCY` and `SUB_PRODUCT_DESC` in
/// addition to its base fields, except `TESTPRODUCT`, whose reference table
/// entry is the same bare `['TESTPRODUCT']` list for both request and
/// subscription.
fn required_env(type_name: &str, is_subscription: bool) -> Vec<&'static str> {
    let Some(reqs) = env_requirements(type_name) else {
        return Vec::new();
    };
    let mut required = reqs.base.to_vec();
    if is_subscription {
        if type_name != "TESTPRODUCT" {
            required.push("FREQUENCY");
            required.push("SUB_PRODUCT_DESC");
        }
    } else if reqs.date_on_request {
        required.push("DATE");
    }
    required
}

fn optional_env(type_name: &str, is_subscription: bool) -> Vec<&'static str> {
    let mut optional = match env_requirements(type_name) {
        Some(reqs) => reqs.optional.to_vec(),
        None => Vec::new(),
    };
    if is_subscription {
        optional.push("SUBSCRNAME");
    }
    optional
}

// ---------------------------------------------------------------------
// Product rules: consume TYPE/SUBTYPE/FORMAT/SUBFORMAT, write Classification
// ---------------------------------------------------------------------

trait ProductRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error>;
}

fn product_rule(type_name: &str) -> Option<&'static dyn ProductRule> {
    match type_name {
        "WAVEFORM" => Some(&WaveformRule),
        "BULLETIN" => Some(&BulletinRule),
        "ARRIVAL" | "SLSD" | "ORIGIN" | "EVENT" => Some(&FilteredWaveformRule),
        t if SIMPLE_WAVEFORM_PRODUCTS.contains(&t) => Some(&SimpleWaveformProductRule),
        t if RAD_PRODUCTS.contains(&t) => Some(&RadionuclideProductRule),
        "TESTPRODUCT" => Some(&TestProductRule),
        _ => None,
    }
}

fn resolve_format(format: &Option<String>, allowed: &[&str], default: &str) -> Result<String, SemanticError> {
    match format {
        None => Ok(default.to_string()),
        Some(f) => allowed
            .iter()
            .find(|a| a.eq_ignore_ascii_case(f))
            .map(|a| a.to_string())
            .ok_or_else(|| SemanticError::new(format!("\"{f}\" is not a recognized format"))),
    }
}

fn peek_bull_type(product: &ProductDict) -> Result<String, SemanticError> {
    match product.fields.get("BULLTYPE").and_then(EnvValue::as_id) {
        Some(s) => Ok(s.to_uppercase()),
        None => Err(SemanticError::new("product requires BULL_TYPE")),
    }
}

struct WaveformRule;
impl ProductRule for WaveformRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let format = resolve_format(&product.format, SHI_FORMATS, "IMS2.0")?;
        let subformat = resolve_format(&product.subformat, WAVEFORM_SUBFORMATS, "CM6")?;
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = Some(subformat);
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Shi,
            technology_type: "UNKNOWN".to_string(),
            product_family: ProductFamily::Data,
            product_type: "WAVEFORM".to_string(),
            filter: None,
        });
        Ok(())
    }
}

struct BulletinRule;
impl ProductRule for BulletinRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let format = resolve_format(&product.format, SHI_FORMATS, "IMS2.0")?;
        let subformat = resolve_format(&product.subformat, BULLETIN_SUBFORMATS, "SHORT")?;
        // The product type is promoted from BULL_TYPE here; BullTypeRule
        // re-validates the same value against the fixed enum and removes it
        // from the worklist once the required-field pass reaches it.
        let product_type = peek_bull_type(product)?;
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = Some(subformat);
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Shi,
            technology_type: "UNKNOWN".to_string(),
            product_family: ProductFamily::Bulletin,
            product_type,
            filter: None,
        });
        Ok(())
    }
}

struct FilteredWaveformRule;
impl ProductRule for FilteredWaveformRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let filter = product.type_.clone().expect("TYPE present for a product rule");
        let format = resolve_format(&product.format, FILTERED_FORMATS, "IMS2.0")?;
        if product.subformat.is_some() {
            return Err(Error::from(SemanticError::new(format!("{filter} does not accept a SUBFORMAT"))));
        }
        if matches!(filter.as_str(), "ARRIVAL" | "SLSD") {
            if let Some(subtype) = &product.subtype {
                let upper = subtype.to_uppercase();
                if !matches!(upper.as_str(), "AUTOMATIC" | "REVIEWED" | "GROUPED" | "ASSOCIATED" | "UNASSOCIATED") {
                    return Err(Error::from(SemanticError::new(format!(
                        "\"{upper}\" is not a recognized {filter} subtype"
                    ))));
                }
            }
        }
        let product_type = peek_bull_type(product)?;
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = None;
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Shi,
            technology_type: "UNKNOWN".to_string(),
            product_family: ProductFamily::Bulletin,
            product_type,
            filter: Some(filter),
        });
        Ok(())
    }
}

struct SimpleWaveformProductRule;
impl ProductRule for SimpleWaveformProductRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let name = product.type_.clone().expect("TYPE present for a product rule");
        let format = resolve_format(&product.format, SHI_FORMATS, "IMS2.0")?;
        if product.subformat.is_some() {
            return Err(Error::from(SemanticError::new(format!("{name} does not accept a SUBFORMAT"))));
        }
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = None;
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Shi,
            technology_type: "UNKNOWN".to_string(),
            product_family: ProductFamily::Unknown,
            product_type: name,
            filter: None,
        });
        Ok(())
    }
}

struct RadionuclideProductRule;
impl ProductRule for RadionuclideProductRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let name = product.type_.clone().expect("TYPE present for a product rule");
        // A supplied format is validated and kept; only a missing FORMAT
        // defaults to RMS2.0 (a fixed allow-list overwrite would silently
        // discard a valid RMS1.0 or GSE2.0 request).
        let format = match &product.format {
            None => "RMS2.0".to_string(),
            Some(_) => resolve_format(&product.format, RAD_FORMATS, "RMS2.0")?,
        };
        if product.subformat.is_some() {
            return Err(Error::from(SemanticError::new(format!("{name} does not accept a SUBFORMAT"))));
        }
        let family = if RAD_DATA.contains(&name.as_str()) {
            ProductFamily::Data
        } else if RAD_BULLETIN.contains(&name.as_str()) {
            ProductFamily::Bulletin
        } else if RAD_ALERT.contains(&name.as_str()) {
            ProductFamily::Alert
        } else {
            ProductFamily::Unknown
        };
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = None;
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Rad,
            technology_type: "UNKNOWN".to_string(),
            product_family: family,
            product_type: name,
            filter: None,
        });
        Ok(())
    }
}

struct TestProductRule;
impl ProductRule for TestProductRule {
    fn apply(&self, product: &mut ProductDict) -> Result<(), Error> {
        let format = resolve_format(&product.format, TEST_FORMATS, "IMS2.0")?;
        if product.subformat.is_some() {
            return Err(Error::from(SemanticError::new("TEST_PRODUCT does not accept a SUBFORMAT")));
        }
        product.type_ = None;
        product.subtype = None;
        product.format = Some(format);
        product.subformat = None;
        product.classification = Some(Classification {
            technology_family: TechnologyFamily::Test,
            technology_type: "TEST".to_string(),
            product_family: ProductFamily::Test,
            product_type: "TESTPRODUCT".to_string(),
            filter: None,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Environment-variable rules
// ---------------------------------------------------------------------

trait EnvRule {
    fn check(&self, env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, original: &ProductDict) -> Result<(), SemanticError>;
}

fn env_rule(env: &str) -> Option<&'static dyn EnvRule> {
    match env {
        "DATE" => Some(&DateRule),
        "LAT" | "LON" => Some(&LatLonRule),
        "STALIST" => Some(&StaListRule),
        "BULLTYPE" => Some(&BullTypeRule),
        "MAG" | "MAGTYPE" => Some(&MagSibblingsRule),
        "RELATIVETO" => Some(&RelativeToRule),
        "DEPTH" | "DEPTHMINUSERROR" | "MBMINUSMS" | "EVENTSTADIST" => Some(&FloatRule),
        "FREQUENCY" => Some(&FrequencyRule),
        "SUBSCRLIST" => Some(&SubscrListRule),
        "CHANLIST" | "BEAMLIST" | "AUXLIST" | "ARRIVALLIST" | "EVENTLIST" | "ORIGINLIST" | "GROUPBULLLIST" | "COMMLIST"
        | "TIMESTAMP" | "SUBSCRNAME" | "SUB_PRODUCT_DESC" => Some(&RemoveEnvRule),
        _ => None,
    }
}

fn resolve_endpoint(bound: &Bound<f64>, min: f64, max: f64, field: &str) -> Result<f64, SemanticError> {
    let value = match bound {
        Bound::Sentinel(Sentinel::Min) => min,
        Bound::Sentinel(Sentinel::Max) => max,
        Bound::Value(v) => *v,
    };
    if value < min || value > max {
        return Err(SemanticError::new(format!("{field} value {value} is out of range [{min}, {max}]")));
    }
    Ok(value)
}

fn resolve_bounds(range: &Range<f64>, min: f64, max: f64, field: &str) -> Result<Range<f64>, SemanticError> {
    let start = resolve_endpoint(&range.start, min, max, field)?;
    let end = resolve_endpoint(&range.end, min, max, field)?;
    if end < start {
        return Err(SemanticError::new(format!("{field} end must not be less than {field} start")));
    }
    Ok(Range::new(Bound::Value(start), Bound::Value(end)))
}

fn require_concrete(range: &Range<f64>, field: &str) -> Result<Range<f64>, SemanticError> {
    let start = match range.start {
        Bound::Value(v) => v,
        Bound::Sentinel(_) => return Err(SemanticError::new(format!("{field} does not support an elided endpoint"))),
    };
    let end = match range.end {
        Bound::Value(v) => v,
        Bound::Sentinel(_) => return Err(SemanticError::new(format!("{field} does not support an elided endpoint"))),
    };
    if end < start {
        return Err(SemanticError::new(format!("{field} end must not be less than {field} start")));
    }
    Ok(Range::new(Bound::Value(start), Bound::Value(end)))
}

struct DateRule;
impl EnvRule for DateRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let range = match product.fields.get("DATE") {
            Some(EnvValue::RawDateRange(r)) => r.clone(),
            _ => return Err(SemanticError::new("DATE must be a TIME range")),
        };
        let resolved = resolve_date_range(&range).map_err(|e| SemanticError::new(e.to_string()))?;
        let start = resolved.start.value().copied().expect("TIME start is never elided");
        let end = resolved.end.value().copied().expect("TIME end is never elided");
        if end < start {
            return Err(SemanticError::new("DATE end must not precede DATE start"));
        }
        product.fields.insert("DATE".to_string(), EnvValue::DateRange(resolved));
        worklist.retain(|w| w != "DATE");
        Ok(())
    }
}

struct LatLonRule;
impl EnvRule for LatLonRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        if product.fields.contains_key("STALIST") {
            return Err(SemanticError::new("cannot have sta_list and a lat or lon"));
        }
        let lat = match product.fields.get("LAT") {
            Some(EnvValue::NumberRange(r)) => r.clone(),
            _ => return Err(SemanticError::new("LAT and LON must both be present")),
        };
        let lon = match product.fields.get("LON") {
            Some(EnvValue::NumberRange(r)) => r.clone(),
            _ => return Err(SemanticError::new("LAT and LON must both be present")),
        };
        let lat = resolve_bounds(&lat, -90.0, 90.0, "LAT")?;
        let lon = resolve_bounds(&lon, -180.0, 180.0, "LON")?;
        product.fields.remove("LAT");
        product.fields.remove("LON");
        product.fields.insert("LOC".to_string(), EnvValue::Loc(Loc::Geo { lat, lon }));
        worklist.retain(|w| w != "LAT" && w != "LON");
        Ok(())
    }
}

struct StaListRule;
impl EnvRule for StaListRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        if product.fields.contains_key("LAT") || product.fields.contains_key("LON") {
            return Err(SemanticError::new("cannot have sta_list and a lat or lon"));
        }
        let stations = match product.fields.get("STALIST") {
            Some(EnvValue::List(v)) => v.clone(),
            _ => return Err(SemanticError::new("STA_LIST must be a list")),
        };
        product.fields.remove("STALIST");
        product.fields.insert("LOC".to_string(), EnvValue::Loc(Loc::StaList { stations }));
        worklist.retain(|w| w != "STALIST");
        Ok(())
    }
}

struct BullTypeRule;
impl EnvRule for BullTypeRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let value = product
            .fields
            .get("BULLTYPE")
            .and_then(EnvValue::as_id)
            .map(str::to_uppercase)
            .ok_or_else(|| SemanticError::new("BULL_TYPE is required"))?;
        if !BULL_TYPES.contains(&value.as_str()) {
            return Err(SemanticError::new(format!("\"{value}\" is not a recognized bulletin type")));
        }
        // Already promoted into the product's Classification by its
        // ProductRule; this is the final enum check before the key is gone.
        product.fields.remove("BULLTYPE");
        worklist.retain(|w| w != "BULLTYPE");
        Ok(())
    }
}

struct MagSibblingsRule;
impl EnvRule for MagSibblingsRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let mag_present = product.fields.contains_key("MAG");
        let magtype_present = product.fields.contains_key("MAGTYPE");
        if mag_present != magtype_present {
            return Err(SemanticError::new("MAG_TYPE and MAG must be present together"));
        }
        if !mag_present {
            worklist.retain(|w| w != "MAG" && w != "MAGTYPE");
            return Ok(());
        }

        let types = match product.fields.get("MAGTYPE") {
            Some(EnvValue::List(v)) => v.clone(),
            _ => return Err(SemanticError::new("MAG_TYPE must be a list")),
        };
        let mut upper_types = Vec::with_capacity(types.len());
        for t in &types {
            let upper = t.to_uppercase();
            if !matches!(upper.as_str(), "MB" | "MS" | "ML") {
                return Err(SemanticError::new(format!("\"{upper}\" is not a recognized magnitude type")));
            }
            upper_types.push(upper);
        }
        product.fields.insert("MAGTYPE".to_string(), EnvValue::List(upper_types));

        let range = match product.fields.get("MAG") {
            Some(EnvValue::NumberRange(r)) => r.clone(),
            _ => return Err(SemanticError::new("MAG must be a numeric range")),
        };
        let resolved = resolve_bounds(&range, 0.0, 12.0, "MAG")?;
        product.fields.insert("MAG".to_string(), EnvValue::NumberRange(resolved));

        worklist.retain(|w| w != "MAG" && w != "MAGTYPE");
        Ok(())
    }
}

struct RelativeToRule;
impl EnvRule for RelativeToRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let value = product
            .fields
            .get("RELATIVETO")
            .and_then(EnvValue::as_id)
            .map(str::to_uppercase)
            .ok_or_else(|| SemanticError::new("RELATIVE_TO must be an id"))?;
        if !matches!(value.as_str(), "BULLETIN" | "EVENT" | "ORIGIN") {
            return Err(SemanticError::new(format!("\"{value}\" is not a recognized RELATIVE_TO value")));
        }
        product.fields.insert("RELATIVETO".to_string(), EnvValue::Id(value));
        worklist.retain(|w| w != "RELATIVETO");
        Ok(())
    }
}

struct FloatRule;
impl EnvRule for FloatRule {
    fn check(&self, env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let bounds = match env {
            "DEPTH" | "DEPTHMINUSERROR" => Some((0.0, 4000.0)),
            "MBMINUSMS" => Some((0.0, 12.0)),
            "EVENTSTADIST" => None,
            other => unreachable!("FloatRule invoked for unexpected field {other}"),
        };
        match product.fields.get(env) {
            Some(EnvValue::NumberRange(range)) => {
                let range = range.clone();
                let resolved = match bounds {
                    Some((min, max)) => resolve_bounds(&range, min, max, env)?,
                    None => require_concrete(&range, env)?,
                };
                product.fields.insert(env.to_string(), EnvValue::NumberRange(resolved));
            }
            Some(EnvValue::Number(n)) => {
                // A scalar (non-range) numeric field: convert and write the
                // float straight back, instead of discarding the conversion.
                let n = *n;
                if let Some((min, max)) = bounds {
                    if n < min || n > max {
                        return Err(SemanticError::new(format!("{env} value {n} is out of range [{min}, {max}]")));
                    }
                }
                product.fields.insert(env.to_string(), EnvValue::Number(n));
            }
            _ => return Err(SemanticError::new(format!("{env} must be a numeric range"))),
        }
        worklist.retain(|w| w != env);
        Ok(())
    }
}

struct FrequencyRule;
impl EnvRule for FrequencyRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        match product.fields.get("FREQUENCY") {
            Some(EnvValue::Frequency(_)) => {}
            _ => return Err(SemanticError::new("FREQ is required for a subscription product")),
        }
        worklist.retain(|w| w != "FREQUENCY");
        Ok(())
    }
}

fn parse_subscr_ids(items: &[String]) -> Result<Vec<i64>, SemanticError> {
    items
        .iter()
        .map(|item| item.parse().map_err(|_| SemanticError::new(format!("\"{item}\" is not a valid subscription id"))))
        .collect()
}

struct SubscrListRule;
impl EnvRule for SubscrListRule {
    fn check(&self, _env: &str, worklist: &mut Vec<String>, product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        let items = match product.fields.get("SUBSCRLIST") {
            Some(EnvValue::List(v)) => v.clone(),
            _ => return Err(SemanticError::new("SUBSCR_LIST must be a list")),
        };
        let ints = parse_subscr_ids(&items)?;
        product.fields.insert("SUBSCRLIST".to_string(), EnvValue::IntList(ints));
        worklist.retain(|w| w != "SUBSCRLIST");
        Ok(())
    }
}

/// Every field claimed here is a presence-only field: a list/flag/id whose
/// text the parser already typed correctly, so there is nothing left to
/// validate beyond accepting it. `SUB_PRODUCT_DESC` (the reference
/// implementation's `SubProductDescRule`) is the same no-op removal.
struct RemoveEnvRule;
impl EnvRule for RemoveEnvRule {
    fn check(&self, env: &str, worklist: &mut Vec<String>, _product: &mut ProductDict, _original: &ProductDict) -> Result<(), SemanticError> {
        worklist.retain(|w| w != env);
        Ok(())
    }
}

// ---------------------------------------------------------------------
// Subscription commands
// ---------------------------------------------------------------------

/// Validates a `COMMANDLIST` entry (`SUBSCR_PROD`/`UNSUBSCRIBE`). `PRODID_LIST`
/// is forbidden even though no requirement table lists it, as a safety net:
/// it is a product-statement keyword and must never leak into a command.
fn validate_command(cmd: &mut CommandDict) -> Result<(), Error> {
    let mut worklist = cmd.worklist();

    if worklist.iter().any(|w| w == "PRODIDLIST") {
        return Err(Error::from(SemanticError::new("PRODID_LIST is not allowed on a subscription command")));
    }

    if cmd.command == CommandKind::Unsubscribe {
        let has_list = cmd.fields.contains_key("SUBSCRLIST");
        let has_name = cmd.fields.contains_key("SUBSCRNAME");
        if !has_list && !has_name {
            return Err(Error::from(SemanticError::new(
                "UNSUBSCRIBE requires either SUBSCR_LIST or SUBSCR_NAME",
            )));
        }
    }

    if let Some(EnvValue::List(items)) = cmd.fields.get("SUBSCRLIST") {
        let ints = parse_subscr_ids(items).map_err(Error::from)?;
        cmd.fields.insert("SUBSCRLIST".to_string(), EnvValue::IntList(ints));
        worklist.retain(|w| w != "SUBSCRLIST");
    }
    worklist.retain(|w| w != "SUBSCRNAME");

    if let Some(leftover) = worklist.first() {
        return Err(Error::from(SemanticError::new(format!(
            "keyword {leftover} is not supported by a subscription command"
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ims_types::product::ProductDict;

    fn product_with(type_: &str, fields: &[(&str, EnvValue)]) -> ProductDict {
        let mut p = ProductDict::new(type_);
        for (k, v) in fields {
            p.fields.insert((*k).to_string(), v.clone());
        }
        p
    }

    #[test]
    fn waveform_defaults_format_and_subformat() {
        let p = product_with(
            "WAVEFORM",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("STALIST", EnvValue::List(vec!["ABC".into()])),
            ],
        );
        let (validated, advisories) = validate_product(p, false).unwrap();
        assert!(advisories.is_empty());
        assert_eq!(validated.format.as_deref(), Some("IMS2.0"));
        assert_eq!(validated.subformat.as_deref(), Some("CM6"));
        assert_eq!(validated.classification.unwrap().product_type, "WAVEFORM");
    }

    #[test]
    fn sta_list_and_lat_conflict() {
        let p = product_with(
            "WAVEFORM",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("STALIST", EnvValue::List(vec!["ABC".into()])),
                ("LAT", EnvValue::NumberRange(Range::new(Bound::Value(1.0), Bound::Value(2.0)))),
            ],
        );
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("cannot have sta_list and a lat or lon"));
    }

    #[test]
    fn ignored_nseb_field_is_stripped_with_advisory() {
        let mut p = product_with(
            "WAVEFORM",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("STALIST", EnvValue::List(vec!["ABC".into()])),
            ],
        );
        p.fields.insert("LOCCONF".to_string(), EnvValue::Number(50.0));
        let (_, advisories) = validate_product(p, false).unwrap();
        assert_eq!(advisories, vec!["Ignore the following National Event Bulletin Env variables : LOC_CONF.".to_string()]);
    }

    #[test]
    fn radionuclide_preserves_a_valid_supplied_format() {
        let mut p = ProductDict::new("ARR");
        p.format = Some("RMS1.0".to_string());
        p.fields.insert("DATE".to_string(), EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into()))));
        let (validated, _) = validate_product(p, false).unwrap();
        assert_eq!(validated.format.as_deref(), Some("RMS1.0"));
    }

    #[test]
    fn bulletin_requires_bull_type() {
        let p = product_with(
            "BULLETIN",
            &[("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into()))))],
        );
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("BULL_TYPE"));
    }

    #[test]
    fn bulletin_promotes_bull_type_into_classification() {
        let p = product_with(
            "BULLETIN",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("BULLTYPE", EnvValue::Id("reb".into())),
            ],
        );
        let (validated, _) = validate_product(p, false).unwrap();
        let classification = validated.classification.unwrap();
        assert_eq!(classification.product_type, "REB");
        assert!(!validated.fields.contains_key("BULLTYPE"));
    }

    #[test]
    fn subscription_requires_frequency_not_date() {
        let mut p = ProductDict::new("ARR");
        p.fields.insert("FREQUENCY".to_string(), EnvValue::Frequency(ims_types::value::Frequency { policy: ims_types::value::FreqPolicy::Daily, value: None }));
        p.fields.insert("SUB_PRODUCT_DESC".to_string(), EnvValue::Raw("ARR".into()));
        let (validated, _) = validate_product(p, true).unwrap();
        assert_eq!(validated.classification.unwrap().product_family, ProductFamily::Bulletin);
    }

    #[test]
    fn subscription_without_sub_product_desc_is_rejected() {
        let mut p = ProductDict::new("ARR");
        p.fields.insert("FREQUENCY".to_string(), EnvValue::Frequency(ims_types::value::Frequency { policy: ims_types::value::FreqPolicy::Daily, value: None }));
        let err = validate_product(p, true).unwrap_err();
        assert!(err.to_string().contains("SUB_PRODUCT_DESC"));
    }

    #[test]
    fn unsubscribe_requires_a_list_or_a_name() {
        let mut cmd = CommandDict::new(CommandKind::Unsubscribe);
        let err = validate_command(&mut cmd).unwrap_err();
        assert!(err.to_string().contains("UNSUBSCRIBE requires"));
    }

    #[test]
    fn unsubscribe_converts_subscr_list_to_ints() {
        let mut cmd = CommandDict::new(CommandKind::Unsubscribe);
        cmd.fields.insert("SUBSCRLIST".to_string(), EnvValue::List(vec!["1".into(), "2".into(), "3".into()]));
        validate_command(&mut cmd).unwrap();
        assert_eq!(cmd.fields.get("SUBSCRLIST"), Some(&EnvValue::IntList(vec![1, 2, 3])));
    }

    /// `STATION` (unlike `WAVEFORM`) lists `LAT`/`LON` as optional, so it is
    /// used here to exercise `LatLonRule`'s boundary handling.
    fn station_with_latlon(lat: Range<f64>, lon: Range<f64>) -> ProductDict {
        product_with("STATION", &[("LAT", EnvValue::NumberRange(lat)), ("LON", EnvValue::NumberRange(lon))])
    }

    #[test]
    fn lat_lon_accepts_the_extreme_endpoints() {
        let p = station_with_latlon(Range::new(Bound::Value(-90.0), Bound::Value(90.0)), Range::new(Bound::Value(-180.0), Bound::Value(180.0)));
        let (validated, _) = validate_product(p, false).unwrap();
        match validated.fields.get("LOC") {
            Some(EnvValue::Loc(Loc::Geo { lat, lon })) => {
                assert_eq!(lat.start, Bound::Value(-90.0));
                assert_eq!(lon.end, Bound::Value(180.0));
            }
            other => panic!("expected LOC.GEO, got {other:?}"),
        }
    }

    #[test]
    fn lat_rejects_past_its_extreme_endpoint() {
        let p = station_with_latlon(Range::new(Bound::Value(-90.0001), Bound::Value(0.0)), Range::new(Bound::Value(0.0), Bound::Value(0.0)));
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn lon_rejects_past_its_extreme_endpoint() {
        let p = station_with_latlon(Range::new(Bound::Value(0.0), Bound::Value(0.0)), Range::new(Bound::Value(0.0), Bound::Value(180.0001)));
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn waveform_without_stalist_is_rejected() {
        let p = product_with(
            "WAVEFORM",
            &[("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into()))))],
        );
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("STALIST"));
    }

    #[test]
    fn waveform_rejects_lat_lon_even_without_stalist() {
        let p = product_with(
            "WAVEFORM",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("LAT", EnvValue::NumberRange(Range::new(Bound::Value(1.0), Bound::Value(1.0)))),
                ("LON", EnvValue::NumberRange(Range::new(Bound::Value(1.0), Bound::Value(1.0)))),
            ],
        );
        // STALIST is still required and absent here; WAVEFORM never validates
        // successfully on LAT/LON alone, since they aren't in its optional table.
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("STALIST"));
    }

    #[test]
    fn alertflow_requires_date() {
        let p = ProductDict::new("ALERTFLOW");
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("DATE"));
    }

    #[test]
    fn channel_succeeds_without_date() {
        let p = ProductDict::new("CHANNEL");
        let (validated, _) = validate_product(p, false).unwrap();
        assert_eq!(validated.classification.unwrap().product_type, "CHANNEL");
    }

    #[test]
    fn station_succeeds_without_date() {
        let p = ProductDict::new("STATION");
        let (validated, _) = validate_product(p, false).unwrap();
        assert_eq!(validated.classification.unwrap().product_type, "STATION");
    }

    #[test]
    fn arrival_accepts_beam_list() {
        let p = product_with(
            "ARRIVAL",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("BULLTYPE", EnvValue::Id("REB".into())),
                ("BEAMLIST", EnvValue::List(vec!["BEAM1".into()])),
            ],
        );
        let (validated, _) = validate_product(p, false).unwrap();
        assert_eq!(validated.classification.unwrap().product_type, "REB");
    }

    #[test]
    fn arrival_rejects_lat() {
        let p = product_with(
            "ARRIVAL",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("BULLTYPE", EnvValue::Id("REB".into())),
                ("LAT", EnvValue::NumberRange(Range::new(Bound::Value(1.0), Bound::Value(1.0)))),
            ],
        );
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("LAT"));
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn depth_accepts_its_boundary_values() {
        let p = product_with(
            "BULLETIN",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("BULLTYPE", EnvValue::Id("REB".into())),
                ("DEPTH", EnvValue::NumberRange(Range::new(Bound::Value(0.0), Bound::Value(4000.0)))),
            ],
        );
        let (validated, _) = validate_product(p, false).unwrap();
        assert_eq!(validated.fields.get("DEPTH"), Some(&EnvValue::NumberRange(Range::new(Bound::Value(0.0), Bound::Value(4000.0)))));
    }

    #[test]
    fn depth_rejects_past_its_boundary() {
        let p = product_with(
            "BULLETIN",
            &[
                ("DATE", EnvValue::RawDateRange(Range::new(Bound::Value("2020/01/01".into()), Bound::Value("2020/01/02".into())))),
                ("BULLTYPE", EnvValue::Id("REB".into())),
                ("DEPTH", EnvValue::NumberRange(Range::new(Bound::Value(-0.0001), Bound::Value(4000.0001)))),
            ],
        );
        let err = validate_product(p, false).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
