//! Canonical pretty-printing for a validated message: one section per
//! product, a "Product Classification" block followed by a "Product
//! Constraints" block, dates rendered as `{START: …, END: …}`.

use std::fmt;

use ims_types::message::ValidatedMessage;
use ims_types::product::{CommandDict, ProductDict};
use ims_types::value::{Bound, EnvValue, Loc, Sentinel};

/// Wraps a [`ValidatedMessage`] for [`fmt::Display`]; the message itself
/// carries no rendering logic, matching the reference split between data
/// and presentation.
pub struct Pretty<'a>(pub &'a ValidatedMessage);

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.0;
        writeln!(f, "MSG_ID: {}", message.msg_info.id)?;
        writeln!(f, "MSG_TYPE: {:?}", message.msg_info.msg_type)?;
        for (i, product) in message.product_list.iter().enumerate() {
            writeln!(f, "Product {}:", i + 1)?;
            fmt_product(f, product)?;
        }
        for (i, command) in message.command_list.iter().enumerate() {
            writeln!(f, "Command {}:", i + 1)?;
            fmt_command(f, command)?;
        }
        if let Some(errors) = &message.error_messages {
            writeln!(f, "Advisories:")?;
            for e in errors {
                writeln!(f, "  {e}")?;
            }
        }
        Ok(())
    }
}

fn fmt_product(f: &mut fmt::Formatter<'_>, product: &ProductDict) -> fmt::Result {
    writeln!(f, "  Product Classification")?;
    match &product.classification {
        Some(c) => {
            writeln!(f, "    TECHNOLOGY_FAMILY: {:?}", c.technology_family)?;
            writeln!(f, "    TECHNOLOGY_TYPE: {}", c.technology_type)?;
            writeln!(f, "    PRODUCT_FAMILY: {:?}", c.product_family)?;
            writeln!(f, "    PRODUCT_TYPE: {}", c.product_type)?;
            if let Some(filter) = &c.filter {
                writeln!(f, "    FILTER: {filter}")?;
            }
        }
        None => writeln!(f, "    (unclassified)")?,
    }
    if let Some(format) = &product.format {
        writeln!(f, "    FORMAT: {format}")?;
    }
    if let Some(subformat) = &product.subformat {
        writeln!(f, "    SUBFORMAT: {subformat}")?;
    }

    writeln!(f, "  Product Constraints")?;
    if product.fields.is_empty() {
        writeln!(f, "    (none)")?;
    }
    for (key, value) in &product.fields {
        writeln!(f, "    {key}: {}", fmt_value(value))?;
    }
    Ok(())
}

fn fmt_command(f: &mut fmt::Formatter<'_>, command: &CommandDict) -> fmt::Result {
    writeln!(f, "  COMMAND: {:?}", command.command)?;
    for (key, value) in &command.fields {
        writeln!(f, "  {key}: {}", fmt_value(value))?;
    }
    Ok(())
}

fn fmt_value(value: &EnvValue) -> String {
    match value {
        EnvValue::Number(n) => n.to_string(),
        EnvValue::NumberRange(r) => format!("{{START: {}, END: {}}}", fmt_bound(&r.start), fmt_bound(&r.end)),
        EnvValue::RawDateRange(r) => format!("{{START: {}, END: {}}}", fmt_bound_str(&r.start), fmt_bound_str(&r.end)),
        EnvValue::DateRange(r) => format!(
            "{{START: {}, END: {}}}",
            r.start.value().map(|d| d.to_rfc3339()).unwrap_or_default(),
            r.end.value().map(|d| d.to_rfc3339()).unwrap_or_default()
        ),
        EnvValue::Id(s) => s.clone(),
        EnvValue::List(items) => items.join(","),
        EnvValue::IntList(items) => items.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
        EnvValue::Bool(b) => b.to_string(),
        EnvValue::Loc(Loc::Geo { lat, lon }) => {
            format!(
                "{{LAT: {{START: {}, END: {}}}, LON: {{START: {}, END: {}}}}}",
                fmt_bound(&lat.start),
                fmt_bound(&lat.end),
                fmt_bound(&lon.start),
                fmt_bound(&lon.end)
            )
        }
        EnvValue::Loc(Loc::StaList { stations }) => stations.join(","),
        EnvValue::Frequency(freq) => match &freq.value {
            Some(v) => format!("{:?}({v})", freq.policy),
            None => format!("{:?}", freq.policy),
        },
        EnvValue::Raw(s) => s.clone(),
    }
}

fn fmt_bound(bound: &Bound<f64>) -> String {
    match bound {
        Bound::Sentinel(Sentinel::Min) => "MIN".to_string(),
        Bound::Sentinel(Sentinel::Max) => "MAX".to_string(),
        Bound::Value(v) => v.to_string(),
    }
}

fn fmt_bound_str(bound: &Bound<String>) -> String {
    match bound {
        Bound::Sentinel(Sentinel::Min) => "MIN".to_string(),
        Bound::Sentinel(Sentinel::Max) => "MAX".to_string(),
        Bound::Value(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ims_types::msg::{MsgInfo, MsgType};

    #[test]
    fn renders_classification_and_constraints() {
        let mut info = MsgInfo {
            language: MsgInfo::LANGUAGE.to_string(),
            format: "ims2.0".to_string(),
            msg_type: MsgType::Request,
            id: "1".to_string(),
            source: None,
            ref_id: None,
            prod_id: None,
            application: None,
        };
        info.id = "1".to_string();
        let mut message = ValidatedMessage::new(info);
        let mut product = ProductDict::new("WAVEFORM");
        product.type_ = None;
        product.format = Some("IMS2.0".to_string());
        product.classification = Some(ims_types::product::Classification {
            technology_family: ims_types::product::TechnologyFamily::Shi,
            technology_type: "UNKNOWN".to_string(),
            product_family: ims_types::product::ProductFamily::Data,
            product_type: "WAVEFORM".to_string(),
            filter: None,
        });
        message.product_list.push(product);

        let rendered = Pretty(&message).to_string();
        assert!(rendered.contains("Product Classification"));
        assert!(rendered.contains("Product Constraints"));
        assert!(rendered.contains("PRODUCT_TYPE: WAVEFORM"));
    }
}
