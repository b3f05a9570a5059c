//! Extraction of RFM figures from free-form completion text.
//!
//! Strategies run in order and the first one that yields a result wins:
//!
//! 1. the exact single-line template requested in the prompt,
//! 2. each `Label: value` pair searched independently,
//! 3. the first three numbers anywhere in the text.
//!
//! A strategy returns `Ok(None)` when its shape does not match. A conversion
//! failure (an overflowing integer, an amount made only of separators) stops
//! the chain: the text is logged and the parse yields `None`.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use smartcrm_core::scoring::{PriorityClaim, RfmResult};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("{field} value `{raw}` is not a valid day/order count")]
    InvalidCount { field: &'static str, raw: String },
    #[error("monetary value `{raw}` is not a valid amount")]
    InvalidAmount { raw: String },
}

type Strategy = fn(&str) -> Result<Option<RfmResult>, ParseFailure>;

const STRATEGIES: &[(&str, Strategy)] =
    &[("strict", parse_strict), ("labelled", parse_labelled), ("numeric", parse_numeric)];

pub fn parse_rfm_response(text: &str) -> Option<RfmResult> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for (name, strategy) in STRATEGIES {
        match strategy(text) {
            Ok(Some(result)) => return Some(result),
            Ok(None) => continue,
            Err(failure) => {
                warn!(
                    event_name = "agent.parser.conversion_failed",
                    strategy = name,
                    error = %failure,
                    response = text,
                    "could not convert RFM response"
                );
                return None;
            }
        }
    }

    None
}

fn strict_regex() -> &'static Regex {
    static STRICT_RE: OnceLock<Regex> = OnceLock::new();
    STRICT_RE.get_or_init(|| {
        Regex::new(
            r"(?i)Recency:\s*(\d+)\s*days?,\s*Frequency:\s*(\d+)\s*orders?,\s*Monetary:\s*\$?([0-9,]+\.?\d*),\s*Priority:\s*(High|Low)",
        )
        .expect("strict RFM regex must compile")
    })
}

fn recency_regex() -> &'static Regex {
    static RECENCY_RE: OnceLock<Regex> = OnceLock::new();
    RECENCY_RE.get_or_init(|| Regex::new(r"(?i)Recency:\s*(\d+)").expect("recency regex must compile"))
}

fn frequency_regex() -> &'static Regex {
    static FREQUENCY_RE: OnceLock<Regex> = OnceLock::new();
    FREQUENCY_RE
        .get_or_init(|| Regex::new(r"(?i)Frequency:\s*(\d+)").expect("frequency regex must compile"))
}

fn monetary_regex() -> &'static Regex {
    static MONETARY_RE: OnceLock<Regex> = OnceLock::new();
    MONETARY_RE.get_or_init(|| {
        Regex::new(r"(?i)Monetary:\s*\$?([0-9,]+\.?\d*)").expect("monetary regex must compile")
    })
}

fn priority_regex() -> &'static Regex {
    static PRIORITY_RE: OnceLock<Regex> = OnceLock::new();
    PRIORITY_RE
        .get_or_init(|| Regex::new(r"(?i)Priority:\s*(High|Low)").expect("priority regex must compile"))
}

fn number_regex() -> &'static Regex {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NUMBER_RE.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("number regex must compile"))
}

fn parse_strict(text: &str) -> Result<Option<RfmResult>, ParseFailure> {
    let Some(caps) = strict_regex().captures(text) else {
        return Ok(None);
    };

    Ok(Some(RfmResult {
        recency: parse_count("recency", group(&caps, 1))?,
        frequency: parse_count("frequency", group(&caps, 2))?,
        monetary: parse_amount(group(&caps, 3))?,
        priority: PriorityClaim::parse(group(&caps, 4)),
    }))
}

fn parse_labelled(text: &str) -> Result<Option<RfmResult>, ParseFailure> {
    let recency = first_capture(recency_regex(), text);
    let frequency = first_capture(frequency_regex(), text);
    let monetary = first_capture(monetary_regex(), text);

    let (Some(recency), Some(frequency), Some(monetary)) = (recency, frequency, monetary) else {
        return Ok(None);
    };

    let priority = first_capture(priority_regex(), text)
        .map(PriorityClaim::parse)
        .unwrap_or(PriorityClaim::Unknown);

    Ok(Some(RfmResult {
        recency: parse_count("recency", recency)?,
        frequency: parse_count("frequency", frequency)?,
        monetary: parse_amount(monetary)?,
        priority,
    }))
}

fn parse_numeric(text: &str) -> Result<Option<RfmResult>, ParseFailure> {
    let cleaned = text.replace(',', "");
    let numbers: Vec<&str> = number_regex().find_iter(&cleaned).map(|m| m.as_str()).collect();

    let [recency, frequency, monetary, ..] = numbers.as_slice() else {
        return Ok(None);
    };

    let priority = if text.to_ascii_lowercase().contains("high") {
        PriorityClaim::High
    } else {
        PriorityClaim::Low
    };

    Ok(Some(RfmResult {
        recency: truncate_count("recency", recency)?,
        frequency: truncate_count("frequency", frequency)?,
        monetary: parse_amount(monetary)?,
        priority,
    }))
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map(|m| m.as_str()).unwrap_or_default()
}

fn first_capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, ParseFailure> {
    raw.parse::<u32>().map_err(|_| ParseFailure::InvalidCount { field, raw: raw.to_string() })
}

/// Counts from the numeric fallback may carry a fractional part; it is dropped.
fn truncate_count(field: &'static str, raw: &str) -> Result<u32, ParseFailure> {
    let invalid = || ParseFailure::InvalidCount { field, raw: raw.to_string() };
    let value = Decimal::from_str(raw.trim_end_matches('.')).map_err(|_| invalid())?;
    value.trunc().to_u32().ok_or_else(invalid)
}

fn parse_amount(raw: &str) -> Result<Decimal, ParseFailure> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    Decimal::from_str(cleaned).map_err(|_| ParseFailure::InvalidAmount { raw: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use smartcrm_core::scoring::{PriorityClaim, RfmResult};

    use super::{parse_numeric, parse_rfm_response, parse_strict, ParseFailure};

    fn rfm(recency: u32, frequency: u32, monetary: Decimal, priority: PriorityClaim) -> RfmResult {
        RfmResult { recency, frequency, monetary, priority }
    }

    #[test]
    fn strict_template_with_thousands_separator() {
        let parsed = parse_rfm_response(
            "Recency: 15 days, Frequency: 3 orders, Monetary: $1,500.50, Priority: High",
        );

        assert_eq!(parsed, Some(rfm(15, 3, Decimal::new(150_050, 2), PriorityClaim::High)));
    }

    #[test]
    fn strict_template_is_case_insensitive_and_singular_units() {
        let parsed = parse_rfm_response(
            "  recency: 1 day, FREQUENCY: 1 order, monetary: 89.97, priority: low  ",
        );

        assert_eq!(parsed, Some(rfm(1, 1, Decimal::new(8997, 2), PriorityClaim::Low)));
    }

    #[test]
    fn strict_template_found_inside_prose() {
        let parsed = parse_rfm_response(
            "Here is the analysis.\nRecency: 228 days, Frequency: 4 orders, Monetary: $6,326.14, Priority: Low\nThanks!",
        );

        assert_eq!(parsed, Some(rfm(228, 4, Decimal::new(632_614, 2), PriorityClaim::Low)));
    }

    #[test]
    fn labelled_fields_in_any_order_default_to_unknown_priority() {
        let parsed = parse_rfm_response("Frequency: 5\nMonetary: $200\nRecency: 40");

        assert_eq!(parsed, Some(rfm(40, 5, Decimal::new(200, 0), PriorityClaim::Unknown)));
    }

    #[test]
    fn labelled_fields_pick_up_priority_when_present() {
        let parsed = parse_rfm_response("Priority: HIGH\nRecency: 3\nFrequency: 7\nMonetary: 12,000");

        assert_eq!(parsed, Some(rfm(3, 7, Decimal::new(12_000, 0), PriorityClaim::High)));
    }

    #[test]
    fn numeric_fallback_uses_first_three_numbers() {
        let parsed =
            parse_rfm_response("values are 12, 4, 6000 roughly, this customer is high value");

        assert_eq!(parsed, Some(rfm(12, 4, Decimal::new(6000, 0), PriorityClaim::High)));
    }

    #[test]
    fn numeric_fallback_truncates_counts_and_defaults_to_low() {
        let parsed = parse_numeric("about 12.9 then 3.2 and 1,250.75 total").expect("no failure");

        assert_eq!(parsed, Some(rfm(12, 3, Decimal::new(125_075, 2), PriorityClaim::Low)));
    }

    #[test]
    fn numeric_fallback_needs_three_numbers() {
        assert_eq!(parse_rfm_response("Recency: 10 and 20"), None);
    }

    #[test]
    fn text_without_numbers_is_none() {
        assert_eq!(parse_rfm_response("no numbers here at all"), None);
        assert_eq!(parse_rfm_response("   "), None);
    }

    #[test]
    fn overflowing_count_aborts_the_parse() {
        let text = "Recency: 99999999999 days, Frequency: 3 orders, Monetary: $10, Priority: Low";

        assert!(matches!(
            parse_strict(text),
            Err(ParseFailure::InvalidCount { field: "recency", .. })
        ));
        // later strategies would otherwise accept the text
        assert_eq!(parse_rfm_response(text), None);
    }

    #[test]
    fn amount_of_only_separators_aborts_the_parse() {
        let text = "Recency: 5 days, Frequency: 3 orders, Monetary: $,,, Priority: High";

        assert!(matches!(parse_strict(text), Err(ParseFailure::InvalidAmount { .. })));
        assert_eq!(parse_rfm_response(text), None);
    }
}
