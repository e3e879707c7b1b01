//! Reduces an Experian credit-profile response to a `ReducedCreditResult`.
//!
//! Only the first element of each vendor array is read: one profile, one
//! name, one header record, one risk model. A missing or empty array is
//! treated as an empty object, so the dependent fields come out as `""` or
//! `0`. Shape problems are reported as `ReportGap`s and logged, never raised.

use serde_json::Value;
use std::fmt;

use crate::models::{ConsumerName, CreditScoreInfo, ReducedCreditResult, ScoreFactor};

/// A report section that was absent or unreadable and fell back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportGap {
    CreditProfile,
    ConsumerName,
    DateOfBirth,
    HeaderRecord,
    RiskModel,
    Score,
    SsnRecord,
}

impl fmt::Display for ReportGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self {
            ReportGap::CreditProfile => "creditProfile[0]",
            ReportGap::ConsumerName => "consumerIdentity.name[0]",
            ReportGap::DateOfBirth => "consumerIdentity.dob",
            ReportGap::HeaderRecord => "headerRecord[0]",
            ReportGap::RiskModel => "riskModel[0]",
            ReportGap::Score => "riskModel[0].score",
            ReportGap::SsnRecord => "ssn[0].number",
        };
        f.write_str(path)
    }
}

/// Reduce the raw report, logging any section that had to be defaulted.
pub fn reduce_report(raw: &Value, requested_ssn: &str) -> ReducedCreditResult {
    let (result, gaps) = reduce_report_with_gaps(raw, requested_ssn);
    for gap in &gaps {
        tracing::warn!("Credit report missing {}; using defaults", gap);
    }
    result
}

/// Reduce the raw report and return the defaulted sections alongside it.
pub fn reduce_report_with_gaps(
    raw: &Value,
    requested_ssn: &str,
) -> (ReducedCreditResult, Vec<ReportGap>) {
    let mut gaps = Vec::new();
    let empty = Value::Object(Default::default());

    let profile = first_or_gap(raw, "creditProfile", ReportGap::CreditProfile, &mut gaps)
        .unwrap_or(&empty);
    let profile_missing = gaps.contains(&ReportGap::CreditProfile);

    let identity = profile.get("consumerIdentity").unwrap_or(&empty);

    let name = first(identity, "name");
    if name.is_none() && !profile_missing {
        gaps.push(ReportGap::ConsumerName);
    }
    let name = name.unwrap_or(&empty);

    let dob = identity.get("dob").filter(|d| d.is_object());
    if dob.is_none() && !profile_missing {
        gaps.push(ReportGap::DateOfBirth);
    }
    let dob = dob.unwrap_or(&empty);

    let header = first(profile, "headerRecord");
    if header.is_none() && !profile_missing {
        gaps.push(ReportGap::HeaderRecord);
    }
    let header = header.unwrap_or(&empty);

    let credit_score_info = match first(profile, "riskModel") {
        Some(model) => {
            let score = parse_score(model.get("score"));
            if score.is_none() {
                gaps.push(ReportGap::Score);
            }
            CreditScoreInfo {
                score: score.unwrap_or(0),
                model_indicator: text(model, "modelIndicator"),
                evaluation: text(model, "evaluation"),
                score_factors: model
                    .get("scoreFactors")
                    .and_then(Value::as_array)
                    .map(|factors| {
                        factors
                            .iter()
                            .map(|factor| ScoreFactor {
                                code: text(factor, "code"),
                                importance: text(factor, "importance"),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        }
        None => {
            if !profile_missing {
                gaps.push(ReportGap::RiskModel);
            }
            CreditScoreInfo::default()
        }
    };

    let ssn = match first(profile, "ssn").and_then(|record| record.get("number")) {
        Some(number) => value_text(number),
        None => {
            if !profile_missing {
                gaps.push(ReportGap::SsnRecord);
            }
            requested_ssn.to_string()
        }
    };

    let y2k_date = text(header, "y2kReportedDate");
    let report_date = if y2k_date.is_empty() {
        text(header, "reportDate")
    } else {
        y2k_date
    };

    let result = ReducedCreditResult {
        ssn,
        consumer_name: ConsumerName {
            first_name: text(name, "firstName"),
            middle_name: text(name, "middleName"),
            last_name: text(name, "surname"),
        },
        date_of_birth: format_date_of_birth(dob),
        report_date,
        credit_score_info,
    };

    (result, gaps)
}

/// `"{month}/{day}/{year}"` with each part verbatim; missing parts stay empty.
pub fn format_date_of_birth(dob: &Value) -> String {
    format!(
        "{}/{}/{}",
        text(dob, "month"),
        text(dob, "day"),
        text(dob, "year")
    )
}

/// Parses a vendor score: `"0750"` and `750` both give 750.
pub fn parse_score(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
}

fn first_or_gap<'a>(
    value: &'a Value,
    key: &str,
    gap: ReportGap,
    gaps: &mut Vec<ReportGap>,
) -> Option<&'a Value> {
    let found = first(value, key);
    if found.is_none() {
        gaps.push(gap);
    }
    found
}

fn text(value: &Value, key: &str) -> String {
    value.get(key).map(value_text).unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Value {
        json!({
            "creditProfile": [{
                "consumerIdentity": {
                    "dob": {"day": "17", "month": "05", "year": "1955"},
                    "name": [
                        {"firstName": "JOHN", "middleName": "N", "surname": "CANN"},
                        {"firstName": "JONATHAN", "surname": "CANN"}
                    ]
                },
                "headerRecord": [{"reportDate": "010124", "y2kReportedDate": "01012024"}],
                "riskModel": [{
                    "evaluation": "P",
                    "modelIndicator": "V4",
                    "score": "0750",
                    "scoreFactors": [
                        {"code": "10", "importance": "1"},
                        {"code": "14", "importance": "2"}
                    ]
                }],
                "ssn": [{"number": "666123456"}]
            }]
        })
    }

    #[test]
    fn test_reduces_complete_report() {
        let (result, gaps) = reduce_report_with_gaps(&sample_report(), "123-45-6789");

        assert!(gaps.is_empty(), "unexpected gaps: {:?}", gaps);
        assert_eq!(result.ssn, "666123456");
        assert_eq!(result.consumer_name.first_name, "JOHN");
        assert_eq!(result.consumer_name.middle_name, "N");
        assert_eq!(result.consumer_name.last_name, "CANN");
        assert_eq!(result.date_of_birth, "05/17/1955");
        assert_eq!(result.report_date, "01012024");
        assert_eq!(result.credit_score_info.score, 750);
        assert_eq!(result.credit_score_info.model_indicator, "V4");
        assert_eq!(result.credit_score_info.evaluation, "P");
        assert_eq!(result.credit_score_info.score_factors.len(), 2);
        assert_eq!(result.credit_score_info.score_factors[1].code, "14");
    }

    #[test]
    fn test_report_date_falls_back() {
        let mut raw = sample_report();
        raw["creditProfile"][0]["headerRecord"][0]
            .as_object_mut()
            .unwrap()
            .remove("y2kReportedDate");

        let result = reduce_report(&raw, "123-45-6789");
        assert_eq!(result.report_date, "010124");
    }

    #[test]
    fn test_empty_profile_degrades() {
        let (result, gaps) = reduce_report_with_gaps(&json!({"creditProfile": []}), "123-45-6789");

        assert_eq!(gaps, vec![ReportGap::CreditProfile]);
        assert_eq!(result.ssn, "123-45-6789");
        assert_eq!(result.date_of_birth, "//");
        assert_eq!(result.credit_score_info, CreditScoreInfo::default());
    }

    #[test]
    fn test_unparsable_score_is_zero() {
        let mut raw = sample_report();
        raw["creditProfile"][0]["riskModel"][0]["score"] = json!("N/A");

        let (result, gaps) = reduce_report_with_gaps(&raw, "123-45-6789");
        assert_eq!(result.credit_score_info.score, 0);
        assert_eq!(gaps, vec![ReportGap::Score]);
        // rest of the risk model survives
        assert_eq!(result.credit_score_info.model_indicator, "V4");
    }

    #[test]
    fn test_numeric_parts_rendered() {
        let dob = json!({"month": 1, "day": 2, "year": 1980});
        assert_eq!(format_date_of_birth(&dob), "1/2/1980");
        assert_eq!(parse_score(Some(&json!(812))), Some(812));
        assert_eq!(parse_score(Some(&json!(null))), None);
        assert_eq!(parse_score(None), None);
    }

    #[test]
    fn test_non_object_input() {
        let (result, gaps) = reduce_report_with_gaps(&json!("not a report"), "000-00-0000");
        assert_eq!(gaps, vec![ReportGap::CreditProfile]);
        assert_eq!(result.ssn, "000-00-0000");
    }
}
