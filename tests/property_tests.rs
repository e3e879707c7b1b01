/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use experian_mcp::models::{normalize_ssn, ReducedCreditResult};
use experian_mcp::redaction::mask_ssn;
use experian_mcp::reducer::{format_date_of_birth, parse_score, reduce_report};
use proptest::prelude::*;
use serde_json::{json, Value};

fn report_with(score: Value, factors: &[(String, String)], name: (&str, &str, &str)) -> Value {
    json!({
        "creditProfile": [{
            "consumerIdentity": {
                "dob": {"month": "02", "day": "29", "year": "1984"},
                "name": [{"firstName": name.0, "middleName": name.1, "surname": name.2}]
            },
            "headerRecord": [{"y2kReportedDate": "01022026"}],
            "riskModel": [{
                "score": score,
                "modelIndicator": "V4",
                "evaluation": "P",
                "scoreFactors": factors
                    .iter()
                    .map(|(code, importance)| json!({"code": code, "importance": importance}))
                    .collect::<Vec<_>>()
            }]
        }]
    })
}

// Property: the reducer never panics and always yields a result
proptest! {
    #[test]
    fn reducer_never_panics_on_text(raw in "\\PC*") {
        let _ = reduce_report(&Value::String(raw), "123456789");
    }

    #[test]
    fn reducer_never_panics_on_shapes(
        profile_is_array in proptest::bool::ANY,
        risk_is_array in proptest::bool::ANY,
        score in proptest::option::of("\\PC{0,6}")
    ) {
        let risk = json!({"score": score});
        let profile = json!({
            "riskModel": if risk_is_array { json!([risk]) } else { risk }
        });
        let raw = json!({
            "creditProfile": if profile_is_array { json!([profile]) } else { profile }
        });
        let result = reduce_report(&raw, "123456789");
        prop_assert_eq!(result.ssn, "123456789");
    }
}

// Property: scores parse in base 10 whether sent as padded strings or numbers
proptest! {
    #[test]
    fn score_string_matches_integer(score in 300i64..=850, width in 3usize..=6) {
        let padded = format!("{:0width$}", score, width = width);
        prop_assert_eq!(parse_score(Some(&json!(padded))), Some(score));
        prop_assert_eq!(parse_score(Some(&json!(score))), Some(score));
    }

    #[test]
    fn reduced_score_equals_vendor_score(score in 0i64..=9999) {
        let raw = report_with(json!(format!("{:04}", score)), &[], ("A", "", "B"));
        prop_assert_eq!(reduce_report(&raw, "123456789").credit_score_info.score, score);
    }
}

// Property: date of birth is the verbatim month/day/year concatenation
proptest! {
    #[test]
    fn dob_is_verbatim(month in "[0-9]{1,2}", day in "[0-9]{1,2}", year in "[0-9]{4}") {
        let formatted = format_date_of_birth(&json!({"month": &month, "day": &day, "year": &year}));
        prop_assert_eq!(formatted, format!("{}/{}/{}", month, day, year));
    }
}

// Property: reduced results survive a JSON round trip and reduce stably
proptest! {
    #[test]
    fn reduced_result_round_trips(
        score in 0i64..=999,
        factors in proptest::collection::vec(("[0-9]{2}", "[1-4]"), 0..5),
        first in "[A-Z]{1,10}",
        middle in "[A-Z]{0,1}",
        last in "[A-Z]{1,12}"
    ) {
        let raw = report_with(json!(score.to_string()), &factors, (first.as_str(), middle.as_str(), last.as_str()));
        let reduced = reduce_report(&raw, "123-45-6789");

        let text = serde_json::to_string(&reduced).unwrap();
        let parsed: ReducedCreditResult = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(&parsed, &reduced);
        prop_assert_eq!(reduce_report(&raw, "123-45-6789"), reduced.clone());
        prop_assert_eq!(reduced.credit_score_info.score_factors.len(), factors.len());
    }
}

// Property: SSN handling
proptest! {
    #[test]
    fn ssn_normalization_never_panics(input in "\\PC*") {
        let _ = normalize_ssn(&input);
        let _ = mask_ssn(&input);
    }

    #[test]
    fn formatted_and_bare_ssns_agree(area in "[0-9]{3}", group in "[0-9]{2}", serial in "[0-9]{4}") {
        let dashed = format!("{}-{}-{}", area, group, serial);
        let bare = format!("{}{}{}", area, group, serial);
        prop_assert_eq!(normalize_ssn(&dashed).unwrap(), bare.clone());
        prop_assert_eq!(normalize_ssn(&bare).unwrap(), bare);
    }

    #[test]
    fn masked_ssn_hides_leading_digits(area in "[0-9]{3}", group in "[0-9]{2}", serial in "[0-9]{4}") {
        let masked = mask_ssn(&format!("{}-{}-{}", area, group, serial));
        prop_assert_eq!(masked, format!("***-**-{}", serial));
    }
}
