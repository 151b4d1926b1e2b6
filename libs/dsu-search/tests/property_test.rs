//! Property-based tests using QuickCheck

use dsu_search::criteria::quote;
use dsu_search::filter::normalize_connectives;
use dsu_search::{
    DocumentCompiler, FilterTranslator, Literal, PredicateCompiler, SearchCriteria,
};
use quickcheck::{QuickCheck, TestResult};
use serde_json::json;

/// Build a filter from `(field, value, is_and)` triples with the given
/// connective spellings.
fn build_filter(terms: &[(u8, i64, bool)], and: &str, or: &str) -> String {
    let mut out = String::new();
    for (i, (field, value, is_and)) in terms.iter().enumerate() {
        if i > 0 {
            out.push_str(if *is_and { and } else { or });
        }
        out.push_str(&format!("f{} == {}", field % 8, value));
    }
    out
}

/// Property: `&&`/`||` and `;`/`,` produce identical condition trees
#[test]
fn prop_connective_spellings_are_equivalent() {
    fn prop(terms: Vec<(u8, i64, bool)>) -> TestResult {
        if terms.is_empty() || terms.len() > 20 {
            return TestResult::discard();
        }
        let translator = FilterTranslator::default();
        let symbolic = translator.translate(&build_filter(&terms, " && ", " || "));
        let grammar = translator.translate(&build_filter(&terms, ";", ","));
        let keywords = translator.translate(&build_filter(&terms, " and ", " or "));
        TestResult::from_bool(symbolic.is_ok() && symbolic == grammar && grammar == keywords)
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(Vec<(u8, i64, bool)>) -> TestResult);
}

/// Property: normalization never alters quoted text
#[test]
fn prop_normalization_preserves_quoted_literals() {
    fn prop(s: String) -> TestResult {
        let quoted = quote(&s);
        let filter = format!("a == {quoted} && b == 1");
        let normalized = normalize_connectives(&filter);
        TestResult::from_bool(normalized == format!("a == {quoted} ; b == 1"))
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: quoting a string and parsing it back yields the same string
#[test]
fn prop_quoted_strings_round_trip() {
    fn prop(s: String) -> TestResult {
        if dsu_search::filter::parse_offset_timestamp(&s).is_some() {
            return TestResult::discard();
        }
        let node = match FilterTranslator::default().translate(&format!("a == {}", quote(&s))) {
            Ok(node) => node,
            Err(_) => return TestResult::failed(),
        };
        TestResult::from_bool(matches!(
            node,
            dsu_search::ConditionNode::Comparison { value: Literal::String(ref v), .. } if *v == s
        ))
    }

    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(String) -> TestResult);
}

/// Property: rendered criteria always parse and match their own owner
#[test]
fn prop_rendered_criteria_select_owner() {
    fn prop(owner: String, other: String) -> TestResult {
        if owner.is_empty() || owner == other {
            return TestResult::discard();
        }
        let criteria = SearchCriteria::new(owner.clone(), "omh", "step-count");
        let rendered = match criteria.render() {
            Ok(r) => r,
            Err(_) => return TestResult::failed(),
        };
        let predicate = match FilterTranslator::default().translate(&rendered) {
            Ok(node) => DocumentCompiler.compile(&node),
            Err(_) => return TestResult::failed(),
        };

        let doc = |user: &str| {
            json!({
                "header": {
                    "user_id": user,
                    "schema_id": { "namespace": "omh", "name": "step-count" }
                }
            })
        };
        TestResult::from_bool(predicate.matches(&doc(&owner)) && !predicate.matches(&doc(&other)))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(String, String) -> TestResult);
}
