//! Property-based tests (fuzzing) for query building and person handling.
//!
//! Uses proptest to generate random/malformed inputs and verify the crate
//! never panics, only returns clean errors.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;
use serde_json::{json, Value};

use person_search_sync::search::{
    build_advanced_query, build_simple_query, parse_year_filter, ElasticsearchTranslator, Fuzziness,
    QueryNode, FIELD_NAME, HISTOGRAM_MAX_YEAR, HISTOGRAM_MIN_YEAR,
};
use person_search_sync::{Address, BulkOperation, Person, PersonGenerator};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z ]{0,12}")
}

fn address_strategy() -> impl Strategy<Value = Address> {
    (optional_text(), optional_text(), optional_text()).prop_map(|(country, countrycode, city)| {
        Address {
            country,
            countrycode,
            city,
            location: None,
        }
    })
}

/// A partial person as it would arrive in an update request
fn patch_strategy() -> impl Strategy<Value = Person> {
    (
        prop::option::of(any::<i64>()),
        optional_text(),
        optional_text(),
        prop::option::of(address_strategy()),
        prop::option::of(0u32..10),
    )
        .prop_map(|(id, name, gender, address, children)| Person {
            id,
            name,
            gender,
            date_of_birth: None,
            address,
            children,
        })
}

/// Arbitrary JSON, nested a few levels
fn arbitrary_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        ".{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn contains_name_field(node: &QueryNode) -> bool {
    match node {
        QueryNode::MultiMatch(m) => m.fields.iter().any(|f| f.name == FIELD_NAME),
        QueryNode::Bool(b) => b.must.iter().any(contains_name_field),
        _ => false,
    }
}

// =============================================================================
// Query building
// =============================================================================

proptest! {
    #[test]
    fn simple_query_never_panics(
        text in ".{0,40}",
        country in prop::option::of(".{0,20}"),
        year in prop::option::of(".{0,8}"),
    ) {
        let _ = build_simple_query(&text, country.as_deref(), year.as_deref());
    }

    #[test]
    fn non_blank_text_searches_name(text in "[a-z]{1,10}( [a-z]{1,10}){0,2}") {
        let query = build_simple_query(&text, None, None).unwrap();
        prop_assert!(contains_name_field(&query.root));
    }

    #[test]
    fn blank_input_matches_everything(spaces in " {0,5}") {
        let simple = build_simple_query(&spaces, Some(spaces.as_str()), Some(spaces.as_str())).unwrap();
        prop_assert!(simple.is_match_all());

        let advanced = build_advanced_query(Some(&spaces), None, Some(&spaces));
        prop_assert!(advanced.is_match_all());
    }

    #[test]
    fn four_digit_years_parse(year in 1000i32..=9999) {
        prop_assert_eq!(parse_year_filter(&year.to_string()).unwrap(), year);
    }

    #[test]
    fn other_year_shapes_are_rejected(value in "[0-9]{1,3}|[0-9]{5,8}|[0-9]{0,3}[a-z./-][0-9]{0,3}") {
        prop_assert!(parse_year_filter(&value).is_err());
        prop_assert!(build_simple_query("x", None, Some(&value)).is_err());
    }

    #[test]
    fn advanced_query_has_one_clause_per_field(
        name in optional_text(),
        country in optional_text(),
        city in optional_text(),
    ) {
        let filled = [&name, &country, &city]
            .iter()
            .filter(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
            .count();

        let query = build_advanced_query(name.as_deref(), country.as_deref(), city.as_deref());
        match &query.root {
            QueryNode::MatchAll => prop_assert_eq!(filled, 0),
            QueryNode::Bool(b) => {
                prop_assert_eq!(b.must.len(), filled);
                prop_assert!(b.filter.is_empty());
            }
            other => prop_assert!(false, "unexpected root {:?}", other),
        }
    }

    #[test]
    fn auto_fuzziness_is_bounded(len in 0usize..64) {
        let edits = Fuzziness::Auto.max_edits(len);
        prop_assert!(edits <= 2);
        if len <= 2 {
            prop_assert_eq!(edits, 0);
        }
    }

    #[test]
    fn translated_query_is_always_an_object(
        text in ".{0,20}",
        country in optional_text(),
        year in prop::option::of(1900i32..2100),
    ) {
        let year = year.map(|y| y.to_string());
        let query = build_simple_query(&text, country.as_deref(), year.as_deref()).unwrap();
        prop_assert!(ElasticsearchTranslator::translate(&query).is_object());
    }
}

// =============================================================================
// Person handling
// =============================================================================

proptest! {
    #[test]
    fn merge_never_changes_id(stored_id in any::<i64>(), patch in patch_strategy()) {
        let mut stored = PersonGenerator::seeded(7).person();
        stored.id = Some(stored_id);

        stored.merge_from(&patch);
        prop_assert_eq!(stored.id, Some(stored_id));
    }

    #[test]
    fn empty_patch_is_a_no_op(seed in any::<u64>()) {
        let mut stored = PersonGenerator::seeded(seed).person();
        stored.id = Some(1);
        let before = stored.clone();

        stored.merge_from(&Person::default());
        prop_assert_eq!(stored, before);
    }

    #[test]
    fn merge_applies_every_set_field(patch in patch_strategy()) {
        let mut stored = PersonGenerator::seeded(11).person();
        stored.merge_from(&patch);

        if patch.name.is_some() {
            prop_assert_eq!(&stored.name, &patch.name);
        }
        if patch.children.is_some() {
            prop_assert_eq!(stored.children, patch.children);
        }
        if let Some(city) = patch.address.as_ref().and_then(|a| a.city.clone()) {
            prop_assert_eq!(stored.address.and_then(|a| a.city), Some(city));
        }
    }

    #[test]
    fn generated_persons_fall_in_histogram_bounds(seed in any::<u64>()) {
        let mut generator = PersonGenerator::seeded(seed);
        for _ in 0..20 {
            let person = generator.person();
            let year = person.birth_year().unwrap();
            prop_assert!((HISTOGRAM_MIN_YEAR..=HISTOGRAM_MAX_YEAR).contains(&year));
            prop_assert!(person.children.unwrap() <= 5);
            prop_assert!(person.id.is_none());
        }
    }

    #[test]
    fn person_json_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = serde_json::from_slice::<Person>(&bytes);
    }

    #[test]
    fn person_from_arbitrary_json_never_panics(value in arbitrary_json()) {
        let _ = serde_json::from_value::<Person>(value);
    }

    #[test]
    fn bulk_body_has_a_line_per_header_and_document(ids in prop::collection::vec(0i64..1000, 0..20)) {
        let operations: Vec<BulkOperation> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                if i % 2 == 0 {
                    let mut person = Person::new(format!("p{id}"));
                    person.id = Some(*id);
                    BulkOperation::index(&person).unwrap()
                } else {
                    BulkOperation::delete(*id)
                }
            })
            .collect();
        let indexes = operations.iter().filter(|op| op.action() == "index").count();

        let body = ElasticsearchTranslator::bulk_body("person", &operations).unwrap();
        prop_assert_eq!(body.lines().count(), operations.len() + indexes);
        prop_assert!(body.is_empty() || body.ends_with('\n'));
    }
}

// =============================================================================
// Engine responses
// =============================================================================

proptest! {
    #[test]
    fn search_response_parsing_never_panics(value in arbitrary_json()) {
        let _ = ElasticsearchTranslator::parse_search_response(&value);
    }

    #[test]
    fn bulk_response_parsing_never_panics(value in arbitrary_json()) {
        let response = ElasticsearchTranslator::parse_bulk_response(&value);
        prop_assert!(response.failed() <= response.items.len());
    }
}
