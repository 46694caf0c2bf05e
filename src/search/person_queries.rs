// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Person search queries.
//!
//! Pure translation of user input (free text, country/decade facets, or
//! per-field advanced search) into the [`Query`] AST. No I/O happens here.
//!
//! ```text
//! build_simple_query("joe", None, None)
//!     → multi_match(name^3, name.ngram, gender.ngram, address.city.ngram, address.country.ngram)
//!
//! build_simple_query("", Some("France"), Some("1975"))
//!     → bool { must: match_all,
//!              filter: [term address.country.keyword = France,
//!                       range dateOfBirth 1975 <= x < 1985] }
//! ```

use thiserror::Error;

use super::query_builder::{BoostedField, Fuzziness, Query, QueryBuilder, QueryNode, RangeBound};

pub const FIELD_NAME: &str = "name";
pub const FIELD_NAME_NGRAM: &str = "name.ngram";
pub const FIELD_GENDER_NGRAM: &str = "gender.ngram";
pub const FIELD_CITY_NGRAM: &str = "address.city.ngram";
pub const FIELD_COUNTRY_NGRAM: &str = "address.country.ngram";
pub const FIELD_COUNTRY_KEYWORD: &str = "address.country.keyword";
pub const FIELD_DATE_OF_BIRTH: &str = "dateOfBirth";
pub const FIELD_CHILDREN: &str = "children";

/// Width of the decade facet, in years.
pub const DECADE_SPAN: i32 = 10;

const NAME_BOOST: f32 = 3.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid filter '{value}': {reason}")]
    InvalidFilter { value: String, reason: String },
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a decade filter. Only a 4-digit year is accepted.
pub fn parse_year_filter(value: &str) -> Result<i32, QueryError> {
    let trimmed = value.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(QueryError::InvalidFilter {
            value: value.to_string(),
            reason: "expected a 4-digit year".to_string(),
        });
    }
    trimmed.parse().map_err(|_| QueryError::InvalidFilter {
        value: value.to_string(),
        reason: "year out of range".to_string(),
    })
}

/// Full-text query over every searchable field, name weighted highest.
fn full_text(text: &str) -> Query {
    Query::multi_match(
        text,
        vec![
            BoostedField::boosted(FIELD_NAME, NAME_BOOST),
            BoostedField::new(FIELD_NAME_NGRAM),
            BoostedField::new(FIELD_GENDER_NGRAM),
            BoostedField::new(FIELD_CITY_NGRAM),
            BoostedField::new(FIELD_COUNTRY_NGRAM),
        ],
        Fuzziness::Auto,
    )
}

/// Build the query behind the simple search box.
///
/// Blank `text` matches everything. Filters wrap the text query in a boolean
/// query; without filters the text query is returned unwrapped. The year
/// filter is validated before anything is built.
pub fn build_simple_query(
    text: &str,
    country: Option<&str>,
    year: Option<&str>,
) -> Result<Query, QueryError> {
    let year = non_blank(year).map(parse_year_filter).transpose()?;
    let country = non_blank(country);

    let base = if text.trim().is_empty() {
        Query::match_all()
    } else {
        full_text(text)
    };

    if country.is_none() && year.is_none() {
        return Ok(base);
    }

    let country_filter = country.map(|c| Query::term(FIELD_COUNTRY_KEYWORD, c).root);
    let decade_filter = year.map(|y| {
        Query::range(
            FIELD_DATE_OF_BIRTH,
            Some(RangeBound::Year(y)),
            Some(RangeBound::Year(y + DECADE_SPAN)),
        )
        .root
    });

    Ok(QueryBuilder::new()
        .must(base.root)
        .filter_opt(country_filter)
        .filter_opt(decade_filter)
        .build())
}

/// Build the per-field advanced search query.
///
/// Each non-blank field adds one fuzzy `must` clause on its n-gram sub-field.
/// Blank fields add no constraint. All blank matches everything.
pub fn build_advanced_query(name: Option<&str>, country: Option<&str>, city: Option<&str>) -> Query {
    let clauses: Vec<QueryNode> = [
        (FIELD_NAME_NGRAM, name),
        (FIELD_COUNTRY_NGRAM, country),
        (FIELD_CITY_NGRAM, city),
    ]
    .into_iter()
    .filter(|(_, value)| has_text(*value))
    .filter_map(|(field, value)| value.map(|v| Query::fuzzy_match(field, v).root))
    .collect();

    clauses
        .into_iter()
        .fold(QueryBuilder::new(), QueryBuilder::must)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query_builder::{BoolQuery, MatchQuery, RangeQuery, TermQuery};

    #[test]
    fn test_blank_text_is_match_all() {
        assert!(build_simple_query("", None, None).unwrap().is_match_all());
        assert!(build_simple_query("   ", None, None).unwrap().is_match_all());
    }

    #[test]
    fn test_text_builds_multi_match_over_five_fields() {
        let query = build_simple_query("joe", None, None).unwrap();
        match query.root {
            QueryNode::MultiMatch(mm) => {
                assert_eq!(mm.text, "joe");
                assert_eq!(mm.fuzziness, Fuzziness::Auto);
                let specs: Vec<String> = mm.fields.iter().map(|f| f.to_field_spec()).collect();
                assert_eq!(
                    specs,
                    vec![
                        "name^3",
                        "name.ngram",
                        "gender.ngram",
                        "address.city.ngram",
                        "address.country.ngram"
                    ]
                );
            }
            other => panic!("Expected MultiMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_country_and_decade_filters() {
        let query = build_simple_query("", Some("France"), Some("1975")).unwrap();
        assert_eq!(
            query.root,
            QueryNode::Bool(BoolQuery {
                must: vec![QueryNode::MatchAll],
                filter: vec![
                    QueryNode::Term(TermQuery {
                        field: "address.country.keyword".into(),
                        value: "France".into(),
                    }),
                    QueryNode::Range(RangeQuery {
                        field: "dateOfBirth".into(),
                        gte: Some(RangeBound::Year(1975)),
                        lt: Some(RangeBound::Year(1985)),
                    }),
                ],
            })
        );
    }

    #[test]
    fn test_single_filter_wraps_text_query() {
        let query = build_simple_query("paris", Some("France"), None).unwrap();
        match query.root {
            QueryNode::Bool(b) => {
                assert!(matches!(b.must[0], QueryNode::MultiMatch(_)));
                assert_eq!(b.filter.len(), 1);
            }
            other => panic!("Expected Bool, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = build_simple_query("joe", Some(""), Some("  ")).unwrap();
        assert!(matches!(query.root, QueryNode::MultiMatch(_)));
    }

    #[test]
    fn test_invalid_year_is_rejected() {
        for bad in ["19x5", "75", "197", "19755", "abcd", "-197"] {
            let err = build_simple_query("", None, Some(bad)).unwrap_err();
            assert!(matches!(err, QueryError::InvalidFilter { .. }), "{} accepted", bad);
        }
    }

    #[test]
    fn test_parse_year_filter() {
        assert_eq!(parse_year_filter("1940").unwrap(), 1940);
        assert_eq!(parse_year_filter(" 2000 ").unwrap(), 2000);
    }

    #[test]
    fn test_advanced_all_blank_is_match_all() {
        assert!(build_advanced_query(None, None, None).is_match_all());
        assert!(build_advanced_query(Some(""), Some(" "), None).is_match_all());
    }

    #[test]
    fn test_advanced_one_clause_per_field() {
        let query = build_advanced_query(Some("joe"), None, Some("paris"));
        match query.root {
            QueryNode::Bool(b) => {
                assert!(b.filter.is_empty());
                assert_eq!(
                    b.must,
                    vec![
                        QueryNode::Match(MatchQuery {
                            field: "name.ngram".into(),
                            text: "joe".into(),
                            fuzziness: Fuzziness::Auto,
                        }),
                        QueryNode::Match(MatchQuery {
                            field: "address.city.ngram".into(),
                            text: "paris".into(),
                            fuzziness: Fuzziness::Auto,
                        }),
                    ]
                );
            }
            other => panic!("Expected Bool, got {:?}", other),
        }
    }
}
