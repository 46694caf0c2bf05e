// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Infrastructure
//!
//! Structured, engine-agnostic search requests over the person index.
//!
//! # Architecture
//!
//! ```text
//! user input (text, country, year | name, country, city)
//!     ↓
//! person_queries → Query AST + person_aggregations()
//!     ↓
//! SearchRequest
//!     ├─→ ElasticsearchTranslator → JSON query DSL / NDJSON bulk
//!     └─→ InMemorySearchGateway   → evaluated directly
//! ```
//!
//! # Example
//!
//! ```rust
//! use person_search_sync::search::{build_simple_query, SearchRequest, ElasticsearchTranslator};
//!
//! let query = build_simple_query("joe", Some("France"), Some("1975")).unwrap();
//! let request = SearchRequest::faceted(query, 0, 10);
//! let body = ElasticsearchTranslator::search_body(&request);
//! assert!(body["query"]["bool"]["filter"].is_array());
//! ```

mod query_builder;
mod person_queries;
mod aggregations;
mod request;
mod es_translator;

pub use query_builder::{
    BoolQuery, BoostedField, Fuzziness, MatchQuery, MultiMatchQuery, Query, QueryBuilder, QueryNode,
    RangeBound, RangeQuery, TermQuery,
};
pub use person_queries::{
    build_advanced_query, build_simple_query, parse_year_filter, QueryError, DECADE_SPAN,
    FIELD_CHILDREN, FIELD_CITY_NGRAM, FIELD_COUNTRY_KEYWORD, FIELD_COUNTRY_NGRAM,
    FIELD_DATE_OF_BIRTH, FIELD_GENDER_NGRAM, FIELD_NAME, FIELD_NAME_NGRAM,
};
pub use aggregations::{
    person_aggregations, Aggregation, AggregationKind, AggregationResult, Aggregations, Bucket,
    HistogramInterval, AGG_AVG_CHILDREN, AGG_BY_COUNTRY, AGG_BY_YEAR, DECADE_INTERVAL_DAYS,
    HISTOGRAM_MAX_YEAR, HISTOGRAM_MIN_YEAR,
};
pub use request::SearchRequest;
pub use es_translator::ElasticsearchTranslator;
