// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder - AST for search queries
//!
//! Provides an engine-agnostic way to describe full-text and filter queries.
//! The AST is translated to the engine's wire DSL by
//! [`ElasticsearchTranslator`](super::ElasticsearchTranslator) and evaluated
//! directly by the in-memory gateway.
//!
//! # Example
//!
//! ```rust
//! use person_search_sync::search::{Query, QueryBuilder, QueryNode, Fuzziness};
//!
//! // Fuzzy match on one field
//! let query = Query::fuzzy_match("name.ngram", "alice");
//!
//! // Boolean: scored clause plus non-scoring filters
//! let query = QueryBuilder::new()
//!     .must(QueryNode::MatchAll)
//!     .filter(Query::term("address.country.keyword", "France").root)
//!     .build();
//! assert!(matches!(query.root, QueryNode::Bool(_)));
//! ```

use serde::{Deserialize, Serialize};

/// Search query AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Root query node
    pub root: QueryNode,
}

impl Query {
    /// Create a new query from a root node
    pub fn new(root: QueryNode) -> Self {
        Self { root }
    }

    /// Match every document
    pub fn match_all() -> Self {
        Self::new(QueryNode::MatchAll)
    }

    /// Full-text match over several fields, each with an optional boost
    pub fn multi_match(text: impl Into<String>, fields: Vec<BoostedField>, fuzziness: Fuzziness) -> Self {
        Self::new(QueryNode::MultiMatch(MultiMatchQuery {
            text: text.into(),
            fields,
            fuzziness,
        }))
    }

    /// Full-text match on one field with automatic fuzziness
    pub fn fuzzy_match(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(QueryNode::Match(MatchQuery {
            field: field.into(),
            text: text.into(),
            fuzziness: Fuzziness::Auto,
        }))
    }

    /// Exact, non-analyzed value match
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(QueryNode::Term(TermQuery {
            field: field.into(),
            value: value.into(),
        }))
    }

    /// Half-open range `[gte, lt)`
    pub fn range(field: impl Into<String>, gte: Option<RangeBound>, lt: Option<RangeBound>) -> Self {
        Self::new(QueryNode::Range(RangeQuery {
            field: field.into(),
            gte,
            lt,
        }))
    }

    #[must_use]
    pub fn is_match_all(&self) -> bool {
        matches!(self.root, QueryNode::MatchAll)
    }
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// Every document, constant score
    MatchAll,
    /// Analyzed text over several fields (best field wins)
    MultiMatch(MultiMatchQuery),
    /// Analyzed text over one field
    Match(MatchQuery),
    /// Exact keyword equality
    Term(TermQuery),
    /// Numeric/date range
    Range(RangeQuery),
    /// Boolean combination: scored `must`, non-scoring `filter`
    Bool(BoolQuery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    pub text: String,
    pub fields: Vec<BoostedField>,
    pub fuzziness: Fuzziness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub field: String,
    pub text: String,
    pub fuzziness: Fuzziness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    pub field: String,
    /// Inclusive lower bound
    pub gte: Option<RangeBound>,
    /// Exclusive upper bound
    pub lt: Option<RangeBound>,
}

/// Range endpoint value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RangeBound {
    /// Calendar year on a date field (`1975` means 1975-01-01)
    Year(i32),
    /// Plain number on a numeric field
    Number(f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<QueryNode>,
    pub filter: Vec<QueryNode>,
}

/// A field name with an optional relevance multiplier (`name^3`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedField {
    pub name: String,
    pub boost: Option<f32>,
}

impl BoostedField {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), boost: None }
    }

    pub fn boosted(name: impl Into<String>, boost: f32) -> Self {
        Self { name: name.into(), boost: Some(boost) }
    }

    /// Boost applied to scores, `1.0` when unset
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.boost.unwrap_or(1.0)
    }

    /// `name` or `name^3`
    #[must_use]
    pub fn to_field_spec(&self) -> String {
        match self.boost {
            Some(boost) => format!("{}^{}", self.name, boost),
            None => self.name.clone(),
        }
    }
}

/// Allowed edit distance when matching a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fuzziness {
    /// Scales with term length: 0 edits for 1-2 chars, 1 for 3-5, 2 for 6+
    Auto,
    /// Fixed edit distance
    Edits(u8),
}

impl Fuzziness {
    /// Maximum edit distance for a term of `term_len` characters
    #[must_use]
    pub fn max_edits(&self, term_len: usize) -> u8 {
        match self {
            Fuzziness::Auto => match term_len {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
            Fuzziness::Edits(n) => *n,
        }
    }

    /// Wire representation (`"AUTO"` or the edit count)
    #[must_use]
    pub fn as_param(&self) -> String {
        match self {
            Fuzziness::Auto => "AUTO".to_string(),
            Fuzziness::Edits(n) => n.to_string(),
        }
    }
}

/// Builder for boolean queries
#[derive(Default)]
pub struct QueryBuilder {
    must: Vec<QueryNode>,
    filter: Vec<QueryNode>,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scored clause that every hit must satisfy
    pub fn must(mut self, node: QueryNode) -> Self {
        self.must.push(node);
        self
    }

    /// Add a non-scoring constraint
    pub fn filter(mut self, node: QueryNode) -> Self {
        self.filter.push(node);
        self
    }

    /// Add a non-scoring constraint when `node` is present
    pub fn filter_opt(self, node: Option<QueryNode>) -> Self {
        match node {
            Some(node) => self.filter(node),
            None => self,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty()
    }

    /// Build the boolean query. An empty builder never yields an empty
    /// boolean clause: it matches everything instead.
    pub fn build(self) -> Query {
        if self.is_empty() {
            Query::match_all()
        } else {
            Query::new(QueryNode::Bool(BoolQuery {
                must: self.must,
                filter: self.filter,
            }))
        }
    }
}
