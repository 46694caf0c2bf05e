//! Aggregation requests and results for faceted display.
//!
//! Every person search carries the same aggregation set:
//!
//! ```text
//! by_country   terms(address.country.keyword)
//!   └─ by_year   date_histogram(dateOfBirth, 3653d, 1940..2009, yyyy)
//!        └─ avg_children   avg(children)
//! by_year      date_histogram(dateOfBirth, 1y, 1940..2009, yyyy)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::person_queries::{FIELD_CHILDREN, FIELD_COUNTRY_KEYWORD, FIELD_DATE_OF_BIRTH};

pub const AGG_BY_COUNTRY: &str = "by_country";
pub const AGG_BY_YEAR: &str = "by_year";
pub const AGG_AVG_CHILDREN: &str = "avg_children";

/// Lower histogram bound (year)
pub const HISTOGRAM_MIN_YEAR: i32 = 1940;
/// Upper histogram bound (year)
pub const HISTOGRAM_MAX_YEAR: i32 = 2009;
/// Roughly ten years, expressed in days
pub const DECADE_INTERVAL_DAYS: u32 = 3653;
/// Default number of terms buckets
pub const DEFAULT_TERMS_SIZE: usize = 10;

/// Named aggregation request with optional nested aggregations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub name: String,
    pub kind: AggregationKind,
    pub sub_aggregations: Vec<Aggregation>,
}

impl Aggregation {
    pub fn new(name: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sub_aggregations: Vec::new(),
        }
    }

    pub fn with_sub(mut self, sub: Aggregation) -> Self {
        self.sub_aggregations.push(sub);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregationKind {
    /// One bucket per distinct keyword value, largest first
    Terms { field: String, size: usize },
    /// Date buckets on a date field; empty buckets are emitted between the
    /// bounds (years)
    DateHistogram {
        field: String,
        interval: HistogramInterval,
        min_year: i32,
        max_year: i32,
        format: String,
    },
    /// Mean of a numeric field
    Avg { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistogramInterval {
    /// Fixed width in days, aligned on the Unix epoch
    FixedDays(u32),
    /// One bucket per calendar year
    CalendarYear,
}

fn year_histogram(name: &str, interval: HistogramInterval) -> Aggregation {
    Aggregation::new(
        name,
        AggregationKind::DateHistogram {
            field: FIELD_DATE_OF_BIRTH.to_string(),
            interval,
            min_year: HISTOGRAM_MIN_YEAR,
            max_year: HISTOGRAM_MAX_YEAR,
            format: "yyyy".to_string(),
        },
    )
}

/// The fixed aggregation set attached to every person search.
pub fn person_aggregations() -> Vec<Aggregation> {
    let avg_children = Aggregation::new(
        AGG_AVG_CHILDREN,
        AggregationKind::Avg {
            field: FIELD_CHILDREN.to_string(),
        },
    );

    let by_country = Aggregation::new(
        AGG_BY_COUNTRY,
        AggregationKind::Terms {
            field: FIELD_COUNTRY_KEYWORD.to_string(),
            size: DEFAULT_TERMS_SIZE,
        },
    )
    .with_sub(
        year_histogram(AGG_BY_YEAR, HistogramInterval::FixedDays(DECADE_INTERVAL_DAYS))
            .with_sub(avg_children),
    );

    vec![by_country, year_histogram(AGG_BY_YEAR, HistogramInterval::CalendarYear)]
}

/// Aggregation results by name.
pub type Aggregations = BTreeMap<String, AggregationResult>;

/// Result of one aggregation, shaped like the engine's JSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationResult {
    Buckets { buckets: Vec<Bucket> },
    Value { value: Option<f64> },
}

impl AggregationResult {
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        match self {
            AggregationResult::Buckets { buckets } => buckets,
            AggregationResult::Value { .. } => &[],
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            AggregationResult::Value { value } => *value,
            AggregationResult::Buckets { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    pub doc_count: u64,
    #[serde(flatten)]
    pub sub: Aggregations,
}

impl Bucket {
    /// Find a bucket by key
    pub fn find<'a>(buckets: &'a [Bucket], key: &str) -> Option<&'a Bucket> {
        buckets.iter().find(|b| b.key == key)
    }
}
