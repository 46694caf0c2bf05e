// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory search engine.
//!
//! Evaluates the Query AST and aggregation requests directly against stored
//! documents. Matching approximates an analyzed index:
//!
//! - `*.keyword` fields compare the raw value exactly
//! - `*.ngram` fields match a term that occurs anywhere in the value, or a
//!   token within the allowed edit distance
//! - plain text fields match whole tokens within the allowed edit distance
//!
//! Also records every bulk request and can be told to fail, which makes it
//! the gateway double for indexer and service tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use dashmap::DashMap;
use parking_lot::Mutex;

use super::traits::{
    BulkItemOutcome, BulkOperation, BulkResponse, GatewayError, SearchGateway, SearchHit,
    SearchResponse,
};
use crate::person::Person;
use crate::search::{
    Aggregation, AggregationKind, AggregationResult, Aggregations, Bucket, Fuzziness,
    HistogramInterval, QueryNode, RangeBound, SearchRequest,
};

pub struct InMemorySearchGateway {
    docs: DashMap<String, Person>,
    index_created: AtomicBool,
    available: AtomicBool,
    rejected_ids: Mutex<HashSet<String>>,
    bulk_requests: Mutex<Vec<usize>>,
    search_requests: AtomicUsize,
}

impl InMemorySearchGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            index_created: AtomicBool::new(false),
            available: AtomicBool::new(true),
            rejected_ids: Mutex::new(HashSet::new()),
            bulk_requests: Mutex::new(Vec::new()),
            search_requests: AtomicUsize::new(0),
        }
    }

    /// Number of indexed documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Indexed copy of a document
    #[must_use]
    pub fn document(&self, id: &str) -> Option<Person> {
        self.docs.get(id).map(|r| r.value().clone())
    }

    /// Simulate the engine going away (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every future bulk item for `id` fail
    pub fn reject_id(&self, id: impl Into<String>) {
        self.rejected_ids.lock().insert(id.into());
    }

    /// Operation count of every bulk request received, in arrival order
    #[must_use]
    pub fn bulk_request_sizes(&self) -> Vec<usize> {
        self.bulk_requests.lock().clone()
    }

    #[must_use]
    pub fn bulk_request_count(&self) -> usize {
        self.bulk_requests.lock().len()
    }

    #[must_use]
    pub fn search_request_count(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unavailable("connection refused".into()))
        }
    }
}

impl Default for InMemorySearchGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchGateway for InMemorySearchGateway {
    async fn ensure_index(&self) -> Result<bool, GatewayError> {
        self.check_available()?;
        Ok(!self.index_created.swap(true, Ordering::SeqCst))
    }

    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, GatewayError> {
        self.check_available()?;
        self.search_requests.fetch_add(1, Ordering::SeqCst);

        let mut matched: Vec<(f32, String, Person)> = self
            .docs
            .iter()
            .filter_map(|entry| {
                score(&request.query.root, entry.value())
                    .map(|s| (s, entry.key().clone(), entry.value().clone()))
            })
            .collect();

        // Relevance first, then id for a stable order among equal scores
        matched.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| compare_ids(&a.1, &b.1))
        });

        let docs: Vec<&Person> = matched.iter().map(|(_, _, p)| p).collect();
        let aggregations = aggregate(&request.aggregations, &docs);
        let total = matched.len() as u64;

        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(score, id, source)| SearchHit { id, score, source })
            .collect();

        Ok(SearchResponse { total, hits, aggregations })
    }

    async fn bulk_apply(&self, operations: &[BulkOperation]) -> Result<BulkResponse, GatewayError> {
        self.check_available()?;
        self.bulk_requests.lock().push(operations.len());

        let rejected = self.rejected_ids.lock().clone();
        let mut items = Vec::with_capacity(operations.len());

        for op in operations {
            let error = if rejected.contains(op.id()) {
                Some(format!("document {} rejected", op.id()))
            } else {
                match op {
                    BulkOperation::Index { id, document } => {
                        self.docs.insert(id.clone(), document.clone());
                    }
                    BulkOperation::Delete { id } => {
                        self.docs.remove(id);
                    }
                }
                None
            };
            items.push(BulkItemOutcome {
                id: op.id().to_string(),
                action: op.action(),
                error,
            });
        }

        Ok(BulkResponse { items })
    }

    async fn delete_all(&self) -> Result<(), GatewayError> {
        self.check_available()?;
        self.docs.clear();
        Ok(())
    }

    async fn count_all(&self) -> Result<u64, GatewayError> {
        self.check_available()?;
        Ok(self.docs.len() as u64)
    }
}

fn compare_ids(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Query evaluation
// ═══════════════════════════════════════════════════════════════════════════

/// Relevance score of `person` for `node`, `None` if it does not match.
fn score(node: &QueryNode, person: &Person) -> Option<f32> {
    match node {
        QueryNode::MatchAll => Some(1.0),
        QueryNode::MultiMatch(mm) => mm
            .fields
            .iter()
            .filter_map(|f| text_score(&f.name, &mm.text, mm.fuzziness, person).map(|s| s * f.weight()))
            .reduce(f32::max),
        QueryNode::Match(m) => text_score(&m.field, &m.text, m.fuzziness, person),
        QueryNode::Term(t) => (field_value(base_field(&t.field), person).as_deref() == Some(t.value.as_str()))
            .then_some(1.0),
        QueryNode::Range(r) => in_range(&r.field, r.gte, r.lt, person).then_some(1.0),
        QueryNode::Bool(b) => {
            if !b.filter.iter().all(|f| score(f, person).is_some()) {
                return None;
            }
            b.must
                .iter()
                .try_fold(0.0, |acc, clause| score(clause, person).map(|s| acc + s))
        }
    }
}

fn base_field(field: &str) -> &str {
    field
        .strip_suffix(".ngram")
        .or_else(|| field.strip_suffix(".keyword"))
        .unwrap_or(field)
}

fn field_value(path: &str, person: &Person) -> Option<String> {
    let address = person.address.as_ref();
    match path {
        "name" => person.name.clone(),
        "gender" => person.gender.clone(),
        "address.city" => address.and_then(|a| a.city.clone()),
        "address.country" => address.and_then(|a| a.country.clone()),
        "address.countrycode" => address.and_then(|a| a.countrycode.clone()),
        _ => None,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn text_score(field: &str, text: &str, fuzziness: Fuzziness, person: &Person) -> Option<f32> {
    let value = field_value(base_field(field), person)?;
    if field.ends_with(".keyword") {
        return (value == text).then_some(1.0);
    }

    let ngram = field.ends_with(".ngram");
    let lowered = value.to_lowercase();
    let tokens = tokenize(&value);

    let total: f32 = tokenize(text)
        .iter()
        .filter_map(|term| {
            if ngram && lowered.contains(term.as_str()) {
                return Some(1.0);
            }
            let max_edits = fuzziness.max_edits(term.chars().count()) as usize;
            tokens
                .iter()
                .map(|token| levenshtein(term, token))
                .filter(|d| *d <= max_edits)
                .min()
                .map(|d| 1.0 / (1.0 + d as f32))
        })
        .sum();

    (total > 0.0).then_some(total)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn year_start(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

fn in_range(field: &str, gte: Option<RangeBound>, lt: Option<RangeBound>, person: &Person) -> bool {
    if field == "dateOfBirth" {
        let Some(date) = person.date_of_birth else { return false };
        let to_date = |bound: RangeBound| match bound {
            RangeBound::Year(y) => year_start(y),
            RangeBound::Number(millis) => chrono::DateTime::from_timestamp_millis(millis as i64)
                .map(|dt| dt.date_naive()),
        };
        let lower_ok = gte.and_then(to_date).map_or(true, |lo| date >= lo);
        let upper_ok = lt.and_then(to_date).map_or(true, |hi| date < hi);
        return lower_ok && upper_ok;
    }

    let value = match field {
        "children" => person.children.map(f64::from),
        _ => None,
    };
    let Some(value) = value else { return false };
    let as_number = |bound: RangeBound| match bound {
        RangeBound::Year(y) => f64::from(y),
        RangeBound::Number(n) => n,
    };
    gte.map_or(true, |lo| value >= as_number(lo)) && lt.map_or(true, |hi| value < as_number(hi))
}

// ═══════════════════════════════════════════════════════════════════════════
// Aggregations
// ═══════════════════════════════════════════════════════════════════════════

fn aggregate(aggs: &[Aggregation], docs: &[&Person]) -> Aggregations {
    aggs.iter()
        .map(|agg| (agg.name.clone(), aggregate_one(agg, docs)))
        .collect()
}

fn aggregate_one(agg: &Aggregation, docs: &[&Person]) -> AggregationResult {
    match &agg.kind {
        AggregationKind::Terms { field, size } => {
            let mut groups: BTreeMap<String, Vec<&Person>> = BTreeMap::new();
            for doc in docs {
                if let Some(value) = field_value(base_field(field), doc) {
                    groups.entry(value).or_default().push(*doc);
                }
            }
            let mut groups: Vec<(String, Vec<&Person>)> = groups.into_iter().collect();
            // Largest bucket first, key order among ties (BTreeMap gave key order)
            groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            let buckets = groups
                .into_iter()
                .take(*size)
                .map(|(key, members)| Bucket {
                    key,
                    doc_count: members.len() as u64,
                    sub: aggregate(&agg.sub_aggregations, &members),
                })
                .collect();
            AggregationResult::Buckets { buckets }
        }
        AggregationKind::DateHistogram { interval, min_year, max_year, .. } => {
            date_histogram(agg, *interval, *min_year, *max_year, docs)
        }
        AggregationKind::Avg { field } => {
            let values: Vec<f64> = docs
                .iter()
                .filter_map(|doc| match field.as_str() {
                    "children" => doc.children.map(f64::from),
                    _ => None,
                })
                .collect();
            let value = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
            AggregationResult::Value { value }
        }
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Bucket ordinal of `date`: epoch-aligned for fixed intervals, the year
/// itself for calendar years.
fn bucket_ordinal(interval: HistogramInterval, date: NaiveDate) -> i64 {
    match interval {
        HistogramInterval::FixedDays(days) => (date - epoch()).num_days().div_euclid(i64::from(days)),
        HistogramInterval::CalendarYear => i64::from(date.year()),
    }
}

fn bucket_key(interval: HistogramInterval, ordinal: i64) -> String {
    match interval {
        HistogramInterval::FixedDays(days) => {
            let start = epoch() + Duration::days(ordinal * i64::from(days));
            start.year().to_string()
        }
        HistogramInterval::CalendarYear => ordinal.to_string(),
    }
}

fn date_histogram(
    agg: &Aggregation,
    interval: HistogramInterval,
    min_year: i32,
    max_year: i32,
    docs: &[&Person],
) -> AggregationResult {
    let mut groups: BTreeMap<i64, Vec<&Person>> = BTreeMap::new();
    for doc in docs {
        if let Some(date) = doc.date_of_birth {
            groups.entry(bucket_ordinal(interval, date)).or_default().push(*doc);
        }
    }

    // Extended bounds: empty buckets between the bounds even without data
    let bound = |year| year_start(year).map(|d| bucket_ordinal(interval, d));
    let lows = [bound(min_year), groups.keys().next().copied()];
    let highs = [bound(max_year), groups.keys().next_back().copied()];
    let (Some(first), Some(last)) = (lows.into_iter().flatten().min(), highs.into_iter().flatten().max())
    else {
        return AggregationResult::Buckets { buckets: Vec::new() };
    };

    let buckets = (first..=last)
        .map(|ordinal| {
            let members = groups.remove(&ordinal).unwrap_or_default();
            Bucket {
                key: bucket_key(interval, ordinal),
                doc_count: members.len() as u64,
                sub: aggregate(&agg.sub_aggregations, &members),
            }
        })
        .collect();
    AggregationResult::Buckets { buckets }
}
