//! Elasticsearch Translator
//!
//! Translates the Query AST, aggregation requests and bulk operations to the
//! Elasticsearch JSON wire format, and parses the engine's responses back.
//! A transport adapter only has to ship these bodies.
//!
//! # Query DSL
//!
//! ```text
//! MatchAll              → {"match_all": {}}
//! MultiMatch            → {"multi_match": {"query", "fields": ["name^3", ...], "fuzziness": "AUTO"}}
//! Match                 → {"match": {field: {"query", "fuzziness"}}}
//! Term                  → {"term": {field: {"value"}}}
//! Range                 → {"range": {field: {"gte", "lt"}}}
//! Bool                  → {"bool": {"must": [...], "filter": [...]}}
//! ```
//!
//! # Bulk body (NDJSON)
//!
//! ```text
//! {"index":{"_index":"person","_id":"1"}}
//! {"name":"Joe Smith",...}
//! {"delete":{"_index":"person","_id":"2"}}
//! ```

use serde_json::{json, Map, Value};

use super::aggregations::{Aggregation, AggregationKind, AggregationResult, Aggregations, Bucket, HistogramInterval};
use super::query_builder::{Query, QueryNode, RangeBound};
use super::request::SearchRequest;
use crate::gateway::{BulkItemOutcome, BulkOperation, BulkResponse, SearchHit, SearchResponse};

/// Elasticsearch request/response translator
pub struct ElasticsearchTranslator;

impl ElasticsearchTranslator {
    /// Translate a Query AST to the query DSL
    pub fn translate(query: &Query) -> Value {
        Self::translate_node(&query.root)
    }

    fn translate_node(node: &QueryNode) -> Value {
        match node {
            QueryNode::MatchAll => json!({"match_all": {}}),
            QueryNode::MultiMatch(mm) => {
                let fields: Vec<String> = mm.fields.iter().map(|f| f.to_field_spec()).collect();
                json!({
                    "multi_match": {
                        "query": mm.text,
                        "fields": fields,
                        "fuzziness": mm.fuzziness.as_param(),
                    }
                })
            }
            QueryNode::Match(m) => json!({
                "match": {
                    m.field.clone(): {
                        "query": m.text,
                        "fuzziness": m.fuzziness.as_param(),
                    }
                }
            }),
            QueryNode::Term(t) => json!({
                "term": { t.field.clone(): { "value": t.value } }
            }),
            QueryNode::Range(r) => {
                let mut bounds = Map::new();
                if let Some(gte) = r.gte {
                    bounds.insert("gte".into(), Self::bound_value(gte));
                }
                if let Some(lt) = r.lt {
                    bounds.insert("lt".into(), Self::bound_value(lt));
                }
                json!({ "range": { r.field.clone(): bounds } })
            }
            QueryNode::Bool(b) => {
                let mut clauses = Map::new();
                if !b.must.is_empty() {
                    clauses.insert(
                        "must".into(),
                        Value::Array(b.must.iter().map(Self::translate_node).collect()),
                    );
                }
                if !b.filter.is_empty() {
                    clauses.insert(
                        "filter".into(),
                        Value::Array(b.filter.iter().map(Self::translate_node).collect()),
                    );
                }
                json!({ "bool": clauses })
            }
        }
    }

    fn bound_value(bound: RangeBound) -> Value {
        match bound {
            // Date fields accept a bare year as date math
            RangeBound::Year(year) => Value::String(year.to_string()),
            RangeBound::Number(n) => json!(n),
        }
    }

    /// Translate aggregation requests to the `aggs` object
    pub fn aggregations(aggs: &[Aggregation]) -> Value {
        let mut out = Map::new();
        for agg in aggs {
            out.insert(agg.name.clone(), Self::aggregation(agg));
        }
        Value::Object(out)
    }

    fn aggregation(agg: &Aggregation) -> Value {
        let mut body = Map::new();
        let (kind, params) = match &agg.kind {
            AggregationKind::Terms { field, size } => ("terms", json!({"field": field, "size": size})),
            AggregationKind::DateHistogram { field, interval, min_year, max_year, format } => {
                let mut params = json!({
                    "field": field,
                    "extended_bounds": {
                        "min": min_year.to_string(),
                        "max": max_year.to_string(),
                    },
                    "format": format,
                });
                match interval {
                    HistogramInterval::FixedDays(days) => {
                        params["fixed_interval"] = json!(format!("{}d", days));
                    }
                    HistogramInterval::CalendarYear => {
                        params["calendar_interval"] = json!("year");
                    }
                }
                ("date_histogram", params)
            }
            AggregationKind::Avg { field } => ("avg", json!({"field": field})),
        };
        body.insert(kind.into(), params);
        if !agg.sub_aggregations.is_empty() {
            body.insert("aggs".into(), Self::aggregations(&agg.sub_aggregations));
        }
        Value::Object(body)
    }

    /// Full `_search` request body
    pub fn search_body(request: &SearchRequest) -> Value {
        let mut body = json!({
            "query": Self::translate(&request.query),
            "from": request.from,
            "size": request.size,
        });
        if request.track_total_hits {
            body["track_total_hits"] = json!(true);
        }
        if !request.aggregations.is_empty() {
            body["aggs"] = Self::aggregations(&request.aggregations);
        }
        body
    }

    /// NDJSON `_bulk` body. Every line, including the last, ends with `\n`.
    pub fn bulk_body(index: &str, operations: &[BulkOperation]) -> Result<String, serde_json::Error> {
        let mut body = String::new();
        for op in operations {
            let header = json!({ op.action(): { "_index": index, "_id": op.id() } });
            body.push_str(&serde_json::to_string(&header)?);
            body.push('\n');
            if let BulkOperation::Index { document, .. } = op {
                body.push_str(&serde_json::to_string(document)?);
                body.push('\n');
            }
        }
        Ok(body)
    }

    /// Parse a `_search` response
    pub fn parse_search_response(value: &Value) -> Result<SearchResponse, serde_json::Error> {
        let hits_node = &value["hits"];
        let total = match &hits_node["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            other => other["value"].as_u64().unwrap_or(0),
        };

        let mut hits = Vec::new();
        if let Some(raw_hits) = hits_node["hits"].as_array() {
            for raw in raw_hits {
                hits.push(SearchHit {
                    id: raw["_id"].as_str().unwrap_or_default().to_string(),
                    score: raw["_score"].as_f64().unwrap_or(0.0) as f32,
                    source: serde_json::from_value(raw["_source"].clone())?,
                });
            }
        }

        let aggregations = value["aggregations"]
            .as_object()
            .map(Self::parse_aggregations)
            .unwrap_or_default();

        Ok(SearchResponse { total, hits, aggregations })
    }

    fn parse_aggregations(node: &Map<String, Value>) -> Aggregations {
        let mut out = Aggregations::new();
        for (name, agg) in node {
            if let Some(buckets) = agg["buckets"].as_array() {
                let buckets = buckets.iter().map(Self::parse_bucket).collect();
                out.insert(name.clone(), AggregationResult::Buckets { buckets });
            } else if agg.get("value").is_some() {
                out.insert(name.clone(), AggregationResult::Value { value: agg["value"].as_f64() });
            }
        }
        out
    }

    fn parse_bucket(raw: &Value) -> Bucket {
        let key = raw["key_as_string"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| match &raw["key"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        let sub = raw
            .as_object()
            .map(|obj| {
                let nested: Map<String, Value> = obj
                    .iter()
                    .filter(|(k, v)| v.is_object() && !k.starts_with("key"))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Self::parse_aggregations(&nested)
            })
            .unwrap_or_default();
        Bucket {
            key,
            doc_count: raw["doc_count"].as_u64().unwrap_or(0),
            sub,
        }
    }

    /// Parse a `_bulk` response into per-item outcomes
    pub fn parse_bulk_response(value: &Value) -> BulkResponse {
        let items = value["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let (action, result) = item.as_object()?.iter().next()?;
                        let action = match action.as_str() {
                            "delete" => "delete",
                            _ => "index",
                        };
                        let error = result.get("error").filter(|e| !e.is_null()).map(|e| {
                            e["reason"].as_str().map(str::to_string).unwrap_or_else(|| e.to_string())
                        });
                        Some(BulkItemOutcome {
                            id: result["_id"].as_str().unwrap_or_default().to_string(),
                            action,
                            error,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        BulkResponse { items }
    }
}
