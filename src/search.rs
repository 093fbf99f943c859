use std::time::Duration;

use serde::Serialize;

use crate::{error::Result, record::Record};

/// A query against the whole shard set, paged with `from` and `size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query string in tantivy's query syntax.
    pub query: String,
    pub size: usize,
    pub from: usize,
}

impl SearchRequest {
    pub const DEFAULT_SIZE: usize = 10;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            size: Self::DEFAULT_SIZE,
            from: 0,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }
}

/// One merged hit. `(shard, key)` identifies the stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub shard: usize,
    pub key: String,
    pub score: f32,
    pub record: Record,
}

/// Merged, ranked hits from every shard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    /// Matches across all shards, regardless of paging.
    pub total: usize,
    pub max_score: Option<f32>,
    pub hits: Vec<Hit>,
    #[serde(serialize_with = "serialize_millis", rename = "took_ms")]
    pub took: Duration,
}

fn serialize_millis<S: serde::Serializer>(
    took: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let millis = u64::try_from(took.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &SearchResults) -> String {
    if results.hits.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, hit) in results.hits.iter().enumerate() {
        let r = &hit.record;
        out.push_str(&format!(
            "{:>3}. [{:.3}] {} ({}, {}) shard {} #{}\n",
            i + 1,
            hit.score,
            r.name,
            r.city,
            r.country,
            hit.shard,
            hit.key,
        ));
    }
    out.push_str(&format!(
        "\n{} hit(s) of {} in {:?}\n",
        results.hits.len(),
        results.total,
        results.took
    ));
    out
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    results: &'a SearchResults,
}

/// Format results as a JSON document: the query followed by the
/// serialized [`SearchResults`].
pub fn format_json(results: &SearchResults, query: &str) -> Result<String> {
    Ok(serde_json::to_string(&JsonOutput { query, results })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SearchResults {
        SearchResults {
            total: 3,
            max_score: Some(1.5),
            hits: vec![Hit {
                shard: 1,
                key: "0".to_string(),
                score: 1.5,
                record: Record {
                    name: "Sofitel \"Paris\"".to_string(),
                    city: "Paris".to_string(),
                    country: "France".to_string(),
                    ..Record::default()
                },
            }],
            took: Duration::from_millis(4),
        }
    }

    #[test]
    fn request_defaults() {
        let req = SearchRequest::new("Sofitel");
        assert_eq!(req.size, 10);
        assert_eq!(req.from, 0);

        let req = req.with_size(5).with_from(20);
        assert_eq!((req.size, req.from), (5, 20));
    }

    #[test]
    fn human_output_lists_hits() {
        let out = format_human(&sample());
        assert!(out.contains("1. [1.500] Sofitel \"Paris\" (Paris, France)"));
        assert!(out.contains("1 hit(s) of 3"));
    }

    #[test]
    fn human_output_when_empty() {
        assert_eq!(format_human(&SearchResults::default()), "No results.\n");
    }

    #[test]
    fn json_output_escapes_and_nests_records() {
        let json = format_json(&sample(), "sofitel").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["query"], "sofitel");
        assert_eq!(value["total"], 3);
        assert_eq!(value["took_ms"], 4);
        assert_eq!(value["hits"][0]["shard"], 1);
        assert_eq!(value["hits"][0]["record"]["name"], "Sofitel \"Paris\"");
        assert_eq!(value["max_score"], 1.5);
        assert!(value.get("took").is_none());
    }

    #[test]
    fn json_output_of_no_hits() {
        let json = format_json(&SearchResults::default(), "marriott").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total"], 0);
        assert!(value["max_score"].is_null());
        assert_eq!(value["hits"], serde_json::json!([]));
    }
}
