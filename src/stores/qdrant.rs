//! Qdrant REST client: collection management, batched upserts, and
//! nearest-neighbor queries.
//!
//! Search responses have arrived in several shapes across Qdrant versions and
//! client layers: a wrapper object exposing a `points` list (directly or under
//! `result`), a bare list, and records that carry `payload`/`score` either at
//! the record root or nested one level under `point`. All of that
//! heterogeneity is absorbed here by a single adapter, [`normalize_results`];
//! everything downstream of this module only ever sees [`SearchResult`].

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::types::{RagError, SearchResult};

use super::{StoredPoint, VectorBackend};

/// Points written per upsert request. Purely a request-size control.
const UPSERT_BATCH_SIZE: usize = 100;

/// Point count and vector dimension of the live collection, as far as they
/// can be determined from the collection metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionInfo {
    pub points_count: Option<u64>,
    pub dimension: Option<u64>,
}

/// REST client owning one named Qdrant collection.
#[derive(Clone)]
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            collection: collection.into(),
            dimension,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Fetches point count and vector dimension for the health endpoint.
    ///
    /// Metadata shapes differ between server versions; decoding is defensive
    /// and reports `None` for whatever cannot be resolved instead of failing.
    pub async fn collection_info(&self) -> Result<CollectionInfo, RagError> {
        let response = self
            .request(self.client.get(self.collection_url()))
            .send()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::VectorStore(format!(
                "collection info request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;
        Ok(parse_collection_info(&body))
    }
}

#[async_trait::async_trait]
impl VectorBackend for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), RagError> {
        let response = self
            .request(self.client.get(self.collection_url()))
            .send()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;

        if response.status().is_success() {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(RagError::VectorStore(format!(
                "collection lookup returned {}",
                response.status()
            )));
        }

        let body = json!({
            "vectors": { "size": self.dimension, "distance": "Cosine" }
        });
        let created = self
            .request(self.client.put(self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;

        // A concurrent creator winning the race is not an error.
        if created.status().is_success() || created.status() == reqwest::StatusCode::CONFLICT {
            debug!(collection = %self.collection, dimension = self.dimension, "collection ready");
            return Ok(());
        }
        let status = created.status();
        let detail = created.text().await.unwrap_or_default();
        if detail.contains("already exists") {
            return Ok(());
        }
        Err(RagError::VectorStore(format!(
            "collection create returned {status}: {detail}"
        )))
    }

    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<(), RagError> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!("{}/points?wait=true", self.collection_url());

        // Sequential batches; a failed batch aborts the rest of the run
        // without rolling back batches already written.
        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let body = json!({
                "points": batch
                    .iter()
                    .map(|point| {
                        json!({
                            "id": point.id,
                            "vector": point.vector,
                            "payload": { "text": point.text, "source": point.source },
                        })
                    })
                    .collect::<Vec<_>>()
            });

            let response = self
                .request(self.client.put(&url))
                .json(&body)
                .send()
                .await
                .map_err(|err| RagError::VectorStore(err.to_string()))?;

            if !response.status().is_success() {
                return Err(RagError::VectorStore(format!(
                    "point upsert returned {}",
                    response.status()
                )));
            }
        }

        debug!(
            collection = %self.collection,
            points = points.len(),
            "upserted points"
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<SearchResult>, RagError> {
        let url = format!("{}/points/query", self.collection_url());
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::VectorStore(format!(
                "point query returned {}",
                response.status()
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;
        normalize_results(&parsed)
    }
}

/// Normalizes a raw search response into canonical [`SearchResult`]s.
///
/// Surviving records keep their relative order; nothing is re-sorted.
/// Malformed individual records are dropped with a warning. The only fatal
/// case is a response body that is neither a recognizable wrapper object nor
/// a list.
pub(crate) fn normalize_results(body: &Value) -> Result<Vec<SearchResult>, RagError> {
    let records = extract_records(body).ok_or_else(|| {
        RagError::VectorStore("unrecognized search response shape".to_string())
    })?;
    Ok(records.iter().filter_map(decode_record).collect())
}

/// Pulls the ordered record list out of whichever wrapper shape arrived.
fn extract_records(body: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = body.as_array() {
        return Some(list);
    }
    let object = body.as_object()?;
    if let Some(list) = object.get("points").and_then(Value::as_array) {
        return Some(list);
    }
    match object.get("result") {
        Some(Value::Array(list)) => Some(list),
        Some(result) => result.get("points").and_then(Value::as_array),
        None => None,
    }
}

/// Decodes one raw record, or drops it with a warning.
fn decode_record(raw: &Value) -> Option<SearchResult> {
    if raw.is_array() {
        warn!("skipping positional tuple record in search response");
        return None;
    }
    let Some(record) = raw.as_object() else {
        warn!(kind = value_kind(raw), "skipping non-object record in search response");
        return None;
    };

    // Payload and score live at the record root in current responses; older
    // client layers wrapped them one level down under `point`.
    let (payload, score) = if let Some(payload) = record.get("payload") {
        (payload, record.get("score"))
    } else if let Some(inner) = record.get("point").and_then(Value::as_object) {
        match inner.get("payload") {
            Some(payload) => (payload, record.get("score").or_else(|| inner.get("score"))),
            None => {
                warn!("skipping record without decodable payload");
                return None;
            }
        }
    } else {
        warn!("skipping record without decodable payload");
        return None;
    };

    let (text, source) = match payload {
        Value::Object(map) => (
            map.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            map.get("source")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Value::String(text) => (text.clone(), String::new()),
        other => {
            warn!(kind = value_kind(other), "skipping record with undecodable payload");
            return None;
        }
    };

    if text.trim().is_empty() {
        warn!("skipping record with blank payload text");
        return None;
    }

    let score = score.and_then(Value::as_f64).unwrap_or(0.0) as f32;
    Some(SearchResult {
        text,
        source,
        score,
    })
}

/// Defensive decode of collection metadata across differing server shapes.
fn parse_collection_info(body: &Value) -> CollectionInfo {
    let result = body.get("result").unwrap_or(body);

    let points_count = result
        .get("points_count")
        .and_then(Value::as_u64)
        .or_else(|| result.get("vectors_count").and_then(Value::as_u64));

    let vectors = result
        .get("config")
        .and_then(|config| config.get("params"))
        .and_then(|params| params.get("vectors"))
        .or_else(|| result.get("vectors"));

    let dimension = vectors.and_then(|vectors| match vectors {
        Value::Object(map) => map.get("size").and_then(Value::as_u64).or_else(|| {
            // Named-vector map: only an unambiguous single entry resolves.
            let mut sizes = map
                .values()
                .filter_map(|entry| entry.get("size").and_then(Value::as_u64));
            let first = sizes.next()?;
            sizes.next().is_none().then_some(first)
        }),
        Value::Number(size) => size.as_u64(),
        _ => None,
    });

    CollectionInfo {
        points_count,
        dimension,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record(text: &str, source: &str, score: f64) -> Value {
        json!({ "id": 1, "score": score, "payload": { "text": text, "source": source } })
    }

    #[test]
    fn wrapper_with_result_points_normalizes() {
        let body = json!({
            "result": { "points": [valid_record("alpha", "a.md", 0.9)] },
            "status": "ok",
        });
        let results = normalize_results(&body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "alpha");
        assert_eq!(results[0].source, "a.md");
        assert!((results[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn wrapper_with_top_level_points_normalizes() {
        let body = json!({ "points": [valid_record("alpha", "a.md", 0.5)] });
        assert_eq!(normalize_results(&body).unwrap().len(), 1);
    }

    #[test]
    fn bare_list_normalizes() {
        let body = json!([
            valid_record("first", "a.md", 0.9),
            valid_record("second", "b.md", 0.8),
        ]);
        let results = normalize_results(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "first");
        assert_eq!(results[1].text, "second");
    }

    #[test]
    fn result_holding_bare_list_normalizes() {
        let body = json!({ "result": [valid_record("alpha", "a.md", 0.4)] });
        assert_eq!(normalize_results(&body).unwrap().len(), 1);
    }

    #[test]
    fn nested_point_records_normalize() {
        let body = json!({
            "result": {
                "points": [
                    { "score": 0.7, "point": { "payload": { "text": "nested", "source": "n.md" } } },
                    { "point": { "payload": { "text": "inner score", "source": "m.md" }, "score": 0.6 } },
                ]
            }
        });
        let results = normalize_results(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].score - 0.7).abs() < 1e-6);
        assert!((results[1].score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn string_payload_becomes_text_with_empty_source() {
        let body = json!([{ "score": 0.3, "payload": "raw payload text" }]);
        let results = normalize_results(&body).unwrap();
        assert_eq!(results[0].text, "raw payload text");
        assert_eq!(results[0].source, "");
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        let body = json!([{ "payload": { "text": "scoreless", "source": "s.md" } }]);
        let results = normalize_results(&body).unwrap();
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn malformed_records_are_dropped_and_order_is_preserved() {
        let body = json!({
            "result": {
                "points": [
                    ["tuple", 0.9],
                    valid_record("one", "a.md", 0.9),
                    { "score": 0.8 },
                    valid_record("two", "b.md", 0.8),
                    { "score": 0.7, "payload": { "text": "   " } },
                    { "score": 0.6, "payload": 42 },
                    valid_record("three", "c.md", 0.6),
                    "just a string",
                    { "score": 0.5, "payload": null },
                ]
            }
        });
        let results = normalize_results(&body).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn all_malformed_records_yield_empty_result_not_error() {
        let body = json!([["t"], { "score": 1.0 }, null]);
        assert!(normalize_results(&body).unwrap().is_empty());
    }

    #[test]
    fn unrecognized_response_shape_is_fatal() {
        for body in [
            json!({ "status": "ok" }),
            json!("totally unexpected"),
            json!(42),
            json!({ "result": { "rows": [] } }),
        ] {
            let err = normalize_results(&body).unwrap_err();
            assert!(matches!(err, RagError::VectorStore(_)), "body={body}");
        }
    }

    #[test]
    fn collection_info_decodes_current_shape() {
        let body = json!({
            "result": {
                "points_count": 42,
                "config": { "params": { "vectors": { "size": 768, "distance": "Cosine" } } }
            }
        });
        let info = parse_collection_info(&body);
        assert_eq!(info.points_count, Some(42));
        assert_eq!(info.dimension, Some(768));
    }

    #[test]
    fn collection_info_decodes_flat_and_named_shapes() {
        let flat = json!({ "vectors_count": 7, "vectors": { "size": 384 } });
        let info = parse_collection_info(&flat);
        assert_eq!(info.points_count, Some(7));
        assert_eq!(info.dimension, Some(384));

        let named = json!({
            "result": {
                "points_count": 3,
                "config": { "params": { "vectors": { "default": { "size": 512 } } } }
            }
        });
        assert_eq!(parse_collection_info(&named).dimension, Some(512));
    }

    #[test]
    fn ambiguous_or_missing_dimension_reports_unknown() {
        let ambiguous = json!({
            "result": {
                "config": { "params": { "vectors": {
                    "text": { "size": 768 },
                    "image": { "size": 512 },
                } } }
            }
        });
        assert_eq!(parse_collection_info(&ambiguous).dimension, None);

        let empty = json!({ "result": {} });
        let info = parse_collection_info(&empty);
        assert_eq!(info.dimension, None);
        assert_eq!(info.points_count, None);
    }
}
