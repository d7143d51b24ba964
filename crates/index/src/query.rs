use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nearest-neighbour lookup sent to a [`VectorIndex`](crate::VectorIndex).
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    /// Query vector. Borrowed: the caller owns it for the request's lifetime.
    pub vector: &'a [f32],
    /// Maximum number of matches to return.
    pub top_k: usize,
    /// Ask the index to attach stored metadata to each match.
    pub include_metadata: bool,
}

impl<'a> QueryRequest<'a> {
    pub fn new(vector: &'a [f32], top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            include_metadata: true,
        }
    }
}

/// Result entry for a similarity query.
///
/// Entries arrive ordered by descending similarity; position is the rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier of the stored item.
    pub id: String,
    /// Similarity score as reported by the index, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Metadata stored alongside the vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Match {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: None,
            metadata: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_request_defaults_to_metadata() {
        let vector = vec![0.0f32; 4];
        let request = QueryRequest::new(&vector, 10);
        assert_eq!(request.top_k, 10);
        assert!(request.include_metadata);
        assert_eq!(request.vector.len(), 4);
    }

    #[test]
    fn match_deserializes_without_optional_fields() {
        let m: Match = serde_json::from_value(json!({ "id": "doc-1" })).unwrap();
        assert_eq!(m, Match::new("doc-1"));
    }

    #[test]
    fn match_ignores_vector_values() {
        let m: Match = serde_json::from_value(json!({
            "id": "doc-2",
            "score": 0.87,
            "values": [],
            "metadata": { "title": "Second" }
        }))
        .unwrap();

        assert_eq!(m.id, "doc-2");
        assert_eq!(m.score, Some(0.87));
        assert_eq!(m.metadata.unwrap()["title"], "Second");
    }
}
