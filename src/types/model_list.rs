use serde::{Deserialize, Serialize};

/// Response of `GET /v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Models the server can serve.
    pub data: Vec<ModelEntry>,
}

impl ModelList {
    /// The model identifiers, in server order.
    pub fn ids(&self) -> Vec<String> {
        self.data.iter().map(|entry| entry.id.clone()).collect()
    }
}

/// One entry of a [`ModelList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Identifier to use as the `model` of a request.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_list_deserialization() {
        let list: ModelList = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"id": "jan-nano", "object": "model", "owned_by": "me"},
                {"id": "qwen3:8b", "object": "model"}
            ]
        }))
        .unwrap();
        assert_eq!(list.ids(), vec!["jan-nano".to_string(), "qwen3:8b".to_string()]);
    }
}
