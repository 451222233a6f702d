use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Description of a resource, as listed to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Resource {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            description: None,
            mime_type: None,
            metadata: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Attach metadata. Entries are added to any already present.
    pub fn with_metadata<K, V>(mut self, metadata: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .extend(metadata.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::json;

    #[test]
    fn minimal() {
        let resource = Resource::new("readme", "file:///readme");

        assert_eq!(
            serde_json::to_value(resource).unwrap(),
            json!({ "name": "readme", "uri": "file:///readme" })
        );
    }

    #[test]
    fn builder() {
        let resource = Resource::new("readme", "file:///readme")
            .with_description("project readme")
            .with_mime_type("text/markdown")
            .with_metadata([("owner", "docs")])
            .with_metadata([("lang", "en")]);

        assert_eq!(
            serde_json::to_value(resource).unwrap(),
            json!({
                "name": "readme",
                "uri": "file:///readme",
                "description": "project readme",
                "mimeType": "text/markdown",
                "metadata": { "lang": "en", "owner": "docs" }
            })
        );
    }
}
