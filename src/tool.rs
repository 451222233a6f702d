//! Tool descriptors, the content they produce, and the handlers executing them.

use std::{fmt::Display, future::Future, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::McpError;

/// Arguments a tool is called with.
pub type Arguments = Map<String, Value>;

/// Outcome of a tool call.
pub type ToolResult = Result<Vec<Content>, McpError>;

/// Description of a tool, as listed to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,

    /// JSON schema of the arguments. Tools without one accept any object.
    #[serde(default, serialize_with = "serialize_schema")]
    pub input_schema: Option<Value>,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

fn serialize_schema<S: Serializer>(
    schema: &Option<Value>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match schema {
        Some(schema) => schema.serialize(serializer),
        None => json!({ "type": "object" }).serialize(serializer),
    }
}

/// A piece of content returned by a tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: ResourceContent,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Contents of a resource embedded in a tool result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ResourceContent {
    pub fn text(text: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: Some(text.into()),
        }
    }
}

/// Render content as plain text. Content without a textual form is described instead.
pub fn content_to_string(content: &Content) -> String {
    match content {
        Content::Text { text } => text.clone(),
        Content::Image { mime_type, .. } => format!("[Image: {mime_type}]"),
        Content::Resource { resource } => match &resource.text {
            Some(text) => text.clone(),
            None => format!("[Resource: {}]", resource.uri),
        },
    }
}

/// Wrap any displayable value as a single text content.
pub fn value_to_content<T: Display>(value: T) -> Vec<Content> {
    vec![Content::text(value.to_string())]
}

type HandlerFn = dyn Fn(Arguments) -> BoxFuture<'static, ToolResult> + Send + Sync;

/// Implementation of a tool, registered alongside its descriptor.
#[derive(Clone)]
pub struct ToolHandler(Arc<HandlerFn>);

impl ToolHandler {
    /// Create a handler from an async function.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self(Arc::new(move |arguments| handler(arguments).boxed()))
    }

    /// Create a handler from a synchronous function.
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(Arguments) -> ToolResult + Send + Sync + 'static,
    {
        Self(Arc::new(move |arguments| {
            futures::future::ready(handler(arguments)).boxed()
        }))
    }

    pub async fn call(&self, arguments: Arguments) -> ToolResult {
        (self.0)(arguments).await
    }
}

impl std::fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rstest::*;

    #[rstest]
    #[case::without_schema(
        Tool::new("echo", "echoes", None),
        json!({ "name": "echo", "description": "echoes", "inputSchema": { "type": "object" } })
    )]
    #[case::with_schema(
        Tool::new("echo", "echoes", Some(json!({ "type": "object", "required": ["text"] }))),
        json!({
            "name": "echo",
            "description": "echoes",
            "inputSchema": { "type": "object", "required": ["text"] }
        })
    )]
    fn tool_serialization(#[case] tool: Tool, #[case] expected: Value) {
        assert_eq!(serde_json::to_value(tool).unwrap(), expected);
    }

    #[rstest]
    #[case::text(Content::text("hello"), json!({ "type": "text", "text": "hello" }))]
    #[case::image(
        Content::Image { data: "AAAA".to_string(), mime_type: "image/png".to_string() },
        json!({ "type": "image", "data": "AAAA", "mimeType": "image/png" })
    )]
    #[case::resource(
        Content::Resource { resource: ResourceContent::text("notes", "file:///notes") },
        json!({
            "type": "resource",
            "resource": { "uri": "file:///notes", "mimeType": "text/plain", "text": "notes" }
        })
    )]
    fn content_serialization(#[case] content: Content, #[case] expected: Value) {
        assert_eq!(serde_json::to_value(content).unwrap(), expected);
    }

    #[rstest]
    #[case::text(Content::text("hello"), "hello")]
    #[case::image(
        Content::Image { data: String::new(), mime_type: "image/png".to_string() },
        "[Image: image/png]"
    )]
    #[case::resource_text(
        Content::Resource { resource: ResourceContent::text("notes", "file:///notes") },
        "notes"
    )]
    #[case::resource_without_text(
        Content::Resource {
            resource: ResourceContent { uri: "file:///logo".to_string(), mime_type: None, text: None }
        },
        "[Resource: file:///logo]"
    )]
    fn content_as_string(#[case] content: Content, #[case] expected: &str) {
        assert_eq!(content_to_string(&content), expected);
    }

    #[test]
    fn displayable_values() {
        assert_eq!(value_to_content(42), vec![Content::text("42")]);
    }

    #[tokio::test]
    async fn async_handler() {
        let handler = ToolHandler::new(|arguments: Arguments| async move {
            Ok::<_, McpError>(value_to_content(arguments.len()))
        });

        let mut arguments = Arguments::new();
        arguments.insert("text".to_string(), json!("hi"));

        assert_eq!(
            handler.call(arguments).await.unwrap(),
            vec![Content::text("1")]
        );
    }

    #[tokio::test]
    async fn sync_handler() {
        let handler =
            ToolHandler::from_fn(|_| Err(McpError::InvalidParams("no arguments".to_string())));

        assert!(matches!(
            handler.call(Arguments::new()).await,
            Err(McpError::InvalidParams(_))
        ));
    }
}
