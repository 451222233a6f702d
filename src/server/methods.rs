//! Methods a server answers, with their parameter and result types. Pass one of the markers to
//! [`Server::with_method_handler`](crate::Server::with_method_handler) to replace the built-in
//! behaviour for that method.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Arguments, Content, Resource, Tool};

use super::capabilities::{ClientCapabilities, Implementation, ServerCapabilities};

/// Revision of the protocol this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC method, identified by name.
pub trait Method {
    const NAME: &'static str;

    type Params: DeserializeOwned + Send + 'static;
    type Result: Serialize + Send + 'static;
}

pub struct Initialize;

impl Method for Initialize {
    const NAME: &'static str = "initialize";

    type Params = InitializeParams;
    type Result = InitializeResult;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

pub struct Ping;

impl Method for Ping {
    const NAME: &'static str = "ping";

    type Params = Value;
    type Result = Value;
}

pub struct ListTools;

impl Method for ListTools {
    const NAME: &'static str = "tools/list";

    type Params = ListParams;
    type Result = ListToolsResult;
}

/// Parameters of the list methods. Results are never paginated, so the cursor is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

pub struct CallTool;

impl Method for CallTool {
    const NAME: &'static str = "tools/call";

    type Params = CallToolParams;
    type Result = CallToolResult;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// A tool that ran but failed. The failure is reported as content, so the client can show it.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }
}

pub struct ListResources;

impl Method for ListResources {
    const NAME: &'static str = "resources/list";

    type Params = ListParams;
    type Result = ListResourcesResult;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}
