//! Declare MCP tools, resources and servers with attributes, and serve them.
//!
//! The macros ([`tool`], [`resource`], [`server`], [`global_server`], [`global_server_fns`],
//! [`toolbox`] and [`param`]) expand annotated declarations into code targeting the runtime in
//! this crate: [`Tool`] and [`Resource`] descriptors, the [`Toolbox`] and [`ServerProvider`]
//! traits, and a [`Server`] speaking JSON-RPC over a [`Transport`].

mod error;
pub mod logging;
mod provider;
mod resource;
mod server;
mod tool;
mod toolbox;
mod transport;

pub use error::{ErrorCode, McpError};
pub use mcpgen_macros::*;
pub use provider::{LocalServerProvider, ServerProvider};
pub use resource::Resource;
pub use server::{
    ClientCapabilities, Configuration, Implementation, JSONRPC_VERSION, LoggingCapability,
    PromptsCapability, Request, ResourcesCapability, Response, Server, ServerCapabilities,
    ServerInner, ToolsCapability, methods,
};
pub use tool::{
    Arguments, Content, ResourceContent, Tool, ToolHandler, ToolResult, content_to_string,
    value_to_content,
};
pub use toolbox::{Toolbox, ToolboxInfo};
pub use transport::{ChannelTransport, LocalTransport, StdioTransport, Transport};

/// Used by generated code.
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
    pub use tokio;
    pub use tracing;
}
