use serde::{Deserialize, Serialize};

use crate::{Arguments, Tool, ToolResult};

/// Name and description of a [`Toolbox`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolboxInfo {
    pub name: String,
    pub description: String,
}

impl ToolboxInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A group of tools dispatched by name. Usually implemented with
/// [`toolbox`](crate::toolbox).
pub trait Toolbox {
    fn get_toolbox_info(&self) -> ToolboxInfo;

    /// Descriptors of every tool, in declaration order.
    fn get_tools(&self) -> Vec<Tool>;

    /// Run the tool called `name`. Unknown names fail with [`McpError::tool_not_found`].
    ///
    /// [`McpError::tool_not_found`]: crate::McpError::tool_not_found
    fn handle_tool_call(&self, name: &str, arguments: Arguments) -> ToolResult;
}
