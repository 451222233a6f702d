use mcpgen::{Arguments, Tool, ToolResult, Toolbox, toolbox, value_to_content};

#[toolbox(name = "strings", description = "String helpers")]
impl Strings {
    #[tool(description = "Count the keys of the arguments")]
    fn count(&self) -> Tool;

    fn count_handler(
        &self,
        #[param(description = "Any object")] arguments: Arguments,
    ) -> ToolResult {
        Ok(value_to_content(arguments.len()))
    }
}

struct Strings;

fn main() {
    let result = Strings.handle_tool_call("count", Arguments::new()).unwrap();
    assert_eq!(result.len(), 1);
}
