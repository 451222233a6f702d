use mcpgen::{Tool, server};

#[server(name = "custom")]
impl Custom {
    #[tool(description = "Does nothing")]
    fn noop() -> Tool;

    pub fn initialize_tools() -> Vec<Tool> {
        Vec::new()
    }
}

struct Custom;

fn main() {
    assert!(Custom::initialize_tools().is_empty());
}
