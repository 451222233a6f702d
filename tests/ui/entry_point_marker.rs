use mcpgen::{Tool, server};

#[server(name = "marked")]
#[main]
impl Marked {
    #[tool(description = "Does nothing")]
    fn noop() -> Tool;

    fn main() {
        Self::initialize_tools();
    }
}

struct Marked;

fn main() {
    assert_eq!(Marked::initialize_tools().len(), 1);
}
