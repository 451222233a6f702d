//! Attribute macros generating MCP server scaffolding from annotated declarations. See the
//! `mcpgen` crate for the runtime they target.

mod arguments;
mod diagnostic;
mod dispatch;
mod guard;
mod model;
mod render;
mod resolve;
mod scan;
mod synth;

use model::Tag;

/// Describe a tool. Applied to a bodyless accessor declared in an `impl` block, which is given a
/// body returning the tool's descriptor.
///
/// Arguments: `description` (required), `name` (a string literal, defaults to the accessor's
/// name) and `input_schema` (or `schema`, any value convertible into a JSON value).
///
/// ```ignore
/// impl Weather {
///     #[tool(description = "Current temperature of a city")]
///     fn temperature(&self) -> Tool;
/// }
/// ```
#[proc_macro_attribute]
pub fn tool(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::Tool, attr.into(), item.into()).into()
}

/// Describe a resource. Applied to a bodyless accessor, like [`macro@tool`].
///
/// Arguments: `uri` (required), `name` (defaults to the accessor's name), `description`,
/// `mime_type` and `metadata` (pairs of strings).
#[proc_macro_attribute]
pub fn resource(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::Resource, attr.into(), item.into()).into()
}

/// Generate a stdio server from the tools declared in an `impl` block.
///
/// Adds `setup_server`, `initialize_tools`, `register_handlers` and `main` to the block, skipping
/// any the block already declares. Tool calls are answered with a placeholder error until
/// `register_handlers` is written by hand.
///
/// Arguments: `name`, `version`, `capabilities`, `configuration` and `generate_main`. When the
/// block is also marked `#[main]`, `main` is only generated if `generate_main = true` is given.
///
/// ```ignore
/// #[server(name = "weather", version = "0.1.0")]
/// impl Weather {
///     #[tool(description = "Current temperature of a city")]
///     fn temperature() -> Tool;
/// }
/// ```
#[proc_macro_attribute]
pub fn server(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::Server, attr.into(), item.into()).into()
}

/// Implement `Toolbox` for the type of an `impl` block, dispatching each declared tool to an
/// `execute_{tool}` method. The method calls `{tool}_handler` when one is declared, and returns a
/// placeholder response otherwise.
///
/// Arguments: `name` and `description`, both string literals.
///
/// ```ignore
/// #[toolbox(name = "math", description = "Arithmetic")]
/// impl Math {
///     #[tool(description = "Add two numbers")]
///     fn add(&self) -> Tool;
///
///     fn add_handler(&self, arguments: Arguments) -> ToolResult {
///         todo!()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn toolbox(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::Toolbox, attr.into(), item.into()).into()
}

/// Describe a parameter of a tool handler. Only read by other macros, and removed by them.
///
/// Arguments: `description` (required).
#[proc_macro_attribute]
pub fn param(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::Param, attr.into(), item.into()).into()
}

/// Generate `create_server` and `start_server` next to an `impl` block, registering every
/// declared tool with its `{tool}_handler` when one exists, and implement `ServerProvider` for
/// the type so the server can be started from another crate.
///
/// Handlers and the optional `on_initialize` hook must be associated functions without `self`.
///
/// Arguments: `name` and `version` (required), `capabilities` and `configuration`.
///
/// ```ignore
/// #[global_server(name = "weather", version = "0.1.0")]
/// impl Weather {
///     #[tool(description = "Current temperature of a city")]
///     fn temperature() -> Tool;
///
///     async fn temperature_handler(arguments: Arguments) -> ToolResult {
///         todo!()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn global_server(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    dispatch::attribute(Tag::GlobalServer, attr.into(), item.into()).into()
}

/// Generate free `create_server`, `start_server` and `setup_handlers` functions. The generated
/// `setup_handlers` registers nothing, so tools are added to the created server with
/// `register_tool`.
///
/// ```ignore
/// global_server_fns!(name = "weather", version = "0.1.0");
/// ```
#[proc_macro]
pub fn global_server_fns(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    dispatch::freestanding(input.into()).into()
}
