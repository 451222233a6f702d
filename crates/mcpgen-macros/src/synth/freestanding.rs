use syn::{Item, parse_quote};

use crate::{arguments::ArgumentSchema, diagnostic::Diagnostic, model::Annotation};

use super::{Expansion, Form, Host, SynthesizedDeclaration, builder::FnBuilder, peers::new_server};

/// Free functions building and starting a server, for use outside of any type.
pub fn functions(annotation: &Annotation) -> Result<Expansion, Diagnostic> {
    let arguments = ArgumentSchema::global_server(true).resolve(annotation)?;

    let create_server = FnBuilder::new("create_server")
        .public()
        .output(parse_quote!(::mcpgen::Server))
        .stmt(new_server(&arguments)?)
        .stmt(parse_quote!(setup_handlers(&server);))
        .tail(parse_quote!(server))
        .build_free();

    let start_server = FnBuilder::new("start_server")
        .public()
        .asynchronous()
        .generics(parse_quote!(<McpTransport: ::mcpgen::Transport + 'static>))
        .input(parse_quote!(transport: McpTransport))
        .output(parse_quote!(
            ::core::result::Result<::mcpgen::Server, ::mcpgen::McpError>
        ))
        .stmt(parse_quote!(let server = create_server();))
        .stmt(parse_quote!(server.start(transport).await?;))
        .tail(parse_quote!(::core::result::Result::Ok(server)))
        .build_free();

    let setup_handlers = FnBuilder::new("setup_handlers")
        .public()
        .input(parse_quote!(_server: &::mcpgen::Server))
        .build_free();

    let functions = [create_server, start_server, setup_handlers].map(Item::Fn);
    let declaration = SynthesizedDeclaration::items(Form::FreestandingSet, functions);
    Ok(Expansion::new(Host::Nothing).with(declaration))
}
