use syn::{Expr, ImplItemFn, Item, ItemImpl, Stmt, parse_quote};

use crate::{
    arguments::{ArgumentSchema, ResolvedArguments},
    diagnostic::Diagnostic,
    guard::ExistingMembers,
    model::{Annotation, HandlerBinding, Member},
    resolve::{bind, initialize_hook},
    scan::scan,
};

use super::{
    Expansion, Form, Host, SynthesizedDeclaration, builder::FnBuilder, check_static_tools,
    check_unique_tools, prepare_impl,
};

/// Place a server factory next to an `impl` block: a sibling `impl` with `create_server` and
/// `start_server`, and an implementation of `ServerProvider`.
pub fn peers(annotation: &Annotation, mut item: ItemImpl) -> Result<Expansion, Diagnostic> {
    if item.trait_.is_some() {
        return Err(Diagnostic::type_target(annotation.site, annotation.span));
    }

    let arguments = ArgumentSchema::global_server(false).resolve(annotation)?;

    let declaration = scan(&item);
    check_unique_tools(&declaration)?;
    check_static_tools(&declaration, annotation.site)?;

    let bindings = bind(&declaration);
    for handler in bindings.iter().filter_map(|binding| binding.handler) {
        if handler.receiver {
            return Err(Diagnostic::receiver(
                handler,
                &declaration.name,
                annotation.site,
            ));
        }
    }

    let hook = initialize_hook(&declaration);
    if let Some(hook) = hook {
        if hook.receiver {
            return Err(Diagnostic::receiver(
                hook,
                &declaration.name,
                annotation.site,
            ));
        }
        if !hook.asyncness {
            return Err(Diagnostic::synchronous(
                hook,
                &declaration.name,
                annotation.site,
            ));
        }
    }

    let existing = ExistingMembers::of(&declaration);
    let factory = existing.filter([
        create_server(&arguments, &bindings)?,
        start_server(hook.is_some()),
    ]);

    prepare_impl(&mut item)?;

    let mut items = Vec::new();
    if !factory.is_empty() {
        items.push(sibling(&item, factory));
    }
    if !existing.contains("create_and_start_server") {
        items.push(provider(&item));
    }

    let siblings = SynthesizedDeclaration::items(Form::PeerSet, items);
    Ok(Expansion::new(Host::Impl(item)).with(siblings))
}

/// `let server = Server::new(...)` from the resolved settings.
pub fn new_server(arguments: &ResolvedArguments) -> Result<Stmt, Diagnostic> {
    let name = arguments.required("name")?;
    let version = arguments.required("version")?;
    let capabilities = arguments.required("capabilities")?;
    let configuration = arguments.required("configuration")?;

    Ok(parse_quote! {
        let server = ::mcpgen::Server::new(#name, #version, #capabilities, #configuration);
    })
}

fn create_server(
    arguments: &ResolvedArguments,
    bindings: &[HandlerBinding<'_>],
) -> Result<ImplItemFn, Diagnostic> {
    Ok(FnBuilder::new("create_server")
        .public()
        .output(parse_quote!(::mcpgen::Server))
        .stmt(new_server(arguments)?)
        .stmts(bindings.iter().map(register_tool))
        .tail(parse_quote!(server))
        .build_member())
}

fn register_tool(binding: &HandlerBinding<'_>) -> Stmt {
    let property = &binding.property.ident;

    let handler: Expr = match binding.handler {
        Some(Member {
            ident,
            asyncness: true,
            ..
        }) => parse_quote! {
            ::core::option::Option::Some(::mcpgen::ToolHandler::new(Self::#ident))
        },
        Some(Member { ident, .. }) => parse_quote! {
            ::core::option::Option::Some(::mcpgen::ToolHandler::from_fn(Self::#ident))
        },
        None => parse_quote!(::core::option::Option::None),
    };

    parse_quote! {
        server.register_tool(Self::#property(), #handler);
    }
}

fn start_server(with_hook: bool) -> ImplItemFn {
    let start: Stmt = if with_hook {
        parse_quote!(server.start_with_hook(transport, Self::on_initialize).await?;)
    } else {
        parse_quote!(server.start(transport).await?;)
    };

    FnBuilder::new("start_server")
        .public()
        .asynchronous()
        .generics(parse_quote!(<McpTransport: ::mcpgen::Transport + 'static>))
        .input(parse_quote!(transport: McpTransport))
        .output(parse_quote!(
            ::core::result::Result<::mcpgen::Server, ::mcpgen::McpError>
        ))
        .stmt(parse_quote!(let server = Self::create_server();))
        .stmt(start)
        .tail(parse_quote!(::core::result::Result::Ok(server)))
        .build_member()
}

fn sibling(item: &ItemImpl, functions: Vec<ImplItemFn>) -> Item {
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    parse_quote! {
        impl #impl_generics #self_ty #where_clause {
            #(#functions)*
        }
    }
}

fn provider(item: &ItemImpl) -> Item {
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let create_and_start = FnBuilder::new("create_and_start_server")
        .asynchronous()
        .generics(parse_quote!(<McpTransport: ::mcpgen::Transport + 'static>))
        .with_ref_self()
        .input(parse_quote!(transport: McpTransport))
        .output(parse_quote!(
            ::core::result::Result<::mcpgen::Server, ::mcpgen::McpError>
        ))
        .tail(parse_quote!(Self::start_server(transport).await))
        .build_member();

    parse_quote! {
        impl #impl_generics ::mcpgen::ServerProvider for #self_ty #where_clause {
            #create_and_start
        }
    }
}
