use quote::{format_ident, quote};
use syn::{
    Expr, ImplItem, ImplItemFn, Item, ItemImpl, LitStr, Token, parse_quote, punctuated::Punctuated,
};

use crate::{
    arguments::ArgumentSchema,
    diagnostic::Diagnostic,
    guard::ExistingMembers,
    model::{AnnotatedDeclaration, Annotation, HandlerBinding, Tag},
    resolve::{bind, execution_ident},
    scan::scan,
};

use super::{
    Expansion, Form, Host, SynthesizedDeclaration, builder::FnBuilder, check_unique_tools,
    prepare_impl,
};

/// Add an `execute_{id}` method per tool to the `impl` block, and implement `Toolbox` for the type
/// by dispatching on the tool name.
pub fn toolbox(annotation: &Annotation, mut item: ItemImpl) -> Result<Expansion, Diagnostic> {
    if item.trait_.is_some() {
        return Err(Diagnostic::type_target(annotation.site, annotation.span));
    }

    let arguments = ArgumentSchema::toolbox().resolve(annotation)?;
    let name = arguments.required_lit_str("name")?;
    let description = arguments.required_lit_str("description")?;

    let declaration = scan(&item);
    check_unique_tools(&declaration)?;

    let bindings = bind(&declaration);
    for handler in bindings.iter().filter_map(|binding| binding.handler) {
        if handler.asyncness {
            return Err(Diagnostic::asynchronous(
                handler,
                &declaration.name,
                annotation.site,
            ));
        }
    }

    let existing = ExistingMembers::of(&declaration);
    let executions = existing.filter(bindings.iter().map(execute));

    prepare_impl(&mut item)?;
    item.items
        .extend(executions.iter().cloned().map(ImplItem::Fn));

    let conformance = conformance(&item, &declaration, &bindings, &existing, name, description);

    Ok(Expansion::new(Host::Impl(item))
        .with(SynthesizedDeclaration::members(executions))
        .with(SynthesizedDeclaration::items(
            Form::ConformanceExtension,
            [conformance],
        )))
}

fn execute(binding: &HandlerBinding<'_>) -> ImplItemFn {
    let body: Expr = match binding.handler {
        Some(handler) if handler.receiver => {
            let ident = &handler.ident;
            parse_quote!(self.#ident(arguments))
        }
        Some(handler) => {
            let ident = &handler.ident;
            parse_quote!(Self::#ident(arguments))
        }
        None => {
            let name = &binding.name;
            parse_quote! {
                ::core::result::Result::Ok(::std::vec![::mcpgen::Content::text(::std::format!(
                    "Tool '{}' executed (arguments: {})",
                    #name,
                    ::mcpgen::__private::serde_json::Value::Object(arguments)
                ))])
            }
        }
    };

    FnBuilder::ident(execution_ident(binding.property))
        .with_ref_self()
        .input(parse_quote!(arguments: ::mcpgen::Arguments))
        .output(parse_quote!(::mcpgen::ToolResult))
        .tail(body)
        .build_member()
}

/// Body calling a trait method the user already declared as an inherent function, which takes
/// precedence over the trait method during path resolution.
fn delegate(declaration: &AnnotatedDeclaration, name: &str, parameters: &[&str]) -> Option<Expr> {
    let member = declaration.function(name)?;
    let ident = &member.ident;

    let mut arguments = Punctuated::<Expr, Token![,]>::new();
    if member.receiver {
        arguments.push(parse_quote!(self));
    }
    for parameter in parameters {
        let parameter = format_ident!("{parameter}");
        arguments.push(parse_quote!(#parameter));
    }

    Some(parse_quote!(Self::#ident(#arguments)))
}

fn conformance(
    item: &ItemImpl,
    declaration: &AnnotatedDeclaration,
    bindings: &[HandlerBinding<'_>],
    existing: &ExistingMembers,
    name: LitStr,
    description: LitStr,
) -> Item {
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let info = delegate(declaration, "get_toolbox_info", &[]).unwrap_or_else(|| {
        parse_quote!(::mcpgen::ToolboxInfo::new(#name, #description))
    });

    let tools = delegate(declaration, "get_tools", &[]).unwrap_or_else(|| {
        let tools = declaration
            .tagged_properties(Tag::Tool)
            .map(|(property, _)| -> Expr {
                let ident = &property.ident;
                if property.receiver {
                    parse_quote!(self.#ident())
                } else {
                    parse_quote!(Self::#ident())
                }
            });

        parse_quote!(::std::vec![#(#tools),*])
    });

    let dispatch = delegate(declaration, "handle_tool_call", &["name", "arguments"])
        .unwrap_or_else(|| {
            let arms = bindings.iter().map(|binding| {
                let name = &binding.name;
                let execute = execution_ident(binding.property);
                quote!(#name => self.#execute(arguments),)
            });

            parse_quote! {
                match name {
                    #(#arms)*
                    _ => ::core::result::Result::Err(::mcpgen::McpError::tool_not_found(name)),
                }
            }
        });

    let mut handle_tool_call = FnBuilder::new("handle_tool_call")
        .with_ref_self()
        .input(parse_quote!(name: &str))
        .input(parse_quote!(arguments: ::mcpgen::Arguments))
        .output(parse_quote!(::mcpgen::ToolResult))
        .tail(dispatch);
    if bindings.is_empty() && !existing.contains("handle_tool_call") {
        handle_tool_call = handle_tool_call.attr(parse_quote!(#[allow(unused_variables)]));
    }

    let get_toolbox_info = FnBuilder::new("get_toolbox_info")
        .with_ref_self()
        .output(parse_quote!(::mcpgen::ToolboxInfo))
        .tail(info)
        .build_member();
    let get_tools = FnBuilder::new("get_tools")
        .with_ref_self()
        .output(parse_quote!(::std::vec::Vec<::mcpgen::Tool>))
        .tail(tools)
        .build_member();
    let handle_tool_call = handle_tool_call.build_member();

    parse_quote! {
        impl #impl_generics ::mcpgen::Toolbox for #self_ty #where_clause {
            #get_toolbox_info
            #get_tools
            #handle_tool_call
        }
    }
}
