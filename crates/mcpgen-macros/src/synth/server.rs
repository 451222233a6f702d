use syn::{Expr, ImplItem, ImplItemFn, ItemImpl, parse_quote};

use crate::{
    arguments::ArgumentSchema,
    diagnostic::{Diagnostic, DiagnosticKind},
    guard::ExistingMembers,
    model::{AnnotatedDeclaration, Annotation, Tag},
    scan::scan,
};

use super::{
    Expansion, Host, SynthesizedDeclaration, builder::FnBuilder, check_static_tools,
    check_unique_tools, prepare_impl,
};

/// Inject the server members into an `impl` block: `main`, `setup_server`, `initialize_tools` and
/// `register_handlers`. Functions the block already declares are left alone.
pub fn members(annotation: &Annotation, mut item: ItemImpl) -> Result<Expansion, Diagnostic> {
    if item.trait_.is_some() {
        return Err(Diagnostic::type_target(annotation.site, annotation.span));
    }

    let arguments = ArgumentSchema::server().resolve(annotation)?;
    let generate_main = arguments.lit_bool("generate_main")?.unwrap_or(true);

    let declaration = scan(&item);
    check_unique_tools(&declaration)?;
    check_static_tools(&declaration, annotation.site)?;

    let mut warnings = Vec::new();

    // An explicit marker takes precedence over the default, so `main` is only produced when asked
    // for by name.
    let emit_main = match declaration.entry_point {
        Some(span) => {
            warnings.push(Diagnostic::new(
                DiagnosticKind::EntryPointConflict(declaration.name.clone()),
                span,
            ));
            generate_main && arguments.is_explicit("generate_main")
        }
        None => generate_main,
    };

    let existing = ExistingMembers::of(&declaration);

    let mut generated = Vec::new();
    if emit_main {
        generated.push(main());
    }
    generated.push(setup_server(
        arguments.required("name")?,
        arguments.required("version")?,
        arguments.required("capabilities")?,
        arguments.required("configuration")?,
    ));
    generated.push(initialize_tools(&declaration));
    generated.push(register_handlers());

    let generated = existing.filter(generated);

    prepare_impl(&mut item)?;
    item.items
        .extend(generated.iter().cloned().map(ImplItem::Fn));

    let mut expansion =
        Expansion::new(Host::Impl(item)).with(SynthesizedDeclaration::members(generated));
    for warning in warnings {
        expansion = expansion.warn(warning);
    }

    Ok(expansion)
}

fn main() -> ImplItemFn {
    FnBuilder::new("main")
        .public()
        .stmts([
            parse_quote!(::mcpgen::logging::init();),
            parse_quote! {
                let runtime = match ::mcpgen::__private::tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                {
                    ::core::result::Result::Ok(runtime) => runtime,
                    ::core::result::Result::Err(error) => {
                        ::mcpgen::__private::tracing::error!("failed to start the runtime: {error}");
                        ::std::process::exit(1);
                    }
                };
            },
            parse_quote! {
                let result = runtime.block_on(async {
                    ::mcpgen::__private::tracing::info!("starting server");
                    let server = Self::setup_server().await?;
                    ::mcpgen::__private::tracing::info!("server started, waiting for completion");
                    server.wait_until_completed().await
                });
            },
            parse_quote! {
                if let ::core::result::Result::Err(error) = result {
                    ::mcpgen::__private::tracing::error!("server setup or run failed: {error}");
                    ::std::process::exit(1);
                }
            },
            parse_quote!(::mcpgen::__private::tracing::info!("server stopped");),
        ])
        .build_member()
}

fn setup_server(
    name: &Expr,
    version: &Expr,
    capabilities: &Expr,
    configuration: &Expr,
) -> ImplItemFn {
    FnBuilder::new("setup_server")
        .public()
        .asynchronous()
        .output(parse_quote!(
            ::core::result::Result<::mcpgen::Server, ::mcpgen::McpError>
        ))
        .stmts([
            parse_quote!(let tools = Self::initialize_tools();),
            parse_quote! {
                let server = ::mcpgen::Server::new(#name, #version, #capabilities, #configuration);
            },
            parse_quote!(Self::register_handlers(&server, tools);),
            parse_quote!(server.start(::mcpgen::StdioTransport::new()).await?;),
        ])
        .tail(parse_quote!(::core::result::Result::Ok(server)))
        .build_member()
}

fn initialize_tools(declaration: &AnnotatedDeclaration) -> ImplItemFn {
    let tools = declaration
        .tagged_properties(Tag::Tool)
        .map(|(member, _)| &member.ident);

    FnBuilder::new("initialize_tools")
        .public()
        .output(parse_quote!(::std::vec::Vec<::mcpgen::Tool>))
        .tail(parse_quote!(::std::vec![#(Self::#tools()),*]))
        .build_member()
}

fn register_handlers() -> ImplItemFn {
    FnBuilder::new("register_handlers")
        .public()
        .input(parse_quote!(server: &::mcpgen::Server))
        .input(parse_quote!(tools: ::std::vec::Vec<::mcpgen::Tool>))
        .stmts([
            parse_quote! {
                let names = tools
                    .iter()
                    .map(|tool| tool.name.clone())
                    .collect::<::std::vec::Vec<_>>();
            },
            parse_quote! {
                server.with_method_handler(::mcpgen::methods::ListTools, move |_| {
                    let tools = tools.clone();
                    async move {
                        ::core::result::Result::<_, ::mcpgen::McpError>::Ok(
                            ::mcpgen::methods::ListToolsResult { tools },
                        )
                    }
                });
            },
            parse_quote! {
                server.with_method_handler(::mcpgen::methods::CallTool, move |params| {
                    let known = names.contains(&params.name);
                    async move {
                        ::core::result::Result::<::mcpgen::methods::CallToolResult, _>::Err(if known {
                            ::mcpgen::McpError::tool_implementation_required(&params.name)
                        } else {
                            ::mcpgen::McpError::tool_not_found(&params.name)
                        })
                    }
                });
            },
        ])
        .build_member()
}

#[cfg(test)]
mod test {
    use super::*;

    use proc_macro2::{Span, TokenStream};
    use quote::{ToTokens, quote};
    use rstest::*;

    use crate::{
        diagnostic::Severity,
        model::Site,
        synth::{Form, Synthesized},
    };

    fn expand(arguments: TokenStream, item: ItemImpl) -> Result<Expansion, Diagnostic> {
        let annotation =
            Annotation::parse(Site::attached(Tag::Server), Span::call_site(), arguments).unwrap();
        members(&annotation, item)
    }

    fn generated(expansion: &Expansion) -> Vec<String> {
        expansion
            .declaration(Form::MemberSet)
            .map(|declaration| declaration.function_names())
            .unwrap_or_default()
    }

    fn member<'a>(expansion: &'a Expansion, name: &str) -> &'a ImplItemFn {
        expansion
            .declaration(Form::MemberSet)
            .unwrap()
            .items
            .iter()
            .find_map(|item| match item {
                Synthesized::Member(member) if member.sig.ident == name => Some(member),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn all_members() {
        let expansion = expand(quote!(), parse_quote!(impl EchoServer {})).unwrap();

        assert_eq!(
            generated(&expansion),
            ["main", "setup_server", "initialize_tools", "register_handlers"]
        );
        assert!(expansion.diagnostics.is_empty());
    }

    #[test]
    fn empty_tool_list() {
        let expansion = expand(quote!(), parse_quote!(impl EchoServer {})).unwrap();

        let expected: ImplItemFn = parse_quote! {
            pub fn initialize_tools() -> ::std::vec::Vec<::mcpgen::Tool> {
                ::std::vec![]
            }
        };
        assert_eq!(
            member(&expansion, "initialize_tools")
                .to_token_stream()
                .to_string(),
            expected.to_token_stream().to_string()
        );
    }

    #[test]
    fn tools_in_declaration_order() {
        let expansion = expand(
            quote!(),
            parse_quote! {
                impl EchoServer {
                    #[tool(description = "echoes")]
                    fn echo() -> Tool;

                    #[tool(description = "adds")]
                    fn calculator() -> Tool;
                }
            },
        )
        .unwrap();

        let expected: ImplItemFn = parse_quote! {
            pub fn initialize_tools() -> ::std::vec::Vec<::mcpgen::Tool> {
                ::std::vec![Self::echo(), Self::calculator()]
            }
        };
        assert_eq!(
            member(&expansion, "initialize_tools")
                .to_token_stream()
                .to_string(),
            expected.to_token_stream().to_string()
        );
    }

    #[test]
    fn server_arguments() {
        let expansion = expand(
            quote!(name = "echo", version = "0.2.0", capabilities = caps()),
            parse_quote!(impl EchoServer {}),
        )
        .unwrap();

        let setup = member(&expansion, "setup_server")
            .to_token_stream()
            .to_string();
        let expected = quote!(::mcpgen::Server::new(
            "echo",
            "0.2.0",
            caps(),
            <::mcpgen::Configuration as ::core::default::Default>::default()
        ));
        assert!(setup.contains(&expected.to_string()));
    }

    #[test]
    fn default_server_arguments() {
        let expansion = expand(quote!(), parse_quote!(impl EchoServer {})).unwrap();

        let setup = member(&expansion, "setup_server")
            .to_token_stream()
            .to_string();
        assert!(setup.contains(&quote!("MCPServer", "1.0.0").to_string()));
        assert!(setup.contains(&quote!(::mcpgen::StdioTransport::new()).to_string()));
    }

    #[test]
    fn placeholder_call_handler() {
        let expansion = expand(quote!(), parse_quote!(impl EchoServer {})).unwrap();

        let register = member(&expansion, "register_handlers")
            .to_token_stream()
            .to_string();
        assert!(register.contains("ListTools"));
        assert!(register.contains("CallTool"));
        assert!(register.contains("tool_not_found"));
    }

    #[test]
    fn existing_main_is_kept() {
        let expansion = expand(
            quote!(),
            parse_quote! {
                impl EchoServer {
                    pub fn main() {}
                }
            },
        )
        .unwrap();

        assert_eq!(
            generated(&expansion),
            ["setup_server", "initialize_tools", "register_handlers"]
        );

        let Host::Impl(item) = &expansion.host else {
            panic!("expected the impl block");
        };
        let mains = item
            .items
            .iter()
            .filter(|item| matches!(item, ImplItem::Fn(function) if function.sig.ident == "main"))
            .count();
        assert_eq!(mains, 1);
    }

    #[test]
    fn repeated_expansion_adds_nothing() {
        let first = expand(
            quote!(),
            parse_quote! {
                impl EchoServer {
                    #[tool(description = "echoes")]
                    fn echo() -> Tool;
                }
            },
        )
        .unwrap();
        let Host::Impl(item) = first.host else {
            panic!("expected the impl block");
        };
        let count = item.items.len();

        let second = expand(quote!(), item).unwrap();
        assert!(generated(&second).is_empty());

        let Host::Impl(item) = second.host else {
            panic!("expected the impl block");
        };
        assert_eq!(item.items.len(), count);
    }

    #[test]
    fn entry_point_conflict() {
        let expansion = expand(
            quote!(),
            parse_quote! {
                #[main]
                impl EchoServer {}
            },
        )
        .unwrap();

        assert_eq!(
            generated(&expansion),
            ["setup_server", "initialize_tools", "register_handlers"]
        );
        assert_eq!(expansion.diagnostics.len(), 1);
        assert_eq!(expansion.diagnostics[0].severity(), Severity::Warning);
        assert_eq!(
            expansion.diagnostics[0].message(),
            "`EchoServer` is marked `#[main]`; #[server] will not generate a second `main` (pass `generate_main = true` to generate it anyway)"
        );

        let Host::Impl(item) = &expansion.host else {
            panic!("expected the impl block");
        };
        assert!(item.attrs.is_empty());
    }

    #[rstest]
    #[case::explicitly_enabled(quote!(generate_main = true), true)]
    #[case::explicitly_disabled(quote!(generate_main = false), false)]
    fn entry_point_conflict_with_argument(#[case] arguments: TokenStream, #[case] has_main: bool) {
        let expansion = expand(
            arguments,
            parse_quote! {
                #[main]
                impl EchoServer {}
            },
        )
        .unwrap();

        assert_eq!(
            generated(&expansion).contains(&"main".to_string()),
            has_main
        );
        assert_eq!(expansion.diagnostics.len(), 1);
    }

    #[test]
    fn main_disabled_without_marker() {
        let expansion = expand(
            quote!(generate_main = false),
            parse_quote!(impl EchoServer {}),
        )
        .unwrap();

        assert!(!generated(&expansion).contains(&"main".to_string()));
        assert!(expansion.diagnostics.is_empty());
    }

    #[rstest]
    #[case::trait_impl(
        parse_quote!(impl Default for EchoServer {}),
        "#[server] can only be applied to an inherent `impl` block"
    )]
    #[case::receiver(
        parse_quote! {
            impl EchoServer {
                #[tool(description = "echoes")]
                fn echo(&self) -> Tool;
            }
        },
        "`echo` in `EchoServer` must be an associated function without `self` to be used by #[server]"
    )]
    #[case::duplicate(
        parse_quote! {
            impl EchoServer {
                #[tool(description = "echoes")]
                fn echo() -> Tool;

                #[tool(name = "echo", description = "echoes again")]
                fn echo_again() -> Tool;
            }
        },
        "duplicate tool name `echo` in `EchoServer`"
    )]
    fn errors(#[case] item: ItemImpl, #[case] expected: &str) {
        let error = expand(quote!(), item).unwrap_err();
        assert_eq!(error.message(), expected);
    }

    #[test]
    fn unknown_argument() {
        let error = expand(quote!(port = 80), parse_quote!(impl EchoServer {})).unwrap_err();
        assert_eq!(
            error.message(),
            "#[server] does not accept a `port` argument"
        );
    }
}
