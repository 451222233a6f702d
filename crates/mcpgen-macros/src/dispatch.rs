use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::{Item, ItemImpl};

use crate::{
    arguments::ArgumentSchema,
    diagnostic::Diagnostic,
    model::{Annotation, PropertyDecl, Site, Tag},
    render::render,
    synth::{Expansion, Host, accessor, freestanding, peers, server, strip_impl, toolbox},
};

/// Declaration kind an attribute was attached to.
#[derive(Clone, Debug)]
pub enum Target {
    /// A bodyless function inside an `impl` block.
    Property(PropertyDecl),
    Type(ItemImpl),
    Function,
    Other,
}

impl Target {
    pub fn classify(item: TokenStream) -> Self {
        if let Ok(property) = syn::parse2::<PropertyDecl>(item.clone()) {
            return Self::Property(property);
        }

        match syn::parse2::<Item>(item) {
            Ok(Item::Impl(item)) => Self::Type(item),
            Ok(Item::Fn(_)) => Self::Function,
            _ => Self::Other,
        }
    }
}

/// Expand an attribute from the vocabulary. On failure the item is emitted next to the error, so
/// other annotations in the same file still expand. `impl` blocks lose the markers only the
/// generator understands.
pub fn attribute(tag: Tag, attr: TokenStream, item: TokenStream) -> TokenStream {
    match expand_attribute(tag, attr, item.clone()) {
        Ok(expansion) => render(expansion),
        Err(diagnostic) => {
            let mut tokens = match syn::parse2::<ItemImpl>(item.clone()) {
                Ok(mut item) => {
                    strip_impl(&mut item);
                    item.into_token_stream()
                }
                Err(_) => item,
            };
            tokens.extend(diagnostic.emit());
            tokens
        }
    }
}

fn expand_attribute(
    tag: Tag,
    attr: TokenStream,
    item: TokenStream,
) -> Result<Expansion, Diagnostic> {
    let site = Site::attached(tag);
    let span = Span::call_site();

    // The kind of declaration is checked before the arguments are looked at.
    match (tag, Target::classify(item.clone())) {
        (Tag::Tool, Target::Property(property)) => {
            accessor::tool(&Annotation::parse(site, span, attr)?, property)
        }
        (Tag::Resource, Target::Property(property)) => {
            accessor::resource(&Annotation::parse(site, span, attr)?, property)
        }
        (Tag::Tool | Tag::Resource, _) => Err(Diagnostic::property_target(site, span)),

        (Tag::Server, Target::Type(item)) => {
            server::members(&Annotation::parse(site, span, attr)?, item)
        }
        (Tag::Toolbox, Target::Type(item)) => {
            toolbox::toolbox(&Annotation::parse(site, span, attr)?, item)
        }
        (Tag::GlobalServer, Target::Type(item)) => {
            peers::peers(&Annotation::parse(site, span, attr)?, item)
        }
        (Tag::Server | Tag::Toolbox | Tag::GlobalServer, _) => {
            Err(Diagnostic::type_target(site, span))
        }

        (Tag::Param, _) => {
            ArgumentSchema::param().resolve(&Annotation::parse(site, span, attr)?)?;
            Ok(Expansion::new(Host::Verbatim(item)))
        }
    }
}

/// Expand the freestanding server macro.
pub fn freestanding(tokens: TokenStream) -> TokenStream {
    let site = Site::freestanding(Tag::GlobalServer);

    Annotation::parse(site, Span::call_site(), tokens)
        .map_err(Diagnostic::from)
        .and_then(|annotation| freestanding::functions(&annotation))
        .map(render)
        .unwrap_or_else(|diagnostic| diagnostic.emit())
}

#[cfg(test)]
mod test {
    use super::*;

    use quote::quote;
    use rstest::*;

    #[rstest]
    #[case::property(quote!(fn echo(&self) -> Tool;), "property")]
    #[case::property_with_attributes(quote!(#[doc = "echo"] pub fn echo() -> Tool;), "property")]
    #[case::bodyless_function(quote!(fn echo(&self, text: String) -> Tool;), "property")]
    #[case::inherent_impl(quote!(impl EchoServer {}), "type")]
    #[case::trait_impl(quote!(impl Default for EchoServer {}), "type")]
    #[case::function(quote!(fn echo() -> Tool { todo!() }), "function")]
    #[case::structure(quote!(struct EchoServer;), "other")]
    fn classify(#[case] item: TokenStream, #[case] expected: &str) {
        let kind = match Target::classify(item) {
            Target::Property(_) => "property",
            Target::Type(_) => "type",
            Target::Function => "function",
            Target::Other => "other",
        };

        assert_eq!(kind, expected);
    }

    #[test]
    fn tool_property_becomes_accessor() {
        let output = attribute(
            Tag::Tool,
            quote!(description = "echoes"),
            quote!(fn echo(&self) -> Tool;),
        );

        assert_eq!(
            output.to_string(),
            quote! {
                fn echo(&self) -> Tool {
                    ::mcpgen::Tool::new("echo", "echoes", ::core::option::Option::None)
                }
            }
            .to_string()
        );
    }

    #[rstest]
    #[case::tool_on_struct(
        Tag::Tool,
        quote!(description = "echoes"),
        quote!(struct Echo;),
        "#[tool] can only be applied to a property declaration"
    )]
    #[case::tool_on_function(
        Tag::Tool,
        quote!(description = "echoes"),
        quote!(fn echo() -> Tool { todo!() }),
        "#[tool] can only be applied to a property declaration"
    )]
    #[case::structure_before_arguments(
        Tag::Resource,
        quote!(=),
        quote!(struct Readme;),
        "#[resource] can only be applied to a property declaration"
    )]
    #[case::server_on_function(
        Tag::Server,
        quote!(),
        quote!(fn main() {}),
        "#[server] can only be applied to an inherent `impl` block"
    )]
    #[case::toolbox_on_struct(
        Tag::Toolbox,
        quote!(name = "t", description = "d"),
        quote!(struct TextTools;),
        "#[toolbox] can only be applied to an inherent `impl` block"
    )]
    #[case::param_description(
        Tag::Param,
        quote!(),
        quote!(struct Unit;),
        "#[param] requires a `description` argument"
    )]
    fn errors_keep_the_item(
        #[case] tag: Tag,
        #[case] attr: TokenStream,
        #[case] item: TokenStream,
        #[case] expected: &str,
    ) {
        let output = attribute(tag, attr, item.clone()).to_string();

        assert!(output.starts_with(&item.to_string()));
        assert!(output.contains("compile_error"));
        assert!(output.contains(expected));
    }

    #[test]
    fn failed_impl_loses_markers() {
        let output = attribute(
            Tag::Server,
            quote!(port = 8080),
            quote! {
                #[main]
                impl EchoServer {
                    fn echo_handler(#[param(description = "the text")] text: String) {}
                }
            },
        )
        .to_string();

        assert!(output.contains("#[server] does not accept a `port` argument"));
        assert!(output.contains("echo_handler"));
        assert!(!output.contains("main"));
        assert!(!output.contains("param"));
    }

    #[test]
    fn param_is_metadata() {
        let item = quote!(fn echo(text: String) {});
        let output = attribute(Tag::Param, quote!(description = "the text"), item.clone());

        assert_eq!(output.to_string(), item.to_string());
    }

    #[test]
    fn server_with_entry_point_warns() {
        let output = attribute(
            Tag::Server,
            quote!(),
            quote! {
                #[main]
                impl EchoServer {}
            },
        )
        .to_string();

        assert!(output.contains("deprecated"));
        assert!(!output.contains("compile_error"));
        assert!(output.contains("setup_server"));
        assert!(!output.contains("fn main"));
    }

    #[test]
    fn freestanding_functions() {
        let output = freestanding(quote!(name = "calculator", version = "1.0.0")).to_string();

        assert!(output.contains("fn create_server"));
        assert!(output.contains("fn start_server"));
        assert!(output.contains("fn setup_handlers"));
    }

    #[test]
    fn freestanding_error() {
        let output = freestanding(quote!(name = "calculator")).to_string();

        assert!(output.contains("compile_error"));
        assert!(output.contains("global_server_fns! requires a `version` argument"));
    }
}
