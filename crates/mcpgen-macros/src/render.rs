use proc_macro2::TokenStream;
use quote::ToTokens;

use crate::synth::{Expansion, Form, Host};

/// Turn an expansion into the tokens handed back to the compiler.
pub fn render(expansion: Expansion) -> TokenStream {
    let Expansion {
        host,
        declarations,
        diagnostics,
    } = expansion;

    let completed = declarations
        .iter()
        .any(|declaration| declaration.form == Form::Accessor);

    let mut tokens = match host {
        // An accessor takes the place of its property.
        Host::Property(property) if !completed => property.into_token_stream(),
        Host::Property(_) | Host::Nothing => TokenStream::new(),
        Host::Impl(item) => item.into_token_stream(),
        Host::Verbatim(item) => item,
    };

    for declaration in declarations {
        match declaration.form {
            // Already placed inside the host.
            Form::MemberSet => {}
            Form::Accessor
            | Form::ConformanceExtension
            | Form::PeerSet
            | Form::FreestandingSet => {
                for item in declaration.items {
                    item.to_tokens(&mut tokens);
                }
            }
        }
    }

    for diagnostic in diagnostics {
        tokens.extend(diagnostic.emit());
    }

    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    use proc_macro2::Span;
    use quote::quote;
    use syn::parse_quote;

    use crate::{
        diagnostic::{Diagnostic, DiagnosticKind},
        synth::SynthesizedDeclaration,
    };

    #[test]
    fn accessor_replaces_property() {
        let expansion = Expansion::new(Host::Property(parse_quote!(fn echo() -> Tool;))).with(
            SynthesizedDeclaration::accessor(parse_quote!(fn echo() -> Tool { todo!() })),
        );

        assert_eq!(
            render(expansion).to_string(),
            quote!(fn echo() -> Tool { todo!() }).to_string()
        );
    }

    #[test]
    fn members_are_not_repeated() {
        let expansion = Expansion::new(Host::Impl(parse_quote! {
            impl EchoServer {
                fn setup_server() {}
            }
        }))
        .with(SynthesizedDeclaration::members([parse_quote!(
            fn setup_server() {}
        )]));

        assert_eq!(
            render(expansion).to_string(),
            quote!(impl EchoServer { fn setup_server() {} }).to_string()
        );
    }

    #[test]
    fn items_follow_the_host() {
        let expansion = Expansion::new(Host::Impl(parse_quote!(impl EchoServer {}))).with(
            SynthesizedDeclaration::items(
                Form::PeerSet,
                [parse_quote!(impl EchoServer { fn create_server() {} })],
            ),
        );

        assert_eq!(
            render(expansion).to_string(),
            quote!(impl EchoServer {} impl EchoServer { fn create_server() {} }).to_string()
        );
    }

    #[test]
    fn warnings_are_appended() {
        let expansion = Expansion::new(Host::Nothing).warn(Diagnostic::new(
            DiagnosticKind::EntryPointConflict("EchoServer".to_string()),
            Span::call_site(),
        ));

        let output = render(expansion).to_string();
        assert!(output.starts_with("const _"));
    }
}
