use quote::format_ident;
use syn::Ident;

use crate::{
    model::{AnnotatedDeclaration, HandlerBinding, Member, Tag},
    scan::{HANDLER_SUFFIX, tool_name},
};

/// Name of the function invoked when the client initializes a peer-set server.
pub const INITIALIZE_HOOK: &str = "on_initialize";

/// Identifier of the handler expected for a property.
pub fn handler_name(property: &Member) -> String {
    format!("{}{HANDLER_SUFFIX}", property.name())
}

/// Identifier of the generated execution method for a property.
pub fn execution_ident(property: &Member) -> Ident {
    format_ident!("execute_{}", property.name())
}

/// Bind every tool property of the declaration to its handler, in declaration order.
pub fn bind(declaration: &AnnotatedDeclaration) -> Vec<HandlerBinding<'_>> {
    declaration
        .tagged_properties(Tag::Tool)
        .map(|(property, annotation)| {
            let expected = handler_name(property);

            HandlerBinding {
                property,
                name: tool_name(property, annotation),
                handler: declaration
                    .candidate_handlers()
                    .find(|candidate| candidate.name() == expected),
            }
        })
        .collect()
}

/// The initialize hook declared on the type, if any.
pub fn initialize_hook(declaration: &AnnotatedDeclaration) -> Option<&Member> {
    declaration.function(INITIALIZE_HOOK)
}
