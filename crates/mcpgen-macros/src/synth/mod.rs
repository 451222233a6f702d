//! Building the declarations derived from an annotation occurrence.

pub mod accessor;
pub mod builder;
pub mod freestanding;
pub mod peers;
pub mod server;
pub mod toolbox;

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident};
use syn::{
    Attribute, FnArg, ImplItem, ImplItemFn, Item, ItemImpl, Path, Token, parse_quote,
    punctuated::Punctuated,
};

use crate::{
    arguments::ArgumentSchema,
    diagnostic::{Diagnostic, DiagnosticKind},
    model::{AnnotatedDeclaration, Annotation, PropertyDecl, Site, Tag},
    scan::{is_entry_point, tool_name},
};

/// Shape of a synthesized declaration, and so where it is placed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Form {
    /// Completes the annotated property.
    Accessor,

    /// Added to the annotated `impl` block.
    MemberSet,

    /// A trait implementation placed after the annotated item.
    ConformanceExtension,

    /// Items placed after the annotated item.
    PeerSet,

    /// Items placed where a freestanding macro was invoked.
    FreestandingSet,
}

#[derive(Clone, Debug)]
pub enum Synthesized {
    Member(ImplItemFn),
    Item(Item),
}

impl ToTokens for Synthesized {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            Synthesized::Member(member) => member.to_tokens(tokens),
            Synthesized::Item(item) => item.to_tokens(tokens),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SynthesizedDeclaration {
    pub form: Form,
    pub items: Vec<Synthesized>,
}

impl SynthesizedDeclaration {
    pub fn accessor(accessor: ImplItemFn) -> Self {
        Self {
            form: Form::Accessor,
            items: vec![Synthesized::Member(accessor)],
        }
    }

    pub fn members(members: impl IntoIterator<Item = ImplItemFn>) -> Self {
        Self {
            form: Form::MemberSet,
            items: members.into_iter().map(Synthesized::Member).collect(),
        }
    }

    pub fn items(form: Form, items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            form,
            items: items.into_iter().map(Synthesized::Item).collect(),
        }
    }

    /// Names of the functions this declaration provides, including those nested in `impl`
    /// blocks.
    #[cfg(test)]
    pub fn function_names(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|item| match item {
                Synthesized::Member(member) => vec![member.sig.ident.to_string()],
                Synthesized::Item(Item::Fn(function)) => vec![function.sig.ident.to_string()],
                Synthesized::Item(Item::Impl(item)) => item
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        ImplItem::Fn(function) => Some(function.sig.ident.to_string()),
                        _ => None,
                    })
                    .collect(),
                Synthesized::Item(_) => Vec::new(),
            })
            .collect()
    }
}

/// The item the annotation was attached to, after the expansion has adjusted it.
#[derive(Clone, Debug)]
pub enum Host {
    /// A property, replaced by its accessor.
    Property(PropertyDecl),

    /// An `impl` block, which receives any member set.
    Impl(ItemImpl),

    /// Any other item, emitted unchanged.
    Verbatim(TokenStream),

    /// Freestanding invocations have no host.
    Nothing,
}

/// Result of a successful expansion.
#[derive(Clone, Debug)]
pub struct Expansion {
    pub host: Host,
    pub declarations: Vec<SynthesizedDeclaration>,

    /// Warnings raised along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            declarations: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a declaration. Declarations without any items are dropped.
    pub fn with(mut self, declaration: SynthesizedDeclaration) -> Self {
        if !declaration.items.is_empty() {
            self.declarations.push(declaration);
        }
        self
    }

    pub fn warn(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// The declaration of a given form, if one was produced.
    #[cfg(test)]
    pub fn declaration(&self, form: Form) -> Option<&SynthesizedDeclaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.form == form)
    }
}

/// Prepare an annotated `impl` block for re-emission: the entry point marker is removed, `#[param]`
/// is validated and stripped from parameters, and nested annotations are given absolute paths so
/// they expand without being imported.
pub fn prepare_impl(item: &mut ItemImpl) -> Result<(), Diagnostic> {
    rewrite_impl(item, true)
}

/// Remove the markers only a generator can consume from an `impl` block whose expansion failed, so
/// that the expansion's error is the only one reported.
pub fn strip_impl(item: &mut ItemImpl) {
    // Nothing is validated, so this cannot fail.
    let _ = rewrite_impl(item, false);
}

fn rewrite_impl(item: &mut ItemImpl, validate: bool) -> Result<(), Diagnostic> {
    item.attrs.retain(|attr| !is_entry_point(attr));

    for member in &mut item.items {
        match member {
            ImplItem::Fn(function) => {
                qualify(&mut function.attrs);
                strip_params(&mut function.sig.inputs, validate)?;
            }
            ImplItem::Verbatim(tokens) => {
                let Ok(mut decl) = syn::parse2::<PropertyDecl>(tokens.clone()) else {
                    continue;
                };

                qualify(&mut decl.attrs);
                strip_params(&mut decl.sig.inputs, validate)?;
                *tokens = decl.into_token_stream();
            }
            _ => {}
        }
    }

    Ok(())
}

/// Rewrite the paths of vocabulary attributes to point into the runtime crate.
fn qualify(attrs: &mut [Attribute]) {
    for attr in attrs {
        let Some(tag) = Tag::from_path(attr.path()) else {
            continue;
        };

        let name = format_ident!("{}", tag.name());
        let path: Path = parse_quote!(::mcpgen::#name);

        match &mut attr.meta {
            syn::Meta::Path(existing) => *existing = path,
            syn::Meta::List(list) => list.path = path,
            syn::Meta::NameValue(name_value) => name_value.path = path,
        }
    }
}

/// Remove `#[param]` from function parameters, checking its arguments when `validate` is set.
fn strip_params(
    inputs: &mut Punctuated<FnArg, Token![,]>,
    validate: bool,
) -> Result<(), Diagnostic> {
    for input in inputs {
        let FnArg::Typed(input) = input else {
            continue;
        };

        let mut error = None;
        input.attrs.retain(|attr| {
            if !validate {
                return Tag::from_path(attr.path()) != Some(Tag::Param);
            }

            let Some(annotation) = Annotation::from_attribute(attr) else {
                return true;
            };
            if error.is_some() {
                return false;
            }

            match annotation {
                Ok(annotation) if annotation.tag() == Tag::Param => {
                    if let Err(err) = ArgumentSchema::param().resolve(&annotation) {
                        error = Some(Diagnostic::from(err));
                    }
                    false
                }
                Ok(_) => true,
                Err(err) => {
                    error = Some(Diagnostic::from(err));
                    false
                }
            }
        });

        if let Some(error) = error {
            return Err(error);
        }
    }

    Ok(())
}

/// Fail if two tool properties resolve to the same name.
pub fn check_unique_tools(declaration: &AnnotatedDeclaration) -> Result<(), Diagnostic> {
    let mut seen = HashSet::new();

    for (member, annotation) in declaration.tagged_properties(Tag::Tool) {
        let name = tool_name(member, annotation);

        if !seen.insert(name.value()) {
            return Err(Diagnostic::new(
                DiagnosticKind::DuplicateTool {
                    name: name.value(),
                    ty: declaration.name.clone(),
                },
                name.span(),
            ));
        }
    }

    Ok(())
}

/// Fail if any tool property takes `self`, as the generated code calls it without an instance.
pub fn check_static_tools(
    declaration: &AnnotatedDeclaration,
    site: Site,
) -> Result<(), Diagnostic> {
    match declaration
        .tagged_properties(Tag::Tool)
        .find(|(member, _)| member.receiver)
    {
        Some((member, _)) => Err(Diagnostic::receiver(member, &declaration.name, site)),
        None => Ok(()),
    }
}
