use quote::ToTokens;
use syn::{Attribute, ImplItem, ItemImpl, LitStr, Type, TypePath, spanned::Spanned};

use crate::{
    arguments::ArgumentSchema,
    model::{AnnotatedDeclaration, Annotation, Member, MemberKind, PropertyDecl, Site, Tag},
};

/// Suffix that marks a function as a candidate handler.
pub const HANDLER_SUFFIX: &str = "_handler";

/// Attribute marking a type as the program entry point.
pub const ENTRY_POINT_MARKER: &str = "main";

/// Walk the members of an `impl` block in order, classifying each one. Nested items are not
/// inspected.
pub fn scan(item: &ItemImpl) -> AnnotatedDeclaration {
    let members = item.items.iter().filter_map(scan_member).collect();

    AnnotatedDeclaration {
        name: type_name(&item.self_ty),
        entry_point: item
            .attrs
            .iter()
            .find(|attr| is_entry_point(attr))
            .map(|attr| attr.span()),
        members,
    }
}

pub fn is_entry_point(attr: &Attribute) -> bool {
    attr.path().is_ident(ENTRY_POINT_MARKER)
}

fn scan_member(item: &ImplItem) -> Option<Member> {
    match item {
        ImplItem::Fn(function) => Some(Member {
            kind: MemberKind::Function { has_body: true },
            ident: function.sig.ident.clone(),
            annotations: annotations(&function.attrs),
            receiver: function.sig.receiver().is_some(),
            asyncness: function.sig.asyncness.is_some(),
        }),
        // Declarations without a body are only produced as verbatim tokens.
        ImplItem::Verbatim(tokens) => {
            let decl = syn::parse2::<PropertyDecl>(tokens.clone()).ok()?;

            Some(Member {
                kind: if decl.is_property() {
                    MemberKind::StoredProperty
                } else {
                    MemberKind::Function { has_body: false }
                },
                annotations: annotations(&decl.attrs),
                receiver: decl.has_receiver(),
                asyncness: decl.sig.asyncness.is_some(),
                ident: decl.sig.ident,
            })
        }
        _ => None,
    }
}

/// Annotations from the vocabulary, in source order. Arguments that fail to parse are dropped, as
/// the annotation's own expansion reports them.
fn annotations(attrs: &[Attribute]) -> Vec<Annotation> {
    attrs
        .iter()
        .filter_map(|attr| {
            let tag = Tag::from_path(attr.path())?;

            Some(
                Annotation::from_attribute(attr)?.unwrap_or_else(|_| Annotation {
                    site: Site::attached(tag),
                    arguments: Vec::new(),
                    span: attr.span(),
                }),
            )
        })
        .collect()
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(TypePath { path, .. }) => path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        ty => ty.to_token_stream().to_string(),
    }
}

impl AnnotatedDeclaration {
    /// Stored properties carrying `tag`, in declaration order.
    pub fn tagged_properties(&self, tag: Tag) -> impl Iterator<Item = (&Member, &Annotation)> {
        self.members
            .iter()
            .filter(|member| member.kind == MemberKind::StoredProperty)
            .filter_map(move |member| Some((member, member.annotation(tag)?)))
    }

    /// Functions named by the handler convention, in declaration order. Declarations without a
    /// body cannot be called, so they are not candidates.
    pub fn candidate_handlers(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|member| {
            member.kind == MemberKind::Function { has_body: true }
                && member.name().ends_with(HANDLER_SUFFIX)
        })
    }

    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.is_function() && member.name() == name)
    }
}

/// Name of the tool a property provides. Falls back to the identifier when the annotation is
/// malformed, leaving the error to the annotation's own expansion.
pub fn tool_name(member: &Member, annotation: &Annotation) -> LitStr {
    ArgumentSchema::tool(&member.ident)
        .resolve(annotation)
        .ok()
        .and_then(|arguments| arguments.lit_str("name").ok().flatten())
        .unwrap_or_else(|| LitStr::new(&member.name(), member.ident.span()))
}
