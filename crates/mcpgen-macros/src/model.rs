use std::fmt::Display;

use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::{
    Attribute, Block, Expr, FnArg, Ident, ImplItemFn, LitStr, Meta, Path, ReturnType, Signature,
    Token, Visibility,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
};

/// Fixed vocabulary of annotations understood by the generator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    Tool,
    Resource,
    Server,
    Toolbox,
    Param,
    GlobalServer,
}

impl Tag {
    /// Name of the attribute as written in source.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Tool => "tool",
            Tag::Resource => "resource",
            Tag::Server => "server",
            Tag::Toolbox => "toolbox",
            Tag::Param => "param",
            Tag::GlobalServer => "global_server",
        }
    }

    /// Match an attribute path against the vocabulary. Only the final segment is compared, so both
    /// `#[tool]` and `#[mcpgen::tool]` are recognised.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ident = &path.segments.last()?.ident;

        Some(match ident.to_string().as_str() {
            "tool" => Tag::Tool,
            "resource" => Tag::Resource,
            "server" => Tag::Server,
            "toolbox" => Tag::Toolbox,
            "param" => Tag::Param,
            "global_server" => Tag::GlobalServer,
            _ => return None,
        })
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where an annotation was written. Only [`Tag::GlobalServer`] has a freestanding form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Site {
    pub tag: Tag,
    pub freestanding: bool,
}

impl Site {
    pub fn attached(tag: Tag) -> Self {
        Self {
            tag,
            freestanding: false,
        }
    }

    pub fn freestanding(tag: Tag) -> Self {
        Self {
            tag,
            freestanding: true,
        }
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.freestanding {
            write!(f, "{}_fns!", self.tag)
        } else {
            write!(f, "#[{}]", self.tag)
        }
    }
}

/// A single argument passed to an annotation.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub struct Argument {
    /// Label of the argument, absent for positional arguments.
    pub label: Option<Ident>,

    /// Raw value of the argument. It is spliced into generated code as written.
    pub value: Expr,
}

impl Parse for Argument {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(Ident::peek_any) && input.peek2(Token![=]) && !input.peek2(Token![==]) {
            let label = input.call(Ident::parse_any)?;
            input.parse::<Token![=]>()?;

            return Ok(Self {
                label: Some(label),
                value: input.parse()?,
            });
        }

        Ok(Self {
            label: None,
            value: input.parse()?,
        })
    }
}

impl Argument {
    /// The span covering the whole argument.
    pub fn span(&self) -> Span {
        match &self.label {
            Some(label) => label
                .span()
                .join(self.value.span())
                .unwrap_or_else(|| label.span()),
            None => self.value.span(),
        }
    }
}

/// One occurrence of a tag with its arguments.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub site: Site,

    /// Arguments in the order they were written.
    pub arguments: Vec<Argument>,

    /// Location of the occurrence, used for every diagnostic raised against it.
    pub span: Span,
}

impl Annotation {
    /// Parse the argument list of an occurrence.
    pub fn parse(site: Site, span: Span, tokens: TokenStream) -> syn::Result<Self> {
        let arguments = syn::parse::Parser::parse2(
            Punctuated::<Argument, Token![,]>::parse_terminated,
            tokens,
        )?;

        Ok(Self {
            site,
            arguments: arguments.into_iter().collect(),
            span,
        })
    }

    /// Read an annotation from an attribute, if the attribute belongs to the vocabulary.
    pub fn from_attribute(attr: &Attribute) -> Option<syn::Result<Self>> {
        let tag = Tag::from_path(attr.path())?;
        let site = Site::attached(tag);

        Some(match &attr.meta {
            Meta::Path(_) => Ok(Self {
                site,
                arguments: Vec::new(),
                span: attr.span(),
            }),
            Meta::List(list) => Self::parse(site, attr.span(), list.tokens.clone()),
            Meta::NameValue(name_value) => Err(syn::Error::new(
                name_value.span(),
                format!("{site} arguments must be written as `label = value`"),
            )),
        })
    }

    pub fn tag(&self) -> Tag {
        self.site.tag
    }
}

/// A declaration with no body, such as `fn echo(&self) -> Tool;`. Properties are written this way
/// and completed by the accessor the generator produces.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub sig: Signature,
    pub semi: Token![;],
}

impl Parse for PropertyDecl {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            attrs: input.call(Attribute::parse_outer)?,
            vis: input.parse()?,
            sig: input.parse()?,
            semi: input.parse()?,
        })
    }
}

impl ToTokens for PropertyDecl {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.extend(self.attrs.iter().map(ToTokens::to_token_stream));
        self.vis.to_tokens(tokens);
        self.sig.to_tokens(tokens);
        self.semi.to_tokens(tokens);
    }
}

impl PropertyDecl {
    /// Whether the declaration reads as a stored property: nothing but an optional receiver, a
    /// declared type, and no `async` or generics.
    pub fn is_property(&self) -> bool {
        self.sig.asyncness.is_none()
            && self.sig.generics.params.is_empty()
            && self.sig.variadic.is_none()
            && matches!(self.sig.output, ReturnType::Type(..))
            && self
                .sig
                .inputs
                .iter()
                .all(|input| matches!(input, FnArg::Receiver(_)))
    }

    pub fn has_receiver(&self) -> bool {
        self.sig.receiver().is_some()
    }

    pub fn ident(&self) -> &Ident {
        &self.sig.ident
    }

    /// Complete the declaration with a body.
    pub fn into_accessor(self, block: Block) -> ImplItemFn {
        ImplItemFn {
            attrs: self.attrs,
            vis: self.vis,
            defaultness: None,
            sig: self.sig,
            block,
        }
    }
}

/// Kind of a member declared on a type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemberKind {
    StoredProperty,
    Function { has_body: bool },
}

/// A member of an [`AnnotatedDeclaration`].
#[derive(Clone, Debug)]
pub struct Member {
    pub kind: MemberKind,
    pub ident: Ident,

    /// Annotations from the vocabulary attached to this member, in source order.
    pub annotations: Vec<Annotation>,

    /// Whether the member takes `self` in any form.
    pub receiver: bool,

    pub asyncness: bool,
}

impl Member {
    pub fn annotation(&self, tag: Tag) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|annotation| annotation.tag() == tag)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, MemberKind::Function { .. })
    }

    /// Identifier with any raw prefix removed, suitable for building derived names.
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

/// A type and its ordered members, as seen by the generator.
#[derive(Clone, Debug)]
pub struct AnnotatedDeclaration {
    /// Name of the type, used in diagnostics.
    pub name: String,

    /// Location of a `#[main]` marker on the type, if one is present.
    pub entry_point: Option<Span>,

    pub members: Vec<Member>,
}

/// Everything needed to build a tool descriptor.
#[derive(Clone, Debug)]
pub struct ToolDescriptor {
    pub name: LitStr,
    pub description: Expr,
    pub input_schema: Option<Expr>,
}

/// Everything needed to build a resource descriptor.
#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    pub name: Expr,
    pub uri: Expr,
    pub description: Option<Expr>,
    pub mime_type: Option<Expr>,
    pub metadata: Option<Expr>,
}

/// Pairs a tool property with the function that executes it.
#[derive(Clone, Debug)]
pub struct HandlerBinding<'a> {
    pub property: &'a Member,

    /// Tool name for the property.
    pub name: LitStr,

    pub handler: Option<&'a Member>,
}
