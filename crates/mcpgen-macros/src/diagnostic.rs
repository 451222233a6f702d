use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote_spanned};

use crate::{
    arguments::ArgumentError,
    model::{Member, Site, Tag},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Halts the build.
    Error,

    /// Reported without halting the build.
    Warning,
}

/// Every problem the generator can report. Messages are fixed and only parameterised by names
/// taken from the annotated code.
#[derive(Clone, Debug, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("{site} can only be applied to a property declaration such as `fn name(&self) -> {ty};`")]
    PropertyTarget { site: Site, ty: &'static str },
    #[error("{site} can only be applied to an inherent `impl` block")]
    TypeTarget { site: Site },
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("{0}")]
    Syntax(String),
    #[error("duplicate tool name `{name}` in `{ty}`")]
    DuplicateTool { name: String, ty: String },
    #[error("`{member}` in `{ty}` must be an associated function without `self` to be used by {site}")]
    Receiver {
        member: String,
        ty: String,
        site: Site,
    },
    #[error("`{member}` in `{ty}` must not be `async` to be used by {site}")]
    Asynchronous {
        member: String,
        ty: String,
        site: Site,
    },
    #[error("`{member}` in `{ty}` must be `async` to be used by {site}")]
    Synchronous {
        member: String,
        ty: String,
        site: Site,
    },
    #[error(
        "`{0}` is marked `#[main]`; #[server] will not generate a second `main` (pass `generate_main = true` to generate it anyway)"
    )]
    EntryPointConflict(String),
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::EntryPointConflict(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A reported problem, located at the annotation occurrence it concerns.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Wrong declaration kind for a tag that attaches to properties.
    pub fn property_target(site: Site, span: Span) -> Self {
        let ty = match site.tag {
            Tag::Resource => "Resource",
            _ => "Tool",
        };

        Self::new(DiagnosticKind::PropertyTarget { site, ty }, span)
    }

    /// Wrong declaration kind for a tag that attaches to types.
    pub fn type_target(site: Site, span: Span) -> Self {
        Self::new(DiagnosticKind::TypeTarget { site }, span)
    }

    pub fn receiver(member: &Member, ty: &str, site: Site) -> Self {
        Self::new(
            DiagnosticKind::Receiver {
                member: member.name(),
                ty: ty.to_string(),
                site,
            },
            member.ident.span(),
        )
    }

    pub fn asynchronous(member: &Member, ty: &str, site: Site) -> Self {
        Self::new(
            DiagnosticKind::Asynchronous {
                member: member.name(),
                ty: ty.to_string(),
                site,
            },
            member.ident.span(),
        )
    }

    pub fn synchronous(member: &Member, ty: &str, site: Site) -> Self {
        Self::new(
            DiagnosticKind::Synchronous {
                member: member.name(),
                ty: ty.to_string(),
                site,
            },
            member.ident.span(),
        )
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Render the diagnostic. Errors become `compile_error!`, warnings become a use of a deprecated
    /// item, which rustc reports without failing the build.
    pub fn emit(&self) -> TokenStream {
        let message = self.message();

        match self.severity() {
            Severity::Error => syn::Error::new(self.span, message).into_compile_error(),
            Severity::Warning => {
                let marker = format_ident!("warning", span = self.span);

                quote_spanned! {self.span=>
                    const _: () = {
                        #[deprecated(note = #message)]
                        #[allow(non_upper_case_globals)]
                        const #marker: () = ();
                        #marker
                    };
                }
            }
        }
    }
}

impl From<ArgumentError> for Diagnostic {
    fn from(err: ArgumentError) -> Self {
        let span = err.span();
        Self::new(err.into(), span)
    }
}

impl From<syn::Error> for Diagnostic {
    fn from(err: syn::Error) -> Self {
        Self::new(DiagnosticKind::Syntax(err.to_string()), err.span())
    }
}

impl From<Diagnostic> for syn::Error {
    fn from(diagnostic: Diagnostic) -> Self {
        syn::Error::new(diagnostic.span, diagnostic.message())
    }
}
