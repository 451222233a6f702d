use std::collections::HashMap;

use indexmap::IndexMap;
use proc_macro2::Span;
use syn::{Expr, ExprLit, Ident, Lit, LitStr, Path, ext::IdentExt, parse_quote};

use crate::model::{Annotation, Site, Tag};

/// Whether a parameter has to be written, and what it falls back to when it isn't.
#[derive(Clone, Debug)]
pub enum Requirement {
    Required,
    Optional,
    Default(Expr),
}

/// A single parameter accepted by an annotation.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub label: &'static str,

    /// Alternative labels that resolve to this parameter.
    pub aliases: Vec<&'static str>,

    pub requirement: Requirement,
}

impl Parameter {
    fn accepts(&self, label: &str) -> bool {
        self.label == label || self.aliases.contains(&label)
    }
}

/// Ordered list of the parameters an annotation accepts.
#[derive(Clone, Debug)]
pub struct ArgumentSchema {
    site: Site,
    parameters: Vec<Parameter>,
}

impl ArgumentSchema {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            parameters: Vec::new(),
        }
    }

    fn with(mut self, label: &'static str, requirement: Requirement) -> Self {
        self.parameters.push(Parameter {
            label,
            aliases: Vec::new(),
            requirement,
        });
        self
    }

    pub fn required(self, label: &'static str) -> Self {
        self.with(label, Requirement::Required)
    }

    pub fn optional(self, label: &'static str) -> Self {
        self.with(label, Requirement::Optional)
    }

    pub fn defaulted(self, label: &'static str, default: Expr) -> Self {
        self.with(label, Requirement::Default(default))
    }

    /// Add an alias to the most recently declared parameter.
    pub fn alias(mut self, alias: &'static str) -> Self {
        if let Some(parameter) = self.parameters.last_mut() {
            parameter.aliases.push(alias);
        }
        self
    }

    /// Map every parameter to the value written for it, or its default.
    pub fn resolve(&self, annotation: &Annotation) -> Result<ResolvedArguments, ArgumentError> {
        let site = self.site;
        let mut actual = HashMap::<&'static str, Expr>::new();

        for argument in &annotation.arguments {
            let Some(label) = &argument.label else {
                return Err(ArgumentError::Positional {
                    site,
                    span: argument.span(),
                });
            };
            let label_str = label.unraw().to_string();

            let Some(parameter) = self
                .parameters
                .iter()
                .find(|parameter| parameter.accepts(&label_str))
            else {
                return Err(ArgumentError::Unknown {
                    site,
                    label: label_str,
                    span: label.span(),
                });
            };

            if actual
                .insert(parameter.label, argument.value.clone())
                .is_some()
            {
                return Err(ArgumentError::Duplicate {
                    site,
                    label: parameter.label,
                    span: label.span(),
                });
            }
        }

        let mut values = IndexMap::new();

        for parameter in &self.parameters {
            let resolved = match (actual.remove(parameter.label), &parameter.requirement) {
                (Some(value), _) => Resolved {
                    value,
                    explicit: true,
                },
                (None, Requirement::Default(default)) => Resolved {
                    value: default.clone(),
                    explicit: false,
                },
                (None, Requirement::Optional) => continue,
                (None, Requirement::Required) => {
                    return Err(ArgumentError::Missing {
                        site,
                        label: parameter.label,
                        span: annotation.span,
                    });
                }
            };

            values.insert(parameter.label, resolved);
        }

        Ok(ResolvedArguments { site, values })
    }

    /// `#[tool(name?, description, input_schema? | schema?)]`
    pub fn tool(property: &Ident) -> Self {
        Self::new(Site::attached(Tag::Tool))
            .defaulted("name", ident_literal(property))
            .required("description")
            .optional("input_schema")
            .alias("schema")
    }

    /// `#[resource(name?, description?, uri, mime_type?, metadata?)]`
    pub fn resource(property: &Ident) -> Self {
        Self::new(Site::attached(Tag::Resource))
            .defaulted("name", ident_literal(property))
            .optional("description")
            .required("uri")
            .optional("mime_type")
            .optional("metadata")
    }

    /// `#[server(name?, version?, capabilities?, configuration?, generate_main?)]`
    pub fn server() -> Self {
        Self::new(Site::attached(Tag::Server))
            .defaulted("name", parse_quote!("MCPServer"))
            .defaulted("version", parse_quote!("1.0.0"))
            .defaulted(
                "capabilities",
                default_of(parse_quote!(::mcpgen::ServerCapabilities)),
            )
            .defaulted(
                "configuration",
                default_of(parse_quote!(::mcpgen::Configuration)),
            )
            .defaulted("generate_main", parse_quote!(true))
    }

    /// `#[global_server(name, version, capabilities?, configuration?)]`, and the freestanding form
    /// when `freestanding` is set.
    pub fn global_server(freestanding: bool) -> Self {
        let site = if freestanding {
            Site::freestanding(Tag::GlobalServer)
        } else {
            Site::attached(Tag::GlobalServer)
        };

        Self::new(site)
            .required("name")
            .required("version")
            .defaulted(
                "capabilities",
                default_of(parse_quote!(::mcpgen::ServerCapabilities)),
            )
            .defaulted(
                "configuration",
                default_of(parse_quote!(::mcpgen::Configuration)),
            )
    }

    /// `#[toolbox(name, description)]`
    pub fn toolbox() -> Self {
        Self::new(Site::attached(Tag::Toolbox))
            .required("name")
            .required("description")
    }

    /// `#[param(description)]`
    pub fn param() -> Self {
        Self::new(Site::attached(Tag::Param)).required("description")
    }
}

/// String literal holding an identifier, used as the default name of a property.
pub fn ident_literal(ident: &Ident) -> Expr {
    let lit = LitStr::new(&ident.unraw().to_string(), ident.span());
    parse_quote!(#lit)
}

/// `<ty as Default>::default()`.
fn default_of(ty: Path) -> Expr {
    parse_quote!(<#ty as ::core::default::Default>::default())
}

/// A value after defaults have been applied.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub value: Expr,

    /// Whether the value was written, rather than filled in from a default.
    pub explicit: bool,
}

/// Output of [`ArgumentSchema::resolve`], in schema order.
#[derive(Clone, Debug)]
pub struct ResolvedArguments {
    site: Site,
    values: IndexMap<&'static str, Resolved>,
}

impl ResolvedArguments {
    pub fn get(&self, label: &str) -> Option<&Expr> {
        self.values.get(label).map(|resolved| &resolved.value)
    }

    /// Fetch a value the schema guarantees is present.
    pub fn required(&self, label: &'static str) -> Result<&Expr, ArgumentError> {
        self.get(label).ok_or(ArgumentError::Missing {
            site: self.site,
            label,
            span: Span::call_site(),
        })
    }

    pub fn is_explicit(&self, label: &str) -> bool {
        self.values
            .get(label)
            .is_some_and(|resolved| resolved.explicit)
    }

    /// Fetch a value that must be a string literal.
    pub fn lit_str(&self, label: &'static str) -> Result<Option<LitStr>, ArgumentError> {
        self.get(label)
            .map(|value| match value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => Ok(lit.clone()),
                value => Err(self.expected_literal(label, "string", value)),
            })
            .transpose()
    }

    /// Fetch a string literal the schema guarantees is present.
    pub fn required_lit_str(&self, label: &'static str) -> Result<LitStr, ArgumentError> {
        self.lit_str(label)?.ok_or(ArgumentError::Missing {
            site: self.site,
            label,
            span: Span::call_site(),
        })
    }

    /// Fetch a value that must be a boolean literal.
    pub fn lit_bool(&self, label: &'static str) -> Result<Option<bool>, ArgumentError> {
        self.get(label)
            .map(|value| match value {
                Expr::Lit(ExprLit {
                    lit: Lit::Bool(lit),
                    ..
                }) => Ok(lit.value),
                value => Err(self.expected_literal(label, "boolean", value)),
            })
            .transpose()
    }

    fn expected_literal(
        &self,
        label: &'static str,
        kind: &'static str,
        value: &Expr,
    ) -> ArgumentError {
        ArgumentError::ExpectedLiteral {
            site: self.site,
            label,
            kind,
            span: syn::spanned::Spanned::span(value),
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ArgumentError {
    #[error("{site} requires a `{label}` argument")]
    Missing {
        site: Site,
        label: &'static str,
        span: Span,
    },
    #[error("{site} does not accept a `{label}` argument")]
    Unknown {
        site: Site,
        label: String,
        span: Span,
    },
    #[error("{site} was given the `{label}` argument more than once")]
    Duplicate {
        site: Site,
        label: &'static str,
        span: Span,
    },
    #[error("{site} arguments must be written as `label = value`")]
    Positional { site: Site, span: Span },
    #[error("the `{label}` argument of {site} must be a {kind} literal")]
    ExpectedLiteral {
        site: Site,
        label: &'static str,
        kind: &'static str,
        span: Span,
    },
}

impl ArgumentError {
    pub fn span(&self) -> Span {
        match self {
            ArgumentError::Missing { span, .. }
            | ArgumentError::Unknown { span, .. }
            | ArgumentError::Duplicate { span, .. }
            | ArgumentError::Positional { span, .. }
            | ArgumentError::ExpectedLiteral { span, .. } => *span,
        }
    }
}

impl From<ArgumentError> for syn::Error {
    fn from(err: ArgumentError) -> Self {
        syn::Error::new(err.span(), err.to_string())
    }
}

#[cfg(test)]
impl ResolvedArguments {
    /// Labels in schema order, as they were resolved.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use proc_macro2::TokenStream;
    use quote::{ToTokens, quote};
    use rstest::*;

    fn annotation(tag: Tag, tokens: TokenStream) -> Annotation {
        Annotation::parse(Site::attached(tag), Span::call_site(), tokens).unwrap()
    }

    fn render(arguments: &ResolvedArguments) -> Vec<(&'static str, String)> {
        arguments
            .labels()
            .map(|label| {
                let value = arguments.get(label).unwrap().to_token_stream().to_string();
                (label, value)
            })
            .collect()
    }

    #[rstest]
    #[case::name_fallback(
        quote!(description = "echoes"),
        vec![("name", "\"simple\""), ("description", "\"echoes\"")]
    )]
    #[case::explicit_name(
        quote!(name = "other", description = "echoes"),
        vec![("name", "\"other\""), ("description", "\"echoes\"")]
    )]
    #[case::schema(
        quote!(description = "d", input_schema = schema_value),
        vec![("name", "\"simple\""), ("description", "\"d\""), ("input_schema", "schema_value")]
    )]
    #[case::schema_alias(
        quote!(schema = schema_value, description = "d"),
        vec![("name", "\"simple\""), ("description", "\"d\""), ("input_schema", "schema_value")]
    )]
    fn resolve_tool(#[case] tokens: TokenStream, #[case] expected: Vec<(&str, &str)>) {
        let arguments = ArgumentSchema::tool(&parse_quote!(simple))
            .resolve(&annotation(Tag::Tool, tokens))
            .unwrap();

        let expected = expected
            .into_iter()
            .map(|(label, value)| (label, value.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(render(&arguments), expected);
    }

    #[test]
    fn raw_identifier_fallback() {
        let arguments = ArgumentSchema::tool(&parse_quote!(r#type))
            .resolve(&annotation(Tag::Tool, quote!(description = "d")))
            .unwrap();

        assert_eq!(arguments.lit_str("name").unwrap().unwrap().value(), "type");
    }

    #[rstest]
    #[case::tool_description(
        ArgumentSchema::tool(&parse_quote!(simple)),
        Tag::Tool,
        quote!(name = "n"),
        "#[tool] requires a `description` argument"
    )]
    #[case::resource_uri(
        ArgumentSchema::resource(&parse_quote!(file)),
        Tag::Resource,
        quote!(description = "d"),
        "#[resource] requires a `uri` argument"
    )]
    #[case::global_server_version(
        ArgumentSchema::global_server(false),
        Tag::GlobalServer,
        quote!(name = "n"),
        "#[global_server] requires a `version` argument"
    )]
    #[case::freestanding_name(
        ArgumentSchema::global_server(true),
        Tag::GlobalServer,
        quote!(version = "1"),
        "global_server_fns! requires a `name` argument"
    )]
    #[case::toolbox_description(
        ArgumentSchema::toolbox(),
        Tag::Toolbox,
        quote!(name = "n"),
        "#[toolbox] requires a `description` argument"
    )]
    #[case::param_description(
        ArgumentSchema::param(),
        Tag::Param,
        quote!(),
        "#[param] requires a `description` argument"
    )]
    #[case::unknown(
        ArgumentSchema::tool(&parse_quote!(simple)),
        Tag::Tool,
        quote!(description = "d", colour = "red"),
        "#[tool] does not accept a `colour` argument"
    )]
    #[case::duplicate(
        ArgumentSchema::tool(&parse_quote!(simple)),
        Tag::Tool,
        quote!(description = "d", description = "e"),
        "#[tool] was given the `description` argument more than once"
    )]
    #[case::duplicate_alias(
        ArgumentSchema::tool(&parse_quote!(simple)),
        Tag::Tool,
        quote!(description = "d", schema = a, input_schema = b),
        "#[tool] was given the `input_schema` argument more than once"
    )]
    #[case::positional(
        ArgumentSchema::tool(&parse_quote!(simple)),
        Tag::Tool,
        quote!("d"),
        "#[tool] arguments must be written as `label = value`"
    )]
    fn resolve_error(
        #[case] schema: ArgumentSchema,
        #[case] tag: Tag,
        #[case] tokens: TokenStream,
        #[case] expected: &str,
    ) {
        let error = schema.resolve(&annotation(tag, tokens)).unwrap_err();
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn server_defaults() {
        let arguments = ArgumentSchema::server()
            .resolve(&annotation(Tag::Server, quote!(version = "2.0")))
            .unwrap();

        assert_eq!(
            arguments.labels().collect::<Vec<_>>(),
            ["name", "version", "capabilities", "configuration", "generate_main"]
        );
        assert_eq!(
            arguments.lit_str("name").unwrap().unwrap().value(),
            "MCPServer"
        );
        assert_eq!(
            arguments.lit_str("version").unwrap().unwrap().value(),
            "2.0"
        );
        assert_eq!(arguments.lit_bool("generate_main").unwrap(), Some(true));
        assert!(arguments.is_explicit("version"));
        assert!(!arguments.is_explicit("generate_main"));
    }

    #[test]
    fn optional_arguments_stay_absent() {
        let arguments = ArgumentSchema::resource(&parse_quote!(file))
            .resolve(&annotation(Tag::Resource, quote!(uri = "file:///a")))
            .unwrap();

        assert!(arguments.get("description").is_none());
        assert!(arguments.get("mime_type").is_none());
        assert!(arguments.get("metadata").is_none());
        assert_eq!(arguments.labels().collect::<Vec<_>>(), ["name", "uri"]);
    }

    #[rstest]
    #[case::string(quote!(name = NAME, description = "d"), "name", "the `name` argument of #[toolbox] must be a string literal")]
    #[case::string_description(quote!(name = "n", description = 1), "description", "the `description` argument of #[toolbox] must be a string literal")]
    fn expected_literal(
        #[case] tokens: TokenStream,
        #[case] label: &'static str,
        #[case] expected: &str,
    ) {
        let arguments = ArgumentSchema::toolbox()
            .resolve(&annotation(Tag::Toolbox, tokens))
            .unwrap();

        assert_eq!(arguments.lit_str(label).unwrap_err().to_string(), expected);
    }

    #[test]
    fn expected_boolean() {
        let arguments = ArgumentSchema::server()
            .resolve(&annotation(Tag::Server, quote!(generate_main = "yes")))
            .unwrap();

        assert_eq!(
            arguments.lit_bool("generate_main").unwrap_err().to_string(),
            "the `generate_main` argument of #[server] must be a boolean literal"
        );
    }
}
