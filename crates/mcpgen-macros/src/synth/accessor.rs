use syn::{Expr, parse_quote};

use crate::{
    arguments::ArgumentSchema,
    diagnostic::Diagnostic,
    model::{Annotation, PropertyDecl, ResourceDescriptor, ToolDescriptor},
};

use super::{Expansion, Host, SynthesizedDeclaration};

impl ToolDescriptor {
    pub fn resolve(property: &PropertyDecl, annotation: &Annotation) -> Result<Self, Diagnostic> {
        let arguments = ArgumentSchema::tool(property.ident()).resolve(annotation)?;

        Ok(Self {
            name: arguments.required_lit_str("name")?,
            description: arguments.required("description")?.clone(),
            input_schema: arguments.get("input_schema").cloned(),
        })
    }

    /// Expression constructing the descriptor at runtime.
    pub fn construct(&self) -> Expr {
        let Self {
            name,
            description,
            input_schema,
            ..
        } = self;

        let input_schema: Expr = match input_schema {
            Some(input_schema) => parse_quote! {
                ::core::option::Option::Some(::core::convert::Into::into(#input_schema))
            },
            None => parse_quote!(::core::option::Option::None),
        };

        parse_quote! {
            ::mcpgen::Tool::new(#name, #description, #input_schema)
        }
    }
}

impl ResourceDescriptor {
    pub fn resolve(property: &PropertyDecl, annotation: &Annotation) -> Result<Self, Diagnostic> {
        let arguments = ArgumentSchema::resource(property.ident())
            .resolve(annotation)?;

        Ok(Self {
            name: arguments.required("name")?.clone(),
            uri: arguments.required("uri")?.clone(),
            description: arguments.get("description").cloned(),
            mime_type: arguments.get("mime_type").cloned(),
            metadata: arguments.get("metadata").cloned(),
        })
    }

    /// Expression constructing the descriptor at runtime.
    pub fn construct(&self) -> Expr {
        let Self { name, uri, .. } = self;

        let mut expr: Expr = parse_quote!(::mcpgen::Resource::new(#name, #uri));

        if let Some(description) = &self.description {
            expr = parse_quote!(#expr.with_description(#description));
        }
        if let Some(mime_type) = &self.mime_type {
            expr = parse_quote!(#expr.with_mime_type(#mime_type));
        }
        if let Some(metadata) = &self.metadata {
            expr = parse_quote!(#expr.with_metadata(#metadata));
        }

        expr
    }
}

/// Complete a `#[tool]` property with an accessor returning its descriptor.
pub fn tool(annotation: &Annotation, property: PropertyDecl) -> Result<Expansion, Diagnostic> {
    if !property.is_property() {
        return Err(Diagnostic::property_target(
            annotation.site,
            annotation.span,
        ));
    }

    let descriptor = ToolDescriptor::resolve(&property, annotation)?;
    let body = descriptor.construct();

    Ok(complete(property, body))
}

/// Complete a `#[resource]` property with an accessor returning its descriptor.
pub fn resource(annotation: &Annotation, property: PropertyDecl) -> Result<Expansion, Diagnostic> {
    if !property.is_property() {
        return Err(Diagnostic::property_target(
            annotation.site,
            annotation.span,
        ));
    }

    let descriptor = ResourceDescriptor::resolve(&property, annotation)?;
    let body = descriptor.construct();

    Ok(complete(property, body))
}

fn complete(property: PropertyDecl, body: Expr) -> Expansion {
    let accessor = property.clone().into_accessor(parse_quote!({ #body }));

    Expansion::new(Host::Property(property)).with(SynthesizedDeclaration::accessor(accessor))
}
