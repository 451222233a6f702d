use std::collections::HashSet;

use syn::ImplItemFn;

use crate::model::AnnotatedDeclaration;

/// Names of the functions a type already declares. Generated functions with one of these names are
/// never emitted.
#[derive(Clone, Debug, Default)]
pub struct ExistingMembers(HashSet<String>);

impl ExistingMembers {
    pub fn of(declaration: &AnnotatedDeclaration) -> Self {
        Self(
            declaration
                .members
                .iter()
                .map(|member| member.name())
                .collect(),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Whether a generated function may be emitted.
    pub fn admit(&self, function: &ImplItemFn) -> bool {
        !self.contains(&function.sig.ident.to_string())
    }

    /// Keep only the functions that may be emitted, preserving their order.
    pub fn filter(&self, functions: impl IntoIterator<Item = ImplItemFn>) -> Vec<ImplItemFn> {
        functions
            .into_iter()
            .filter(|function| self.admit(function))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use syn::parse_quote;

    use crate::scan::scan;

    #[test]
    fn existing_functions_are_rejected() {
        let existing = ExistingMembers::of(&scan(&parse_quote! {
            impl Server {
                #[tool(description = "d")]
                fn echo() -> Tool;

                fn main() {}
            }
        }));

        assert!(existing.contains("main"));
        assert!(existing.contains("echo"));
        assert!(!existing.contains("setup_server"));

        let generated: [ImplItemFn; 4] = [
            parse_quote!(fn main() {}),
            parse_quote!(fn setup_server() {}),
            parse_quote!(fn echo() -> Tool { todo!() }),
            parse_quote!(fn initialize_tools() {}),
        ];
        let kept = existing.filter(generated);

        let names = kept
            .iter()
            .map(|function| function.sig.ident.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["setup_server", "initialize_tools"]);
    }
}
