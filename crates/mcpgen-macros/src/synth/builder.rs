use proc_macro2::Span;
use syn::{
    Attribute, Block, Expr, FnArg, Generics, Ident, ImplItemFn, ItemFn, ReturnType, Signature,
    Stmt, Token, Type, Visibility, parse_quote, punctuated::Punctuated, token,
};

/// Builds a function declaration from its parts, so generated code is assembled as typed nodes
/// rather than spliced text.
#[derive(Clone, Debug)]
pub struct FnBuilder {
    attrs: Vec<Attribute>,
    vis: Visibility,
    asyncness: bool,
    ident: Ident,
    generics: Generics,
    inputs: Punctuated<FnArg, Token![,]>,
    output: ReturnType,
    stmts: Vec<Stmt>,
}

impl FnBuilder {
    pub fn new(name: &str) -> Self {
        Self::ident(Ident::new(name, Span::call_site()))
    }

    pub fn ident(ident: Ident) -> Self {
        Self {
            attrs: Vec::new(),
            vis: Visibility::Inherited,
            asyncness: false,
            ident,
            generics: Generics::default(),
            inputs: Punctuated::new(),
            output: ReturnType::Default,
            stmts: Vec::new(),
        }
    }

    pub fn public(mut self) -> Self {
        self.vis = parse_quote!(pub);
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.asyncness = true;
        self
    }

    pub fn attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn generics(mut self, generics: Generics) -> Self {
        self.generics = generics;
        self
    }

    /// Take `&self` as the first parameter.
    pub fn with_ref_self(mut self) -> Self {
        self.inputs.insert(0, parse_quote!(&self));
        self
    }

    pub fn input(mut self, input: FnArg) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, ty: Type) -> Self {
        self.output = ReturnType::Type(Default::default(), Box::new(ty));
        self
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.stmts.push(stmt);
        self
    }

    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Stmt>) -> Self {
        self.stmts.extend(stmts);
        self
    }

    /// Finish the body with an expression whose value is returned.
    pub fn tail(mut self, expr: Expr) -> Self {
        self.stmts.push(Stmt::Expr(expr, None));
        self
    }

    fn signature(&self) -> Signature {
        Signature {
            constness: None,
            asyncness: self.asyncness.then(Default::default),
            unsafety: None,
            abi: None,
            fn_token: Default::default(),
            ident: self.ident.clone(),
            generics: self.generics.clone(),
            paren_token: token::Paren::default(),
            inputs: self.inputs.clone(),
            variadic: None,
            output: self.output.clone(),
        }
    }

    fn block(&self) -> Block {
        Block {
            brace_token: token::Brace::default(),
            stmts: self.stmts.clone(),
        }
    }

    /// Produce a function to be placed in an `impl` block.
    pub fn build_member(self) -> ImplItemFn {
        ImplItemFn {
            sig: self.signature(),
            block: self.block(),
            attrs: self.attrs,
            vis: self.vis,
            defaultness: None,
        }
    }

    /// Produce a free function.
    pub fn build_free(self) -> ItemFn {
        ItemFn {
            sig: self.signature(),
            block: Box::new(self.block()),
            attrs: self.attrs,
            vis: self.vis,
        }
    }
}
