use crate::imports::*;

pub fn approx_eq_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = match syn::parse(input) {
        Ok(ast) => ast,
        Err(err) => abort_call_site!("could not parse derive input: {}", err),
    };
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let fields = match &ast.data {
        syn::Data::Struct(s) => match &s.fields {
            syn::Fields::Named(named) => named.named.iter().cloned().collect::<Vec<_>>(),
            other => abort!(
                other.span(),
                "#[derive(ApproxEq)] requires named fields"
            ),
        },
        _ => abort_call_site!("#[derive(ApproxEq)] only works on structs"),
    };

    let field_names = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .collect::<Vec<_>>();

    let mut generated = TokenStream2::new();
    generated.append_all(quote! {
        impl #impl_generics ApproxEq for #name #ty_generics #where_clause {
            fn approx_eq(&self, other: &#name #ty_generics, tol: f64) -> bool {
                true #(&& self.#field_names.approx_eq(&other.#field_names, tol))*
            }
        }
    });
    generated.into()
}
