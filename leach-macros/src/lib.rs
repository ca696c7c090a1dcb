use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Procedural macro to derive the `Resource` marker trait.
///
/// Resources are singleton values stored in the `World` (the node field,
/// the round counter, the shared RNG). The derive only emits the marker impl;
/// the `Send + Sync + 'static` bounds are checked by the trait itself.
///
/// ```rust,ignore
/// use leach_core::Resource;
///
/// #[derive(Resource, Default)]
/// struct ClusterHeads(Vec<u32>);
/// ```
#[proc_macro_derive(Resource)]
pub fn derive_resource(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    if let syn::Data::Union(union) = &input.data {
        return syn::Error::new(union.union_token.span, "Resource cannot be derived for unions")
            .to_compile_error()
            .into();
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let krate = syn::Ident::new("leach_core", Span::call_site());

    let expanded = quote! {
        impl #impl_generics ::#krate::Resource for #name #ty_generics #where_clause {}
    };

    TokenStream::from(expanded)
}
