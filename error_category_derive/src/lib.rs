//! Implements `#[derive(ErrorCategory)]`, which generates an `error_category::ErrorCategory`
//! implementation from `#[category(..)]` attributes on the variants (or fields, for structs)
//! of an error type.

use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;
use syn::Data;
use syn::DeriveInput;
use syn::Fields;
use syn::Ident;
use syn::LitStr;

const ATTR: &str = "category";

enum Categorization {
    Fixed(Ident),
    Defer,
}

fn parse_categorization(attrs: &[syn::Attribute]) -> Categorization {
    for attr in attrs {
        if !attr.path().is_ident(ATTR) {
            continue;
        }

        let mut found = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("defer") {
                found = Some(Categorization::Defer);
            } else if let Some(ident) = meta.path.get_ident() {
                found = Some(Categorization::Fixed(ident.clone()));
            }
            Ok(())
        })
        .unwrap_or_else(|e| panic!("invalid #[category(..)] attribute: {e}"));

        if let Some(categorization) = found {
            return categorization;
        }
    }

    panic!("every variant of an ErrorCategory-derived enum must carry a #[category(..)] attribute")
}

fn category_expr(categorization: &Categorization, span: proc_macro2::Span) -> proc_macro2::TokenStream {
    match categorization {
        Categorization::Defer => quote! { ::error_category::ErrorCategory::category(__inner) },
        Categorization::Fixed(ident) => {
            let variant = match ident.to_string().as_str() {
                "expected" => quote! { Expected },
                "unexpected" => quote! { Unexpected },
                "pd" => quote! { PersonalData },
                "critical" => quote! { Critical },
                other => {
                    let msg = LitStr::new(&format!("unknown category `{other}`"), span);
                    return quote! { compile_error!(#msg) };
                }
            };
            quote! { ::error_category::Category::#variant }
        }
    }
}

/// Derives `error_category::ErrorCategory` for an error enum (or struct) by reading a
/// `#[category(expected | unexpected | pd | critical | defer)]` attribute on every variant.
///
/// `defer` requires the variant to hold exactly one unnamed field whose type itself
/// implements `ErrorCategory` (the common shape for `#[from]` wrapped source errors).
#[proc_macro_derive(ErrorCategory, attributes(category))]
pub fn derive_error_category(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .into_iter()
                .map(|variant| {
                    let categorization = parse_categorization(&variant.attrs);
                    let variant_ident = variant.ident;
                    let span = variant_ident.span();
                    let expr = category_expr(&categorization, span);
                    match (&variant.fields, &categorization) {
                        (Fields::Unnamed(fields), Categorization::Defer) if fields.unnamed.len() == 1 => {
                            quote! { Self::#variant_ident(__inner) => #expr, }
                        }
                        (Fields::Unnamed(_), _) => {
                            quote! { Self::#variant_ident(..) => #expr, }
                        }
                        (Fields::Named(_), _) => {
                            quote! { Self::#variant_ident { .. } => #expr, }
                        }
                        (Fields::Unit, _) => {
                            quote! { Self::#variant_ident => #expr, }
                        }
                    }
                })
                .collect::<Vec<_>>();
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(_) => {
            // A struct carries a single, type-level categorization (no per-field granularity).
            let categorization = parse_categorization(&input.attrs);
            let expr = match categorization {
                Categorization::Defer => panic!("#[category(defer)] is not supported on structs"),
                fixed => category_expr(&fixed, proc_macro2::Span::call_site()),
            };
            quote! { #expr }
        }
        Data::Union(_) => panic!("ErrorCategory cannot be derived for unions"),
    };

    let expanded = quote! {
        impl #impl_generics ::error_category::ErrorCategory for #name #ty_generics #where_clause {
            fn category(&self) -> ::error_category::Category {
                #body
            }
        }
    };

    expanded.into()
}
