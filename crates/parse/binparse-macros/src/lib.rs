//! Proc-macro crate for `#[derive(FromBytes)]` and `#[derive(IntoBytes)]`.
//!
//! Both derives emit an `unsafe impl` of the matching `hadron_binparse` trait
//! together with compile-time assertions that every field type implements
//! the same trait. The layout requirements differ:
//!
//! - `FromBytes` accepts `#[repr(C)]` or `#[repr(C, packed)]`.
//! - `IntoBytes` requires `#[repr(C, packed)]`, since padding bytes would
//!   otherwise be exposed as uninitialized memory.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `hadron_binparse::FromBytes` for a `#[repr(C)]` struct.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Copy, FromBytes)]
/// #[repr(C, packed)]
/// pub struct SdtHeader {
///     pub signature: [u8; 4],
///     pub length: u32,
///     // ...
/// }
/// ```
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_marker(&input, Marker::FromBytes) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `hadron_binparse::IntoBytes` for a `#[repr(C, packed)]` struct.
#[proc_macro_derive(IntoBytes)]
pub fn derive_into_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_marker(&input, Marker::IntoBytes) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
    FromBytes,
    IntoBytes,
}

impl Marker {
    fn trait_ident(self) -> proc_macro2::Ident {
        match self {
            Self::FromBytes => format_ident!("FromBytes"),
            Self::IntoBytes => format_ident!("IntoBytes"),
        }
    }
}

/// The `repr` options found on the input type.
#[derive(Default)]
struct ReprInfo {
    c: bool,
    packed: bool,
}

fn parse_repr(input: &DeriveInput) -> ReprInfo {
    let mut info = ReprInfo::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                info.c = true;
            } else if meta.path.is_ident("packed") {
                info.packed = true;
            }
            Ok(())
        });
    }
    info
}

fn derive_marker(input: &DeriveInput, marker: Marker) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let trait_ident = marker.trait_ident();
    let repr = parse_repr(input);

    if !repr.c {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("{trait_ident} requires #[repr(C)] or #[repr(C, packed)]"),
        ));
    }
    if marker == Marker::IntoBytes && !repr.packed {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "IntoBytes requires #[repr(C, packed)] so the type has no padding",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("{trait_ident} can only be derived for structs"),
        ));
    };

    let field_types: Vec<(String, &syn::Type)> = match &data.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let label = f
                    .ident
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string);
                (label, &f.ty)
            })
            .collect(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| (i.to_string(), &f.ty))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let field_assertions = field_types.iter().map(|(label, ty)| {
        let assert_name = format_ident!("_Assert{}_{}_{}", trait_ident, name, label);
        quote! {
            #[doc(hidden)]
            #[allow(non_camel_case_types, dead_code)]
            struct #assert_name where #ty: hadron_binparse::#trait_ident;
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #(#field_assertions)*

        // SAFETY: The derive macro has verified:
        // 1. The struct has #[repr(C)] layout (and #[repr(packed)] for IntoBytes).
        // 2. All field types implement the same marker trait.
        // 3. The struct is Copy (enforced by the trait bound).
        unsafe impl #impl_generics hadron_binparse::#trait_ident
            for #name #ty_generics #where_clause {}
    })
}
