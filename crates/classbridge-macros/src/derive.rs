//! Implementation of the `#[derive(NativeClass)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Member, parse_macro_input};

use crate::attrs::{FieldAttrs, TypeAttrs};

pub fn derive_native_class_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_native_class_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_native_class_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = TypeAttrs::from_attrs(&input.attrs)?;
    let canonical_name = attrs.name.unwrap_or_else(|| name.to_string());
    let fields = find_fields(input)?;
    let linkage = fields.linkage;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let forward_to_base = match fields.base {
        Some(base) => quote! {
            ::classbridge_core::NativeObject::upcast(::std::sync::Arc::clone(&self.#base), class)
        },
        None => quote! { ::std::option::Option::None },
    };

    Ok(quote! {
        impl #impl_generics ::classbridge_core::NativeObject for #name #ty_generics #where_clause {
            fn linkage(&self) -> &::classbridge_core::Linkage {
                &self.#linkage
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync>
            {
                self
            }

            fn upcast(
                self: ::std::sync::Arc<Self>,
                class: ::classbridge_core::TypeHash,
            ) -> ::std::option::Option<
                ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync>,
            > {
                if class == <Self as ::classbridge_core::NativeClass>::class_hash() {
                    return ::std::option::Option::Some(self);
                }
                #forward_to_base
            }
        }

        impl #impl_generics ::classbridge_core::NativeClass for #name #ty_generics #where_clause {
            const CANONICAL_NAME: &'static str = #canonical_name;
        }
    })
}

/// Fields the generated impls refer to.
struct BridgeFields {
    linkage: Member,
    base: Option<Member>,
}

/// Find the linkage field and the optional base field.
///
/// A field marked `#[bridge(linkage)]` wins; otherwise a field named
/// `linkage` is used. The base field must be an `Arc` of a native object.
fn find_fields(input: &DeriveInput) -> syn::Result<BridgeFields> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "NativeClass can only be derived for structs",
        ));
    };

    let mut marked = None;
    let mut named = None;
    let mut base = None;
    for (index, field) in data.fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(index.into()),
        };
        let attrs = FieldAttrs::from_attrs(&field.attrs)?;
        if attrs.linkage && attrs.base {
            return Err(syn::Error::new_spanned(
                field,
                "a field cannot be both the linkage and the base",
            ));
        }
        if attrs.base {
            if base.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be marked #[bridge(base)]",
                ));
            }
            base = Some(member);
        } else if attrs.linkage {
            if marked.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "only one field can be marked #[bridge(linkage)]",
                ));
            }
            marked = Some(member);
        } else if field.ident.as_ref().is_some_and(|ident| ident == "linkage") {
            named = Some(member);
        }
    }

    let linkage = marked.or(named).ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "NativeClass needs a `linkage: Linkage` field or a field marked #[bridge(linkage)]",
        )
    })?;
    Ok(BridgeFields { linkage, base })
}
