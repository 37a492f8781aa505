//! Derive macros for syringe
//!
//! `#[derive(Blueprint)]` generates the slot table that tells a provider which
//! fields of a default-constructed struct to inject.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syringe::{Blueprint, ServiceCollection};
//!
//! trait Database: Send + Sync {}
//! trait Cache: Send + Sync {}
//! trait Users: Send + Sync {}
//! struct Config;
//!
//! #[derive(Default, Blueprint)]
//! #[provides(dyn Users)]
//! struct UserService {
//!     // `Option<Arc<dyn Trait>>` fields are injected automatically
//!     db: Option<Arc<dyn Database>>,
//!     // Resolution failure fails the whole UserService
//!     #[inject(required)]
//!     cache: Option<Arc<dyn Cache>>,
//!     // Concrete contracts need an explicit #[inject]
//!     #[inject]
//!     config: Option<Arc<Config>>,
//!     // Left alone, keeps its Default value
//!     request_count: u64,
//! }
//!
//! impl Users for UserService {}
//!
//! let services = ServiceCollection::new();
//! services.add_scoped::<dyn Users, UserService>();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Token, Type};

/// Derive macro for the `Blueprint` trait.
///
/// # Attributes
///
/// On fields:
///
/// - no attribute - `Option<Arc<dyn Trait>>` fields become best-effort slots,
///   everything else is left untouched
/// - `#[inject]` - best-effort slot for any `Option<Arc<T>>` field
/// - `#[inject(required)]` - slot whose failure fails the construction
/// - `#[inject(skip)]` - never inject this field
///
/// On the struct:
///
/// - `#[provides(dyn A, dyn B)]` - implement `Implements<dyn A>` and
///   `Implements<dyn B>` so the struct can be registered under those contracts
///
/// # Generated Code
///
/// ```rust,ignore
/// impl syringe::Blueprint for UserService {
///     const SLOTS: &'static [syringe::Slot<Self>] = &[
///         syringe::Slot::optional("db", syringe::ContractKey::of::<dyn Database>, Self::__syringe_assign_db),
///         syringe::Slot::required("cache", syringe::ContractKey::of::<dyn Cache>, Self::__syringe_assign_cache),
///     ];
/// }
/// ```
#[proc_macro_derive(Blueprint, attributes(inject, provides))]
pub fn derive_blueprint(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_blueprint(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_blueprint(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Blueprint can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Blueprint can only be derived for structs",
            ));
        }
    };

    let mut slots = Vec::new();
    let mut assigners = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let Some((contract, required)) = classify_field(&field.attrs, &field.ty)? else {
            continue;
        };

        let label = field_name.unraw().to_string();
        let assign = format_ident!("__syringe_assign_{}", field_name.unraw());
        let constructor = if required {
            quote!(required)
        } else {
            quote!(optional)
        };

        slots.push(quote! {
            ::syringe::Slot::#constructor(
                #label,
                ::syringe::ContractKey::of::<#contract>,
                Self::#assign,
            )
        });
        assigners.push(quote! {
            #[doc(hidden)]
            fn #assign(&mut self, instance: &::syringe::AnyArc) -> bool {
                ::syringe::assign_slot(&mut self.#field_name, instance)
            }
        });
    }

    let contracts = provided_contracts(&input.attrs)?;
    let upcasts = contracts.iter().map(|contract| {
        quote! {
            impl #impl_generics ::syringe::Implements<#contract> for #name #ty_generics #where_clause {
                #[inline]
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<#contract> {
                    self
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            #(#assigners)*
        }

        impl #impl_generics ::syringe::Blueprint for #name #ty_generics #where_clause {
            const SLOTS: &'static [::syringe::Slot<Self>] = &[
                #(#slots),*
            ];
        }

        #(#upcasts)*
    })
}

/// How a field is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectAttr {
    BestEffort,
    Required,
    Skip,
}

/// Find and parse the #[inject] attribute
fn find_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let mut found = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[inject] attribute"));
        }

        let parsed = if attr.meta.require_path_only().is_ok() {
            InjectAttr::BestEffort
        } else {
            let option: syn::Ident = attr.parse_args()?;
            if option == "required" {
                InjectAttr::Required
            } else if option == "skip" {
                InjectAttr::Skip
            } else {
                return Err(syn::Error::new_spanned(
                    option,
                    "expected `#[inject]`, `#[inject(required)]` or `#[inject(skip)]`",
                ));
            }
        };
        found = Some(parsed);
    }

    Ok(found)
}

/// Decide whether a field gets a slot: its contract type and whether it is required.
fn classify_field<'a>(attrs: &[Attribute], ty: &'a Type) -> syn::Result<Option<(&'a Type, bool)>> {
    let contract = extract_option_arc_inner_type(ty);

    match find_inject_attr(attrs)? {
        Some(InjectAttr::Skip) => Ok(None),
        Some(attr) => match contract {
            Some(contract) => Ok(Some((contract, attr == InjectAttr::Required))),
            None => Err(syn::Error::new_spanned(
                ty,
                "fields marked with #[inject] must have type Option<Arc<T>>",
            )),
        },
        // Interface-shaped fields are injected without asking
        None => Ok(contract
            .filter(|inner| matches!(inner, Type::TraitObject(_)))
            .map(|inner| (inner, false))),
    }
}

/// Contracts listed in #[provides(...)] attributes
fn provided_contracts(attrs: &[Attribute]) -> syn::Result<Vec<Type>> {
    let mut contracts = Vec::new();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("provides")) {
        let listed = attr.parse_args_with(Punctuated::<Type, Token![,]>::parse_terminated)?;
        if listed.is_empty() {
            return Err(syn::Error::new_spanned(
                attr,
                "#[provides(...)] needs at least one contract",
            ));
        }
        contracts.extend(listed);
    }

    Ok(contracts)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Option").and_then(extract_arc_inner_type)
}

/// First type argument of `Wrapper<T>`, matched on the last path segment
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
