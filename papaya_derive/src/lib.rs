//! This crate only contains the `#[derive(Mapped)]` and `#[derive(Entity)]`
//! proc-macros for Papaya. For documentation, please see the main
//! [`papaya`][1] crate.
//!
//! [1]: https://docs.rs/papaya

#![doc(html_root_url = "https://docs.rs/papaya_derive/0.1.0")]
#![deny(missing_debug_implementations,
        trivial_casts, trivial_numeric_casts,
        unsafe_code,
        unused_import_braces, unused_qualifications)]

#[macro_use]
mod error;
mod case;
mod meta;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ Data, DeriveInput, Fields, GenericArgument, PathArguments, Type };
use syn::ext::IdentExt;
use self::error::{ Error, Result };
use self::meta::{ Embedded, container_attrs, field_attrs };

/// Container types the derive looks through when finding the type of an
/// embedded document.
const WRAPPER_TYPES: &[&str] = &[
    "Option", "Vec", "VecDeque", "LinkedList", "Box", "Rc", "Arc",
    "BTreeSet", "HashSet", "BinaryHeap",
];

/// Implements `papaya::mapping::Mapped`: one `Property` per serialized
/// field, named the way Serde names it.
#[proc_macro_derive(Mapped, attributes(papaya))]
pub fn derive_papaya_mapped(input: TokenStream) -> TokenStream {
    expand(input, impl_mapped)
}

/// Implements `papaya::mapping::Mapped` and `papaya::mapping::Entity`.
/// The collection name comes from `#[papaya(collection = "...")]`, or else
/// `#[serde(rename = "...")]`, or else the name of the type.
#[proc_macro_derive(Entity, attributes(papaya))]
pub fn derive_papaya_entity(input: TokenStream) -> TokenStream {
    expand(input, impl_entity)
}

/// Parses the input and reports errors as `compile_error!` invocations.
fn expand(input: TokenStream, imp: fn(&DeriveInput) -> Result<TokenStream2>) -> TokenStream {
    syn::parse::<DeriveInput>(input)
        .map_err(Error::from)
        .and_then(|ast| imp(&ast))
        .unwrap_or_else(|error| error.to_compile_error())
        .into()
}

/// Implements `Mapped` for the specified type.
fn impl_mapped(ast: &DeriveInput) -> Result<TokenStream2> {
    let ty = &ast.ident;
    let (impl_gen, ty_gen, where_clause) = ast.generics.split_for_impl();
    let container = container_attrs(&ast.attrs)?;

    let fields = match ast.data {
        Data::Struct(ref s) => &s.fields,
        _ => return Err(Error::spanned(ty, "only `struct`s can be `Mapped`")),
    };

    let named: Vec<&syn::Field> = match *fields {
        Fields::Named(ref named) => named.named.iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => return Err(Error::spanned(
            fields, "tuple structs have no named properties and can't be `Mapped`"
        )),
    };

    let mut properties = Vec::with_capacity(named.len());

    for field in named {
        let attrs = field_attrs(&field.attrs)?;

        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            return Err(Error::spanned(field, "`#[serde(flatten)]` fields can't be `Mapped`"));
        }

        let ident = match field.ident {
            Some(ref ident) => ident.unraw().to_string(),
            None => return err_fmt!("unnamed field in `{}`", ty),
        };
        let stored = match attrs.rename {
            Some(name) => name,
            None => match container.rename_all {
                Some(rule) => rule.apply_to_field(&ident),
                None => ident.clone(),
            },
        };

        let property = match attrs.embedded {
            None => quote! {
                ::papaya::mapping::Property::new(#ident, #stored)
            },
            Some(embedded) => {
                let nested = match embedded {
                    Embedded::Inferred => embedded_type(&field.ty).clone(),
                    Embedded::Explicit(nested) => nested,
                };
                quote! {
                    ::papaya::mapping::Property::embedded(
                        #ident,
                        #stored,
                        <#nested as ::papaya::mapping::Mapped>::properties,
                    )
                }
            }
        };

        properties.push(property);
    }

    Ok(quote! {
        impl #impl_gen ::papaya::mapping::Mapped for #ty #ty_gen #where_clause {
            fn properties() -> &'static [::papaya::mapping::Property] {
                static PROPERTIES: &[::papaya::mapping::Property] = &[
                    #(#properties,)*
                ];
                PROPERTIES
            }
        }
    })
}

/// Implements `Mapped` and `Entity` for the specified type.
fn impl_entity(ast: &DeriveInput) -> Result<TokenStream2> {
    let ty = &ast.ident;
    let (impl_gen, ty_gen, where_clause) = ast.generics.split_for_impl();
    let container = container_attrs(&ast.attrs)?;

    match ast.data {
        Data::Struct(_) => {}
        _ => return Err(Error::spanned(
            ty, "only `struct`s can be top-level entities; consider wrapping this type in a struct"
        )),
    }

    let mapped = impl_mapped(ast)?;
    let name = container.collection
        .or(container.rename)
        .unwrap_or_else(|| ty.unraw().to_string());
    let options = container.aggregate_options.map(|path| quote! {
        fn aggregate_options() -> ::papaya::options::AggregationOptions {
            #path()
        }
    });

    Ok(quote! {
        #mapped

        impl #impl_gen ::papaya::mapping::Entity for #ty #ty_gen #where_clause {
            const NAME: &'static str = #name;

            #options
        }
    })
}

/// The element type of a field holding embedded documents, e.g. `Address`
/// for `Option<Vec<Address>>`.
fn embedded_type(ty: &Type) -> &Type {
    match *ty {
        Type::Path(ref path) if path.qself.is_none() => {
            let inner = path.path.segments.last().and_then(|segment| {
                if !WRAPPER_TYPES.iter().any(|w| segment.ident == *w) {
                    return None;
                }
                match segment.arguments {
                    PathArguments::AngleBracketed(ref args) if args.args.len() == 1 => {
                        match args.args.first() {
                            Some(GenericArgument::Type(inner)) => Some(inner),
                            _ => None,
                        }
                    }
                    _ => None,
                }
            });

            inner.map_or(ty, embedded_type)
        }
        Type::Array(ref array) => embedded_type(&array.elem),
        Type::Slice(ref slice) => embedded_type(&slice.elem),
        Type::Reference(ref reference) => embedded_type(&reference.elem),
        Type::Paren(ref paren) => embedded_type(&paren.elem),
        Type::Group(ref group) => embedded_type(&group.elem),
        _ => ty,
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;
    use super::*;

    #[test]
    fn embedded_type_looks_through_wrappers() {
        let ty: Type = parse_quote!(Option<Vec<Box<Address>>>);
        let expected: Type = parse_quote!(Address);
        assert_eq!(embedded_type(&ty), &expected);

        let ty: Type = parse_quote!([LineItem; 4]);
        let expected: Type = parse_quote!(LineItem);
        assert_eq!(embedded_type(&ty), &expected);

        let ty: Type = parse_quote!(HashMap<String, Address>);
        assert_eq!(embedded_type(&ty), &ty);
    }

    #[test]
    fn entity_name_follows_serde_rename() {
        let ast: DeriveInput = parse_quote! {
            #[serde(rename = "orders")]
            struct Order { id: u32 }
        };
        let tokens = impl_entity(&ast).unwrap().to_string();

        assert!(tokens.contains("\"orders\""));
        assert!(tokens.contains("Mapped for Order"));
    }

    #[test]
    fn collection_attribute_wins_over_serde_rename() {
        let ast: DeriveInput = parse_quote! {
            #[serde(rename = "order")]
            #[papaya(collection = "orders_2024")]
            struct Order { id: u32 }
        };
        let tokens = impl_entity(&ast).unwrap().to_string();

        assert!(tokens.contains("\"orders_2024\""));
        assert!(!tokens.contains("\"order\""));
    }

    #[test]
    fn mapped_rejects_enums_and_tuple_structs() {
        let ast: DeriveInput = parse_quote! { enum Status { Active } };
        assert!(impl_mapped(&ast).is_err());

        let ast: DeriveInput = parse_quote! { struct Pair(u32, u32); };
        assert!(impl_mapped(&ast).is_err());
    }

    #[test]
    fn skipped_fields_have_no_property() {
        let ast: DeriveInput = parse_quote! {
            #[serde(rename_all = "camelCase")]
            struct Invoice {
                total_amount: f64,
                #[serde(skip)]
                cache: u32,
            }
        };
        let tokens = impl_mapped(&ast).unwrap().to_string();

        assert!(tokens.contains("\"totalAmount\""));
        assert!(!tokens.contains("\"cache\""));
    }
}
