//! Entity derive macro implementation.

mod attrs;

use crate::common::syn_types::column_kind;
use attrs::{Timestamp, entity_attrs, field_attrs};
use heck::ToShoutySnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

struct EntityField {
    ident: syn::Ident,
    ty: syn::Type,
    name: String,
    column: String,
    skip: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let settings = entity_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut entity_fields = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let field_settings = field_attrs(field)?;
        let name = ident.unraw().to_string();
        entity_fields.push(EntityField {
            column: field_settings.column.unwrap_or_else(|| name.clone()),
            name,
            ident,
            ty: field.ty.clone(),
            skip: field_settings.skip,
        });
    }

    let mut seen = std::collections::HashSet::new();
    for field in entity_fields.iter().filter(|f| !f.skip) {
        if !seen.insert(field.column.as_str()) {
            return Err(syn::Error::new_spanned(
                &field.ident,
                format!("column `{}` is mapped by more than one field", field.column),
            ));
        }
    }

    let type_name = name.to_string();
    let table = match &settings.table {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };
    let primary_key = settings
        .primary_key
        .as_ref()
        .map(|pk| quote! { const PRIMARY_KEY: &'static str = #pk; });
    let created_at = timestamp_const(quote! { CREATED_AT }, &settings.created_at);
    let updated_at = timestamp_const(quote! { UPDATED_AT }, &settings.updated_at);
    let on_event = settings.on_event.as_ref().map(|path| {
        quote! {
            fn on_event(event: &::pgrecord::ModelEvent) -> ::pgrecord::HookAction {
                #path(event)
            }
        }
    });

    let stored: Vec<&EntityField> = entity_fields.iter().filter(|f| !f.skip).collect();

    let field_defs = stored.iter().map(|f| {
        let field_name = &f.name;
        let column = &f.column;
        let data_type = match column_kind(&f.ty) {
            Some(kind) => {
                let variant = format_ident!("{}", kind.variant());
                quote! { ::core::option::Option::Some(::pgrecord::DataType::#variant) }
            }
            None => quote! { ::core::option::Option::None },
        };
        quote! { ::pgrecord::FieldDef::new(#field_name, #column, #data_type) }
    });

    let handles = stored.iter().map(|f| {
        let const_name = format_ident!("{}", f.name.to_shouty_snake_case());
        let ty = &f.ty;
        let column = &f.column;
        let doc = format!("Typed handle to the `{}` column.", f.column);
        quote! {
            #[doc = #doc]
            pub const #const_name: ::pgrecord::Field<#ty> = ::pgrecord::Field::new(#column);
        }
    });

    let decoders = entity_fields.iter().map(|f| {
        let ident = &f.ident;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            let column = &f.column;
            quote! { #ident: ::pgrecord::entity::decode_entry(entries, #column)? }
        }
    });

    let encoders = stored.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! { ::pgrecord::entity::encode_entry(&mut entries, #column, &self.#ident)?; }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::pgrecord::Entity for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const TABLE: ::core::option::Option<&'static str> = #table;
            #primary_key
            #created_at
            #updated_at
            const FIELDS: &'static [::pgrecord::FieldDef] = &[#(#field_defs),*];

            #on_event
        }

        impl #impl_generics #name #ty_generics #where_clause {
            #(#handles)*
        }

        impl #impl_generics ::pgrecord::FromEntries for #name #ty_generics #where_clause {
            fn from_entries(entries: &::pgrecord::Row) -> ::pgrecord::OrmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#decoders),*
                })
            }
        }

        impl #impl_generics ::pgrecord::IntoEntries for #name #ty_generics #where_clause {
            fn into_entries(self) -> ::pgrecord::OrmResult<::pgrecord::Row> {
                let mut entries = ::pgrecord::Row::new();
                #(#encoders)*
                ::core::result::Result::Ok(entries)
            }
        }
    })
}

fn timestamp_const(name: TokenStream, setting: &Timestamp) -> Option<TokenStream> {
    match setting {
        Timestamp::Default => None,
        Timestamp::Column(column) => Some(quote! {
            const #name: ::core::option::Option<&'static str> =
                ::core::option::Option::Some(#column);
        }),
        Timestamp::Disabled => Some(quote! {
            const #name: ::core::option::Option<&'static str> = ::core::option::Option::None;
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn expands_constants_and_handles() {
        let input: DeriveInput = parse_quote! {
            #[record(table = "users", no_created_at)]
            struct User {
                id: Option<i64>,
                #[record(column = "display_name")]
                name: String,
                #[record(skip)]
                rank: u32,
            }
        };
        let out = expand(input).unwrap().to_string();
        assert!(out.contains("TYPE_NAME"));
        assert!(out.contains("\"User\""));
        assert!(out.contains("Some (\"users\")"));
        assert!(out.contains("const CREATED_AT"));
        assert!(!out.contains("const UPDATED_AT"));
        assert!(out.contains("pub const NAME : :: pgrecord :: Field < String >"));
        assert!(out.contains("FieldDef :: new (\"name\" , \"display_name\""));
        assert!(!out.contains("const RANK"));
        assert!(out.contains("rank : :: core :: default :: Default :: default ()"));
    }

    #[test]
    fn rejects_tuple_structs_and_duplicate_columns() {
        let input: DeriveInput = parse_quote! { struct Pair(i64, i64); };
        assert!(expand(input).is_err());

        let input: DeriveInput = parse_quote! {
            struct Clash {
                a: i64,
                #[record(column = "a")]
                b: i64,
            }
        };
        assert!(expand(input).is_err());
    }
}
