//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[record(...)]` attributes.

use syn::ext::IdentExt;
use syn::{Attribute, Result};

/// One `key` or `key = "value"` item of a `#[record(...)]` list.
struct RecordItem {
    key: syn::Ident,
    value: Option<syn::LitStr>,
}

/// Helper struct for parsing a comma-separated `#[record(...)]` list
struct RecordList {
    items: Vec<RecordItem>,
}

impl syn::parse::Parse for RecordList {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut items = Vec::new();
        while !input.is_empty() {
            let key = syn::Ident::parse_any(input)?;
            let value = if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                Some(input.parse::<syn::LitStr>()?)
            } else {
                None
            };
            items.push(RecordItem { key, value });

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(Self { items })
    }
}

fn record_items(attrs: &[Attribute]) -> Result<Vec<RecordItem>> {
    let mut items = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        let list: RecordList = attr.parse_args()?;
        items.extend(list.items);
    }
    Ok(items)
}

fn required_value(item: &RecordItem) -> Result<String> {
    match &item.value {
        Some(lit) if !lit.value().is_empty() => Ok(lit.value()),
        Some(lit) => Err(syn::Error::new_spanned(
            lit,
            format!("`{}` must not be empty", item.key),
        )),
        None => Err(syn::Error::new_spanned(
            &item.key,
            format!("expected `{} = \"...\"`", item.key),
        )),
    }
}

fn reject_value(item: &RecordItem) -> Result<()> {
    match &item.value {
        Some(lit) => Err(syn::Error::new_spanned(
            lit,
            format!("`{}` takes no value", item.key),
        )),
        None => Ok(()),
    }
}

/// A timestamp column setting: inherited from the trait default, renamed, or switched off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Timestamp {
    Default,
    Column(String),
    Disabled,
}

/// Struct-level settings.
pub(super) struct EntityAttrs {
    pub table: Option<String>,
    pub primary_key: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub on_event: Option<syn::Path>,
}

pub(super) fn entity_attrs(attrs: &[Attribute]) -> Result<EntityAttrs> {
    let mut parsed = EntityAttrs {
        table: None,
        primary_key: None,
        created_at: Timestamp::Default,
        updated_at: Timestamp::Default,
        on_event: None,
    };

    for item in record_items(attrs)? {
        match item.key.to_string().as_str() {
            "table" => parsed.table = Some(required_value(&item)?),
            "primary_key" => parsed.primary_key = Some(required_value(&item)?),
            "created_at" => parsed.created_at = Timestamp::Column(required_value(&item)?),
            "updated_at" => parsed.updated_at = Timestamp::Column(required_value(&item)?),
            "no_created_at" => {
                reject_value(&item)?;
                parsed.created_at = Timestamp::Disabled;
            }
            "no_updated_at" => {
                reject_value(&item)?;
                parsed.updated_at = Timestamp::Disabled;
            }
            "no_timestamps" => {
                reject_value(&item)?;
                parsed.created_at = Timestamp::Disabled;
                parsed.updated_at = Timestamp::Disabled;
            }
            "on_event" => {
                let raw = required_value(&item)?;
                let path = syn::parse_str::<syn::Path>(&raw).map_err(|_| {
                    syn::Error::new_spanned(&item.key, format!("`{raw}` is not a path"))
                })?;
                parsed.on_event = Some(path);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    &item.key,
                    format!("unknown struct attribute `{other}`"),
                ));
            }
        }
    }

    Ok(parsed)
}

/// Field-level settings.
pub(super) struct FieldAttrs {
    pub column: Option<String>,
    pub skip: bool,
}

pub(super) fn field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut parsed = FieldAttrs {
        column: None,
        skip: false,
    };

    for item in record_items(&field.attrs)? {
        match item.key.to_string().as_str() {
            "column" => parsed.column = Some(required_value(&item)?),
            "skip" => {
                reject_value(&item)?;
                parsed.skip = true;
            }
            other => {
                return Err(syn::Error::new_spanned(
                    &item.key,
                    format!("unknown field attribute `{other}`"),
                ));
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_struct_settings() {
        let input: syn::DeriveInput = parse_quote! {
            #[record(table = "blog_posts", primary_key = "post_id")]
            #[record(no_created_at, updated_at = "modified", on_event = "hooks::post")]
            struct Post { post_id: i64 }
        };
        let attrs = entity_attrs(&input.attrs).unwrap();
        assert_eq!(attrs.table.as_deref(), Some("blog_posts"));
        assert_eq!(attrs.primary_key.as_deref(), Some("post_id"));
        assert_eq!(attrs.created_at, Timestamp::Disabled);
        assert_eq!(attrs.updated_at, Timestamp::Column("modified".into()));
        assert!(attrs.on_event.is_some());
    }

    #[test]
    fn rejects_unknown_and_empty_settings() {
        let input: syn::DeriveInput = parse_quote! {
            #[record(tabel = "x")]
            struct A { id: i64 }
        };
        assert!(entity_attrs(&input.attrs).is_err());

        let input: syn::DeriveInput = parse_quote! {
            #[record(table = "")]
            struct A { id: i64 }
        };
        assert!(entity_attrs(&input.attrs).is_err());

        let input: syn::DeriveInput = parse_quote! {
            #[record(no_timestamps = "yes")]
            struct A { id: i64 }
        };
        assert!(entity_attrs(&input.attrs).is_err());
    }

    fn fields(input: syn::DeriveInput) -> Vec<syn::Field> {
        match input.data {
            syn::Data::Struct(data) => data.fields.into_iter().collect(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn parses_field_settings() {
        let fields = fields(parse_quote! {
            struct User {
                #[record(column = "display_name")]
                name: String,
                #[record(skip)]
                rank: u32,
            }
        });
        let name = field_attrs(&fields[0]).unwrap();
        assert_eq!(name.column.as_deref(), Some("display_name"));
        assert!(!name.skip);
        assert!(field_attrs(&fields[1]).unwrap().skip);
    }
}
