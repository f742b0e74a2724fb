//! Type helpers for mapping Rust field types onto column data types.

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Column data type a Rust field type maps to.
///
/// Mirrors `pgrecord::DataType`; `None` means the type maps to no single column type and is
/// left unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    String,
    Integer,
    Double,
    Boolean,
    Array,
}

impl ColumnKind {
    pub fn variant(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
        }
    }
}

/// Map a field type to its column kind, looking through one `Option` layer.
pub fn column_kind(ty: &syn::Type) -> Option<ColumnKind> {
    let ty = option_inner(ty).unwrap_or(ty);
    let ty = match ty {
        syn::Type::Reference(reference) => reference.elem.as_ref(),
        other => other,
    };
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    let name = seg.ident.to_string();
    match name.as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => Some(ColumnKind::Integer),
        "f32" | "f64" => Some(ColumnKind::Double),
        "bool" => Some(ColumnKind::Boolean),
        "String" | "str" | "char" | "Cow" | "Uuid" | "NaiveDate" | "NaiveTime"
        | "NaiveDateTime" | "DateTime" => Some(ColumnKind::String),
        "Vec" | "Value" | "Map" | "HashMap" | "BTreeMap" | "HashSet" | "BTreeSet" => {
            Some(ColumnKind::Array)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_option_inner() {
        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(std::option::Option<i32>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(String);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn test_column_kind() {
        let ty: syn::Type = parse_quote!(i64);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Integer));

        let ty: syn::Type = parse_quote!(Option<u32>);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Integer));

        let ty: syn::Type = parse_quote!(f64);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Double));

        let ty: syn::Type = parse_quote!(bool);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Boolean));

        let ty: syn::Type = parse_quote!(chrono::DateTime<chrono::Utc>);
        assert_eq!(column_kind(&ty), Some(ColumnKind::String));

        let ty: syn::Type = parse_quote!(Option<uuid::Uuid>);
        assert_eq!(column_kind(&ty), Some(ColumnKind::String));

        let ty: syn::Type = parse_quote!(Vec<String>);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Array));

        let ty: syn::Type = parse_quote!(serde_json::Value);
        assert_eq!(column_kind(&ty), Some(ColumnKind::Array));

        let ty: syn::Type = parse_quote!(MyEnum);
        assert_eq!(column_kind(&ty), None);
    }
}
