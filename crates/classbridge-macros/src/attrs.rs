//! Attribute parsing for `#[bridge(...)]`.

use syn::{Attribute, LitStr};

/// Parsed `#[bridge(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Canonical class name (default: Rust struct name)
    pub name: Option<String>,
}

/// Parsed `#[bridge(...)]` attributes on a field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// The field is the object's linkage
    pub linkage: bool,
    /// The field holds the embedded base class object
    pub base: bool,
}

impl TypeAttrs {
    /// Parse attributes from a list of `#[bridge(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bridge") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(syn::Error::new(value.span(), "class name cannot be empty"));
                    }
                    result.name = Some(value.value());
                } else {
                    return Err(meta.error(format!(
                        "unknown bridge attribute: {}",
                        meta.path
                            .get_ident()
                            .map(|i| i.to_string())
                            .unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    /// Parse attributes from a list of `#[bridge(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("bridge") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("linkage") {
                    result.linkage = true;
                } else if meta.path.is_ident("base") {
                    result.base = true;
                } else {
                    return Err(meta.error(format!(
                        "unknown bridge field attribute: {}",
                        meta.path
                            .get_ident()
                            .map(|i| i.to_string())
                            .unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}
