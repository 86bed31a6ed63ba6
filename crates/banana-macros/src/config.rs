//! `#[derive(BananaConfig)]` and `#[derive(ConfigEnum)]`.
//!
//! # Field attributes `#[banana(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `config` | `#[banana(config)]` | Marks the field as a configurable property |
//! | `key` | `key = "cooldown"` | Serialization key (default: the field name) |
//! | `default_for_server` | `default_for_server(kind = "Event", value = 2)` | Per-server default, by `kind` or `id`; repeatable |
//!
//! `key` and `default_for_server` imply `config`. Doc comments on a
//! property become its description.
//!
//! # Enum variant names
//!
//! `ConfigEnum` names each variant the way serde does, so persisted values
//! deserialize: `#[banana(rename = "...")]` first, then `#[serde(rename)]`,
//! then the enum's `#[serde(rename_all)]`, then the identifier.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Ident, LitStr, Type, spanned::Spanned};

// ============================================================================
// Attribute structures
// ============================================================================

enum ServerSelector {
    Kind(LitStr),
    Id(LitStr),
}

struct ServerDefault {
    selector: ServerSelector,
    value: Expr,
}

#[derive(Default)]
struct PropertyAttrs {
    config: bool,
    key: Option<LitStr>,
    server_defaults: Vec<ServerDefault>,
}

struct Property<'a> {
    field: &'a Ident,
    ty: &'a Type,
    key: String,
    description: Option<String>,
    server_defaults: Vec<ServerDefault>,
}

// ============================================================================
// BananaConfig
// ============================================================================

pub fn derive_banana_config(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => {
                return Ok(quote! {
                    impl #impl_generics ::banana::framework::Configurable for #name #ty_generics #where_clause {}
                });
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.span(),
                    "BananaConfig requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "BananaConfig can only be derived for structs",
            ));
        }
    };

    let mut properties = Vec::new();
    let mut seen = HashSet::new();
    for field in fields {
        let attrs = parse_property_attrs(&field.attrs)?;
        if !attrs.config {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let key = attrs
            .key
            .map(|k| k.value())
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        if !seen.insert(key.clone()) {
            return Err(syn::Error::new(
                field.span(),
                format!("duplicate config key `{key}`"),
            ));
        }
        properties.push(Property {
            field: ident,
            ty: &field.ty,
            key,
            description: doc_string(&field.attrs),
            server_defaults: attrs.server_defaults,
        });
    }

    if properties.is_empty() {
        return Ok(quote! {
            impl #impl_generics ::banana::framework::Configurable for #name #ty_generics #where_clause {}
        });
    }

    let table = properties.iter().map(property_entry);
    let keys: Vec<_> = properties.iter().map(|p| &p.key).collect();
    let fields: Vec<_> = properties.iter().map(|p| p.field).collect();

    Ok(quote! {
        impl #impl_generics ::banana::framework::Configurable for #name #ty_generics #where_clause {
            fn config_properties(&self) -> ::std::vec::Vec<::banana::framework::ConfigProperty> {
                ::std::vec![#(#table),*]
            }

            fn read_property(&self, key: &str) -> ::std::option::Option<::banana::core::Value> {
                match key {
                    #(#keys => ::banana::__private::serde_yaml::to_value(&self.#fields).ok(),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn write_property(
                &mut self,
                key: &str,
                value: ::banana::core::Value,
            ) -> ::banana::core::ConvertResult<()> {
                match key {
                    #(#keys => self.#fields = ::banana::__private::serde_yaml::from_value(value)?,)*
                    other => {
                        return ::std::result::Result::Err(
                            ::banana::core::ConvertError::UnknownProperty(other.to_string()),
                        );
                    }
                }
                ::std::result::Result::Ok(())
            }
        }
    })
}

fn property_entry(property: &Property<'_>) -> TokenStream {
    let key = &property.key;
    let ty = property.ty;
    let describe = property
        .description
        .as_ref()
        .map(|doc| quote!(.describe(#doc)));
    let defaults = property.server_defaults.iter().map(|default| {
        let selector = match &default.selector {
            ServerSelector::Kind(kind) => quote!(::banana::framework::ServerMatch::Kind(#kind)),
            ServerSelector::Id(id) => quote!(::banana::framework::ServerMatch::Id(#id)),
        };
        let value = &default.value;
        quote!(.server_default(#selector, #value))
    });

    quote! {
        ::banana::framework::ConfigProperty::new(
            #key,
            <#ty as ::banana::core::ConfigType>::type_tag(),
        )
        #describe
        #(#defaults)*
    }
}

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_property_attrs(attrs: &[Attribute]) -> syn::Result<PropertyAttrs> {
    let mut parsed = PropertyAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("banana") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("config") {
                parsed.config = true;
            } else if meta.path.is_ident("key") {
                parsed.key = Some(meta.value()?.parse()?);
                parsed.config = true;
            } else if meta.path.is_ident("default_for_server") {
                parsed.server_defaults.push(parse_server_default(&meta)?);
                parsed.config = true;
            } else {
                return Err(meta.error("expected `config`, `key` or `default_for_server`"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_server_default(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<ServerDefault> {
    let mut selector = None;
    let mut value = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("kind") {
            selector = Some(ServerSelector::Kind(inner.value()?.parse()?));
        } else if inner.path.is_ident("id") {
            selector = Some(ServerSelector::Id(inner.value()?.parse()?));
        } else if inner.path.is_ident("value") {
            value = Some(inner.value()?.parse::<Expr>()?);
        } else {
            return Err(inner.error("expected `kind`, `id` or `value`"));
        }
        Ok(())
    })?;

    let selector =
        selector.ok_or_else(|| meta.error("default_for_server requires `kind = \"…\"` or `id = \"…\"`"))?;
    let value = value.ok_or_else(|| meta.error("default_for_server requires `value = …`"))?;
    Ok(ServerDefault { selector, value })
}

/// Joins the `///` lines of an item, or `None` if it has none.
fn doc_string(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();
    (!lines.is_empty()).then(|| lines.join(" "))
}

// ============================================================================
// ConfigEnum
// ============================================================================

pub fn derive_config_enum(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new(
            input.span(),
            "ConfigEnum can only be derived for enums",
        ));
    };

    let rename_all = serde_rename_all(&input.attrs)?;
    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "ConfigEnum variants must be unit variants",
            ));
        }
        let mut rename: Option<LitStr> = None;
        for attr in &variant.attrs {
            if attr.path().is_ident("banana") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        rename = Some(meta.value()?.parse()?);
                        Ok(())
                    } else {
                        Err(meta.error("expected `rename`"))
                    }
                })?;
            }
        }
        let variant_name = match rename {
            Some(rename) => rename.value(),
            None => match serde_value(&variant.attrs, "rename")? {
                Some(rename) => rename.value(),
                None => {
                    let ident = variant.ident.to_string();
                    match &rename_all {
                        Some(rule) => apply_rename_rule(rule, &ident)?,
                        None => ident,
                    }
                }
            },
        };
        variants.push(variant_name);
    }

    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::banana::core::ConfigType for #name #ty_generics #where_clause {
            fn type_tag() -> ::banana::core::TypeTag {
                ::banana::core::TypeTag::Enum {
                    name: #type_name,
                    variants: &[#(#variants),*],
                }
            }
        }
    })
}

/// Reads `#[serde(rename_all = "...")]` from container attributes.
fn serde_rename_all(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    serde_value(attrs, "rename_all")
}

/// Finds `key = "..."` inside `#[serde(...)]`, skipping every other entry.
fn serde_value(attrs: &[Attribute], key: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) && meta.input.peek(syn::Token![=]) {
                found = Some(meta.value()?.parse()?);
            } else if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                meta.input.parse::<proc_macro2::Group>()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}

/// Applies a serde `rename_all` rule to a PascalCase variant identifier.
fn apply_rename_rule(rule: &LitStr, ident: &str) -> syn::Result<String> {
    let snake = {
        let mut out = String::new();
        for (i, ch) in ident.char_indices() {
            if ch.is_uppercase() && i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        }
        out
    };
    let renamed = match rule.value().as_str() {
        "lowercase" => ident.to_ascii_lowercase(),
        "UPPERCASE" => ident.to_ascii_uppercase(),
        "PascalCase" => ident.to_string(),
        "camelCase" => {
            let mut chars = ident.chars();
            chars
                .next()
                .map(|first| first.to_lowercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        }
        "snake_case" => snake,
        "SCREAMING_SNAKE_CASE" => snake.to_ascii_uppercase(),
        "kebab-case" => snake.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => snake.replace('_', "-").to_ascii_uppercase(),
        other => {
            return Err(syn::Error::new(
                rule.span(),
                format!("unsupported rename_all rule `{other}`"),
            ));
        }
    };
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(value: &str) -> LitStr {
        LitStr::new(value, proc_macro2::Span::call_site())
    }

    #[test]
    fn rename_rules_follow_serde() {
        let cases = [
            ("snake_case", "army_green"),
            ("SCREAMING_SNAKE_CASE", "ARMY_GREEN"),
            ("kebab-case", "army-green"),
            ("camelCase", "armyGreen"),
            ("lowercase", "armygreen"),
        ];
        for (name, expected) in cases {
            assert_eq!(apply_rename_rule(&rule(name), "ArmyGreen").unwrap(), expected);
        }
        assert!(apply_rename_rule(&rule("Title Case"), "ArmyGreen").is_err());
    }

    #[test]
    fn config_enum_reads_serde_renames() {
        let input: DeriveInput = syn::parse_quote! {
            #[derive(Serialize)]
            #[serde(rename_all = "snake_case", deny_unknown_fields)]
            enum Color {
                ArmyGreen,
                #[serde(rename = "hot-pink")]
                Pink,
                #[banana(rename = "Blue")]
                #[serde(rename = "Blue")]
                NavyBlue,
            }
        };
        let tokens = derive_config_enum(&input).unwrap().to_string();
        assert!(tokens.contains("\"army_green\""));
        assert!(tokens.contains("\"hot-pink\""));
        assert!(tokens.contains("\"Blue\""));
    }
}
