//! `banana_server!` and `banana_role!` declaration macros.
//!
//! Both take one or more `[vis] IDENT { key: value, … }` entries and emit a
//! `static` per entry, built with the const builders of `ServerProfile` and
//! `RoleDeclaration`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Expr, Ident, LitBool, LitStr, Token, Visibility, braced, bracketed,
    parse::{Parse, ParseStream, Result},
    punctuated::Punctuated,
};

// ─── Shared entry syntax ─────────────────────────────────────────────────────

/// `#[attrs] vis IDENT { body }`
struct Entry<B> {
    attrs: Vec<Attribute>,
    vis: Visibility,
    ident: Ident,
    body: B,
}

pub struct Entries<B>(Vec<Entry<B>>);

impl<B: Parse> Parse for Entries<B> {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut entries = Vec::new();
        while !input.is_empty() {
            let attrs = Attribute::parse_outer(input)?;
            let vis = input.parse()?;
            let ident = input.parse()?;
            let content;
            braced!(content in input);
            let body = content.parse()?;
            entries.push(Entry {
                attrs,
                vis,
                ident,
                body,
            });
            if input.peek(Token![;]) {
                input.parse::<Token![;]>()?;
            }
        }
        Ok(Self(entries))
    }
}

/// Parses `key: value` pairs separated by commas, calling `field` per key.
fn parse_fields(
    input: ParseStream,
    mut field: impl FnMut(&Ident, ParseStream) -> Result<()>,
) -> Result<()> {
    while !input.is_empty() {
        let key: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        field(&key, input)?;
        if input.is_empty() {
            break;
        }
        input.parse::<Token![,]>()?;
    }
    Ok(())
}

fn missing(key: &str, what: &str) -> syn::Error {
    syn::Error::new(
        proc_macro2::Span::call_site(),
        format!("{what} requires `{key}: …`"),
    )
}

// ─── banana_server! ──────────────────────────────────────────────────────────

pub struct ServerBody {
    kind: Option<LitStr>,
    name: Option<LitStr>,
    id: Option<LitStr>,
    port: Option<Expr>,
    obsolete: bool,
}

impl Parse for ServerBody {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut body = ServerBody {
            kind: None,
            name: None,
            id: None,
            port: None,
            obsolete: false,
        };
        parse_fields(input, |key, input| {
            match key.to_string().as_str() {
                "kind" => body.kind = Some(input.parse()?),
                "name" => body.name = Some(input.parse()?),
                "id" => body.id = Some(input.parse()?),
                "port" => body.port = Some(input.parse()?),
                "obsolete" => body.obsolete = input.parse::<LitBool>()?.value,
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown server key `{other}`; expected kind, name, id, port or obsolete"),
                    ));
                }
            }
            Ok(())
        })?;
        Ok(body)
    }
}

pub fn expand_servers(entries: Entries<ServerBody>) -> Result<TokenStream> {
    let mut out = TokenStream::new();
    for Entry {
        attrs,
        vis,
        ident,
        body,
    } in entries.0
    {
        let kind = body.kind.ok_or_else(|| missing("kind", "banana_server!"))?;
        let id = body.id.ok_or_else(|| missing("id", "banana_server!"))?;
        let port = body.port.ok_or_else(|| missing("port", "banana_server!"))?;
        let name = body.name.unwrap_or_else(|| kind.clone());
        let obsolete = body.obsolete.then(|| quote!(.obsolete()));

        out.extend(quote! {
            #(#attrs)*
            #vis static #ident: ::banana::framework::ServerProfile =
                ::banana::framework::ServerProfile::new(#kind, #name, #id, #port) #obsolete;
        });
    }
    Ok(out)
}

// ─── banana_role! ────────────────────────────────────────────────────────────

enum InheritEntry {
    Name(LitStr),
    Type(LitStr),
}

impl Parse for InheritEntry {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(Token![type]) {
            input.parse::<Token![type]>()?;
            Ok(Self::Type(input.parse()?))
        } else {
            Ok(Self::Name(input.parse()?))
        }
    }
}

#[derive(Default)]
pub struct RoleBody {
    name: Option<LitStr>,
    hierarchy: Option<Expr>,
    /// Builder calls, in the order written.
    calls: Vec<TokenStream>,
}

impl Parse for RoleBody {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut body = RoleBody::default();
        parse_fields(input, |key, input| {
            let call = match key.to_string().as_str() {
                "name" => {
                    body.name = Some(input.parse()?);
                    return Ok(());
                }
                "hierarchy" => {
                    body.hierarchy = Some(input.parse()?);
                    return Ok(());
                }
                "type_name" => {
                    let value: LitStr = input.parse()?;
                    quote!(.type_name(#value))
                }
                "nodes" => {
                    let content;
                    bracketed!(content in input);
                    let nodes: Punctuated<LitStr, Token![,]> =
                        content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
                    let nodes = nodes.iter();
                    quote!(.nodes(&[#(#nodes),*]))
                }
                "permissions" => {
                    let value: Expr = input.parse()?;
                    quote!(.permissions(::banana::core::PermissionFlags::from_bits(#value)))
                }
                "kick_power" => {
                    let value: Expr = input.parse()?;
                    quote!(.kick_power(#value))
                }
                "required_kick_power" => {
                    let value: Expr = input.parse()?;
                    quote!(.required_kick_power(#value))
                }
                "display_name" => {
                    let value: LitStr = input.parse()?;
                    quote!(.display_name(#value))
                }
                "badge_color" => {
                    let value: Ident = input.parse()?;
                    quote!(.badge_color(::banana::core::RoleColor::#value))
                }
                "cover" => {
                    let value: LitBool = input.parse()?;
                    quote!(.cover(#value))
                }
                "auto_hide" => {
                    let value: LitBool = input.parse()?;
                    quote!(.auto_hide(#value))
                }
                "inherits" => {
                    let content;
                    bracketed!(content in input);
                    let entries: Punctuated<InheritEntry, Token![,]> =
                        content.parse_terminated(InheritEntry::parse, Token![,])?;
                    let entries = entries.iter().map(|entry| match entry {
                        InheritEntry::Name(name) => quote!(::banana::framework::InheritRole::Name(#name)),
                        InheritEntry::Type(name) => quote!(::banana::framework::InheritRole::Type(#name)),
                    });
                    quote!(.inherits(&[#(#entries),*]))
                }
                "override_existing" => {
                    let value: LitBool = input.parse()?;
                    if !value.value {
                        return Ok(());
                    }
                    quote!(.override_existing())
                }
                "obsolete" => {
                    let value: LitBool = input.parse()?;
                    if !value.value {
                        return Ok(());
                    }
                    quote!(.obsolete())
                }
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown role key `{other}`"),
                    ));
                }
            };
            body.calls.push(call);
            Ok(())
        })?;
        Ok(body)
    }
}

pub fn expand_roles(entries: Entries<RoleBody>) -> Result<TokenStream> {
    let mut out = TokenStream::new();
    for Entry {
        attrs,
        vis,
        ident,
        body,
    } in entries.0
    {
        let name = body.name.ok_or_else(|| missing("name", "banana_role!"))?;
        let hierarchy = body
            .hierarchy
            .ok_or_else(|| missing("hierarchy", "banana_role!"))?;
        let calls = body.calls;

        out.extend(quote! {
            #(#attrs)*
            #vis static #ident: ::banana::framework::RoleDeclaration =
                ::banana::framework::RoleDeclaration::new(#name, #hierarchy) #(#calls)*;
        });
    }
    Ok(out)
}
