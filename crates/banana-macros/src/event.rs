//! `#[host_event(...)]` implementation.
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `owner` | `"Player"` | **Yes** | Type (or group) exposing the event |
//! | `name` | `"Joined"` | No | Event name (default: the type name) |
//!
//! The type gets a `HostEvent` impl and is appended to the process-wide
//! `HOST_EVENTS` slice.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, LitStr, spanned::Spanned};

#[derive(Default)]
pub struct HostEventArgs {
    owner: Option<LitStr>,
    name: Option<LitStr>,
}

impl HostEventArgs {
    pub fn parse(&mut self, meta: syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("owner") {
            self.owner = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("expected `owner` or `name`"));
        }
        Ok(())
    }
}

pub fn expand_host_event(args: HostEventArgs, item: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &item.ident;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "host events cannot be generic",
        ));
    }
    let owner = args.owner.ok_or_else(|| {
        syn::Error::new(ident.span(), "#[host_event] requires `owner = \"…\"`")
    })?;
    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let entry = format_ident!("__BANANA_HOST_EVENT_{}", ident.to_string().to_uppercase());

    Ok(quote! {
        #item

        impl ::banana::core::HostEvent for #ident {
            const OWNER: &'static str = #owner;
            const NAME: &'static str = #name;
        }

        #[::banana::core::linkme::distributed_slice(::banana::core::HOST_EVENTS)]
        #[linkme(crate = ::banana::core::linkme)]
        #[doc(hidden)]
        static #entry: ::banana::core::HostEventFn =
            <#ident as ::banana::core::HostEvent>::descriptor;
    })
}
