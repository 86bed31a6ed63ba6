//! Procedural macros for the Banana plugin framework.
//!
//! This crate provides:
//!
//! - `#[derive(BananaConfig)]` - Builds the configurable-property table of a feature
//! - `#[derive(ConfigEnum)]` - Gives a unit enum an enum-by-name type tag
//! - `#[host_event(...)]` - Declares a host event and registers it process-wide
//! - `banana_server! { ... }` / `banana_role! { ... }` - Static server and role declarations
//!
//! Expansions refer to the `banana` facade crate, so plugins depend on
//! `banana` rather than on this crate directly.

mod config;
mod declare;
mod event;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Configurable` from `#[banana(...)]` field attributes.
///
/// Only marked fields are part of the table; other fields are never read
/// from or written to the features file. The field type must implement
/// `ConfigType` and serde's `Serialize`/`Deserialize`.
///
/// # Example
///
/// ```rust,ignore
/// use banana::prelude::*;
///
/// #[derive(Default, BananaConfig)]
/// pub struct Cooldowns {
///     /// Seconds between two uses.
///     #[banana(config, default_for_server(kind = "Event", value = 2))]
///     pub cool_down_seconds: i64,
///
///     #[banana(key = "max_uses")]
///     pub uses: u32,
///
///     pub used: u32,
/// }
/// ```
#[proc_macro_derive(BananaConfig, attributes(banana))]
pub fn derive_banana_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match config::derive_banana_config(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `ConfigType` for a unit-only enum.
///
/// Persisted values match a variant by name, case-insensitively, or by
/// index. `#[banana(rename = "...")]` changes a variant's name.
#[proc_macro_derive(ConfigEnum, attributes(banana))]
pub fn derive_config_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match config::derive_config_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Declares a host event argument type.
///
/// ```rust,ignore
/// #[host_event(owner = "Player", name = "Joined")]
/// pub struct PlayerJoined {
///     pub nickname: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn host_event(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut parsed = event::HostEventArgs::default();
    let parser = syn::meta::parser(|meta| parsed.parse(meta));
    parse_macro_input!(args with parser);
    let item = parse_macro_input!(item as DeriveInput);

    match event::expand_host_event(parsed, &item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Declares `static` server profiles.
///
/// ```rust,ignore
/// banana_server! {
///     pub EU_MAIN { kind: "Main", name: "EU Main", id: "eu1", port: 7777 }
///     pub US_EVENT { kind: "Event", id: "us1", port: 8888 }
/// }
/// ```
///
/// `name` defaults to `kind`; `obsolete: true` hides the profile from
/// discovery.
#[proc_macro]
pub fn banana_server(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as declare::Entries<declare::ServerBody>);

    match declare::expand_servers(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Declares `static` roles.
///
/// ```rust,ignore
/// banana_role! {
///     pub MODERATOR {
///         name: "moderator",
///         hierarchy: 2,
///         nodes: ["demo.moderator"],
///         permissions: 0b10,
///         kick_power: 3,
///         badge_color: Pumpkin,
///         inherits: ["helper", type "AdminRole"],
///     }
/// }
/// ```
///
/// `name` and `hierarchy` are required. Other keys map onto the
/// `RoleDeclaration` builder; `override_existing` and `obsolete` take a bool.
#[proc_macro]
pub fn banana_role(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as declare::Entries<declare::RoleBody>);

    match declare::expand_roles(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
