use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Ident, LitStr, Result, Token, Visibility, braced};

use proc_macro_crate::{FoundCrate, crate_name};

/// Namespace used when a location has no `namespace:` prefix.
const DEFAULT_NAMESPACE: &str = "minecraft";

struct KeyDef {
    attrs: Vec<Attribute>,
    name: Ident,
    location: LitStr,
}

struct TagKeysInput {
    attrs: Vec<Attribute>,
    vis: Visibility,
    module: Ident,
    registry: LitStr,
    keys: Vec<KeyDef>,
}

impl Parse for TagKeysInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let module: Ident = input.parse()?;
        input.parse::<Token![for]>()?;
        let registry: LitStr = input.parse()?;

        let content;
        braced!(content in input);
        let mut keys = Vec::new();
        while !content.is_empty() {
            let attrs = content.call(Attribute::parse_outer)?;
            let name: Ident = content.parse()?;
            content.parse::<Token![=]>()?;
            let location: LitStr = content.parse()?;
            content.parse::<Token![;]>()?;
            keys.push(KeyDef {
                attrs,
                name,
                location,
            });
        }

        Ok(Self {
            attrs,
            vis,
            module,
            registry,
            keys,
        })
    }
}

// =============================================================================
// Validation
// =============================================================================

fn is_valid_registry_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('/').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        })
}

/// Split `ns:path` (or bare `path`) into validated parts.
fn split_location(raw: &str) -> std::result::Result<(String, String), String> {
    let (namespace, path) = match raw.split_once(':') {
        Some((ns, path)) => (ns, path),
        None => (DEFAULT_NAMESPACE, raw),
    };
    if namespace.is_empty() {
        return Err(format!("`{raw}` has an empty namespace"));
    }
    if path.is_empty() {
        return Err(format!("`{raw}` has an empty path"));
    }
    if let Some(c) = namespace
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-'))
    {
        return Err(format!("`{raw}` has invalid namespace character {c:?}"));
    }
    if let Some(c) = path
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-' | '/'))
    {
        return Err(format!("`{raw}` has invalid path character {c:?}"));
    }
    Ok((namespace.to_owned(), path.to_owned()))
}

fn push_error(errors: &mut Option<syn::Error>, error: syn::Error) {
    match errors {
        Some(existing) => existing.combine(error),
        None => *errors = Some(error),
    }
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn tagpack_crate_path() -> TokenStream2 {
    match crate_name("bevy-tagpack") {
        Ok(FoundCrate::Itself) => quote!(::bevy_tagpack),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::bevy_tagpack),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Generate the key module, or every validation error found in `input`.
fn expand(input: TagKeysInput, krate: &TokenStream2) -> Result<TokenStream2> {
    let mut errors = None;

    let registry = input.registry.value();
    if !is_valid_registry_key(&registry) {
        push_error(
            &mut errors,
            syn::Error::new(
                input.registry.span(),
                format!("invalid registry key `{registry}`: expected `[a-z0-9_]` segments separated by `/`"),
            ),
        );
    }

    let mut seen_names: Vec<String> = Vec::new();
    let mut seen_locations: Vec<(String, String)> = Vec::new();
    let mut consts = Vec::new();

    for key in &input.keys {
        let name = key.name.to_string();
        if seen_names.contains(&name) {
            push_error(
                &mut errors,
                syn::Error::new(key.name.span(), format!("duplicate tag key `{name}`")),
            );
        }
        seen_names.push(name);

        let (namespace, path) = match split_location(&key.location.value()) {
            Ok(parts) => parts,
            Err(msg) => {
                push_error(&mut errors, syn::Error::new(key.location.span(), msg));
                continue;
            }
        };
        if seen_locations.contains(&(namespace.clone(), path.clone())) {
            push_error(
                &mut errors,
                syn::Error::new(
                    key.location.span(),
                    format!("tag `{namespace}:{path}` is declared more than once"),
                ),
            );
        }
        seen_locations.push((namespace.clone(), path.clone()));

        let attrs = &key.attrs;
        let ident = &key.name;
        consts.push(quote! {
            #(#attrs)*
            pub const #ident: #krate::TagId =
                #krate::TagId::from_static(REGISTRY, #namespace, #path);
        });
    }

    if let Some(errors) = errors {
        return Err(errors);
    }

    let TagKeysInput {
        attrs, vis, module, ..
    } = input;
    let names = input.keys.iter().map(|key| &key.name);
    let count = input.keys.len();

    Ok(quote! {
        #(#attrs)*
        #[allow(non_snake_case)]
        #vis mod #module {
            /// Registry these tags group elements of.
            pub const REGISTRY: &str = #registry;

            /// Number of declared tag keys.
            pub const COUNT: usize = #count;

            #(#consts)*

            /// Every declared tag key, in declaration order.
            #[allow(deprecated)]
            pub const ALL: &[#krate::TagId] = &[#(#names),*];
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare compile-time tag ids for one registry.
///
/// ```ignore
/// tag_keys! {
///     pub mod BlockTags for "block" {
///         /// Every log block.
///         LOGS = "minecraft:logs";
///         MINEABLE_AXE = "mineable/axe";
///         #[deprecated(note = "use LOGS")]
///         WOOD = "mymod:wood";
///     }
/// }
///
/// assert_eq!(BlockTags::LOGS, TagId::parse(RegistryKey::from_static("block"), "logs")?);
/// ```
///
/// Locations without a namespace use `minecraft`. Invalid locations, an
/// invalid registry key and duplicate names or locations are compile errors.
#[proc_macro]
pub fn tag_keys(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as TagKeysInput);
    let krate = tagpack_crate_path();
    match expand(input, &krate) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
