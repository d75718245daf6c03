//! Attribute macros for the wirebox container.

mod attrs;
mod impls;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::Result as SynResult;

/// Generates a `Component` implementation from an annotated `impl` block.
///
/// The block must contain the injectable constructor: the associated
/// function marked `#[inject]`, or a zero-argument `new` when nothing is
/// marked. Constructor parameters may pick their key with `#[named("...")]`
/// or `#[qualified(...)]`, and the parameter types `Option<T>`,
/// `Deferred<T>` and `ProviderOf<T>` resolve through the matching injector
/// surfaces.
///
/// ```ignore
/// #[injectable(shared(dyn Service), singleton)]
/// impl ServiceImpl {
///     #[inject]
///     fn new(db: Arc<Database>, #[named("retries")] retries: i32) -> Self {
///         Self { db, retries }
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn injectable(attr: TokenStream, item: TokenStream) -> TokenStream {
    match injectable_impl(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn injectable_impl(attr: TokenStream2, item: TokenStream2) -> SynResult<TokenStream2> {
    let attr_data = attrs::parse_attributes(attr)?;
    let expanded = impls::expand_implementation(item, attr_data)?;
    Ok(expanded)
}
