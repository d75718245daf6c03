use proc_macro2::TokenStream;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Error as SynError, Meta, Result as SynResult, Token, Type};

/// What the generated `Component::Constructed` should be.
#[derive(Debug)]
pub enum ConstructedKind {
    /// The component itself.
    SelfType,
    /// `Arc<Self>`.
    SharedSelf,
    /// `Arc<dyn Trait>` for the given trait object type.
    SharedAs(Type),
}

/// The scoping the component declares for itself.
#[derive(Debug, Clone, Copy)]
pub enum ScopingKind {
    NoScope,
    Singleton,
    EagerSingleton,
}

#[derive(Debug)]
pub struct AttributeData {
    pub constructed: ConstructedKind,
    pub scoping: ScopingKind,
}

pub fn parse_attributes(attr: TokenStream) -> SynResult<AttributeData> {
    let mut data = AttributeData {
        constructed: ConstructedKind::SelfType,
        scoping: ScopingKind::NoScope,
    };
    if attr.is_empty() {
        return Ok(data);
    }

    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(attr)?;
    for meta in metas {
        match &meta {
            Meta::Path(path) if path.is_ident("shared") => {
                data.constructed = ConstructedKind::SharedSelf;
            }
            Meta::List(list) if list.path.is_ident("shared") => {
                let ty: Type = syn::parse2(list.tokens.clone())?;
                data.constructed = ConstructedKind::SharedAs(ty);
            }
            Meta::Path(path) if path.is_ident("singleton") => {
                data.scoping = ScopingKind::Singleton;
            }
            Meta::Path(path) if path.is_ident("eager_singleton") => {
                data.scoping = ScopingKind::EagerSingleton;
            }
            other => {
                return Err(SynError::new(
                    other.span(),
                    "expects `shared`, `shared(dyn Trait)`, `singleton` or `eager_singleton`",
                ));
            }
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    #[test]
    fn parse_attributes_defaults_to_the_component_itself() {
        let data = parse_attributes(TokenStream::new()).unwrap();
        assert!(matches!(data.constructed, ConstructedKind::SelfType));
        assert!(matches!(data.scoping, ScopingKind::NoScope));
    }

    #[test]
    fn parse_attributes_reads_shared_and_scoping_flags() {
        let data = parse_attributes(quote!(shared, singleton)).unwrap();
        assert!(matches!(data.constructed, ConstructedKind::SharedSelf));
        assert!(matches!(data.scoping, ScopingKind::Singleton));

        let data = parse_attributes(quote!(eager_singleton)).unwrap();
        assert!(matches!(data.scoping, ScopingKind::EagerSingleton));
    }

    #[test]
    fn parse_attributes_reads_trait_object_targets() {
        let data = parse_attributes(quote!(shared(dyn Greeter))).unwrap();
        assert!(matches!(data.constructed, ConstructedKind::SharedAs(_)));
    }

    #[test]
    fn parse_attributes_rejects_unknown_arguments() {
        let err = parse_attributes(quote!(transient)).unwrap_err();
        assert!(err.to_string().contains("expects"));
    }
}
