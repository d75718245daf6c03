use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{
    Attribute, Error as SynError, FnArg, GenericArgument, Ident, ImplItem, ItemImpl, LitStr,
    Meta, PathArguments, Result as SynResult, ReturnType, Signature, Type, TypePath,
};

use crate::attrs::{AttributeData, ConstructedKind, ScopingKind};

struct ConstructorData {
    self_type: TypePath,
    identifier: Ident,
    arguments: Vec<ArgumentData>,
    return_type: ReturnTypeData,
}

struct ArgumentData {
    shape: ArgumentShape,
    qualifier: QualifierData,
}

enum ArgumentShape {
    Plain(Type),
    Optional(Type),
    Deferred(Type),
    Provider(Type),
}

enum QualifierData {
    None,
    Named(LitStr),
    Qualified(TokenStream2),
}

enum ReturnTypeData {
    Infallible,
    Result { error_type: Type },
}

struct AttributeRemovalVisitor;

impl AttributeRemovalVisitor {
    fn is_custom_attribute(attr: &Attribute) -> bool {
        if let Meta::Path(path) = &attr.meta {
            if path.segments.first().is_some_and(|s| s.ident == "inject") {
                return true;
            }
        } else if let Meta::List(list) = &attr.meta {
            if let Some(s) = list.path.segments.first() {
                if s.ident == "named" || s.ident == "qualified" {
                    return true;
                }
            }
        }
        false
    }
}

impl VisitMut for AttributeRemovalVisitor {
    fn visit_attributes_mut(&mut self, attrs: &mut Vec<Attribute>) {
        attrs.retain(|attr| !Self::is_custom_attribute(attr));
        attrs
            .iter_mut()
            .for_each(|attr| visit_mut::visit_attribute_mut(self, attr));
    }
}

pub fn expand_implementation(
    impls: TokenStream2,
    attr_data: AttributeData,
) -> SynResult<TokenStream2> {
    let mut impls = match syn::parse2::<ItemImpl>(impls) {
        Ok(impls) => impls,
        Err(err) => {
            return Err(SynError::new(
                err.span(),
                "`#[injectable]` should be annotated on the `impl` block",
            ))
        }
    };

    let self_type = get_self_type(&impls)?;
    let signature = get_constructor_signature(&impls)?;
    let ctor_data = parse_constructor(self_type, &signature)?;

    let expanded = expand_component_implementation(ctor_data, attr_data);

    let mut visitor = AttributeRemovalVisitor;
    visitor.visit_item_impl_mut(&mut impls);

    Ok(quote! {
        #impls
        #expanded
    })
}

fn get_self_type(impls: &ItemImpl) -> SynResult<TypePath> {
    if let Type::Path(ty) = impls.self_ty.as_ref() {
        Ok(ty.clone())
    } else {
        Err(SynError::new(impls.self_ty.span(), "invalid self type"))
    }
}

fn get_constructor_signature(impls: &ItemImpl) -> SynResult<Signature> {
    let marked: Vec<&Signature> = impls
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(item_fn) => Some(item_fn),
            _ => None,
        })
        .filter(|item_fn| {
            item_fn
                .attrs
                .iter()
                .any(AttributeRemovalVisitor::is_custom_attribute)
        })
        .map(|item_fn| &item_fn.sig)
        .collect();

    let signature = match marked.len() {
        0 => impls
            .items
            .iter()
            .find_map(|item| match item {
                ImplItem::Fn(item_fn) if item_fn.sig.ident == "new" => Some(&item_fn.sig),
                _ => None,
            })
            .ok_or_else(|| {
                SynError::new(
                    impls.span(),
                    "expects an associated function annotated with `#[inject]`, \
                     or one named `new`",
                )
            })?,
        1 => marked[0],
        _ => {
            return Err(SynError::new(
                impls.span(),
                "only one associated function can be annotated with `#[inject]`",
            ))
        }
    };

    if signature.receiver().is_some() {
        return Err(SynError::new(
            signature.span(),
            "the injectable constructor cannot take `self`",
        ));
    }
    Ok(signature.clone())
}

fn parse_constructor(self_type: TypePath, signature: &Signature) -> SynResult<ConstructorData> {
    let mut arguments = Vec::new();
    for input in &signature.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(SynError::new(input.span(), "invalid constructor argument"));
        };
        arguments.push(ArgumentData {
            shape: parse_shape(&pat_type.ty),
            qualifier: parse_qualifier(&pat_type.attrs)?,
        });
    }

    Ok(ConstructorData {
        self_type,
        identifier: signature.ident.clone(),
        arguments,
        return_type: parse_return_type(&signature.output),
    })
}

fn parse_qualifier(attrs: &[Attribute]) -> SynResult<QualifierData> {
    for attr in attrs {
        let Meta::List(list) = &attr.meta else {
            continue;
        };
        let Some(segment) = list.path.segments.first() else {
            continue;
        };
        if segment.ident == "named" {
            let name: LitStr = syn::parse2(list.tokens.clone())?;
            return Ok(QualifierData::Named(name));
        }
        if segment.ident == "qualified" {
            return Ok(QualifierData::Qualified(list.tokens.clone()));
        }
    }
    Ok(QualifierData::None)
}

fn parse_shape(ty: &Type) -> ArgumentShape {
    if let Some((wrapper, inner)) = split_single_generic(ty) {
        match wrapper.to_string().as_str() {
            "Option" => return ArgumentShape::Optional(inner),
            "Deferred" => return ArgumentShape::Deferred(inner),
            "ProviderOf" => return ArgumentShape::Provider(inner),
            _ => {}
        }
    }
    ArgumentShape::Plain(ty.clone())
}

fn split_single_generic(ty: &Type) -> Option<(Ident, Type)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some((segment.ident.clone(), inner.clone()))
}

fn parse_return_type(output: &ReturnType) -> ReturnTypeData {
    let ReturnType::Type(_, ty) = output else {
        return ReturnTypeData::Infallible;
    };
    let Type::Path(path) = ty.as_ref() else {
        return ReturnTypeData::Infallible;
    };
    let Some(segment) = path.path.segments.last() else {
        return ReturnTypeData::Infallible;
    };
    if segment.ident != "Result" {
        return ReturnTypeData::Infallible;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return ReturnTypeData::Infallible;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty.clone()),
        _ => None,
    });
    let _ok = types.next();
    match types.next() {
        Some(error_type) => ReturnTypeData::Result { error_type },
        None => ReturnTypeData::Infallible,
    }
}

fn key_expression(ty: &Type, qualifier: &QualifierData) -> TokenStream2 {
    match qualifier {
        QualifierData::None => quote!(::wirebox::key::of::<#ty>()),
        QualifierData::Named(name) => quote!(::wirebox::key::named::<#ty>(#name)),
        QualifierData::Qualified(expr) => quote!(::wirebox::key::qualified::<#ty, _>(#expr)),
    }
}

fn expand_component_implementation(
    ctor: ConstructorData,
    attr_data: AttributeData,
) -> TokenStream2 {
    let mut bindings = Vec::new();
    let mut dependencies = Vec::new();
    let mut names = Vec::new();
    for (index, argument) in ctor.arguments.iter().enumerate() {
        let name = format_ident!("__arg{}", index);
        let (resolve, dependency) = match &argument.shape {
            ArgumentShape::Plain(ty) => {
                let key = key_expression(ty, &argument.qualifier);
                (
                    quote!(injector.get(#key)),
                    quote!(::wirebox::provider::component::Dependency::on(#key)),
                )
            }
            ArgumentShape::Optional(inner) => {
                let key = key_expression(inner, &argument.qualifier);
                (
                    quote!(injector.get_optional(#key)),
                    quote!(::wirebox::provider::component::Dependency::optional(#key)),
                )
            }
            ArgumentShape::Deferred(inner) => {
                let arc: Type = syn::parse_quote!(::std::sync::Arc<#inner>);
                let key = key_expression(&arc, &argument.qualifier);
                (
                    quote!(injector.get_deferred(#key)),
                    quote!(::wirebox::provider::component::Dependency::deferred(#key)),
                )
            }
            ArgumentShape::Provider(inner) => {
                let key = key_expression(inner, &argument.qualifier);
                (
                    quote!(injector.get_provider(#key)),
                    quote!(::wirebox::provider::component::Dependency::on(#key)),
                )
            }
        };
        bindings.push(quote!(let #name = #resolve?;));
        dependencies.push(dependency);
        names.push(name);
    }

    let self_type = &ctor.self_type;
    let identifier = &ctor.identifier;
    let (error_type, completion) = match &ctor.return_type {
        ReturnTypeData::Infallible => (
            quote!(::std::convert::Infallible),
            quote!(::std::result::Result::Ok(::std::result::Result::Ok(
                Self::#identifier(#(#names),*)
            ))),
        ),
        ReturnTypeData::Result { error_type } => (
            quote!(#error_type),
            quote!(::std::result::Result::Ok(Self::#identifier(#(#names),*))),
        ),
    };

    let constructed = match &attr_data.constructed {
        ConstructedKind::SelfType => quote!(Self),
        ConstructedKind::SharedSelf => quote!(::std::sync::Arc<Self>),
        ConstructedKind::SharedAs(ty) => quote!(::std::sync::Arc<#ty>),
    };
    let post_process = match &attr_data.constructed {
        ConstructedKind::SelfType => quote!(self),
        ConstructedKind::SharedSelf => quote!(::std::sync::Arc::new(self)),
        ConstructedKind::SharedAs(ty) => {
            quote!(::std::sync::Arc::new(self) as ::std::sync::Arc<#ty>)
        }
    };
    let scoping = match attr_data.scoping {
        ScopingKind::NoScope => TokenStream2::new(),
        ScopingKind::Singleton => quote! {
            fn scoping() -> ::wirebox::scope::Scoping {
                ::wirebox::scope::Scoping::Singleton
            }
        },
        ScopingKind::EagerSingleton => quote! {
            fn scoping() -> ::wirebox::scope::Scoping {
                ::wirebox::scope::Scoping::EagerSingleton
            }
        },
    };

    quote! {
        impl ::wirebox::provider::component::Component for #self_type {
            type Constructed = #constructed;

            type Error = #error_type;

            fn dependencies() -> ::std::vec::Vec<::wirebox::provider::component::Dependency> {
                ::std::vec![#(#dependencies),*]
            }

            #scoping

            fn construct<__I>(
                injector: &__I,
            ) -> ::std::result::Result<
                ::std::result::Result<Self, Self::Error>,
                ::wirebox::errors::ProvisionError,
            >
            where
                __I: ::wirebox::container::injector::TypedInjector + ?Sized,
            {
                #(#bindings)*
                #completion
            }

            fn post_process(self) -> Self::Constructed {
                #post_process
            }
        }
    }
}
