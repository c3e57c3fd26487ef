//! Expansion of `#[serving]`

use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{
    Attribute, Expr, ExprLit, FnArg, GenericArgument, GenericParam, Ident, ItemFn, Lit, Meta, Pat,
    PathArguments, PathSegment, Result, ReturnType, Token, Type, TypeParamBound,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
};

/// Catch-all parameter left out of the input schema; it always receives
/// an empty value.
const KWARGS: &str = "kwargs";

/// Traits whose `impl`/`dyn` forms are driven on the blocking pool.
const ITERATORS: &[&str] = &[
    "Iterator",
    "IntoIterator",
    "DoubleEndedIterator",
    "ExactSizeIterator",
];

/// Arguments of the attribute: nothing, `http` or `websocket`.
pub struct ServingArgs {
    websocket: bool,
}

impl Parse for ServingArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { websocket: false });
        }

        let transport: Ident = input.parse()?;
        let websocket = match transport.to_string().as_str() {
            "http" => false,
            "websocket" => true,
            _ => {
                return Err(syn::Error::new_spanned(
                    transport,
                    "expected `http` or `websocket`",
                ));
            }
        };
        Ok(Self { websocket })
    }
}

/// The annotated function.
pub struct ServingFn {
    item: ItemFn,
}

impl Parse for ServingFn {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self {
            item: input.parse()?,
        })
    }
}

/// What the function hands back, decided from its return type.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Value,
    Iter,
    Stream,
    Streamed,
}

impl Shape {
    fn of(ty: &Type) -> Self {
        match ty {
            Type::Paren(inner) => Self::of(&inner.elem),
            Type::Group(inner) => Self::of(&inner.elem),
            Type::ImplTrait(bounds) => Self::bounds(&bounds.bounds),
            Type::TraitObject(bounds) => Self::bounds(&bounds.bounds),
            Type::Path(path) => {
                let Some(segment) = path.path.segments.last() else {
                    return Self::Value;
                };
                match segment.ident.to_string().as_str() {
                    "StreamingResponse" => Self::Streamed,
                    "BoxStream" => Self::Stream,
                    "Box" | "Pin" => first_type_arg(segment).map_or(Self::Value, Self::of),
                    _ => Self::Value,
                }
            }
            _ => Self::Value,
        }
    }

    fn bounds(bounds: &Punctuated<TypeParamBound, Token![+]>) -> Self {
        let Some(name) = bounds.iter().find_map(|bound| match bound {
            TypeParamBound::Trait(t) => t.path.segments.last().map(|s| s.ident.to_string()),
            _ => None,
        }) else {
            return Self::Value;
        };

        if ITERATORS.contains(&name.as_str()) {
            Self::Iter
        } else if name == "Stream" {
            Self::Stream
        } else {
            Self::Value
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Value => "a value",
            Self::Iter => "an iterator",
            Self::Stream => "a stream",
            Self::Streamed => "StreamingResponse",
        }
    }
}

impl ServingFn {
    /// Keep the function and emit its registration module.
    pub fn expand(self, args: ServingArgs) -> Result<TokenStream> {
        let item = &self.item;
        let sig = &item.sig;
        let ident = &sig.ident;
        let name = ident.unraw().to_string();

        if let Some(param) = sig
            .generics
            .params
            .iter()
            .find(|p| !matches!(p, GenericParam::Lifetime(_)))
        {
            return Err(syn::Error::new_spanned(
                param,
                "served functions cannot be generic",
            ));
        }

        let description = description(&item.attrs);
        let mut builder = vec![quote! { .description(#description) }];
        let mut decode = Vec::new();
        let mut call_args = Vec::new();
        let mut context = None;
        let mut context_mut = false;
        let mut takes_args = false;

        for (idx, input) in sig.inputs.iter().enumerate() {
            let FnArg::Typed(pat_type) = input else {
                return Err(syn::Error::new_spanned(
                    input,
                    "methods cannot be served, use a free function",
                ));
            };
            let Pat::Ident(pat) = &*pat_type.pat else {
                return Err(syn::Error::new_spanned(
                    &pat_type.pat,
                    "served parameters must be plain identifiers",
                ));
            };
            let param = pat.ident.unraw().to_string();
            let ty = &*pat_type.ty;

            if is_context(ty) {
                if context.replace(param.clone()).is_some() {
                    return Err(syn::Error::new_spanned(
                        pat_type,
                        "only one Context parameter is allowed",
                    ));
                }
                builder.push(quote! { .context(#param) });
                call_args.push(match ty {
                    Type::Reference(r) if r.mutability.is_some() => {
                        context_mut = true;
                        quote! { &mut ctx }
                    }
                    Type::Reference(_) => quote! { &ctx },
                    _ => quote! { ctx },
                });
                continue;
            }

            if let Type::ImplTrait(_) = ty {
                return Err(syn::Error::new_spanned(
                    ty,
                    "`impl Trait` parameters cannot be decoded, name a concrete type",
                ));
            }

            let text = ty.to_token_stream().to_string();
            builder.push(quote! { .param(#param, #text) });

            let binding = format_ident!("arg{idx}");
            let (owned, pass, mutable) = match ty {
                Type::Reference(r) => {
                    let mutable = r.mutability.is_some();
                    let pass = if mutable {
                        quote! { &mut #binding }
                    } else {
                        quote! { &#binding }
                    };
                    (owned(&r.elem), pass, mutable)
                }
                other => (other.to_token_stream(), quote! { #binding }, false),
            };
            let mutability = mutable.then(|| quote! { mut });
            let value = if param == KWARGS {
                quote! { ::std::default::Default::default() }
            } else {
                takes_args = true;
                quote! { args.take(#param)? }
            };
            decode.push(quote! {
                let #mutability #binding: #owned = #value;
            });
            call_args.push(pass);
        }

        let (fallible, shape) = match &sig.output {
            ReturnType::Default => (false, Shape::Value),
            ReturnType::Type(_, ty) => {
                builder.push({
                    let text = ty.to_token_stream().to_string();
                    quote! { .returns(#text) }
                });
                match result_ok(ty) {
                    Some(ok) => (true, Shape::of(ok)),
                    None => (false, Shape::of(ty)),
                }
            }
        };

        if shape != Shape::Value && !args.websocket {
            return Err(syn::Error::new_spanned(
                &sig.output,
                format!(
                    "functions returning {} must be served with #[serving(websocket)]",
                    shape.describe()
                ),
            ));
        }
        if fallible && matches!(shape, Shape::Iter | Shape::Stream) {
            return Err(syn::Error::new_spanned(
                &sig.output,
                "lazy sequences cannot be wrapped in Result, yield the errors as elements instead",
            ));
        }
        if args.websocket {
            builder.push(quote! { .websocket() });
        }

        let call = quote! { super::#ident(#(#call_args),*) };
        let asyncness = sig.asyncness.is_some();
        let invoke = if asyncness {
            quote! { #call.await }
        } else {
            quote! { ::fnserve::run_blocking(move || #call).await? }
        };
        let produce = quote! { let ret = #invoke; };
        let body = match (shape, fallible) {
            (Shape::Value, false) => quote! { #produce ::fnserve::Reply::value(ret) },
            (Shape::Value, true) => quote! { #produce ::fnserve::Reply::from_result(ret) },
            (Shape::Streamed, false) => quote! { #invoke; ::fnserve::Reply::streamed() },
            (Shape::Streamed, true) => quote! { #produce ::fnserve::Reply::streamed_result(ret) },
            (Shape::Iter, _) if asyncness => {
                quote! { #produce ::fnserve::Reply::iter_blocking(move || ret) }
            }
            (Shape::Iter, _) => quote! { ::fnserve::Reply::iter_blocking(move || #call) },
            (Shape::Stream, _) => quote! { #produce ::fnserve::Reply::stream(ret) },
        };

        let args_ident = if takes_args {
            quote! { mut args }
        } else {
            quote! { _args }
        };
        let ctx_ident = match (context.is_some(), context_mut) {
            (true, true) => quote! { mut ctx },
            (true, false) => quote! { ctx },
            _ => quote! { _ctx },
        };

        let vis = &item.vis;
        let doc = format!("Registration of the served function `{name}`.");
        Ok(quote! {
            #item

            #[doc = #doc]
            #vis mod #ident {
                #[allow(unused_imports)]
                use super::*;

                /// Describe the function and wrap it in a handler.
                pub fn serving() -> ::fnserve::Serving {
                    let descriptor = ::fnserve::FunctionDescriptor::builder(#name)
                        #(#builder)*
                        .build();
                    ::fnserve::Serving::new(
                        descriptor,
                        |#args_ident: ::fnserve::Args, #ctx_ident: ::fnserve::Context| async move {
                            #(#decode)*
                            #body
                        },
                    )
                }
            }
        })
    }
}

/// Owned type decoded for a borrowed parameter: `str` → `String`,
/// `[T]` → `Vec<T>`, anything else as is.
fn owned(elem: &Type) -> TokenStream {
    match elem {
        Type::Path(path) if path.path.is_ident("str") => quote! { ::std::string::String },
        Type::Slice(slice) => {
            let elem = &slice.elem;
            quote! { ::std::vec::Vec<#elem> }
        }
        other => other.to_token_stream(),
    }
}

fn is_context(ty: &Type) -> bool {
    let ty = match ty {
        Type::Reference(r) => &*r.elem,
        other => other,
    };
    let Type::Path(path) = ty else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "Context")
}

fn result_ok(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    first_type_arg(segment)
}

fn first_type_arg(segment: &PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// Doc comment lines, one leading space stripped from each.
fn description(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(doc), ..
                }) => Some(doc.value()),
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').unwrap_or(&line).to_owned())
        .collect::<Vec<_>>()
        .join("\n")
}
