//! The `#[serving]` attribute.

use proc_macro::TokenStream;
use serving::{ServingArgs, ServingFn};
use syn::parse_macro_input;

mod serving;

/// Expose a free function as a fnserve route, for example
///
/// ```rust,ignore
/// /// Greet someone.
/// #[fnserve::serving]
/// fn greet(name: &str) -> String {
///     format!("hello, {name}")
/// }
/// ```
///
/// keeps `greet` as is and generates a sibling module
///
/// ```rust,ignore
/// mod greet {
///     use super::*;
///
///     pub fn serving() -> ::fnserve::Serving {
///         let descriptor = ::fnserve::FunctionDescriptor::builder("greet")
///             .description("Greet someone.")
///             .param("name", "& str")
///             .returns("String")
///             .build();
///         ::fnserve::Serving::new(descriptor, |mut args, _ctx| async move {
///             let arg0: String = args.take("name")?;
///             let ret = ::fnserve::run_blocking(move || super::greet(&arg0)).await?;
///             ::fnserve::Reply::value(ret)
///         })
///     }
/// }
/// ```
///
/// so the function is registered with `registry.register(greet::serving())`.
///
/// `#[serving(websocket)]` serves the function over a WebSocket session,
/// which functions returning an iterator, a stream, or `StreamingResponse`
/// require. A parameter typed `Context` or `&Context` receives the call
/// context instead of a request field. A parameter named `kwargs` is the
/// catch-all: it is not a request field and receives `Default::default()`,
/// so its type must implement `Default`. Synchronous functions run on the
/// blocking pool; async functions must return a `Send` future.
#[proc_macro_attribute]
pub fn serving(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ServingArgs);
    let serving = parse_macro_input!(item as ServingFn);
    serving
        .expand(args)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
