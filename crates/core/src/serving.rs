//! Registration values: a descriptor plus a type-erased handler.

use crate::{
    Result, context::Context, descriptor::FunctionDescriptor, reply::Reply, schema::Args,
};
use futures_core::future::BoxFuture;
use std::{fmt, future::Future, sync::Arc};

/// A type-erased async function handler.
///
/// Receives validated arguments and the call context; decodes the arguments
/// into the function's parameter types and invokes it.
pub type Handler = Arc<dyn Fn(Args, Context) -> BoxFuture<'static, Result<Reply>> + Send + Sync>;

/// A function ready to be registered.
///
/// Produced by the `#[serving]` attribute, or by hand:
///
/// ```rust,ignore
/// let descriptor = FunctionDescriptor::builder("greet")
///     .param("name", "String")
///     .returns("String")
///     .build();
/// let serving = Serving::new(descriptor, |mut args, _ctx| async move {
///     let name: String = args.take("name")?;
///     Reply::value(format!("hello, {name}"))
/// });
/// ```
#[derive(Clone)]
pub struct Serving {
    /// What is being served.
    pub descriptor: FunctionDescriptor,
    /// How to call it.
    pub handler: Handler,
}

impl Serving {
    /// Pair a descriptor with its handler.
    pub fn new<F, Fut>(descriptor: FunctionDescriptor, handler: F) -> Self
    where
        F: Fn(Args, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |args, ctx| Box::pin(handler(args, ctx)));
        Self {
            descriptor,
            handler,
        }
    }
}

impl fmt::Debug for Serving {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serving")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
