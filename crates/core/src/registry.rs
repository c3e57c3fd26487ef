//! Route registry.
//!
//! Routes are keyed by function name and must have unique route names.
//! Registration is total: a function that cannot be registered is logged
//! and skipped, and the rest of the registry is unaffected.

use crate::{
    Error, Result,
    context::Context,
    descriptor::{FunctionDescriptor, Transport},
    mode::ExecutionMode,
    reply::Reply,
    schema::{Args, ENVS, InputSchema, OutputSchema},
    serving::{Handler, Serving},
};
use futures_core::future::BoxFuture;
use schemars::Schema;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Path segments served by the gateway itself.
pub const RESERVED: &[&str] = &["healthz", "dry_run", "routes"];

/// A registered function with its cached schemas.
#[derive(Clone)]
pub struct Route {
    name: String,
    descriptor: Arc<FunctionDescriptor>,
    input: Arc<InputSchema>,
    output: Arc<OutputSchema>,
    handler: Handler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Route {
    fn new(serving: Serving) -> Self {
        let Serving {
            descriptor,
            handler,
        } = serving;
        Self {
            name: descriptor.route_name(),
            input: Arc::new(InputSchema::synthesize(&descriptor)),
            output: Arc::new(OutputSchema::synthesize(&descriptor)),
            descriptor: Arc::new(descriptor),
            handler,
        }
    }

    /// Route name, e.g. `GreetUser`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL path, e.g. `/greet_user`.
    pub fn path(&self) -> String {
        self.descriptor.path()
    }

    /// The function descriptor.
    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Cached input schema.
    pub fn input(&self) -> &InputSchema {
        &self.input
    }

    /// Cached output schema.
    pub fn output(&self) -> &OutputSchema {
        &self.output
    }

    /// Execution mode fixed at registration.
    pub fn mode(&self) -> ExecutionMode {
        self.descriptor.mode()
    }

    /// Transport the route is served on.
    pub fn transport(&self) -> Transport {
        self.descriptor.transport()
    }

    /// Invoke the function with validated arguments.
    pub fn call(&self, args: Args, ctx: Context) -> BoxFuture<'static, Result<Reply>> {
        (self.handler)(args, ctx)
    }

    /// Introspection record of this route.
    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            name: self.name.clone(),
            path: self.path(),
            transport: self.transport(),
            mode: self.mode(),
            description: self.descriptor.description().to_owned(),
            input_schema: self.input.json_schema(),
            output_schema: self.output.json_schema(),
        }
    }
}

/// Serializable summary of a route, served by `GET /routes`.
#[derive(Debug, Clone, Serialize)]
pub struct RouteInfo {
    /// Route name.
    pub name: String,
    /// URL path.
    pub path: String,
    /// Transport.
    pub transport: Transport,
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Free-text description.
    pub description: String,
    /// Request body schema.
    pub input_schema: Schema,
    /// Output schema.
    pub output_schema: Schema,
}

/// All routes served by one process.
#[derive(Clone, Default)]
pub struct Registry {
    routes: BTreeMap<String, Route>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `serving`, or explain why it cannot be.
    pub fn try_register(&mut self, serving: Serving) -> Result<&Route> {
        let descriptor = &serving.descriptor;
        let name = descriptor.name().to_owned();
        if name.is_empty() {
            return Err(Error::Registration("function name is empty".into()));
        }
        if RESERVED.contains(&name.as_str()) {
            return Err(Error::Registration(format!(
                "/{name} is served by the gateway itself"
            )));
        }

        let route_name = descriptor.route_name();
        if self.routes.values().any(|route| route.name == route_name) {
            return Err(Error::Registration(format!(
                "route {route_name} already registered"
            )));
        }

        if descriptor.fields().any(|param| param.name == ENVS) {
            return Err(Error::Registration(format!(
                "{name}: parameter name `{ENVS}` is reserved for environment overrides"
            )));
        }

        if descriptor.transport() == Transport::Http && descriptor.mode().is_streaming() {
            return Err(Error::Registration(format!(
                "{name}: {:?} functions must be served over websocket",
                descriptor.mode()
            )));
        }

        let route = Route::new(serving);
        tracing::info!(
            "registered {:?} route {} at {} ({:?})",
            route.transport(),
            route.name(),
            route.path(),
            route.mode()
        );
        Ok(self.routes.entry(name).or_insert(route))
    }

    /// Register `serving`; on failure log the reason and skip it.
    ///
    /// A colliding name is a no-op: the first registration wins.
    pub fn register(&mut self, serving: Serving) -> Option<&Route> {
        let name = serving.descriptor.name().to_owned();
        match self.try_register(serving) {
            Ok(route) => Some(route),
            Err(e) => {
                tracing::warn!("skipping {name}: {e}");
                None
            }
        }
    }

    /// Look up a route by function name.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }

    /// All routes, ordered by function name.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
