//! Function descriptors.
//!
//! A [`FunctionDescriptor`] is everything the adapter knows about a served
//! function: its name, its declared parameters and return type (as parsed
//! [`TypeAnnotation`]s), the transport it is served on, and its execution
//! mode. Descriptors are built once at registration and never mutated.

use crate::{annotation::TypeAnnotation, mode::ExecutionMode};
use heck::ToUpperCamelCase;
use serde::{Deserialize, Serialize};

/// Parameter name treated as the variadic catch-all.
pub const KWARGS: &str = "kwargs";

/// The transport a function is served on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// `POST /<name>`, one request, one response.
    #[default]
    Http,
    /// `GET /<name>` upgraded to a duplex WebSocket session.
    WebSocket,
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, also the request field name.
    pub name: String,
    /// Declared type.
    pub annotation: TypeAnnotation,
    /// Whether this parameter receives the call context instead of a
    /// request field. Context parameters are excluded from the schema.
    pub context: bool,
}

/// Immutable description of a served function.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    name: String,
    description: String,
    params: Vec<Param>,
    returns: Option<TypeAnnotation>,
    transport: Transport,
    mode: ExecutionMode,
}

impl FunctionDescriptor {
    /// Start describing the function `name`.
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            returns: None,
            transport: Transport::Http,
        }
    }

    /// Function name, used as the URL path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Route name: the function name in upper camel case, `greet_user` → `GreetUser`.
    pub fn route_name(&self) -> String {
        self.name.to_upper_camel_case()
    }

    /// URL path of the route, `/<name>`.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }

    /// Free-text description, empty when none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All declared parameters in order, context parameters included.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Parameters that map to request fields.
    pub fn fields(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| !p.context)
    }

    /// Declared return type, `None` when the function declares none.
    pub fn returns(&self) -> Option<&TypeAnnotation> {
        self.returns.as_ref()
    }

    /// Transport the function is served on.
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Execution mode derived from the return type.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }
}

/// Builder for [`FunctionDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    description: String,
    params: Vec<Param>,
    returns: Option<TypeAnnotation>,
    transport: Transport,
}

impl DescriptorBuilder {
    /// Set the free-text description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_owned();
        self
    }

    /// Append a parameter declared with the type written as `ty`.
    ///
    /// A parameter named `kwargs` is the catch-all and becomes a context
    /// parameter.
    pub fn param(mut self, name: impl Into<String>, ty: &str) -> Self {
        let name = name.into();
        let context = name == KWARGS;
        self.params.push(Param {
            name,
            annotation: TypeAnnotation::parse(ty),
            context,
        });
        self
    }

    /// Append the parameter that receives the call context.
    pub fn context(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            annotation: TypeAnnotation::parse("Context"),
            context: true,
        });
        self
    }

    /// Set the declared return type.
    pub fn returns(mut self, ty: &str) -> Self {
        self.returns = Some(TypeAnnotation::parse(ty));
        self
    }

    /// Serve over the given transport.
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Serve over a WebSocket session.
    pub fn websocket(self) -> Self {
        self.transport(Transport::WebSocket)
    }

    /// Finish the descriptor, classifying its execution mode.
    pub fn build(self) -> FunctionDescriptor {
        let mode = ExecutionMode::classify(self.returns.as_ref());
        FunctionDescriptor {
            name: self.name,
            description: self.description,
            params: self.params,
            returns: self.returns,
            transport: self.transport,
            mode,
        }
    }
}
