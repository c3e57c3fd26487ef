//! Core of fnserve: describing functions, synthesizing their schemas, and
//! the per-call context they run with.
//!
//! A served function is described by a [`FunctionDescriptor`] built from
//! the text of its declared types. From the descriptor the registry derives,
//! once, an [`InputSchema`], an [`OutputSchema`] and an [`ExecutionMode`];
//! the transports in `fnserve-gateway` only ever consult those cached values.

pub use {
    annotation::{AnnotationKind, TypeAnnotation},
    context::{Asker, AsyncStreamingHandler, Context, Human, Stdout, StreamingHandler},
    descriptor::{DescriptorBuilder, FunctionDescriptor, KWARGS, Param, Transport},
    env::{EnvGuard, EnvScope, Envs},
    error::{Error, Result},
    message::{CLOSE_CMD, HumanPrompt, Output},
    mode::{ExecutionMode, STREAMING_RESPONSE, StreamingResponse},
    registry::{RESERVED, Registry, Route, RouteInfo},
    reply::{Reply, Sequence, guarded, run_blocking},
    schema::{Args, ENVS, Field, InputSchema, Invocation, OutputSchema, result_type},
    serving::{Handler, Serving},
    ty::ValueType,
};

mod annotation;
mod context;
mod descriptor;
pub mod env;
mod error;
mod message;
mod mode;
mod registry;
mod reply;
mod schema;
mod serving;
mod ty;
