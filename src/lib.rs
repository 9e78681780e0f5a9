//! # Fieldwire
//!
//! Wires record-processing components into pipelines by the fields they
//! consume and produce, and binds each component to a bean method through
//! overload resolution.
//!
//! ## Features
//!
//! - **Field-driven compilation**: processors join the first source line that provides all of their input fields
//! - **Pass-through calculation**: every processor learns what to forward for the processors after it
//! - **Overload resolution**: `name(arg, ...)` signatures bind to the uniquely comparable method of a type hierarchy
//! - **Result projection**: return values are scattered and mapped onto output fields, optionally via path expressions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fieldwire::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! let types = TypeTable::new().with(TypeDecl::class("Greeter").method(MethodDecl::new::<Greeter, _>(
//!     "greet",
//!     &["String"],
//!     "String",
//!     |_, args| Ok(format!("Hello {}", args[0].as_str().unwrap_or("you")).into()),
//! )));
//! let context = Arc::new(BeanContext::new("demo", types).with_bean("Greeter", Greeter));
//!
//! let mut greet = BeanProcessor::new("Greeter", "greet(name)", ["greeting"])?.with_id("greet");
//! greet.set_context(context);
//! greet.prepare(&DeploymentConfig::new())?;
//!
//! let mut compilation = PipelineCompilation::new();
//! compilation.add_source(RpcRequest::new("hello(name)")?);
//! compilation.add_processor(greet);
//! compilation.add_processor(RpcResponse::new("hello(name)", &["greeting"])?);
//! compilation.compile()?;
//! compilation.verify()?;
//! # Ok::<(), fieldwire::WireError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`compile`]: the pipeline compiler and the [`TopologyBuilder`] wiring seam
//! - [`component`]: configured sources and processors, records and collectors
//! - [`reflect`]: the type table, overload resolution and method binding
//! - [`project`]: scatter, field projection and binding expressions
//! - [`context`]: bean contexts and the per-deployment registry
//! - [`declaration`]: serde-deserializable component declarations
//! - [`prelude`]: commonly used types (import with `use fieldwire::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

pub mod core;
pub mod error;

pub use crate::core::{compile, component, context, declaration, project, reflect};

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use crate::core::signature::Signature;
pub use crate::core::{AsAny, FieldValue};
pub use error::{Result, WireError};

// Compilation
pub use crate::core::compile::{Line, PipelineCompilation, TopologyBuilder};
pub use crate::core::declaration::{ComponentDeclaration, TopologyDeclaration};

// Components
pub use crate::core::component::{
    BeanComponent, BeanProcessor, BeanSource, ConfiguredComponent, ConfiguredProcessor,
    ConfiguredSource, OutputCollector, Record, RpcRequest, RpcResponse,
};

// Binding
pub use crate::core::context::{BeanContext, ContextLoader, DeploymentConfig};
pub use crate::core::project::{Expression, FieldProjector};
pub use crate::core::reflect::resolver::{Binding, Candidate, MethodResolver};
pub use crate::core::reflect::{InvocationError, MethodDecl, TypeDecl, TypeKind, TypeTable};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Everything needed to declare, compile and run a pipeline.
///
/// # Example
/// ```rust
/// use fieldwire::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        BeanContext,
        BeanProcessor,
        BeanSource,
        // Components
        ConfiguredComponent,
        ConfiguredProcessor,
        ConfiguredSource,
        ContextLoader,
        DeploymentConfig,
        FieldValue,
        InvocationError,
        // Binding
        MethodDecl,
        OutputCollector,
        // Compilation
        PipelineCompilation,
        Record,
        RpcRequest,
        RpcResponse,
        Signature,
        TopologyBuilder,
        TopologyDeclaration,
        TypeDecl,
        TypeTable,
        WireError,
    };
    pub use crate::signature;
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
