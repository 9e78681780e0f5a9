//! Configured components and the narrow interface of the delivery runtime.
//!
//! - [`ConfiguredSource`] / [`ConfiguredProcessor`] describe what the
//!   [`PipelineCompilation`](crate::core::compile::PipelineCompilation) matches on
//! - [`BeanSource`] and [`BeanProcessor`] invoke a bound bean method per record
//! - [`RpcRequest`] and [`RpcResponse`] frame a remote-call round trip
//! - [`Record`] and [`OutputCollector`] are what the delivery runtime hands in

pub mod bean;
pub mod processor;
pub mod rpc;
pub mod source;

pub use bean::BeanComponent;
pub use processor::BeanProcessor;
pub use rpc::{RpcRequest, RpcResponse};
pub use source::BeanSource;

use std::fmt;

use crate::core::{AsAny, FieldValue};
use crate::error::{Result, WireError};

/// Stream used when a component does not name one.
pub const DEFAULT_STREAM: &str = "default";

/// What every wired component exposes to the compiler and the wiring layer.
pub trait ConfiguredComponent: AsAny + fmt::Display + Send {
    /// Identifier, unique within a deployment.
    fn id(&self) -> &str;

    fn output_stream_id(&self) -> &str {
        DEFAULT_STREAM
    }

    fn output_fields(&self) -> &[String];

    fn parallelism(&self) -> Option<u32>;
}

/// A component originating records. It consumes no fields.
pub trait ConfiguredSource: ConfiguredComponent {}

/// A component consuming named fields and producing named fields.
pub trait ConfiguredProcessor: ConfiguredComponent {
    fn input_fields(&self) -> &[String];

    /// Fields copied from the input record after the output fields.
    fn pass_through_fields(&self) -> &[String];

    fn set_pass_through_fields(&mut self, fields: Vec<String>) -> Result<()>;
}

/// A record of named field values, as delivered by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<String>,
    values: Vec<FieldValue>,
}

impl Record {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
    {
        let (fields, values) = entries
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self { fields, values }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn value_by_field(&self, name: &str) -> Result<&FieldValue> {
        self.fields
            .iter()
            .position(|f| f == name)
            .map(|i| &self.values[i])
            .ok_or_else(|| WireError::MissingField(name.to_string()))
    }
}

/// Receives what a component produces for the delivery runtime.
pub trait OutputCollector {
    /// Emits `values` on `stream`, anchored to `anchor` when given so a failure
    /// downstream replays the input.
    fn emit(&mut self, stream: &str, anchor: Option<&Record>, values: Vec<FieldValue>);

    fn ack(&mut self, input: &Record);

    fn fail(&mut self, input: &Record);

    fn report_error(&mut self, error: &WireError);
}
