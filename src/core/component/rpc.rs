use std::fmt;

use crate::core::component::{ConfiguredComponent, ConfiguredProcessor, ConfiguredSource};
use crate::core::signature::Signature;
use crate::error::{Result, WireError};

/// Output field used when the remote call takes no argument.
pub const IGNORE_ARGUMENTS: &str = "_ignoreArguments";

/// Field carrying the request context from [`RpcRequest`] to [`RpcResponse`].
pub fn context_field(signature: &Signature) -> String {
    format!("{}-rpc-ctx", signature.function())
}

/// Source of remote-call requests for one function.
///
/// Emits the call argument and the request context. The actual request
/// intake belongs to the delivery runtime.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    id: String,
    function: String,
    output_fields: Vec<String>,
    parallelism: Option<u32>,
}

impl RpcRequest {
    pub fn new(signature: &str) -> Result<Self> {
        let signature: Signature = signature.parse()?;
        let argument = match signature.arguments() {
            [] => IGNORE_ARGUMENTS.to_string(),
            [single] => single.clone(),
            _ => {
                return Err(WireError::Config(format!(
                    "remote call {} takes at most one argument",
                    signature
                )));
            }
        };

        Ok(Self {
            id: format!("{}-rpc-req", signature.function()),
            function: signature.function().to_string(),
            output_fields: vec![argument, context_field(&signature)],
            parallelism: None,
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn set_parallelism(&mut self, parallelism: Option<u32>) {
        self.parallelism = parallelism;
    }
}

impl ConfiguredComponent for RpcRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }
}

impl ConfiguredSource for RpcRequest {}

impl fmt::Display for RpcRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RpcRequest '{}'", self.function)
    }
}

/// Returns the result of a remote call to its requester.
///
/// Consumes the return field and the request context; produces nothing but
/// its pass-through fields.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    id: String,
    function: String,
    input_fields: Vec<String>,
    pass_through_fields: Vec<String>,
    parallelism: Option<u32>,
}

impl RpcResponse {
    pub fn new(signature: &str, return_fields: &[&str]) -> Result<Self> {
        let signature: Signature = signature.parse()?;
        let [return_field] = return_fields else {
            return Err(WireError::Config(format!(
                "remote call {} requires exactly one return field",
                signature
            )));
        };

        Ok(Self {
            id: format!("{}-rpc-rsp", signature.function()),
            function: signature.function().to_string(),
            input_fields: vec![return_field.to_string(), context_field(&signature)],
            pass_through_fields: Vec::new(),
            parallelism: None,
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn set_parallelism(&mut self, parallelism: Option<u32>) {
        self.parallelism = parallelism;
    }
}

impl ConfiguredComponent for RpcResponse {
    fn id(&self) -> &str {
        &self.id
    }

    fn output_fields(&self) -> &[String] {
        &[]
    }

    fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }
}

impl ConfiguredProcessor for RpcResponse {
    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn pass_through_fields(&self) -> &[String] {
        &self.pass_through_fields
    }

    fn set_pass_through_fields(&mut self, fields: Vec<String>) -> Result<()> {
        self.pass_through_fields = fields;
        Ok(())
    }
}

impl fmt::Display for RpcResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RpcResponse '{}'", self.function)
    }
}
