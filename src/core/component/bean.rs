use std::fmt;
use std::sync::Arc;

use crate::core::FieldValue;
use crate::core::component::DEFAULT_STREAM;
use crate::core::context::{self, BeanContext, ContextLoader, DeploymentConfig};
use crate::core::project::{FieldProjector, scatter};
use crate::core::reflect::resolver::{Binding, MethodResolver};
use crate::core::signature::Signature;
use crate::error::{Result, WireError};

/// State shared by components that invoke a bean method: which bean, which
/// method, and how the result maps onto output fields.
pub struct BeanComponent {
    id: String,
    bean_type: String,
    signature: Signature,
    output_stream_id: String,
    parallelism: Option<u32>,
    scatter_output: bool,
    projector: FieldProjector,
    context: Option<Arc<BeanContext>>,
    loader: Option<Arc<dyn ContextLoader>>,
    resolver: MethodResolver,
    binding: Option<Binding>,
}

impl BeanComponent {
    /// Parses `invocation` (e.g. `"echo(in)"`) into the signature whose
    /// arguments name the input fields.
    pub fn new<I, S>(bean_type: impl Into<String>, invocation: &str, output_fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signature: Signature = invocation.parse()?;
        Ok(Self {
            id: format!("autogen_{}", uuid::Uuid::new_v4().simple()),
            bean_type: bean_type.into(),
            signature,
            output_stream_id: DEFAULT_STREAM.to_string(),
            parallelism: None,
            scatter_output: false,
            projector: FieldProjector::new(output_fields),
            context: None,
            loader: None,
            resolver: MethodResolver::new(),
            binding: None,
        })
    }

    /// Binds the signature, obtains the deployment context and checks the
    /// bean exists.
    pub fn init(&mut self, config: &DeploymentConfig) -> Result<()> {
        log::debug!("Prepare {}", self.id);

        let context = match &self.context {
            Some(context) => Arc::clone(context),
            None => {
                let loader = self.loader.as_deref().ok_or_else(|| {
                    WireError::Context(format!("No context or context loader for '{}'", self.id))
                })?;
                let context = context::get_or_create(config, loader)?;
                self.context = Some(Arc::clone(&context));
                context
            }
        };

        let binding = self
            .resolver
            .bind(context.types(), &self.bean_type, &self.signature)?;
        log::info!("'{}' uses {}", self.id, binding.candidate());

        // Fail-fast
        context.bean(&self.bean_type)?;
        self.binding = Some(binding);
        Ok(())
    }

    /// Invokes the bound method and maps the result onto the output fields.
    ///
    /// Yields one entry per emitted record: the scattered elements when
    /// scattering, otherwise the single result. Without output fields there is
    /// exactly one empty entry.
    pub fn invoke(&self, arguments: &[FieldValue]) -> Result<Vec<Vec<FieldValue>>> {
        let (binding, context) = match (&self.binding, &self.context) {
            (Some(binding), Some(context)) => (binding, context),
            _ => return Err(WireError::NotPrepared(self.id.clone())),
        };

        let bean = context.bean(&self.bean_type)?;
        let returned = binding.invoke(context.types(), &bean.concrete, &bean.instance, arguments)?;

        if self.projector.fields().is_empty() {
            return Ok(vec![Vec::new()]);
        }

        let entries = if self.scatter_output {
            scatter(returned)
        } else {
            vec![returned]
        };
        entries.iter().map(|entry| self.projector.project(entry)).collect()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn bean_type(&self) -> &str {
        &self.bean_type
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn input_fields(&self) -> &[String] {
        self.signature.arguments()
    }

    pub fn output_fields(&self) -> &[String] {
        self.projector.fields()
    }

    pub fn output_stream_id(&self) -> &str {
        &self.output_stream_id
    }

    pub fn set_output_stream_id(&mut self, stream: impl Into<String>) {
        self.output_stream_id = stream.into();
    }

    pub fn parallelism(&self) -> Option<u32> {
        self.parallelism
    }

    pub fn set_parallelism(&mut self, parallelism: Option<u32>) {
        self.parallelism = parallelism;
    }

    /// Sets whether items of array returns are emitted as individual records.
    pub fn set_scatter_output(&mut self, scatter: bool) {
        self.scatter_output = scatter;
    }

    pub fn bind_field(&mut self, field: &str, expression: &str) -> Result<()> {
        self.projector.bind(field, expression)
    }

    pub fn set_context(&mut self, context: Arc<BeanContext>) {
        self.context = Some(context);
    }

    pub fn set_context_loader(&mut self, loader: Arc<dyn ContextLoader>) {
        self.loader = Some(loader);
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }
}

impl fmt::Debug for BeanComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanComponent")
            .field("id", &self.id)
            .field("bean_type", &self.bean_type)
            .field("signature", &self.signature)
            .field("output_fields", &self.projector.fields())
            .finish()
    }
}
