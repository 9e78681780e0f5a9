use std::fmt;
use std::sync::Arc;

use crate::core::component::{BeanComponent, ConfiguredComponent, ConfiguredSource, OutputCollector};
use crate::core::context::{BeanContext, ContextLoader, DeploymentConfig};
use crate::error::{Result, WireError};

/// A source polling a no-argument bean method for new records.
#[derive(Debug)]
pub struct BeanSource {
    component: BeanComponent,
}

impl BeanSource {
    pub fn new<I, S>(bean_type: impl Into<String>, invocation: &str, output_fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let component = BeanComponent::new(bean_type, invocation, output_fields)?;
        if !component.input_fields().is_empty() {
            return Err(WireError::Config(format!(
                "source signature {} must not take input fields",
                component.signature()
            )));
        }
        let source = Self { component };
        log::trace!("{} constructed", source);
        Ok(source)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.component.set_id(id);
        self
    }

    pub fn open(&mut self, config: &DeploymentConfig) -> Result<()> {
        self.component.init(config)
    }

    /// Invokes the bean once and emits every resulting record, unanchored.
    ///
    /// Invocation and projection failures are reported to the collector.
    /// Returns the number of records emitted.
    pub fn next_record(&self, collector: &mut dyn OutputCollector) -> Result<usize> {
        match self.component.invoke(&[]) {
            Ok(entries) => {
                if self.output_fields().is_empty() {
                    return Ok(0);
                }
                log::debug!("{} got {} records", self, entries.len());
                let count = entries.len();
                for output in entries {
                    collector.emit(self.output_stream_id(), None, output);
                }
                Ok(count)
            }
            Err(e @ (WireError::Invocation(_) | WireError::Projection(_))) => {
                collector.report_error(&e);
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    pub fn component(&self) -> &BeanComponent {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut BeanComponent {
        &mut self.component
    }

    pub fn set_context(&mut self, context: Arc<BeanContext>) {
        self.component.set_context(context);
    }

    pub fn set_context_loader(&mut self, loader: Arc<dyn ContextLoader>) {
        self.component.set_context_loader(loader);
    }
}

impl ConfiguredComponent for BeanSource {
    fn id(&self) -> &str {
        self.component.id()
    }

    fn output_stream_id(&self) -> &str {
        self.component.output_stream_id()
    }

    fn output_fields(&self) -> &[String] {
        self.component.output_fields()
    }

    fn parallelism(&self) -> Option<u32> {
        self.component.parallelism()
    }
}

impl ConfiguredSource for BeanSource {}

impl fmt::Display for BeanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[source '{}']", self.id())
    }
}
