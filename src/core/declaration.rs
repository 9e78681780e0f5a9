//! Declarative component input, as handed over by a configuration layer.
//!
//! ```json
//! {
//!   "sources": [{"id": "s1", "beanType": "Feed", "signature": "poll()", "outputFields": "feed"}],
//!   "processors": [{"beanType": "Words", "signature": "split(feed)", "outputFields": "word", "scatter": true}]
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::FieldValue;
use crate::core::compile::PipelineCompilation;
use crate::core::component::{BeanComponent, BeanProcessor, BeanSource};
use crate::core::context::ContextLoader;
use crate::error::Result;

/// One source or processor as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentDeclaration {
    pub id: Option<String>,
    pub bean_type: String,
    pub signature: String,
    /// Output field names separated by whitespace.
    pub output_fields: String,
    pub parallelism: Option<u32>,
    pub scatter: bool,
    pub output_stream: Option<String>,
    /// Binding expression per output field.
    pub bindings: BTreeMap<String, String>,
    /// Pause in milliseconds per invocation failure kind. Processors only.
    pub delays: BTreeMap<String, u64>,
}

impl ComponentDeclaration {
    pub fn output_field_names(&self) -> Vec<&str> {
        self.output_fields.split_whitespace().collect()
    }

    pub fn into_source(self, loader: Option<Arc<dyn ContextLoader>>) -> Result<BeanSource> {
        let mut source = BeanSource::new(&self.bean_type, &self.signature, self.output_field_names())?;
        self.configure(source.component_mut())?;
        if !self.delays.is_empty() {
            log::warn!("Delays of source '{}' are ignored", source.component().id());
        }
        if let Some(loader) = loader {
            source.set_context_loader(loader);
        }
        Ok(source)
    }

    pub fn into_processor(self, loader: Option<Arc<dyn ContextLoader>>) -> Result<BeanProcessor> {
        let mut processor = BeanProcessor::new(&self.bean_type, &self.signature, self.output_field_names())?;
        self.configure(processor.component_mut())?;
        for (kind, millis) in &self.delays {
            processor.set_delay(kind.as_str(), Duration::from_millis(*millis));
        }
        if let Some(loader) = loader {
            processor.set_context_loader(loader);
        }
        Ok(processor)
    }

    fn configure(&self, component: &mut BeanComponent) -> Result<()> {
        match &self.id {
            Some(id) => component.set_id(id.as_str()),
            None => log::warn!("Generated id '{}' for {}", component.id(), self.signature),
        }
        if let Some(stream) = &self.output_stream {
            component.set_output_stream_id(stream.as_str());
        }
        component.set_parallelism(self.parallelism);
        component.set_scatter_output(self.scatter);
        for (field, expression) in &self.bindings {
            component.bind_field(field, expression)?;
        }
        Ok(())
    }
}

fn anchor_default() -> bool {
    true
}

/// A whole deployment: its sources and processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyDeclaration {
    #[serde(default)]
    pub sources: Vec<ComponentDeclaration>,
    #[serde(default)]
    pub processors: Vec<ComponentDeclaration>,
    /// Whether processors anchor their output to the input record.
    #[serde(default = "anchor_default")]
    pub anchor: bool,
}

impl Default for TopologyDeclaration {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            processors: Vec::new(),
            anchor: anchor_default(),
        }
    }
}

impl TopologyDeclaration {
    pub fn from_value(value: FieldValue) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Builds every declared component and registers it for compilation.
    pub fn into_compilation(self, loader: Option<Arc<dyn ContextLoader>>) -> Result<PipelineCompilation> {
        let mut compilation = PipelineCompilation::new();
        for declaration in self.sources {
            compilation.add_source(declaration.into_source(loader.clone())?);
        }
        for declaration in self.processors {
            let mut processor = declaration.into_processor(loader.clone())?;
            processor.set_do_anchor(self.anchor);
            compilation.add_processor(processor);
        }
        Ok(compilation)
    }
}
