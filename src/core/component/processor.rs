use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::FieldValue;
use crate::core::component::{
    BeanComponent, ConfiguredComponent, ConfiguredProcessor, OutputCollector, Record,
};
use crate::core::context::{BeanContext, ContextLoader, DeploymentConfig};
use crate::error::{Result, WireError};

/// A processor invoking a bean method per input record.
///
/// The arguments are the input fields named by the signature. Each result entry
/// is emitted with the pass-through fields appended, then the input is acked.
/// A failing invocation fails the input instead.
#[derive(Debug)]
pub struct BeanProcessor {
    component: BeanComponent,
    pass_through_fields: Vec<String>,
    do_anchor: bool,
    delays: HashMap<String, Duration>,
}

impl BeanProcessor {
    pub fn new<I, S>(bean_type: impl Into<String>, invocation: &str, output_fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            component: BeanComponent::new(bean_type, invocation, output_fields)?,
            pass_through_fields: Vec::new(),
            do_anchor: true,
            delays: HashMap::new(),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.component.set_id(id);
        self
    }

    pub fn prepare(&mut self, config: &DeploymentConfig) -> Result<()> {
        log::trace!("{} init", self);
        self.component.init(config)
    }

    /// The stream and field names this processor emits: the output fields
    /// followed by the pass-through fields.
    pub fn declare_output_fields(&self) -> (String, Vec<String>) {
        let names: Vec<String> = self
            .output_fields()
            .iter()
            .chain(&self.pass_through_fields)
            .cloned()
            .collect();
        let stream = self.output_stream_id().to_string();
        log::info!("{} declares {:?} for stream '{}'", self, names, stream);
        (stream, names)
    }

    /// Processes one input record.
    ///
    /// Failures of the invocation or of the projection are contained to
    /// `input`: it is failed on the collector and `Ok` is returned. Only a
    /// record lacking one of the declared fields or an unprepared processor
    /// yields `Err`, before anything reaches the collector.
    pub fn execute(&self, input: &Record, collector: &mut dyn OutputCollector) -> Result<()> {
        log::trace!("{} execute", self);

        let arguments = self.collect(input, self.component.input_fields())?;
        let passed = self.collect(input, &self.pass_through_fields)?;

        match self.component.invoke(&arguments) {
            Ok(entries) => {
                if !self.output_fields().is_empty() || !self.pass_through_fields.is_empty() {
                    let stream = self.output_stream_id();
                    log::debug!("{} provides {} records to stream {}", self, entries.len(), stream);
                    for mut output in entries {
                        output.extend(passed.iter().cloned());
                        let anchor = self.do_anchor.then_some(input);
                        collector.emit(stream, anchor, output);
                    }
                }
                collector.ack(input);
                Ok(())
            }
            Err(WireError::Invocation(e)) => {
                match self.delays.get(e.kind()) {
                    Some(delay) => {
                        log::info!("{} pauses {:?} after {}", self, delay, e);
                        thread::sleep(*delay);
                    }
                    None => collector.report_error(&WireError::Invocation(e)),
                }
                collector.fail(input);
                Ok(())
            }
            Err(e @ WireError::Projection(_)) => {
                collector.report_error(&e);
                collector.fail(input);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn collect(&self, input: &Record, fields: &[String]) -> Result<Vec<FieldValue>> {
        fields
            .iter()
            .map(|f| input.value_by_field(f).cloned())
            .collect()
    }

    /// Sets whether emitted records are anchored to the input, so a failure
    /// downstream replays it.
    pub fn set_do_anchor(&mut self, anchor: bool) {
        self.do_anchor = anchor;
    }

    /// Pauses for `delay` instead of reporting invocation failures of `kind`.
    pub fn set_delay(&mut self, kind: impl Into<String>, delay: Duration) {
        self.delays.insert(kind.into(), delay);
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

impl ConfiguredComponent for BeanProcessor {
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

impl ConfiguredProcessor for BeanProcessor {
    fn input_fields(&self) -> &[String] {
        self.component.input_fields()
    }

    fn pass_through_fields(&self) -> &[String] {
        &self.pass_through_fields
    }

    fn set_pass_through_fields(&mut self, fields: Vec<String>) -> Result<()> {
        if let Some(name) = fields.iter().find(|f| self.output_fields().contains(*f)) {
            return Err(WireError::PassThroughOverlap(name.clone()));
        }
        self.pass_through_fields = fields;
        Ok(())
    }
}

impl fmt::Display for BeanProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[processor '{}']", self.id())
    }
}
