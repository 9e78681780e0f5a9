//! Dependency calculation between sources and processors.
//!
//! Every source starts a line. A processor joins the first line (in source id
//! order) that makes all of its input fields available, either from the source
//! itself or from processors placed earlier on the same line. Once the lines
//! are built, each processor learns which fields it has to pass through for
//! processors further down its line.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::core::component::{ConfiguredProcessor, ConfiguredSource};
use crate::error::{Result, WireError};

/// A source with the processors bound to it, in execution order.
pub struct Line {
    source: Box<dyn ConfiguredSource>,
    processors: Vec<Box<dyn ConfiguredProcessor>>,
}

impl Line {
    pub fn source(&self) -> &dyn ConfiguredSource {
        self.source.as_ref()
    }

    pub fn processors(&self) -> impl Iterator<Item = &dyn ConfiguredProcessor> {
        self.processors.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Computes the pass-through fields from the last processor back to the first.
    fn assign_pass_through(&mut self) -> Result<()> {
        let mut required: BTreeSet<String> = BTreeSet::new();
        for processor in self.processors.iter_mut().rev() {
            for field in processor.output_fields() {
                required.remove(field);
            }
            processor.set_pass_through_fields(required.iter().cloned().collect())?;
            required.extend(processor.input_fields().iter().cloned());
        }
        Ok(())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source.id())?;
        for processor in &self.processors {
            write!(f, " -> {}", processor.id())?;
        }
        Ok(())
    }
}

/// Registers a compiled line with the delivery runtime.
pub trait TopologyBuilder {
    fn set_source(&mut self, source: &dyn ConfiguredSource);

    /// Registers `processor`, consuming `upstream_stream` of `upstream_id`.
    fn set_processor(&mut self, processor: &dyn ConfiguredProcessor, upstream_id: &str, upstream_stream: &str);
}

/// Sources ordered by id, and the pool of processors not yet bound to any of them.
#[derive(Default)]
pub struct PipelineCompilation {
    lines: BTreeMap<String, Line>,
    unbound: Vec<Box<dyn ConfiguredProcessor>>,
    compiled: bool,
}

impl PipelineCompilation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source<S: ConfiguredSource + 'static>(&mut self, source: S) -> &mut Self {
        self.add_boxed_source(Box::new(source))
    }

    pub fn add_boxed_source(&mut self, source: Box<dyn ConfiguredSource>) -> &mut Self {
        let id = source.id().to_string();
        let line = Line {
            source,
            processors: Vec::new(),
        };
        if let Some(previous) = self.lines.insert(id.clone(), line) {
            log::warn!("Source id '{}' registered twice, replacing {}", id, previous.source);
            self.unbound.extend(previous.processors);
        }
        self
    }

    pub fn add_processor<P: ConfiguredProcessor + 'static>(&mut self, processor: P) -> &mut Self {
        self.add_boxed_processor(Box::new(processor))
    }

    pub fn add_boxed_processor(&mut self, processor: Box<dyn ConfiguredProcessor>) -> &mut Self {
        self.unbound.push(processor);
        self
    }

    /// Binds processors to lines and assigns pass-through fields.
    ///
    /// Processors whose inputs can't be satisfied stay unbound; see
    /// [`verify`](Self::verify). Compiling again requires a [`reset`](Self::reset).
    pub fn compile(&mut self) -> Result<()> {
        if self.compiled {
            return Err(WireError::AlreadyCompiled);
        }

        log::debug!(
            "Matching {} sources with {} processors",
            self.lines.len(),
            self.unbound.len()
        );
        for line in self.lines.values_mut() {
            let mut available: HashSet<String> = line.source.output_fields().iter().cloned().collect();
            let mut options = std::mem::take(&mut self.unbound);

            let mut collected = true;
            while collected {
                collected = false;
                let mut i = 0;
                while i < options.len() {
                    log::trace!("Trying {} for {}", options[i], line.source);
                    if options[i].input_fields().iter().all(|f| available.contains(f)) {
                        let option = options.remove(i);
                        available.extend(option.output_fields().iter().cloned());
                        line.processors.push(option);
                        collected = true;
                    } else {
                        i += 1;
                    }
                }
            }

            self.unbound = options;
            log::debug!("Found {} processors for {}", line.processors.len(), line.source);
        }

        for line in self.lines.values_mut() {
            line.assign_pass_through()?;
        }

        self.compiled = true;
        log::info!("Compiled as: {}", self);
        Ok(())
    }

    /// Fails when [`compile`](Self::compile) left processors unbound.
    pub fn verify(&self) -> Result<()> {
        if self.unbound.is_empty() {
            return Ok(());
        }
        let ids = self.unbound.iter().map(|p| p.id().to_string()).collect();
        Err(WireError::UnresolvedPipeline(ids))
    }

    /// Returns every bound processor to the unbound pool, in line order, and
    /// clears their pass-through fields.
    pub fn reset(&mut self) -> Result<()> {
        let mut returned = Vec::new();
        for line in self.lines.values_mut() {
            for mut processor in line.processors.drain(..) {
                processor.set_pass_through_fields(Vec::new())?;
                returned.push(processor);
            }
        }
        returned.append(&mut self.unbound);
        self.unbound = returned;
        self.compiled = false;
        Ok(())
    }

    /// Drops all sources and processors.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.unbound.clear();
        self.compiled = false;
    }

    /// Compiles when needed, verifies, and registers every line with `builder`.
    /// Each processor consumes the output stream of its predecessor.
    pub fn build(&mut self, builder: &mut dyn TopologyBuilder) -> Result<()> {
        if !self.compiled {
            self.compile()?;
        }
        self.verify()?;

        for line in self.lines.values() {
            builder.set_source(line.source());
            let mut last_id = line.source.id();
            let mut stream_id = line.source.output_stream_id();
            for processor in &line.processors {
                builder.set_processor(processor.as_ref(), last_id, stream_id);
                last_id = processor.id();
                stream_id = processor.output_stream_id();
            }
        }
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    pub fn line(&self, source_id: &str) -> Option<&Line> {
        self.lines.get(source_id)
    }

    /// Ids of the processors bound to `source_id`, in execution order.
    pub fn chain(&self, source_id: &str) -> Option<Vec<&str>> {
        self.lines
            .get(source_id)
            .map(|line| line.processors().map(|p| p.id()).collect())
    }

    pub fn unbound(&self) -> impl Iterator<Item = &dyn ConfiguredProcessor> {
        self.unbound.iter().map(|p| p.as_ref())
    }

    /// Finds a processor by id, bound or not.
    pub fn processor(&self, id: &str) -> Option<&dyn ConfiguredProcessor> {
        self.lines
            .values()
            .flat_map(|line| line.processors.iter())
            .chain(self.unbound.iter())
            .map(|p| p.as_ref())
            .find(|p| p.id() == id)
    }

    /// Finds a processor by id and recovers its concrete type.
    pub fn processor_as<P: ConfiguredProcessor + 'static>(&self, id: &str) -> Option<&P> {
        self.processor(id)?.as_any().downcast_ref::<P>()
    }

    pub fn source_as<S: ConfiguredSource + 'static>(&self, id: &str) -> Option<&S> {
        self.lines.get(id)?.source().as_any().downcast_ref::<S>()
    }
}

impl fmt::Display for PipelineCompilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.lines.values().map(|l| format!("{{{}}}", l)).collect();
        write!(f, "{}", lines.join(", "))
    }
}
