//! Per-deployment bean containers and the process-wide registry that shares them.
//!
//! Every component instance of a deployment asks [`get_or_create`] for its
//! [`BeanContext`]. The registry lock is held across lookup and creation, so
//! concurrently initializing replicas never load the same deployment twice.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use crate::core::FieldValue;
use crate::core::reflect::{Bean, TypeTable};
use crate::error::{Result, WireError};

/// Configuration key holding the deployment name.
pub const DEPLOYMENT_NAME: &str = "deployment.name";

/// Deployment-wide configuration, as handed to components on preparation.
pub type DeploymentConfig = HashMap<String, FieldValue>;

/// A bean together with the name of its concrete type.
#[derive(Clone)]
pub struct BeanRef {
    pub concrete: String,
    pub instance: Bean,
}

impl fmt::Debug for BeanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BeanRef({})", self.concrete)
    }
}

/// The declared types and singleton beans of one deployment.
pub struct BeanContext {
    id: String,
    types: TypeTable,
    beans: Vec<BeanRef>,
}

impl BeanContext {
    pub fn new(id: impl Into<String>, types: TypeTable) -> Self {
        Self {
            id: id.into(),
            types,
            beans: Vec::new(),
        }
    }

    /// Registers a singleton bean under its concrete type name.
    pub fn with_bean<T: Any + Send + Sync>(mut self, concrete: impl Into<String>, bean: T) -> Self {
        self.register(concrete, Arc::new(bean));
        self
    }

    pub fn register(&mut self, concrete: impl Into<String>, instance: Bean) {
        let concrete = concrete.into();
        if !self.types.contains(&concrete) {
            log::warn!("Bean registered for undeclared type {} in '{}'", concrete, self.id);
        }
        self.beans.retain(|b| b.concrete != concrete);
        self.beans.push(BeanRef { concrete, instance });
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Gets the single bean assignable to `type_name`.
    pub fn bean(&self, type_name: &str) -> Result<BeanRef> {
        let mut matches = self
            .beans
            .iter()
            .filter(|b| self.types.is_assignable(type_name, &b.concrete));

        let found = matches.next().ok_or_else(|| {
            WireError::Context(format!("No bean of type {} in '{}'", type_name, self.id))
        })?;
        if let Some(other) = matches.next() {
            return Err(WireError::Context(format!(
                "No unique bean of type {} in '{}': found {} and {}",
                type_name, self.id, found.concrete, other.concrete
            )));
        }
        Ok(found.clone())
    }
}

impl fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContext")
            .field("id", &self.id)
            .field("beans", &self.beans)
            .finish()
    }
}

/// Creates the context of a deployment on first use.
pub trait ContextLoader: Send + Sync {
    fn load(&self, deployment: &str, config: &DeploymentConfig) -> Result<BeanContext>;
}

impl<F> ContextLoader for F
where
    F: Fn(&str, &DeploymentConfig) -> Result<BeanContext> + Send + Sync,
{
    fn load(&self, deployment: &str, config: &DeploymentConfig) -> Result<BeanContext> {
        self(deployment, config)
    }
}

static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<BeanContext>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Reads the deployment name from `config`.
pub fn deployment_name(config: &DeploymentConfig) -> Result<&str> {
    config
        .get(DEPLOYMENT_NAME)
        .and_then(FieldValue::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            WireError::Context(format!(
                "Missing required '{}' in deployment configuration",
                DEPLOYMENT_NAME
            ))
        })
}

/// Gets the context of the configured deployment, loading it when absent.
pub fn get_or_create(config: &DeploymentConfig, loader: &dyn ContextLoader) -> Result<Arc<BeanContext>> {
    let name = deployment_name(config)?;
    log::debug!("Context lookup for deployment '{}'", name);

    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(context) = registry.get(name) {
        return Ok(Arc::clone(context));
    }

    log::debug!("Need new context for '{}'", name);
    let context = Arc::new(loader.load(name, config)?);
    log::info!("Context instantiated for deployment '{}'", name);
    registry.insert(name.to_string(), Arc::clone(&context));
    Ok(context)
}

/// Drops the context of one deployment. Returns whether it was present.
pub fn remove(deployment: &str) -> bool {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(deployment)
        .is_some()
}

/// Drops every registered context.
pub fn clear() {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner).clear();
    REGISTRY.clear_poison();
}
