pub mod compile;
pub mod component;
pub mod context;
pub mod declaration;
pub mod project;
pub mod reflect;
pub mod signature;

/// Alias for serde_json::Value, the value of every record field
pub type FieldValue = serde_json::Value;

use std::any::Any;

/// Provides `as_any` so configured components can be recovered from the
/// trait objects held by a compiled pipeline.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
