use std::sync::Arc;

use crate::form::FormResult;
use crate::value::{ErrorMessage, Value};
use crate::widget::WidgetError;

pub type SharedHandle = Arc<dyn FieldHandle>;
pub type SharedWidget = Arc<dyn FieldWidget>;

/// What a mounted field exposes to the registries it joins.
pub trait FieldHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Current value with formatting removed.
    fn get_value(&self) -> Value;

    fn set_value(&self, value: Value);

    fn reset(&self);

    fn validate(&self, value: &Value, update_errors: bool) -> Vec<ErrorMessage>;

    fn focus(&self);

    /// Whether the field was mounted with an explicit current value, which wins over any
    /// persisted one.
    fn is_controlled(&self) -> bool {
        false
    }
}

/// A container fields register with: a form or a slide.
pub trait Registrar: Send + Sync {
    fn register(&self, handle: SharedHandle) -> FormResult<()>;

    fn unregister(&self, name: &str) -> FormResult<()>;

    fn initial_value(&self, _name: &str) -> Option<Value> {
        None
    }

    fn auto_complete(&self) -> bool {
        true
    }
}

/// The concrete input a field controller drives. Every method is best-effort.
pub trait FieldWidget: Send + Sync {
    /// Caret position in characters, when the widget has one.
    fn selection_start(&self) -> Option<usize>;

    fn set_selection(&self, position: usize) -> Result<(), WidgetError>;

    fn focus(&self) -> Result<(), WidgetError>;
}
