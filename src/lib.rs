pub mod contracts;
pub mod form;
pub mod id;
pub mod mask;
pub mod prelude;
pub mod value;
pub mod widget;

pub use form::{Field, FieldOptions, FieldScope, Form, FormError, FormOptions, FormResult};
pub use mask::Formatter;
pub use value::{ErrorMessage, FieldKind, FormValues, Value};
