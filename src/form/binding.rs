use std::sync::Arc;

use super::controller::{Form, FormResult};
use super::field::Field;
use super::slide::Slide;
use crate::contracts::Registrar;
use crate::value::{ErrorMessage, FormValues, Value};

/// Form-level state handed to descendants that render around fields, such as an error summary.
#[derive(Clone)]
pub struct FormCapabilities {
    pub registrar: Arc<dyn Registrar>,
    pub auto_complete: bool,
    pub has_submitted: bool,
    pub is_submitting: bool,
    pub errors: Vec<ErrorMessage>,
    pub default_values: FormValues,
}

#[derive(Clone)]
pub struct SlideCapabilities {
    pub registrar: Arc<dyn Registrar>,
    pub errors: Vec<ErrorMessage>,
    pub active: bool,
}

/// What a concrete widget renders. Event entry points stay on [`Field`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldCapabilities {
    pub value: Value,
    pub errors: Vec<ErrorMessage>,
    pub auto_complete: String,
}

impl Form {
    pub fn capabilities(&self) -> FormResult<FormCapabilities> {
        let status = self.status()?;
        Ok(FormCapabilities {
            registrar: self.registrar(),
            auto_complete: self.options().auto_complete,
            has_submitted: status.has_submitted,
            is_submitting: status.is_submitting,
            errors: status.errors,
            default_values: self.options().initial_values.clone(),
        })
    }
}

impl Slide {
    pub fn capabilities(&self) -> FormResult<SlideCapabilities> {
        Ok(SlideCapabilities {
            registrar: self.registrar(),
            errors: self.errors()?,
            active: self.is_active()?,
        })
    }
}

impl Field {
    pub fn capabilities(&self) -> FieldCapabilities {
        FieldCapabilities {
            value: self.value(),
            errors: self.errors(),
            auto_complete: self.auto_complete().to_owned(),
        }
    }
}
