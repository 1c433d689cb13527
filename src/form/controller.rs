use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lifecycle::Lifecycle;
use super::persist::PersistedValues;
use super::registry::Registry;
use super::submit::SubmitHandlers;
use crate::contracts::{Registrar, SharedHandle};
use crate::value::{ErrorMessage, FormValues, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Invalid,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    pub name: String,
    pub auto_complete: bool,
    /// Keep the last value of unmounted fields and hand it back when a field with the same name
    /// mounts again.
    pub persist: bool,
    /// Initial values offered to fields by name.
    pub initial_values: FormValues,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            auto_complete: true,
            persist: false,
            initial_values: FormValues::new(),
        }
    }
}

impl FormOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("{0} is no longer mounted")]
    Unmounted(&'static str),
}

pub type FormResult<T> = Result<T, FormError>;

#[derive(Clone, Debug, PartialEq)]
pub struct FormStatus {
    pub submit_state: SubmitState,
    pub is_submitting: bool,
    pub has_submitted: bool,
    pub errors: Vec<ErrorMessage>,
    pub submit_count: u32,
}

pub(super) struct FormState {
    pub(super) registry: Registry,
    pub(super) persisted: PersistedValues,
    pub(super) submit_state: SubmitState,
    pub(super) is_submitting: bool,
    pub(super) has_submitted: bool,
    pub(super) errors: Vec<ErrorMessage>,
    pub(super) submit_count: u32,
}

impl FormState {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            persisted: PersistedValues::default(),
            submit_state: SubmitState::Idle,
            is_submitting: false,
            has_submitted: false,
            errors: Vec::new(),
            submit_count: 0,
        }
    }
}

/// Top-level container: owns the field registry, the persisted values and the submission
/// state. Cloning is cheap and every clone drives the same form.
#[derive(Clone)]
pub struct Form {
    pub(super) options: Arc<FormOptions>,
    pub(super) handlers: Arc<SubmitHandlers>,
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) lifecycle: Lifecycle,
}

impl Form {
    pub fn new(options: FormOptions) -> Self {
        Self::with_handlers(options, SubmitHandlers::default())
    }

    pub fn with_handlers(options: FormOptions, handlers: SubmitHandlers) -> Self {
        Self {
            options: Arc::new(options),
            handlers: Arc::new(handlers),
            state: Arc::new(RwLock::new(FormState::new())),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// Register/unregister entry points for fields mounted under this form.
    pub fn registrar(&self) -> Arc<dyn Registrar> {
        Arc::new(self.clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    /// Tears the form down. Submissions still in flight finish without touching its state.
    pub fn unmount(&self) {
        if self.lifecycle.unmount() {
            tracing::debug!(form = %self.options.name, "form unmounted");
        }
    }

    pub fn status(&self) -> FormResult<FormStatus> {
        let state = read_lock(&self.state, "reading form status")?;
        Ok(FormStatus {
            submit_state: state.submit_state,
            is_submitting: state.is_submitting,
            has_submitted: state.has_submitted,
            errors: state.errors.clone(),
            submit_count: state.submit_count,
        })
    }

    pub fn field_names(&self) -> FormResult<Vec<String>> {
        Ok(read_lock(&self.state, "listing field names")?
            .registry
            .names()
            .map(str::to_owned)
            .collect())
    }

    pub fn field(&self, name: &str) -> FormResult<Option<SharedHandle>> {
        Ok(read_lock(&self.state, "looking up field")?
            .registry
            .get(name)
            .cloned())
    }

    /// Values of the currently mounted fields only.
    pub fn get_form_values(&self) -> FormResult<FormValues> {
        Ok(self.registry()?.gather_values())
    }

    /// Mounted field values over persisted values of unmounted ones. This is what submission
    /// hands to the caller's stages.
    pub fn values(&self) -> FormResult<FormValues> {
        let (registry, persisted) = {
            let state = read_lock(&self.state, "reading values")?;
            (state.registry.clone(), state.persisted.clone())
        };
        Ok(persisted.merged_under(registry.gather_values()))
    }

    /// Validates every mounted field, showing the errors on each field.
    pub fn validate(&self) -> FormResult<bool> {
        Ok(self.registry()?.gather_errors(true).is_empty())
    }

    pub fn reset(&self) -> FormResult<()> {
        let registry = {
            let mut state = write_lock(&self.state, "resetting form")?;
            transition_submit_state(&mut state, SubmitState::Idle, &self.options.name)?;
            state.is_submitting = false;
            state.has_submitted = false;
            state.errors.clear();
            state.persisted.clear();
            state.registry.clone()
        };
        for handle in registry.handles() {
            handle.reset();
        }
        tracing::debug!(form = %self.options.name, fields = registry.len(), "form reset");
        Ok(())
    }

    pub(super) fn registry(&self) -> FormResult<Registry> {
        Ok(read_lock(&self.state, "cloning field registry")?
            .registry
            .clone())
    }
}

impl Registrar for Form {
    fn register(&self, handle: SharedHandle) -> FormResult<()> {
        let name = handle.name().to_owned();
        let restore = {
            let mut state = write_lock(&self.state, "registering field")?;
            if state.registry.insert(Arc::clone(&handle)).is_some() {
                tracing::debug!(form = %self.options.name, field = %name, "field handle replaced");
            }
            if self.options.persist {
                state.persisted.take(&name)
            } else {
                None
            }
        };

        match restore {
            Some(value) if !handle.is_controlled() => {
                tracing::debug!(
                    form = %self.options.name,
                    field = %name,
                    "restoring persisted value"
                );
                handle.set_value(value);
            }
            _ => tracing::debug!(form = %self.options.name, field = %name, "field registered"),
        }
        Ok(())
    }

    fn unregister(&self, name: &str) -> FormResult<()> {
        let removed = write_lock(&self.state, "unregistering field")?
            .registry
            .remove(name);
        let Some(handle) = removed else {
            return Ok(());
        };

        if self.options.persist {
            let value = handle.get_value();
            let mut state = write_lock(&self.state, "persisting field value")?;
            state.persisted.save(name, value);
            tracing::debug!(
                form = %self.options.name,
                field = %name,
                persisted = state.persisted.len(),
                "field unregistered, value persisted"
            );
        } else {
            tracing::debug!(form = %self.options.name, field = %name, "field unregistered");
        }
        Ok(())
    }

    fn initial_value(&self, name: &str) -> Option<Value> {
        self.options.initial_values.get(name).cloned()
    }

    fn auto_complete(&self) -> bool {
        self.options.auto_complete
    }
}

pub(super) fn transition_submit_state(
    state: &mut FormState,
    next: SubmitState,
    form: &str,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Invalid)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    tracing::debug!(form = %form, from = ?current, to = ?next, "submit state transition");
    state.submit_state = next;
    Ok(())
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
