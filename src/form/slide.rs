use std::future::Future;
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::controller::{FormResult, read_lock, write_lock};
use super::lifecycle::Lifecycle;
use super::registry::Registry;
use super::validation::{GroupValidatorFn, Validation};
use crate::contracts::{Registrar, SharedHandle};
use crate::value::{ErrorMessage, FormValues};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

/// What an exit guard is told about the transition it may veto.
#[derive(Clone, Debug, PartialEq)]
pub struct SlideExit {
    pub from: usize,
    /// `None` when moving forward off the last visible slide, which submits the form.
    pub to: Option<usize>,
    pub direction: Direction,
    pub values: FormValues,
}

pub type GuardFuture = BoxFuture<'static, bool>;
pub(super) type GuardFn = Arc<dyn Fn(SlideExit) -> GuardFuture + Send + Sync>;
pub(super) type ShowIfFn = Arc<dyn Fn(&FormValues) -> bool + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideOptions {
    /// Focus the first registered field when the slide becomes active.
    pub auto_focus: bool,
}

impl Default for SlideOptions {
    fn default() -> Self {
        Self { auto_focus: true }
    }
}

#[derive(Clone, Default)]
struct ExitGuards {
    any: Option<GuardFn>,
    prev: Option<GuardFn>,
    next: Option<GuardFn>,
}

pub struct SlideBuilder {
    name: String,
    options: SlideOptions,
    validator: Option<GroupValidatorFn>,
    guards: ExitGuards,
    show_if: Option<ShowIfFn>,
}

impl SlideBuilder {
    /// Group validator, run over the values of the fields mounted in this slide.
    pub fn validate<F, R>(mut self, validator: F) -> Self
    where
        F: Fn(&FormValues) -> R + Send + Sync + 'static,
        R: Into<Validation>,
    {
        self.validator = Some(Arc::new(move |values: &FormValues| -> Validation {
            validator(values).into()
        }));
        self
    }

    /// Guard for leaving in either direction, used when no directional guard is set.
    pub fn before_exit<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(SlideExit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.guards.any = Some(guard_fn(guard));
        self
    }

    pub fn before_exit_to_prev<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(SlideExit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.guards.prev = Some(guard_fn(guard));
        self
    }

    pub fn before_exit_to_next<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(SlideExit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.guards.next = Some(guard_fn(guard));
        self
    }

    /// Keeps the slide in the sequence only while `predicate` holds for the form's values.
    pub fn show_if(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.show_if = Some(Arc::new(predicate));
        self
    }

    pub fn options(mut self, options: SlideOptions) -> Self {
        self.options = options;
        self
    }

    pub fn auto_focus(mut self, auto_focus: bool) -> Self {
        self.options.auto_focus = auto_focus;
        self
    }

    pub fn build(self) -> Slide {
        Slide {
            inner: Arc::new(SlideInner {
                name: self.name,
                options: self.options,
                validator: self.validator,
                guards: self.guards,
                show_if: self.show_if,
                state: RwLock::new(SlideState::default()),
                lifecycle: Lifecycle::new(),
            }),
        }
    }
}

fn guard_fn<F, Fut>(guard: F) -> GuardFn
where
    F: Fn(SlideExit) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |exit: SlideExit| -> GuardFuture { guard(exit).boxed() })
}

#[derive(Default)]
struct SlideState {
    registry: Registry,
    errors: Vec<ErrorMessage>,
    active: bool,
    entered_from: Option<Direction>,
}

struct SlideInner {
    name: String,
    options: SlideOptions,
    validator: Option<GroupValidatorFn>,
    guards: ExitGuards,
    show_if: Option<ShowIfFn>,
    state: RwLock<SlideState>,
    lifecycle: Lifecycle,
}

/// One step of a multi-step form with its own field registry. Clones share the slide.
#[derive(Clone)]
pub struct Slide {
    inner: Arc<SlideInner>,
}

impl Slide {
    pub fn builder(name: impl Into<String>) -> SlideBuilder {
        SlideBuilder {
            name: name.into(),
            options: SlideOptions::default(),
            validator: None,
            guards: ExitGuards::default(),
            show_if: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> SlideOptions {
        self.inner.options
    }

    pub fn registrar(&self) -> Arc<dyn Registrar> {
        Arc::new(self.clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lifecycle.is_mounted()
    }

    pub fn unmount(&self) {
        if self.inner.lifecycle.unmount() {
            tracing::debug!(slide = %self.inner.name, "slide unmounted");
        }
    }

    /// Values of the fields mounted in this slide.
    pub fn values(&self) -> FormResult<FormValues> {
        Ok(self.registry()?.gather_values())
    }

    pub fn field_names(&self) -> FormResult<Vec<String>> {
        Ok(self.registry()?.names().map(str::to_owned).collect())
    }

    /// Field errors followed by group errors. With `update_errors`, fields show their errors and
    /// the slide keeps the group errors.
    pub fn validate_slide(&self, update_errors: bool) -> FormResult<Vec<ErrorMessage>> {
        let registry = self.registry()?;
        let mut errors = registry.gather_errors(update_errors);
        let group_errors = match &self.inner.validator {
            Some(validator) => validator(&registry.gather_values()).into_errors(),
            None => Vec::new(),
        };
        if update_errors && self.is_mounted() {
            write_lock(&self.inner.state, "storing slide errors")?.errors = group_errors.clone();
        }
        errors.extend(group_errors);
        Ok(errors)
    }

    /// Validates and shows the errors. Returns whether the slide may be left.
    pub fn check(&self) -> FormResult<bool> {
        Ok(self.validate_slide(true)?.is_empty())
    }

    pub fn is_slide_valid(&self) -> FormResult<bool> {
        Ok(self.validate_slide(false)?.is_empty())
    }

    /// Group validator errors from the last displayed validation.
    pub fn errors(&self) -> FormResult<Vec<ErrorMessage>> {
        Ok(read_lock(&self.inner.state, "reading slide errors")?
            .errors
            .clone())
    }

    pub fn should_show(&self, values: &FormValues) -> bool {
        self.inner
            .show_if
            .as_ref()
            .is_none_or(|predicate| predicate(values))
    }

    pub fn is_active(&self) -> FormResult<bool> {
        Ok(read_lock(&self.inner.state, "reading slide activity")?.active)
    }

    /// The direction of the move that made this slide active, `None` when it was entered first.
    pub fn entered_from(&self) -> FormResult<Option<Direction>> {
        Ok(read_lock(&self.inner.state, "reading slide entry")?.entered_from)
    }

    pub fn did_enter(&self) -> FormResult<bool> {
        Ok(self.entered_from()?.is_some())
    }

    pub fn as_prev(&self) -> FormResult<bool> {
        Ok(self.entered_from()? == Some(Direction::Prev))
    }

    pub fn as_next(&self) -> FormResult<bool> {
        Ok(self.entered_from()? == Some(Direction::Next))
    }

    pub(super) fn exit_guard(&self, direction: Direction) -> Option<GuardFn> {
        let guards = &self.inner.guards;
        let directional = match direction {
            Direction::Prev => &guards.prev,
            Direction::Next => &guards.next,
        };
        directional.as_ref().or(guards.any.as_ref()).cloned()
    }

    pub(super) fn activate(&self, entered_from: Option<Direction>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.inner.state, "activating slide")?;
            state.active = true;
            state.entered_from = entered_from;
        }
        tracing::debug!(slide = %self.inner.name, ?entered_from, "slide activated");
        if self.inner.options.auto_focus {
            self.maybe_auto_focus()?;
        }
        Ok(())
    }

    pub(super) fn deactivate(&self) -> FormResult<()> {
        write_lock(&self.inner.state, "deactivating slide")?.active = false;
        Ok(())
    }

    fn maybe_auto_focus(&self) -> FormResult<()> {
        let first = read_lock(&self.inner.state, "finding first slide field")?
            .registry
            .first()
            .cloned();
        if let Some(handle) = first {
            handle.focus();
        }
        Ok(())
    }

    fn registry(&self) -> FormResult<Registry> {
        Ok(read_lock(&self.inner.state, "cloning slide registry")?
            .registry
            .clone())
    }
}

impl Registrar for Slide {
    fn register(&self, handle: SharedHandle) -> FormResult<()> {
        let name = handle.name().to_owned();
        if write_lock(&self.inner.state, "registering slide field")?
            .registry
            .insert(handle)
            .is_some()
        {
            tracing::debug!(slide = %self.inner.name, field = %name, "slide field handle replaced");
        }
        Ok(())
    }

    fn unregister(&self, name: &str) -> FormResult<()> {
        write_lock(&self.inner.state, "unregistering slide field")?
            .registry
            .remove(name);
        Ok(())
    }
}
