use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures_timer::Delay;
use serde::{Deserialize, Serialize};

use super::controller::FormResult;
use super::lifecycle::Lifecycle;
use super::validation::{Validation, ValidatorFn, run_validators};
use super::{Form, Slide};
use crate::contracts::{FieldHandle, Registrar, SharedHandle, SharedWidget};
use crate::id::{FieldId, autocomplete_token};
use crate::mask::Formatter;
use crate::value::{ErrorMessage, FieldKind, Value};

/// `(raw, caret) -> (display, caret)`. The caret is `None` when the widget does not expose one.
pub type FormatFn = Arc<dyn Fn(&str, Option<usize>) -> (String, Option<usize>) + Send + Sync>;
pub type UnformatFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
pub type Listener = Arc<dyn Fn(&str, &FieldEvent) + Send + Sync>;

/// Debounced validation scheduled by a change. Drive it on the host executor; a later change
/// turns an earlier one into a no-op.
pub type PendingValidation = BoxFuture<'static, ()>;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationTiming {
    pub on_change: bool,
    pub on_blur: bool,
    pub debounce_ms: u64,
}

impl Default for ValidationTiming {
    fn default() -> Self {
        Self {
            on_change: false,
            on_blur: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl ValidationTiming {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeEvent {
    pub value: String,
    pub checked: bool,
}

impl ChangeEvent {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            checked: false,
        }
    }

    pub fn checkbox(checked: bool) -> Self {
        Self {
            value: String::new(),
            checked,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldEvent {
    Change(ChangeEvent),
    Blur,
    Focus,
    Click,
}

#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct ValidationTicket(pub u64);

/// Everything a field is mounted with.
#[derive(Clone, Default)]
pub struct FieldOptions {
    name: String,
    kind: FieldKind,
    multiple: bool,
    value: Option<Value>,
    default_value: Option<Value>,
    checked: Option<bool>,
    default_checked: Option<bool>,
    auto_complete: Option<String>,
    timing: ValidationTiming,
    format: Option<FormatFn>,
    unformat: Option<UnformatFn>,
    validators: Vec<ValidatorFn>,
    listener: Option<Listener>,
    do_not_register: bool,
}

impl FieldOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Explicit current value. Wins over registry initial values and persisted values.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn default_checked(mut self, checked: bool) -> Self {
        self.default_checked = Some(checked);
        self
    }

    pub fn auto_complete(mut self, token: impl Into<String>) -> Self {
        self.auto_complete = Some(token.into());
        self
    }

    pub fn validate_on_change(mut self, enabled: bool) -> Self {
        self.timing.on_change = enabled;
        self
    }

    pub fn validate_on_blur(mut self, enabled: bool) -> Self {
        self.timing.on_blur = enabled;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.timing.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timing(mut self, timing: ValidationTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn format(
        mut self,
        format: impl Fn(&str, Option<usize>) -> (String, Option<usize>) + Send + Sync + 'static,
    ) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    pub fn unformat(mut self, unformat: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.unformat = Some(Arc::new(unformat));
        self
    }

    /// Uses `formatter` for both directions.
    pub fn mask(mut self, formatter: Formatter) -> Self {
        let formatter = Arc::new(formatter);
        let unmask = Arc::clone(&formatter);
        self.format = Some(Arc::new(move |raw: &str, caret: Option<usize>| {
            let at = caret.unwrap_or_else(|| raw.chars().count());
            let (masked, next) = formatter.format(raw, at);
            (masked, caret.map(|_| next))
        }));
        self.unformat = Some(Arc::new(move |masked: &str| unmask.unformat(masked)));
        self
    }

    /// Adds a validator. Validators run in the order they were added.
    pub fn validate<F, R>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: Into<Validation>,
    {
        self.validators
            .push(Arc::new(move |value: &Value| -> Validation { validator(value).into() }));
        self
    }

    pub fn listen(mut self, listener: impl Fn(&str, &FieldEvent) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Mounts the field without joining any registry.
    pub fn do_not_register(mut self, skip: bool) -> Self {
        self.do_not_register = skip;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The registrars a field joins on mount: its form and, inside a multi-step form, its slide.
#[derive(Clone, Default)]
pub struct FieldScope {
    form: Option<Arc<dyn Registrar>>,
    slide: Option<Arc<dyn Registrar>>,
}

impl FieldScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(form: &Form) -> Self {
        Self {
            form: Some(form.registrar()),
            slide: None,
        }
    }

    pub fn with_slide(mut self, slide: &Slide) -> Self {
        self.slide = Some(slide.registrar());
        self
    }

    pub fn with_registrar(mut self, registrar: Arc<dyn Registrar>) -> Self {
        if self.form.is_none() {
            self.form = Some(registrar);
        } else {
            self.slide = Some(registrar);
        }
        self
    }

    fn registrars(&self) -> impl Iterator<Item = &Arc<dyn Registrar>> {
        self.form.iter().chain(self.slide.iter())
    }
}

struct FieldState {
    value: Value,
    cursor: Option<usize>,
    errors: Vec<ErrorMessage>,
    widget: Option<SharedWidget>,
    caret_pending: bool,
}

struct FieldCore {
    id: FieldId,
    name: String,
    kind: FieldKind,
    controlled: bool,
    initial: Value,
    auto_complete: String,
    timing: ValidationTiming,
    format: Option<FormatFn>,
    unformat: Option<UnformatFn>,
    validators: Vec<ValidatorFn>,
    listener: Option<Listener>,
    state: Mutex<FieldState>,
    ticket: AtomicU64,
    lifecycle: Lifecycle,
}

impl FieldCore {
    fn lock(&self) -> MutexGuard<'_, FieldState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Display form of `value`; only text passes through the formatter.
    fn display(&self, value: Value, caret: Option<usize>) -> (Value, Option<usize>) {
        match (value, &self.format) {
            (Value::Text(raw), Some(format)) => {
                let (formatted, caret) = format(&raw, caret);
                (Value::Text(formatted), caret)
            }
            (value, _) => (value, caret),
        }
    }

    fn raw(&self, value: &Value) -> Value {
        match (value, &self.unformat) {
            (Value::Text(formatted), Some(unformat)) => Value::Text(unformat(formatted)),
            (value, _) => value.clone(),
        }
    }

    fn caret_before_edit(&self, widget: Option<&SharedWidget>) -> Option<usize> {
        if !self.kind.supports_selection() {
            return None;
        }
        widget.and_then(|widget| widget.selection_start())
    }

    fn notify(&self, event: &FieldEvent) {
        if let Some(listener) = &self.listener {
            listener(&self.name, event);
        }
    }

    fn next_ticket(&self) -> ValidationTicket {
        ValidationTicket(self.ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_latest(&self, ticket: ValidationTicket) -> bool {
        self.ticket.load(Ordering::SeqCst) == ticket.0
    }
}

impl FieldHandle for FieldCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_value(&self) -> Value {
        let value = self.lock().value.clone();
        self.raw(&value)
    }

    fn set_value(&self, value: Value) {
        let caret = value.char_len();
        let (value, cursor) = self.display(value, caret);
        let mut state = self.lock();
        state.value = value;
        state.cursor = cursor;
        state.caret_pending = cursor.is_some();
    }

    fn reset(&self) {
        let mut state = self.lock();
        state.value = self.initial.clone();
        state.cursor = None;
        state.caret_pending = false;
        state.errors.clear();
    }

    fn validate(&self, value: &Value, update_errors: bool) -> Vec<ErrorMessage> {
        let errors = run_validators(&self.validators, value);
        if update_errors && self.lifecycle.is_mounted() {
            self.lock().errors = errors.clone();
        }
        errors
    }

    fn focus(&self) {
        let widget = self.lock().widget.clone();
        let Some(widget) = widget else {
            return;
        };
        if let Err(error) = widget.focus() {
            tracing::trace!(field = %self.name, %error, "focus ignored");
        }
    }

    fn is_controlled(&self) -> bool {
        self.controlled
    }
}

/// A mounted field controller. Dropping it unmounts it.
pub struct Field {
    core: Arc<FieldCore>,
    registrars: Vec<Arc<dyn Registrar>>,
}

impl Field {
    /// Resolves the initial value, then registers with every registrar in `scope`, form first.
    pub fn mount(options: FieldOptions, scope: &FieldScope) -> FormResult<Field> {
        let FieldOptions {
            name,
            kind,
            multiple,
            value,
            default_value,
            checked,
            default_checked,
            auto_complete,
            timing,
            format,
            unformat,
            validators,
            listener,
            do_not_register,
        } = options;

        let id = FieldId::next();
        let registry_initial = scope
            .registrars()
            .find_map(|registrar| registrar.initial_value(&name));
        let form_auto_complete = scope
            .registrars()
            .next()
            .is_none_or(|registrar| registrar.auto_complete());

        let (controlled, raw_initial) = if kind == FieldKind::Checkbox {
            let initial = checked
                .or_else(|| registry_initial.as_ref().and_then(Value::as_bool))
                .or(default_checked)
                .unwrap_or(false);
            (checked.is_some(), Value::Bool(initial))
        } else {
            let controlled = value.is_some();
            let initial = value
                .or(registry_initial)
                .or(default_value)
                .unwrap_or_else(|| kind.fallback_value(multiple));
            (controlled, initial)
        };

        let auto_complete = match auto_complete {
            Some(token) => token,
            None if !form_auto_complete => autocomplete_token(&name, id),
            None => String::new(),
        };

        let mut core = FieldCore {
            id,
            name,
            kind,
            controlled,
            initial: Value::Null,
            auto_complete,
            timing,
            format,
            unformat,
            validators,
            listener,
            state: Mutex::new(FieldState {
                value: Value::Null,
                cursor: None,
                errors: Vec::new(),
                widget: None,
                caret_pending: false,
            }),
            ticket: AtomicU64::new(0),
            lifecycle: Lifecycle::new(),
        };
        let (initial, _) = core.display(raw_initial, None);
        core.initial = initial.clone();
        core.lock().value = initial;

        let registrars = if do_not_register {
            Vec::new()
        } else {
            scope.registrars().cloned().collect()
        };
        // A failed registration drops `field`, which leaves the registries joined so far.
        let field = Field {
            core: Arc::new(core),
            registrars,
        };
        for registrar in &field.registrars {
            registrar.register(field.handle())?;
        }
        tracing::trace!(field = %field.core.name, id = %field.core.id, "field mounted");
        Ok(field)
    }

    /// Leaves every registry, last joined first. Later calls are no-ops.
    pub fn unmount(&self) -> FormResult<()> {
        if !self.core.lifecycle.unmount() {
            return Ok(());
        }
        for registrar in self.registrars.iter().rev() {
            registrar.unregister(&self.core.name)?;
        }
        tracing::trace!(field = %self.core.name, "field unmounted");
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.core.lifecycle.is_mounted()
    }

    /// The handle this field registered with. Always the same allocation.
    pub fn handle(&self) -> SharedHandle {
        self.core.clone()
    }

    pub fn id(&self) -> FieldId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn kind(&self) -> FieldKind {
        self.core.kind
    }

    pub fn auto_complete(&self) -> &str {
        &self.core.auto_complete
    }

    /// Displayed (formatted) value.
    pub fn value(&self) -> Value {
        self.core.lock().value.clone()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.core.lock().cursor
    }

    pub fn errors(&self) -> Vec<ErrorMessage> {
        self.core.lock().errors.clone()
    }

    pub fn get_value(&self) -> Value {
        self.core.get_value()
    }

    pub fn set_value(&self, value: impl Into<Value>) {
        self.core.set_value(value.into());
    }

    pub fn reset(&self) {
        self.core.reset();
    }

    pub fn validate(&self, update_errors: bool) -> Vec<ErrorMessage> {
        let value = self.core.get_value();
        self.core.validate(&value, update_errors)
    }

    /// Runs the validators without touching the displayed errors.
    pub fn is_valid(&self) -> bool {
        self.validate(false).is_empty()
    }

    pub fn focus(&self) {
        self.core.focus();
    }

    /// Attaches (or detaches) the concrete widget that renders this field.
    pub fn set_ref(&self, widget: Option<SharedWidget>) {
        self.core.lock().widget = widget;
    }

    /// Applies a change event. Returns the debounced validation to drive when validation on
    /// change is enabled.
    pub fn on_change(&self, event: ChangeEvent) -> Option<PendingValidation> {
        if !self.is_mounted() {
            return None;
        }

        if self.core.kind == FieldKind::Checkbox {
            let mut state = self.core.lock();
            state.value = Value::Bool(event.checked);
            state.cursor = None;
            state.caret_pending = false;
        } else {
            let widget = self.core.lock().widget.clone();
            let caret = self.core.caret_before_edit(widget.as_ref());
            let (value, cursor) = self.core.display(Value::Text(event.value.clone()), caret);
            let mut state = self.core.lock();
            state.value = value;
            state.cursor = cursor;
            state.caret_pending = cursor.is_some();
        }

        self.core.notify(&FieldEvent::Change(event));

        if !self.core.timing.on_change {
            return None;
        }
        Some(self.schedule_validation())
    }

    pub fn on_blur(&self) {
        if !self.is_mounted() {
            return;
        }
        if self.core.timing.on_blur {
            self.validate(true);
        }
        self.core.notify(&FieldEvent::Blur);
    }

    pub fn on_focus(&self) {
        self.core.notify(&FieldEvent::Focus);
    }

    pub fn on_click(&self) {
        self.core.notify(&FieldEvent::Click);
    }

    /// Moves the widget caret to the cursor computed by the last edit. Call after the widget has
    /// rendered the new value. Failures are logged and dropped.
    pub fn after_render(&self) {
        let (widget, cursor) = {
            let mut state = self.core.lock();
            if !state.caret_pending {
                return;
            }
            state.caret_pending = false;
            (state.widget.clone(), state.cursor)
        };
        let (Some(widget), Some(cursor)) = (widget, cursor) else {
            return;
        };
        if let Err(error) = widget.set_selection(cursor) {
            tracing::debug!(field = %self.core.name, cursor, %error, "caret restore failed");
        }
    }

    fn schedule_validation(&self) -> PendingValidation {
        let ticket = self.core.next_ticket();
        let core = Arc::clone(&self.core);
        let delay = core.timing.debounce();
        async move {
            if !delay.is_zero() {
                Delay::new(delay).await;
            }
            if !core.lifecycle.is_mounted() {
                return;
            }
            if !core.is_latest(ticket) {
                tracing::trace!(field = %core.name, ticket = ticket.0, "validation superseded");
                return;
            }
            let value = core.get_value();
            core.validate(&value, true);
        }
        .boxed()
    }
}

impl Drop for Field {
    fn drop(&mut self) {
        if let Err(error) = self.unmount() {
            tracing::warn!(field = %self.core.name, %error, "field unmount failed");
        }
    }
}
