use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use thiserror::Error;

use super::controller::{
    Form, FormError, FormResult, SubmitState, transition_submit_state, write_lock,
};
use crate::value::{ErrorMessage, FormValues};

/// Leading entry of the error payload when submission is refused because fields are invalid.
pub const FORM_NOT_VALID: &str = "Form is not valid";

pub type StageFuture = BoxFuture<'static, Result<FormValues, SubmitError>>;
pub(super) type StageFn = Arc<dyn Fn(FormValues) -> StageFuture + Send + Sync>;
pub(super) type ErrorSink = Arc<dyn Fn(&[ErrorMessage]) + Send + Sync>;

/// Why a submission stage rejected. Either shape reaches the error channel as a list.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmitError {
    #[error("{0}")]
    Message(ErrorMessage),
    #[error("submission rejected with {} errors", .0.len())]
    Messages(Vec<ErrorMessage>),
}

impl SubmitError {
    pub fn into_messages(self) -> Vec<ErrorMessage> {
        match self {
            SubmitError::Message(message) => vec![message],
            SubmitError::Messages(messages) => messages,
        }
    }
}

impl From<ErrorMessage> for SubmitError {
    fn from(message: ErrorMessage) -> Self {
        SubmitError::Message(message)
    }
}

impl From<&str> for SubmitError {
    fn from(message: &str) -> Self {
        SubmitError::Message(message.into())
    }
}

impl From<String> for SubmitError {
    fn from(message: String) -> Self {
        SubmitError::Message(message.into())
    }
}

impl From<Vec<ErrorMessage>> for SubmitError {
    fn from(messages: Vec<ErrorMessage>) -> Self {
        SubmitError::Messages(messages)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Field validation failed; no caller stage ran.
    Invalid(Vec<ErrorMessage>),
    Succeeded(FormValues),
    Failed(Vec<ErrorMessage>),
    /// The form unmounted or was reset while a stage was pending.
    Cancelled,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }

    pub fn errors(&self) -> &[ErrorMessage] {
        match self {
            SubmitOutcome::Invalid(errors) | SubmitOutcome::Failed(errors) => errors,
            SubmitOutcome::Succeeded(_) | SubmitOutcome::Cancelled => &[],
        }
    }
}

/// Caller-supplied submission stages and error sink. Unset stages pass values through.
#[derive(Clone)]
pub struct SubmitHandlers {
    before_submit: StageFn,
    on_submit: StageFn,
    after_submit: StageFn,
    on_error: Option<ErrorSink>,
}

impl Default for SubmitHandlers {
    fn default() -> Self {
        Self {
            before_submit: passthrough(),
            on_submit: passthrough(),
            after_submit: passthrough(),
            on_error: None,
        }
    }
}

impl SubmitHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_submit<F, Fut>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FormValues, SubmitError>> + Send + 'static,
    {
        self.before_submit = async_stage(stage);
        self
    }

    pub fn on_submit<F, Fut>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FormValues, SubmitError>> + Send + 'static,
    {
        self.on_submit = async_stage(stage);
        self
    }

    pub fn after_submit<F, Fut>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FormValues, SubmitError>> + Send + 'static,
    {
        self.after_submit = async_stage(stage);
        self
    }

    pub fn before_submit_sync<F>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Result<FormValues, SubmitError> + Send + Sync + 'static,
    {
        self.before_submit = sync_stage(stage);
        self
    }

    pub fn on_submit_sync<F>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Result<FormValues, SubmitError> + Send + Sync + 'static,
    {
        self.on_submit = sync_stage(stage);
        self
    }

    pub fn after_submit_sync<F>(mut self, stage: F) -> Self
    where
        F: Fn(FormValues) -> Result<FormValues, SubmitError> + Send + Sync + 'static,
    {
        self.after_submit = sync_stage(stage);
        self
    }

    pub fn on_error(mut self, sink: impl Fn(&[ErrorMessage]) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(sink));
        self
    }
}

fn passthrough() -> StageFn {
    Arc::new(|values: FormValues| -> StageFuture { future::ready(Ok(values)).boxed() })
}

fn async_stage<F, Fut>(stage: F) -> StageFn
where
    F: Fn(FormValues) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FormValues, SubmitError>> + Send + 'static,
{
    Arc::new(move |values: FormValues| -> StageFuture { stage(values).boxed() })
}

fn sync_stage<F>(stage: F) -> StageFn
where
    F: Fn(FormValues) -> Result<FormValues, SubmitError> + Send + Sync + 'static,
{
    Arc::new(move |values: FormValues| -> StageFuture { future::ready(stage(values)).boxed() })
}

impl Form {
    /// Validates every mounted field and, when all pass, runs `before_submit`, `on_submit` and
    /// `after_submit` in order. Failures are reported through the error sink and the form's
    /// error state; the returned outcome carries the same payload.
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        if !self.lifecycle.is_mounted() {
            return Err(FormError::Unmounted("form"));
        }

        let registry = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if state.submit_state != SubmitState::Idle {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating, &self.options.name)?;
            state.submit_count = state.submit_count.saturating_add(1);
            state.registry.clone()
        };

        let field_errors = registry.gather_errors(true);
        if !field_errors.is_empty() {
            {
                let mut state = write_lock(&self.state, "handling submit validation failure")?;
                transition_submit_state(&mut state, SubmitState::Invalid, &self.options.name)?;
                transition_submit_state(&mut state, SubmitState::Idle, &self.options.name)?;
            }
            let mut errors = Vec::with_capacity(field_errors.len() + 1);
            errors.push(ErrorMessage::from(FORM_NOT_VALID));
            errors.extend(field_errors);
            self.handle_errors(&errors)?;
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let persisted = {
            let mut state = write_lock(&self.state, "moving submit state to submitting")?;
            transition_submit_state(&mut state, SubmitState::Submitting, &self.options.name)?;
            state.is_submitting = true;
            state.errors.clear();
            state.persisted.clone()
        };
        let values = persisted.merged_under(registry.gather_values());

        let result = self.run_stages(values).await;

        if !self.lifecycle.is_mounted() {
            tracing::debug!(form = %self.options.name, "form unmounted during submit");
            return Ok(SubmitOutcome::Cancelled);
        }

        match result {
            Ok(values) => {
                if !self.finish_submit(SubmitState::Succeeded)? {
                    return Ok(SubmitOutcome::Cancelled);
                }
                Ok(SubmitOutcome::Succeeded(values))
            }
            Err(error) => {
                tracing::debug!(form = %self.options.name, %error, "submission stage rejected");
                if !self.finish_submit(SubmitState::Failed)? {
                    return Ok(SubmitOutcome::Cancelled);
                }
                let errors = error.into_messages();
                self.handle_errors(&errors)?;
                Ok(SubmitOutcome::Failed(errors))
            }
        }
    }

    async fn run_stages(&self, values: FormValues) -> Result<FormValues, SubmitError> {
        let handlers = Arc::clone(&self.handlers);
        let values = (handlers.before_submit)(values).await?;
        let result = (handlers.on_submit)(values).await?;
        (handlers.after_submit)(result).await
    }

    /// Leaves `Submitting`. Returns `false` when a reset already moved the form on.
    fn finish_submit(&self, outcome: SubmitState) -> FormResult<bool> {
        let mut state = write_lock(&self.state, "completing submit")?;
        if state.submit_state != SubmitState::Submitting {
            tracing::debug!(form = %self.options.name, "submit superseded by reset");
            return Ok(false);
        }
        state.is_submitting = false;
        if outcome == SubmitState::Succeeded {
            state.has_submitted = true;
        }
        transition_submit_state(&mut state, outcome, &self.options.name)?;
        transition_submit_state(&mut state, SubmitState::Idle, &self.options.name)?;
        Ok(true)
    }

    fn handle_errors(&self, errors: &[ErrorMessage]) -> FormResult<()> {
        if self.lifecycle.is_mounted() {
            write_lock(&self.state, "storing form errors")?.errors = errors.to_vec();
        }
        if let Some(sink) = &self.handlers.on_error {
            sink(errors);
        }
        Ok(())
    }
}
