use std::sync::Arc;

use crate::value::{ErrorMessage, FormValues, Value};

pub(crate) type ValidatorFn = Arc<dyn Fn(&Value) -> Validation + Send + Sync>;
pub(crate) type GroupValidatorFn = Arc<dyn Fn(&FormValues) -> Validation + Send + Sync>;

/// What a validator returns: nothing, one error, or several. Convert from `()`, `Option<_>`,
/// `Result<(), _>`, a message, or a `Vec` of messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Validation {
    #[default]
    Valid,
    Invalid(Vec<ErrorMessage>),
}

impl Validation {
    /// Errors with empty messages dropped.
    pub fn into_errors(self) -> Vec<ErrorMessage> {
        match self {
            Validation::Valid => Vec::new(),
            Validation::Invalid(errors) => errors
                .into_iter()
                .filter(|error| !error.is_empty())
                .collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Validation::Valid => true,
            Validation::Invalid(errors) => errors.iter().all(ErrorMessage::is_empty),
        }
    }
}

impl From<()> for Validation {
    fn from(_: ()) -> Self {
        Validation::Valid
    }
}

impl From<ErrorMessage> for Validation {
    fn from(error: ErrorMessage) -> Self {
        Validation::Invalid(vec![error])
    }
}

impl From<&str> for Validation {
    fn from(error: &str) -> Self {
        ErrorMessage::from(error).into()
    }
}

impl From<String> for Validation {
    fn from(error: String) -> Self {
        ErrorMessage::from(error).into()
    }
}

impl<E> From<Vec<E>> for Validation
where
    E: Into<ErrorMessage>,
{
    fn from(errors: Vec<E>) -> Self {
        Validation::Invalid(errors.into_iter().map(Into::into).collect())
    }
}

impl<E> From<Option<E>> for Validation
where
    E: Into<Validation>,
{
    fn from(error: Option<E>) -> Self {
        error.map_or(Validation::Valid, Into::into)
    }
}

impl<E> From<Result<(), E>> for Validation
where
    E: Into<Validation>,
{
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Validation::Valid,
            Err(error) => error.into(),
        }
    }
}

/// Runs every validator against `value` and flattens the results in order.
pub(crate) fn run_validators(validators: &[ValidatorFn], value: &Value) -> Vec<ErrorMessage> {
    validators
        .iter()
        .flat_map(|validator| validator(value).into_errors())
        .collect()
}

/// Fails with `message` when the value is null, empty text, an empty list or `false`.
pub fn required(
    message: impl Into<String>,
) -> impl Fn(&Value) -> Validation + Send + Sync + 'static {
    let message = ErrorMessage::new(message);
    move |value: &Value| {
        if value.is_truthy() || matches!(value, Value::Number(_)) {
            Validation::Valid
        } else {
            Validation::from(message.clone())
        }
    }
}
