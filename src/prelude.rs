pub use crate::contracts::{FieldHandle, FieldWidget, Registrar, SharedHandle, SharedWidget};
pub use crate::form::{
    ChangeEvent, Direction, FORM_NOT_VALID, Field, FieldCapabilities, FieldEvent, FieldOptions,
    FieldScope, Form, FormCapabilities, FormError, FormOptions, FormResult, FormStatus, Slide,
    SlideCapabilities, SlideExit, SlideOptions, Slider, SubmitError, SubmitHandlers,
    SubmitOutcome, SubmitState, Transition, Validation, ValidationTiming, required,
};
pub use crate::mask::{Formatter, MaskError, transform};
pub use crate::value::{ErrorMessage, FieldKind, FormValues, Value};
pub use crate::widget::{TextWidget, WidgetError};
