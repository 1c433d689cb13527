mod binding;
mod controller;
mod field;
mod lifecycle;
mod persist;
mod registry;
mod sequencer;
mod slide;
mod submit;
mod validation;


pub use binding::{FieldCapabilities, FormCapabilities, SlideCapabilities};
pub use controller::{Form, FormError, FormOptions, FormResult, FormStatus, SubmitState};
pub use field::{
    ChangeEvent, DEFAULT_DEBOUNCE_MS, Field, FieldEvent, FieldOptions, FieldScope, FormatFn,
    Listener, PendingValidation, UnformatFn, ValidationTicket, ValidationTiming,
};
pub use lifecycle::Lifecycle;
pub use registry::{Registry, gather_errors, gather_values};
pub use sequencer::{Slider, SliderBuilder, Transition};
pub use slide::{Direction, GuardFuture, Slide, SlideBuilder, SlideExit, SlideOptions};
pub use submit::{FORM_NOT_VALID, StageFuture, SubmitError, SubmitHandlers, SubmitOutcome};
pub use validation::{Validation, required};
