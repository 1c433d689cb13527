use std::sync::{Arc, Mutex};

use calmform::prelude::*;
use futures::executor::block_on;

const REQUIRED: &str = "This is required";
const CHOOSE_ONE: &str = "You must choose either check1 or check2";

fn messages(items: &[&str]) -> Vec<ErrorMessage> {
    items.iter().copied().map(ErrorMessage::from).collect()
}

fn required_text(value: &Value) -> Option<&'static str> {
    (value.as_str() == Some("")).then_some(REQUIRED)
}

#[test]
fn single_page_form_validates_then_submits() {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let handlers = {
        let reported = reported.clone();
        SubmitHandlers::new()
            .on_submit(|values: FormValues| async move { Ok(values) })
            .on_error(move |errors: &[ErrorMessage]| {
                reported.lock().expect("reported").push(errors.to_vec());
            })
    };
    let form = Form::with_handlers(
        FormOptions {
            auto_complete: false,
            ..FormOptions::named("general")
        },
        handlers,
    );
    let scope = FieldScope::with_form(&form);

    let test = Field::mount(
        FieldOptions::new("test")
            .format(|value, cursor| (value.to_uppercase(), cursor))
            .unformat(str::to_lowercase)
            .validate_on_blur(true)
            .validate_on_change(true)
            .validate(required_text),
        &scope,
    )
    .expect("mount test");
    let required2 = Field::mount(
        FieldOptions::new("test-required2").validate(required_text),
        &scope,
    )
    .expect("mount test-required2");
    let _radio = Field::mount(FieldOptions::new("testa").kind(FieldKind::Radio), &scope)
        .expect("mount testa");
    let _number = Field::mount(
        FieldOptions::new("numberField").kind(FieldKind::Number),
        &scope,
    )
    .expect("mount numberField");
    let _file = Field::mount(FieldOptions::new("file").kind(FieldKind::File), &scope)
        .expect("mount file");
    let _textarea = Field::mount(
        FieldOptions::new("textarea-field")
            .kind(FieldKind::Textarea)
            .value("Testing"),
        &scope,
    )
    .expect("mount textarea-field");

    assert!(test.auto_complete().starts_with("ac-"));

    let outcome = block_on(form.submit()).expect("first submit");
    let expected = messages(&[FORM_NOT_VALID, REQUIRED, REQUIRED]);
    assert_eq!(outcome, SubmitOutcome::Invalid(expected.clone()));
    assert_eq!(form.capabilities().expect("capabilities").errors, expected);

    let widget = Arc::new(TextWidget::new(""));
    test.set_ref(Some(widget.clone() as SharedWidget));
    let pending = test
        .on_change(ChangeEvent::text(widget.type_text("hello")))
        .expect("change validation is scheduled");
    widget.render(test.value().as_str().unwrap_or_default());
    test.after_render();
    block_on(pending);

    assert_eq!(test.value(), Value::from("HELLO"));
    assert_eq!(test.get_value(), Value::from("hello"));
    assert_eq!(widget.caret(), 5);
    assert!(test.errors().is_empty());

    required2.on_change(ChangeEvent::text("world"));
    let outcome = block_on(form.submit()).expect("second submit");
    let SubmitOutcome::Succeeded(values) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(values.get("test"), Some(&Value::from("hello")));
    assert_eq!(values.get("test-required2"), Some(&Value::from("world")));
    assert_eq!(values.get("numberField"), Some(&Value::Null));
    assert_eq!(values.get("textarea-field"), Some(&Value::from("Testing")));
    assert_eq!(
        values.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "test",
            "test-required2",
            "testa",
            "numberField",
            "file",
            "textarea-field"
        ]
    );

    let status = form.status().expect("status");
    assert!(status.has_submitted);
    assert!(status.errors.is_empty());
    assert_eq!(reported.lock().expect("reported").len(), 1);
}

#[test]
fn multi_step_form_walks_every_slide_and_submits() {
    let submitted = Arc::new(Mutex::new(None));
    let handlers = {
        let submitted = submitted.clone();
        SubmitHandlers::new().on_submit_sync(move |values| {
            *submitted.lock().expect("submitted") = Some(values.clone());
            Ok(values)
        })
    };
    let form = Form::with_handlers(FormOptions::named("slider"), handlers);
    let slider = Slider::builder(&form)
        .slide(Slide::builder("greeting").build())
        .slide(Slide::builder("prefilled").build())
        .slide(Slide::builder("required").build())
        .slide(
            Slide::builder("choices")
                .validate(|values: &FormValues| {
                    let checked = |name: &str| values.get(name).is_some_and(Value::is_truthy);
                    if !checked("slide3A") && !checked("slide3B") {
                        return vec![CHOOSE_ONE];
                    }
                    Vec::new()
                })
                .build(),
        )
        .slide(Slide::builder("preview").build())
        .build();

    let scope = |index| slider.scope_for(index).expect("slide scope");
    let _slide2 = Field::mount(
        FieldOptions::new("slide2").default_value("testing"),
        &scope(1),
    )
    .expect("mount slide2");
    let slide3 = Field::mount(
        FieldOptions::new("slide3").validate(required_text),
        &scope(2),
    )
    .expect("mount slide3");
    let _slide3a = Field::mount(
        FieldOptions::new("slide3A").kind(FieldKind::Checkbox),
        &scope(3),
    )
    .expect("mount slide3A");
    let slide3b = Field::mount(
        FieldOptions::new("slide3B").kind(FieldKind::Checkbox),
        &scope(3),
    )
    .expect("mount slide3B");

    slider.start().expect("start");
    for expected in [1, 2] {
        let Transition::Moved { to, .. } = block_on(slider.next()).expect("next") else {
            panic!("expected to reach slide {expected}");
        };
        assert_eq!(to, expected);
    }

    assert_eq!(
        block_on(slider.next()).expect("next"),
        Transition::Blocked {
            errors: messages(&[REQUIRED])
        }
    );
    assert_eq!(slide3.errors(), messages(&[REQUIRED]));
    slide3.on_change(ChangeEvent::text("done"));
    assert_eq!(
        block_on(slider.next()).expect("next"),
        Transition::Moved {
            from: Some(2),
            to: 3
        }
    );

    assert_eq!(
        block_on(slider.next()).expect("next"),
        Transition::Blocked {
            errors: messages(&[CHOOSE_ONE])
        }
    );
    assert_eq!(slider.active_index().expect("active"), Some(3));
    slide3b.on_change(ChangeEvent::checkbox(true));
    assert_eq!(
        block_on(slider.next()).expect("next"),
        Transition::Moved {
            from: Some(3),
            to: 4
        }
    );

    let preview = form.get_form_values().expect("preview values");
    assert_eq!(preview.get("slide2"), Some(&Value::from("testing")));
    assert_eq!(preview.get("slide3"), Some(&Value::from("done")));
    assert_eq!(preview.get("slide3A"), Some(&Value::from(false)));
    assert_eq!(preview.get("slide3B"), Some(&Value::from(true)));

    let Transition::Submitted(outcome) = block_on(slider.next()).expect("submit") else {
        panic!("expected the last slide to submit");
    };
    assert!(outcome.is_success());
    assert_eq!(
        submitted.lock().expect("submitted").as_ref(),
        Some(&preview)
    );
}
