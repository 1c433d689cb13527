use std::sync::{Arc, RwLock};

use super::controller::{Form, FormError, FormResult, read_lock, write_lock};
use super::field::FieldScope;
use super::lifecycle::Lifecycle;
use super::slide::{Direction, Slide, SlideExit};
use super::submit::SubmitOutcome;
use crate::value::ErrorMessage;

/// Result of a navigation request.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    Moved { from: Option<usize>, to: usize },
    /// The active slide failed validation and stays active.
    Blocked { errors: Vec<ErrorMessage> },
    /// An exit guard vetoed the move.
    Guarded,
    /// No visible slide lies before the active one.
    AtBoundary,
    /// Moving forward off the last visible slide submitted the form.
    Submitted(SubmitOutcome),
    /// The sequencer unmounted while a guard was pending.
    Cancelled,
}

#[derive(Debug, Default)]
struct SliderState {
    active: Option<usize>,
}

pub struct SliderBuilder {
    form: Form,
    slides: Vec<Slide>,
}

impl SliderBuilder {
    pub fn slide(mut self, slide: Slide) -> Self {
        self.slides.push(slide);
        self
    }

    pub fn slides(mut self, slides: impl IntoIterator<Item = Slide>) -> Self {
        self.slides.extend(slides);
        self
    }

    pub fn build(self) -> Slider {
        Slider {
            form: self.form,
            slides: self.slides.into(),
            state: Arc::new(RwLock::new(SliderState::default())),
            lifecycle: Lifecycle::new(),
        }
    }
}

/// Orders the slides of a multi-step form and moves between them.
#[derive(Clone)]
pub struct Slider {
    form: Form,
    slides: Arc<[Slide]>,
    state: Arc<RwLock<SliderState>>,
    lifecycle: Lifecycle,
}

impl Slider {
    pub fn builder(form: &Form) -> SliderBuilder {
        SliderBuilder {
            form: form.clone(),
            slides: Vec::new(),
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    /// Scope for fields mounted inside slide `index`: they join both the form and the slide.
    pub fn scope_for(&self, index: usize) -> Option<FieldScope> {
        self.slides
            .get(index)
            .map(|slide| FieldScope::with_form(&self.form).with_slide(slide))
    }

    pub fn active_index(&self) -> FormResult<Option<usize>> {
        Ok(read_lock(&self.state, "reading active slide")?.active)
    }

    pub fn active_slide(&self) -> FormResult<Option<&Slide>> {
        Ok(self.active_index()?.and_then(|index| self.slides.get(index)))
    }

    /// Indices of the slides currently shown, evaluated against the form's values now.
    pub fn visible_slides(&self) -> FormResult<Vec<usize>> {
        let values = self.form.values()?;
        Ok(self
            .slides
            .iter()
            .enumerate()
            .filter(|(_, slide)| slide.should_show(&values))
            .map(|(index, _)| index)
            .collect())
    }

    /// Activates the first visible slide.
    pub fn start(&self) -> FormResult<Transition> {
        self.ensure_mounted()?;
        let Some(first) = self.visible_slides()?.first().copied() else {
            return Ok(Transition::AtBoundary);
        };
        let previous = self.active_index()?;
        self.switch(previous, first, None)?;
        Ok(Transition::Moved {
            from: previous,
            to: first,
        })
    }

    pub async fn next(&self) -> FormResult<Transition> {
        self.navigate(Direction::Next).await
    }

    pub async fn prev(&self) -> FormResult<Transition> {
        self.navigate(Direction::Prev).await
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }

    pub fn unmount(&self) {
        if self.lifecycle.unmount() {
            tracing::debug!(form = %self.form.name(), "slider unmounted");
        }
    }

    async fn navigate(&self, direction: Direction) -> FormResult<Transition> {
        self.ensure_mounted()?;
        let Some(from) = self.active_index()? else {
            return self.start();
        };
        let Some(current) = self.slides.get(from) else {
            return Ok(Transition::AtBoundary);
        };

        let values = self.form.values()?;
        let to = match direction {
            Direction::Next => (from + 1..self.slides.len())
                .find(|&index| self.slides[index].should_show(&values)),
            Direction::Prev => (0..from)
                .rev()
                .find(|&index| self.slides[index].should_show(&values)),
        };
        if direction == Direction::Prev && to.is_none() {
            return Ok(Transition::AtBoundary);
        }

        let errors = current.validate_slide(true)?;
        if !errors.is_empty() {
            tracing::debug!(
                slide = %current.name(),
                errors = errors.len(),
                ?direction,
                "slide transition blocked"
            );
            return Ok(Transition::Blocked { errors });
        }

        if let Some(guard) = current.exit_guard(direction) {
            let exit = SlideExit {
                from,
                to,
                direction,
                values,
            };
            let proceed = guard(exit).await;
            if !self.lifecycle.is_mounted() {
                return Ok(Transition::Cancelled);
            }
            if !proceed {
                tracing::debug!(slide = %current.name(), ?direction, "slide exit guarded");
                return Ok(Transition::Guarded);
            }
        }

        match to {
            Some(to) => {
                self.switch(Some(from), to, Some(direction))?;
                Ok(Transition::Moved {
                    from: Some(from),
                    to,
                })
            }
            None => Ok(Transition::Submitted(self.form.submit().await?)),
        }
    }

    fn switch(
        &self,
        from: Option<usize>,
        to: usize,
        direction: Option<Direction>,
    ) -> FormResult<()> {
        if let Some(slide) = from.and_then(|index| self.slides.get(index)) {
            slide.deactivate()?;
        }
        write_lock(&self.state, "switching active slide")?.active = Some(to);
        if let Some(slide) = self.slides.get(to) {
            slide.activate(direction)?;
        }
        Ok(())
    }

    fn ensure_mounted(&self) -> FormResult<()> {
        if self.lifecycle.is_mounted() {
            Ok(())
        } else {
            Err(FormError::Unmounted("slider"))
        }
    }
}
