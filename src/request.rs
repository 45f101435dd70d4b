//! Generation request input and local validation.
//!
//! A [`GenerationRequest`] is built by the view layer from user input and
//! validated before any network call is issued.

use serde::Serialize;
use thiserror::Error;

/// Slide count sent when the caller does not specify one.
pub const DEFAULT_SLIDE_COUNT: u8 = 5;

/// Smallest accepted slide count.
pub const MIN_SLIDE_COUNT: u8 = 1;

/// Largest accepted slide count.
pub const MAX_SLIDE_COUNT: u8 = 15;

/// Input rejected locally, before the request reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The primary text/topic is empty or whitespace only.
    #[error("Please enter a topic or some text for the presentation.")]
    EmptyText,

    /// The requested slide count is outside the accepted range.
    #[error("Slide count must be between 1 and 15, got {value}.")]
    SlideCountOutOfRange {
        /// The rejected value.
        value: u8,
    },
}

/// Immutable input for one generation episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    text: String,
    tone: Option<String>,
    slide_count: Option<u8>,
}

impl GenerationRequest {
    /// Creates a request for the given primary text or topic.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: None,
            slide_count: None,
        }
    }

    /// Sets the presentation tone. Blank tones are treated as absent.
    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        let tone = tone.into();
        let trimmed = tone.trim();
        self.tone = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Sets the approximate number of content slides.
    #[must_use]
    pub fn with_slide_count(mut self, slide_count: u8) -> Self {
        self.slide_count = Some(slide_count);
        self
    }

    /// The primary text or topic, as entered.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn tone(&self) -> Option<&str> {
        self.tone.as_deref()
    }

    #[must_use]
    pub fn slide_count(&self) -> Option<u8> {
        self.slide_count
    }

    /// Checks the request can be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyText`] for blank text and
    /// [`ValidationError::SlideCountOutOfRange`] for slide counts outside
    /// `1..=15`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if let Some(value) = self.slide_count
            && !(MIN_SLIDE_COUNT..=MAX_SLIDE_COUNT).contains(&value)
        {
            return Err(ValidationError::SlideCountOutOfRange { value });
        }
        Ok(())
    }

    /// Wire body for the generation endpoint.
    pub(crate) fn to_body(&self) -> RequestBody<'_> {
        RequestBody {
            text_input: &self.text,
            num_slides: self.slide_count.unwrap_or(DEFAULT_SLIDE_COUNT),
            tone: self.tone.as_deref(),
        }
    }
}

/// JSON body posted to the generation endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RequestBody<'a> {
    pub(crate) text_input: &'a str,
    pub(crate) num_slides: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tone: Option<&'a str>,
}
