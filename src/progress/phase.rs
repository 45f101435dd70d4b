//! Advisory phase labels shown next to the progress value.

use std::fmt;

/// Progress below this value reads as "contacting the service".
const CONTACTING_BELOW: f64 = 30.0;

/// Progress below this value reads as "crafting content".
const CRAFTING_BELOW: f64 = 70.0;

/// User-facing phase of a generation episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No episode has run, or the last one was cancelled.
    #[default]
    Idle,
    /// Submission accepted, no tick yet.
    Starting,
    ContactingService,
    CraftingContent,
    AssemblingSlides,
    /// Synthetic progress reached the cap; waiting on the real outcome.
    WrappingUp,
    /// The artifact is ready for the save action.
    Ready,
    Failed,
}

impl Phase {
    /// Picks the band for a simulated progress value.
    #[must_use]
    pub fn for_progress(value: f64, cap: f64) -> Self {
        if value >= cap {
            Self::WrappingUp
        } else if value < CONTACTING_BELOW {
            Self::ContactingService
        } else if value < CRAFTING_BELOW {
            Self::CraftingContent
        } else {
            Self::AssemblingSlides
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Starting => "Starting generation...",
            Self::ContactingService => "Contacting AI service...",
            Self::CraftingContent => "AI is crafting your content...",
            Self::AssemblingSlides => "Assembling presentation slides...",
            Self::WrappingUp => "Almost ready, wrapping up...",
            Self::Ready => "Presentation ready for download!",
            Self::Failed => "Generation failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
