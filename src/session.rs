//! Session state, its transition rules, and the intent dispatcher.
//!
//! [`SessionState`] changes only through [`SessionState::apply`], so every
//! transition can be tested without a UI or a backend. [`Studio`] wires the
//! four user intents to the orchestrator and editor and feeds their outcomes
//! back in as [`SessionEvent`]s.

use crate::backend::GenerativeBackend;
use crate::config::Settings;
use crate::error::{PlatecamError, Result};
use crate::image::{EncodedImage, GeneratedImage};
use crate::orchestrator::{GenerationOrchestrator, Progress};
use crate::photo::{ImageEditor, PhotoStyle};
use std::sync::Arc;

/// Example menu offered to first-time users.
pub const EXAMPLE_MENU: &str = "APPETIZERS
Classic Bruschetta - $9
Toasted baguette topped with fresh tomatoes, garlic, basil, and balsamic glaze.

MAINS
Spaghetti Carbonara - $18
Creamy egg-based sauce with pancetta and Pecorino Romano cheese.

Margherita Pizza - $15
Classic pizza with San Marzano tomatoes, fresh mozzarella, basil, and a drizzle of olive oil.";

/// Where the session is in the generation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// The menu is being parsed.
    Parsing,
    /// Photos are being generated.
    Generating {
        /// Number of dishes in the batch.
        dish_count: usize,
    },
    /// The gallery holds the latest successful batch.
    Ready,
    /// The latest generation failed.
    Error,
}

impl Phase {
    /// Returns true while a generation run is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Parsing | Self::Generating { .. })
    }
}

/// Inputs to [`SessionState::apply`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A generation run started for this menu and style.
    GenerationStarted {
        /// Menu text being processed.
        menu_text: String,
        /// Selected style.
        style: PhotoStyle,
    },
    /// Input was rejected before any run started.
    InputRejected(String),
    /// The running generation reached a new phase.
    ProgressChanged(Progress),
    /// The run finished and produced this gallery.
    GenerationSucceeded(Vec<GeneratedImage>),
    /// The run failed with this message.
    GenerationFailed(String),
    /// The run was dropped before it finished; its results are discarded.
    GenerationCancelled,
    /// The edit view was opened on an image.
    EditorOpened(String),
    /// The edit view was closed.
    EditorClosed,
    /// An edit was submitted for an image.
    EditStarted(String),
    /// An edit finished with a replacement payload.
    EditSucceeded {
        /// Image being replaced.
        image_id: String,
        /// New payload.
        image: EncodedImage,
    },
    /// An edit failed with this message.
    EditFailed(String),
    /// The edit was dropped before it finished.
    EditCancelled,
}

/// In-memory state of one user session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    menu_text: String,
    style: PhotoStyle,
    images: Vec<GeneratedImage>,
    phase: Phase,
    loading_message: Option<String>,
    error: Option<String>,
    editing: Option<String>,
    edit_in_flight: bool,
}

impl SessionState {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current menu text.
    pub fn menu_text(&self) -> &str {
        &self.menu_text
    }

    /// Selected style.
    pub fn style(&self) -> PhotoStyle {
        self.style
    }

    /// Gallery, in generation order.
    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    /// Looks up a gallery image by id.
    pub fn image(&self, id: &str) -> Option<&GeneratedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while a generation run is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Progress message for the loading indicator.
    pub fn loading_message(&self) -> Option<&str> {
        self.loading_message.as_deref()
    }

    /// Most recent error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The image open in the edit view, resolved against the gallery.
    pub fn editing_image(&self) -> Option<&GeneratedImage> {
        self.editing.as_deref().and_then(|id| self.image(id))
    }

    /// True while an edit call is in flight.
    pub fn is_editing_loading(&self) -> bool {
        self.edit_in_flight
    }

    /// Sets the menu text without starting a run.
    pub fn set_menu_text(&mut self, text: impl Into<String>) {
        self.menu_text = text.into();
    }

    /// Selects a style for the next run.
    pub fn select_style(&mut self, style: PhotoStyle) {
        self.style = style;
    }

    /// Applies one transition.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::GenerationStarted { menu_text, style } => {
                self.menu_text = menu_text;
                self.style = style;
                self.error = None;
                self.images.clear();
                self.editing = None;
                self.edit_in_flight = false;
                self.phase = Phase::Parsing;
                self.loading_message = Some(Progress::Parsing.message());
            }
            SessionEvent::InputRejected(message) => {
                self.error = Some(message);
            }
            SessionEvent::ProgressChanged(progress) => {
                if !self.phase.is_loading() {
                    return;
                }
                self.phase = match progress {
                    Progress::Parsing => Phase::Parsing,
                    Progress::Generating { dish_count } => Phase::Generating { dish_count },
                };
                self.loading_message = Some(progress.message());
            }
            SessionEvent::GenerationSucceeded(images) => {
                self.images = images;
                self.phase = Phase::Ready;
                self.loading_message = None;
            }
            SessionEvent::GenerationFailed(message) => {
                self.images.clear();
                self.error = Some(message);
                self.phase = Phase::Error;
                self.loading_message = None;
            }
            SessionEvent::GenerationCancelled => {
                if !self.phase.is_loading() {
                    return;
                }
                self.images.clear();
                self.phase = Phase::Idle;
                self.loading_message = None;
            }
            SessionEvent::EditorOpened(id) => {
                if self.image(&id).is_some() {
                    self.editing = Some(id);
                }
            }
            SessionEvent::EditorClosed => {
                self.editing = None;
                self.edit_in_flight = false;
            }
            SessionEvent::EditStarted(_) => {
                self.error = None;
                self.edit_in_flight = true;
            }
            SessionEvent::EditSucceeded { image_id, image } => {
                self.edit_in_flight = false;
                // Replaced in place; the edit view resolves by id so it follows automatically
                if let Some(entry) = self.images.iter_mut().find(|img| img.id == image_id) {
                    entry.image = image;
                }
            }
            SessionEvent::EditFailed(message) => {
                self.edit_in_flight = false;
                self.error = Some(message);
            }
            SessionEvent::EditCancelled => {
                self.edit_in_flight = false;
            }
        }
    }
}

/// Holds the session while a call is in flight.
///
/// Dropped without [`InFlight::finish`], it applies the cancellation event so
/// the session does not stay loading.
struct InFlight<'a> {
    state: &'a mut SessionState,
    on_cancel: Option<SessionEvent>,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a mut SessionState, on_cancel: SessionEvent) -> Self {
        Self {
            state,
            on_cancel: Some(on_cancel),
        }
    }

    fn finish(mut self, event: SessionEvent) {
        self.on_cancel = None;
        self.state.apply(event);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(event) = self.on_cancel.take() {
            tracing::warn!(?event, "call dropped before completion");
            self.state.apply(event);
        }
    }
}

/// Dispatches user intents against one session.
pub struct Studio {
    orchestrator: GenerationOrchestrator,
    editor: ImageEditor,
    state: SessionState,
}

impl Studio {
    /// Creates a studio over `backend` with default timeouts.
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            orchestrator: GenerationOrchestrator::new(backend.clone()),
            editor: ImageEditor::new(backend),
            state: SessionState::new(),
        }
    }

    /// Creates a studio using the timeouts in `settings`.
    pub fn from_settings(backend: Arc<dyn GenerativeBackend>, settings: &Settings) -> Self {
        Self {
            orchestrator: GenerationOrchestrator::from_settings(backend.clone(), settings),
            editor: ImageEditor::new(backend).with_timeout(settings.edit_timeout),
            state: SessionState::new(),
        }
    }

    /// Read-only view of the session.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Updates the menu text.
    pub fn set_menu_text(&mut self, text: impl Into<String>) {
        self.state.set_menu_text(text);
    }

    /// Selects a style for the next run.
    pub fn select_style(&mut self, style: PhotoStyle) {
        self.state.select_style(style);
    }

    /// Replaces the gallery with photos of every dish in `menu_text`.
    ///
    /// On failure the gallery is left empty and the error is recorded in the
    /// session as well as returned.
    pub async fn request_generation(
        &mut self,
        menu_text: &str,
        style: PhotoStyle,
    ) -> Result<&[GeneratedImage]> {
        if self.state.is_loading() {
            return Err(PlatecamError::Busy);
        }
        if menu_text.trim().is_empty() {
            let err = PlatecamError::Validation("Please enter your menu text.".into());
            self.state.set_menu_text(menu_text);
            self.state
                .apply(SessionEvent::InputRejected(err.to_string()));
            return Err(err);
        }

        self.state.apply(SessionEvent::GenerationStarted {
            menu_text: menu_text.to_string(),
            style,
        });

        let mut in_flight = InFlight::new(&mut self.state, SessionEvent::GenerationCancelled);
        let result = self
            .orchestrator
            .run_generation(menu_text, style, |progress| {
                tracing::info!("{}", progress.message());
                in_flight
                    .state
                    .apply(SessionEvent::ProgressChanged(progress));
            })
            .await;

        match result {
            Ok(images) => {
                tracing::info!(count = images.len(), "gallery ready");
                in_flight.finish(SessionEvent::GenerationSucceeded(images));
                Ok(self.state.images())
            }
            Err(err) => {
                in_flight.finish(SessionEvent::GenerationFailed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Opens the edit view on `image_id`.
    pub fn open_editor(&mut self, image_id: &str) -> Result<&GeneratedImage> {
        if self.state.image(image_id).is_none() {
            return Err(PlatecamError::UnknownImage(image_id.to_string()));
        }
        self.state
            .apply(SessionEvent::EditorOpened(image_id.to_string()));
        self.state
            .editing_image()
            .ok_or_else(|| PlatecamError::UnknownImage(image_id.to_string()))
    }

    /// Closes the edit view.
    pub fn close_editor(&mut self) {
        self.state.apply(SessionEvent::EditorClosed);
    }

    /// Applies `instruction` to the image `image_id`, replacing it in place.
    ///
    /// A failed edit keeps the previous image and the edit view stays open.
    pub async fn request_edit(&mut self, image_id: &str, instruction: &str) -> Result<&GeneratedImage> {
        if self.state.is_loading() || self.state.is_editing_loading() {
            return Err(PlatecamError::Busy);
        }
        let current = self
            .state
            .image(image_id)
            .map(|img| img.image.clone())
            .ok_or_else(|| PlatecamError::UnknownImage(image_id.to_string()))?;

        self.state
            .apply(SessionEvent::EditStarted(image_id.to_string()));

        let in_flight = InFlight::new(&mut self.state, SessionEvent::EditCancelled);
        match self.editor.edit_image(&current, instruction).await {
            Ok(image) => {
                tracing::info!(image_id, "edit applied");
                in_flight.finish(SessionEvent::EditSucceeded {
                    image_id: image_id.to_string(),
                    image,
                });
                self.state
                    .image(image_id)
                    .ok_or_else(|| PlatecamError::UnknownImage(image_id.to_string()))
            }
            Err(err) => {
                tracing::warn!(image_id, error = %err, "edit failed");
                in_flight.finish(SessionEvent::EditFailed(err.to_string()));
                Err(err)
            }
        }
    }
}
