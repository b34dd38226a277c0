//! Menu-to-gallery pipeline: parse once, then generate every dish concurrently.

use crate::backend::GenerativeBackend;
use crate::config::Settings;
use crate::error::{PlatecamError, Result};
use crate::image::{EncodedImage, GeneratedImage};
use crate::menu::{Dish, MenuParser};
use crate::photo::{ImageGenerator, PhotoStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Phase notifications emitted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The menu is being parsed.
    Parsing,
    /// Images are being generated for `dish_count` dishes.
    Generating {
        /// Number of dishes being photographed.
        dish_count: usize,
    },
}

impl Progress {
    /// Human-readable progress message.
    pub fn message(&self) -> String {
        match self {
            Self::Parsing => "Parsing your menu...".to_string(),
            Self::Generating { dish_count: 1 } => "Generating a photo for 1 dish...".to_string(),
            Self::Generating { dish_count } => {
                format!("Generating photos for {dish_count} dishes...")
            }
        }
    }
}

/// Runs menu parsing followed by an all-or-nothing batch of image generations.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    parser: MenuParser,
    generator: ImageGenerator,
}

impl GenerationOrchestrator {
    /// Creates an orchestrator with default timeouts.
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            parser: MenuParser::new(backend.clone()),
            generator: ImageGenerator::new(backend),
        }
    }

    /// Creates an orchestrator using the timeouts in `settings`.
    pub fn from_settings(backend: Arc<dyn GenerativeBackend>, settings: &Settings) -> Self {
        Self {
            parser: MenuParser::new(backend.clone()).with_timeout(settings.parse_timeout),
            generator: ImageGenerator::new(backend).with_timeout(settings.generation_timeout),
        }
    }

    /// Parses `menu_text` and photographs every dish in `style`.
    ///
    /// Images come back in menu order. If any single generation fails, the
    /// whole run fails and no images are returned; calls still in flight are
    /// aborted and their results discarded.
    pub async fn run_generation(
        &self,
        menu_text: &str,
        style: PhotoStyle,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<Vec<GeneratedImage>> {
        if menu_text.trim().is_empty() {
            return Err(PlatecamError::Validation(
                "Please enter your menu text.".into(),
            ));
        }

        on_progress(Progress::Parsing);
        let dishes = self.parser.parse_menu(menu_text).await?;
        if dishes.is_empty() {
            tracing::warn!("menu parsed but no dishes were identified");
            return Err(PlatecamError::NoDishes);
        }

        let progress = Progress::Generating {
            dish_count: dishes.len(),
        };
        tracing::info!(dishes = dishes.len(), style = %style.as_str(), "generating photos");
        on_progress(progress);

        let images = self.generate_all(&dishes, style).await?;

        Ok(dishes
            .into_iter()
            .zip(images)
            .map(|(dish, image)| GeneratedImage::new(dish.name, image))
            .collect())
    }

    async fn generate_all(&self, dishes: &[Dish], style: PhotoStyle) -> Result<Vec<EncodedImage>> {
        let mut slots: Vec<Option<EncodedImage>> = vec![None; dishes.len()];
        let mut indices = HashMap::with_capacity(dishes.len());
        let mut tasks = JoinSet::new();

        for (index, dish) in dishes.iter().cloned().enumerate() {
            let generator = self.generator.clone();
            let handle = tasks.spawn(async move { generator.generate_image(&dish, style).await });
            indices.insert(handle.id(), index);
        }

        // Results are taken in completion order; the first failure to arrive wins.
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    let dish = indices
                        .get(&e.id())
                        .map_or("unknown dish", |&i| dishes[i].name.as_str());
                    tasks.abort_all();
                    return Err(PlatecamError::Generation {
                        dish: dish.to_string(),
                        reason: format!("task failed: {e}"),
                    });
                }
            };
            let Some(&index) = indices.get(&id) else {
                continue;
            };

            match result {
                Ok(image) => slots[index] = Some(image),
                Err(e) => {
                    tracing::warn!(dish = %dishes[index].name, error = %e, "batch failed; discarding remaining results");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .zip(dishes)
            .map(|(slot, dish)| {
                slot.ok_or_else(|| PlatecamError::Generation {
                    dish: dish.name.clone(),
                    reason: "generation produced no result".into(),
                })
            })
            .collect()
    }
}
