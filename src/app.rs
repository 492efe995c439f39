use eframe::egui;
use egui::{ColorImage, TextureHandle, TextureOptions};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::DataConfig;
use crate::core::dataset::{DatasetSplit, GraspOutcome, ImageDataModule, ImageFolder, Subset};
use crate::core::image::transform::{transform_image, TransformImage};
use crate::core::image::{ImageTensor, NORMALIZE_MEAN, NORMALIZE_STD};
use crate::error::Result;
use crate::ui;

type ViewerModule = ImageDataModule<ImageFolder, TransformImage>;

/// One displayed sample of the current batch
pub struct BatchTile {
    pub texture: TextureHandle,
    pub title: String,
}

/// Browses the balanced splits of an image folder one batch at a time
pub struct BatchViewerApp {
    pub config: DataConfig,
    pub module: Option<ViewerModule>,
    pub folder: Option<PathBuf>,
    pub split: DatasetSplit,
    pub batch_index: usize,
    pub tiles: Vec<BatchTile>,
    pub load_error: Option<String>,
    needs_reload: bool,
}

impl BatchViewerApp {
    pub fn new(config: DataConfig, folder: Option<PathBuf>) -> Self {
        let mut app = Self {
            config,
            module: None,
            folder: None,
            split: DatasetSplit::Train,
            batch_index: 0,
            tiles: Vec::new(),
            load_error: None,
            needs_reload: false,
        };
        if let Some(folder) = folder {
            app.load_folder(folder);
        }
        app
    }

    /// Balance and split the images under `folder`
    pub fn load_folder(&mut self, folder: PathBuf) {
        info!("Loading image folder: {:?}", folder);
        self.tiles.clear();
        self.batch_index = 0;

        let module = ImageFolder::open(&folder)
            .and_then(|dataset| ImageDataModule::new(dataset, transform_image(), &self.config));
        match module {
            Ok(module) => {
                self.module = Some(module);
                self.load_error = None;
            }
            Err(e) => {
                error!("Failed to load {:?}: {}", folder, e);
                self.module = None;
                self.load_error = Some(e.to_string());
            }
        }
        self.folder = Some(folder);
        self.needs_reload = true;
    }

    pub fn change_split(&mut self, split: DatasetSplit) {
        if self.split != split {
            info!("Switching to {} split", split.as_str());
            self.split = split;
            self.batch_index = 0;
            self.needs_reload = true;
        }
    }

    pub fn batch_count(&self) -> usize {
        match &self.module {
            Some(module) => module
                .splits()
                .get(self.split)
                .len()
                .div_ceil(module.batch_size()),
            None => 0,
        }
    }

    pub fn next_batch(&mut self) {
        if self.batch_index + 1 < self.batch_count() {
            self.batch_index += 1;
            self.needs_reload = true;
        }
    }

    pub fn prev_batch(&mut self) {
        if self.batch_index > 0 {
            self.batch_index -= 1;
            self.needs_reload = true;
        }
    }

    fn reload_batch(&mut self, ctx: &egui::Context) {
        self.needs_reload = false;
        self.tiles.clear();
        if self.batch_count() == 0 {
            debug!("Nothing to show for the {} split", self.split.as_str());
            return;
        }

        match self.load_tiles(ctx) {
            Ok(tiles) => {
                debug!("Loaded {} tiles for batch {}", tiles.len(), self.batch_index);
                self.tiles = tiles;
                self.load_error = None;
            }
            Err(e) => {
                error!("Failed to load batch {}: {}", self.batch_index, e);
                self.load_error = Some(e.to_string());
            }
        }
    }

    fn load_tiles(&self, ctx: &egui::Context) -> Result<Vec<BatchTile>> {
        let Some(module) = &self.module else {
            return Ok(Vec::new());
        };
        let loader = module.split_loader::<Subset<_, _>>(self.split, None)?;
        let batch = loader.batch(self.batch_index)?;

        let mut tiles = Vec::with_capacity(batch.len());
        for (i, sample) in batch.into_iter().enumerate() {
            let title = class_title(module.dataset().classes(), sample.label);
            let image = tensor_to_color_image(sample.payload)?;
            let name = format!("{}_{}_{}", self.split.as_str(), self.batch_index, i);
            tiles.push(BatchTile {
                texture: ctx.load_texture(name, image, TextureOptions::LINEAR),
                title,
            });
        }
        Ok(tiles)
    }
}

/// Folder name of the class, falling back to the outcome name
fn class_title(classes: &[String], label: usize) -> String {
    match classes.get(label) {
        Some(name) => name.clone(),
        None => match GraspOutcome::from_label(label) {
            Some(outcome) => outcome.to_string(),
            None => {
                warn!("Unknown label {}", label);
                label.to_string()
            }
        },
    }
}

/// Undo normalization and turn the tensor into something egui can draw
fn tensor_to_color_image(tensor: ImageTensor) -> Result<ColorImage> {
    let image = tensor
        .denormalize(&NORMALIZE_MEAN, &NORMALIZE_STD)?
        .to_image()?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

impl eframe::App for BatchViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::handle_keyboard_shortcuts(self, ctx);

        if self.needs_reload {
            self.reload_batch(ctx);
        }

        ui::render_top_panel(self, ctx);
        ui::render_bottom_panel(self, ctx);
        ui::render_central_panel(self, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_title() {
        let classes = vec!["fail".to_string(), "success".to_string()];
        assert_eq!(class_title(&classes, 1), "success");
        assert_eq!(class_title(&[], 0), "fail");
        assert_eq!(class_title(&[], 7), "7");
    }

    #[test]
    fn test_tensor_to_color_image() {
        let tensor = ImageTensor::new(3, 2, 3, vec![0.0; 18]).unwrap();
        let image = tensor_to_color_image(tensor).unwrap();
        assert_eq!(image.size, [3, 2]);
    }

    #[test]
    fn test_viewer_without_folder() {
        let mut app = BatchViewerApp::new(DataConfig::default(), None);
        assert_eq!(app.batch_count(), 0);
        app.next_batch();
        app.prev_batch();
        assert_eq!(app.batch_index, 0);
        app.change_split(DatasetSplit::Val);
        assert_eq!(app.split, DatasetSplit::Val);
    }
}
