use crate::app::BatchViewerApp;
use eframe::egui;
use egui_phosphor::regular as Icon;

const TILE_SPACING: f32 = 8.0;
const TITLE_HEIGHT: f32 = 20.0;

/// Fit a square grid of `count` tiles into `available`; returns (columns, tile side)
fn grid_layout(count: usize, available: egui::Vec2) -> (usize, f32) {
    let columns = (count as f32).sqrt().ceil().max(1.0) as usize;
    let rows = count.div_ceil(columns).max(1);
    let width = (available.x - TILE_SPACING * columns as f32) / columns as f32;
    let height = (available.y - (TILE_SPACING + TITLE_HEIGHT) * rows as f32) / rows as f32;
    (columns, width.min(height).max(32.0))
}

/// The current batch as a grid of images titled with their class
pub fn render_central_panel(app: &mut BatchViewerApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        if let Some(err) = &app.load_error {
            ui.centered_and_justified(|ui| {
                ui.colored_label(
                    egui::Color32::from_rgb(220, 80, 80),
                    format!("{} {}", Icon::WARNING, err),
                );
            });
            return;
        }

        if app.module.is_none() {
            ui.centered_and_justified(|ui| {
                ui.heading("No dataset loaded. Click 'Open Folder' to begin.");
            });
            return;
        }

        if app.tiles.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.heading(format!("The {} split is empty.", app.split.as_str()));
            });
            return;
        }

        let (columns, side) = grid_layout(app.tiles.len(), ui.available_size());
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("batch_grid")
                    .spacing([TILE_SPACING, TILE_SPACING])
                    .show(ui, |ui| {
                        for (i, tile) in app.tiles.iter().enumerate() {
                            ui.vertical(|ui| {
                                ui.label(egui::RichText::new(&tile.title).strong());
                                ui.add(egui::Image::new((tile.texture.id(), egui::vec2(side, side))));
                            });
                            if (i + 1) % columns == 0 {
                                ui.end_row();
                            }
                        }
                    });
            });
    });
}
