use crate::app::BatchViewerApp;
use eframe::egui;
use egui_phosphor::regular as Icon;

/// Batch navigation and the loaded folder
pub fn render_bottom_panel(app: &mut BatchViewerApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
        ui.add_space(10.0);
        ui.horizontal(|ui| {
            ui.add_space(10.0);

            let count = app.batch_count();
            if ui
                .add_enabled(
                    app.batch_index > 0,
                    egui::Button::new(format!("{} Previous", Icon::CARET_LEFT)),
                )
                .clicked()
            {
                app.prev_batch();
            }

            if count > 0 {
                ui.label(format!("Batch {} of {}", app.batch_index + 1, count));
            } else {
                ui.label("No batches");
            }

            if ui
                .add_enabled(
                    app.batch_index + 1 < count,
                    egui::Button::new(format!("Next {}", Icon::CARET_RIGHT)),
                )
                .clicked()
            {
                app.next_batch();
            }

            ui.add_space(20.0);

            if let Some(folder) = &app.folder {
                ui.label(format!("{} {}", Icon::FOLDER, folder.display()));
            }
        });
        ui.add_space(10.0);
    });
}
