use crate::app::BatchViewerApp;
use crate::core::dataset::DatasetSplit;
use eframe::egui;
use egui_phosphor::regular as Icon;

/// Folder picker, split selector and split sizes
pub fn render_top_panel(app: &mut BatchViewerApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading(format!("{} Grasp Dataset Viewer", Icon::IMAGES));

            ui.add_space(20.0);

            if ui
                .button(format!("{} Open Folder", Icon::FOLDER_OPEN))
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new().pick_folder() {
                    app.load_folder(path);
                }
            }

            ui.add_space(20.0);

            let Some(module) = &app.module else {
                return;
            };
            let sizes: Vec<(DatasetSplit, usize)> = DatasetSplit::ALL
                .iter()
                .map(|&split| (split, module.splits().get(split).len()))
                .collect();

            ui.label("Split:");
            for (split, len) in sizes {
                let text = format!("{} ({})", split.as_str(), len);
                if ui.selectable_label(app.split == split, text).clicked() {
                    app.change_split(split);
                }
            }
        });
    });
}
