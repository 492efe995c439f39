use crate::app::BatchViewerApp;
use eframe::egui;
use tracing::debug;

/// Arrow keys page through batches
pub fn handle_keyboard_shortcuts(app: &mut BatchViewerApp, ctx: &egui::Context) {
    if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
        debug!("[KEYBOARD] Right arrow pressed");
        app.next_batch();
    }
    if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
        debug!("[KEYBOARD] Left arrow pressed");
        app.prev_batch();
    }
}
