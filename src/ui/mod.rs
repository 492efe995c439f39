pub mod keyboard;
pub mod panels;

pub use keyboard::handle_keyboard_shortcuts;
pub use panels::{render_bottom_panel, render_central_panel, render_top_panel};
