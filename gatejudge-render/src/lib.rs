pub mod layout;
pub mod render;
pub mod text;

pub use render::{Focus, Frame, FrameStats, Renderer, ScreenRenderer, SkiaRenderer};
pub use text::{render_text_pixmap, Anchor, TextStyle};
