pub mod keyboard_hook;
pub mod launcher;
pub mod presentation;
pub mod session;
pub mod window_catalog;
pub mod window_switcher;

pub use keyboard_hook::{create_keyboard_hook, BoundKeyGate, ChannelConsumer, KeyHookEngine};
pub use launcher::create_launcher;
pub use presentation::LogOverlay;
pub use session::{SessionController, SessionServices};
pub use window_catalog::{create_desktop, WindowCatalog};
pub use window_switcher::WindowSwitcher;
