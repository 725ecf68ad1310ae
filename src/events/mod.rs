pub mod keyboard;
pub mod session;
pub mod window;

pub use keyboard::{HookDecision, RawKeyEvent, VirtualKey};
pub use session::{SessionMessage, SessionPhase, SessionStatus};
pub use window::{AppGroup, GroupedApps, Launcher, WindowHandle, WindowRecord};
