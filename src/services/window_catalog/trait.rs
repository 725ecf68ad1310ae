use crate::events::WindowHandle;
use std::collections::HashMap;
use std::path::PathBuf;

/// DWM cloaking flags of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloakState(pub u32);

impl CloakState {
    pub const NONE: CloakState = CloakState(0);
    /// DWM_CLOAKED_APP: the owning app suspended painting
    pub const APP: CloakState = CloakState(0x1);
    /// DWM_CLOAKED_SHELL: hidden by the shell, e.g. on another virtual desktop
    pub const SHELL: CloakState = CloakState(0x2);

    pub fn is_app_cloaked(&self) -> bool {
        self.0 & Self::APP.0 != 0
    }
}

/// Read-only access to the desktop's top-level windows.
///
/// Every query is best effort: a failed OS call yields the neutral value
/// (`false`, empty string, `None`) instead of an error.
pub trait WindowSystem: Send + Sync {
    /// Top-level windows in Z-order, front to back
    fn top_level_windows(&self) -> Vec<WindowHandle>;
    fn shell_window(&self) -> Option<WindowHandle>;
    fn is_visible(&self, window: WindowHandle) -> bool;
    fn cloak_state(&self, window: WindowHandle) -> CloakState;
    fn is_tool_window(&self, window: WindowHandle) -> bool;
    fn title(&self, window: WindowHandle) -> String;
    fn process_id(&self, window: WindowHandle) -> Option<u32>;
    /// One snapshot of running processes: pid -> executable file name
    fn process_table(&self) -> HashMap<u32, String>;
    fn executable_path(&self, pid: u32) -> Option<PathBuf>;
}
