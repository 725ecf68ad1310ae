use crate::events::WindowHandle;
use crate::services::window_switcher::FocusControl;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

use super::r#trait::{CloakState, WindowSystem};

/// Окно эмулируемого рабочего стола
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub handle: WindowHandle,
    pub title: String,
    pub pid: u32,
    pub exe_name: String,
    pub path: Option<PathBuf>,
    pub visible: bool,
    pub cloak: CloakState,
    pub tool_window: bool,
    pub minimized: bool,
    /// Процесс уже завершился, окно ещё в списке
    pub exited: bool,
}

impl FakeWindow {
    pub fn new(handle: isize, title: impl Into<String>, pid: u32, exe_name: impl Into<String>) -> Self {
        let exe_name = exe_name.into();
        let path = PathBuf::from(format!("C:\\Program Files\\DryRun\\{}", exe_name));
        Self {
            handle: WindowHandle(handle),
            title: title.into(),
            pid,
            exe_name,
            path: Some(path),
            visible: true,
            cloak: CloakState::NONE,
            tool_window: false,
            minimized: false,
            exited: false,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn cloaked(mut self, cloak: CloakState) -> Self {
        self.cloak = cloak;
        self
    }

    pub fn tool_window(mut self) -> Self {
        self.tool_window = true;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.minimized = true;
        self
    }

    pub fn without_path(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn exited(mut self) -> Self {
        self.exited = true;
        self
    }

    fn thread_id(&self) -> u32 {
        self.pid * 10
    }
}

#[derive(Debug, Default)]
struct DesktopState {
    /// Порядок Z, переднее окно первым
    windows: Vec<FakeWindow>,
    shell: Option<WindowHandle>,
    foreground: Option<WindowHandle>,
    /// Эмуляция защиты от кражи фокуса
    lock_foreground: bool,
    refuse_attach: bool,
    attached: HashSet<(u32, u32)>,
    calls: Vec<String>,
}

impl DesktopState {
    fn find(&self, handle: WindowHandle) -> Option<&FakeWindow> {
        self.windows.iter().find(|w| w.handle == handle)
    }

    fn find_mut(&mut self, handle: WindowHandle) -> Option<&mut FakeWindow> {
        self.windows.iter_mut().find(|w| w.handle == handle)
    }

    fn raise(&mut self, handle: WindowHandle) {
        if let Some(pos) = self.windows.iter().position(|w| w.handle == handle) {
            let window = self.windows.remove(pos);
            self.windows.insert(0, window);
        }
        self.foreground = Some(handle);
    }
}

/// Эмулируемый рабочий стол для dry-run режима и тестов
#[derive(Debug, Default)]
pub struct DryRunDesktop {
    state: RwLock<DesktopState>,
}

impl DryRunDesktop {
    pub const THREAD_ID: u32 = 1;

    pub fn empty() -> Self {
        Self::default()
    }

    /// Небольшой набор окон для демонстрации
    pub fn new() -> Self {
        let desktop = Self::empty();
        desktop.add_window(FakeWindow::new(0x1001, "Terminal - dry_run", 100, "WindowsTerminal.exe"));
        desktop.add_window(FakeWindow::new(0x1002, "notes.txt - Notepad", 200, "notepad.exe"));
        desktop.add_window(FakeWindow::new(0x1003, "Inbox - Browser", 300, "chrome.exe"));
        desktop.add_window(FakeWindow::new(0x1004, "Docs - Browser", 300, "chrome.exe").minimized());
        desktop.add_window(FakeWindow::new(0x1005, "Steam", 400, "steamwebhelper.exe"));
        desktop.add_window(FakeWindow::new(0x1006, "Program Manager", 500, "explorer.exe"));
        desktop.set_shell(WindowHandle(0x1006));
        desktop.focus_front();
        info!("Dry-run: эмулируемый рабочий стол из {} окон", desktop.state.read().windows.len());
        desktop
    }

    /// Добавить окно позади существующих
    pub fn add_window(&self, window: FakeWindow) {
        self.state.write().windows.push(window);
    }

    pub fn set_shell(&self, handle: WindowHandle) {
        self.state.write().shell = Some(handle);
    }

    /// Сделать переднее окно активным
    pub fn focus_front(&self) {
        let mut state = self.state.write();
        state.foreground = state.windows.first().map(|w| w.handle);
    }

    pub fn lock_foreground(&self, locked: bool) {
        self.state.write().lock_foreground = locked;
    }

    pub fn refuse_attach(&self, refused: bool) {
        self.state.write().refuse_attach = refused;
    }

    /// Журнал вызовов управления фокусом
    pub fn focus_log(&self) -> Vec<String> {
        self.state.read().calls.clone()
    }

    pub fn clear_log(&self) {
        self.state.write().calls.clear();
    }

    pub fn is_minimized_window(&self, handle: WindowHandle) -> bool {
        self.state.read().find(handle).map(|w| w.minimized).unwrap_or(false)
    }

    fn record(&self, call: String) {
        debug!("Dry-run: {}", call);
        self.state.write().calls.push(call);
    }
}

impl WindowSystem for DryRunDesktop {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        self.state.read().windows.iter().map(|w| w.handle).collect()
    }

    fn shell_window(&self) -> Option<WindowHandle> {
        self.state.read().shell
    }

    fn is_visible(&self, window: WindowHandle) -> bool {
        self.state.read().find(window).map(|w| w.visible).unwrap_or(false)
    }

    fn cloak_state(&self, window: WindowHandle) -> CloakState {
        self.state.read().find(window).map(|w| w.cloak).unwrap_or_default()
    }

    fn is_tool_window(&self, window: WindowHandle) -> bool {
        self.state.read().find(window).map(|w| w.tool_window).unwrap_or(false)
    }

    fn title(&self, window: WindowHandle) -> String {
        self.state
            .read()
            .find(window)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        self.state.read().find(window).map(|w| w.pid)
    }

    fn process_table(&self) -> HashMap<u32, String> {
        self.state
            .read()
            .windows
            .iter()
            .filter(|w| !w.exited)
            .map(|w| (w.pid, w.exe_name.clone()))
            .collect()
    }

    fn executable_path(&self, pid: u32) -> Option<PathBuf> {
        self.state
            .read()
            .windows
            .iter()
            .find(|w| w.pid == pid && !w.exited)
            .and_then(|w| w.path.clone())
    }
}

impl FocusControl for DryRunDesktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        self.state.read().foreground
    }

    fn allow_any_foreground(&self) -> bool {
        self.record("allow_any_foreground".to_string());
        true
    }

    fn is_minimized(&self, window: WindowHandle) -> bool {
        self.is_minimized_window(window)
    }

    fn restore(&self, window: WindowHandle) -> bool {
        self.record(format!("restore {}", window));
        match self.state.write().find_mut(window) {
            Some(w) => {
                w.minimized = false;
                true
            }
            None => false,
        }
    }

    fn show(&self, window: WindowHandle) -> bool {
        self.record(format!("show {}", window));
        self.state.read().find(window).is_some()
    }

    fn window_thread(&self, window: WindowHandle) -> Option<u32> {
        self.state.read().find(window).map(FakeWindow::thread_id)
    }

    fn current_thread(&self) -> u32 {
        Self::THREAD_ID
    }

    fn attach_input(&self, from: u32, to: u32, attach: bool) -> bool {
        self.record(format!("attach_input {} -> {} ({})", from, to, attach));
        let mut state = self.state.write();
        if state.refuse_attach {
            return false;
        }
        if attach {
            state.attached.insert((from, to));
        } else {
            state.attached.remove(&(from, to));
        }
        true
    }

    fn set_foreground(&self, window: WindowHandle) -> bool {
        self.record(format!("set_foreground {}", window));
        let mut state = self.state.write();
        if state.find(window).is_none() {
            return false;
        }

        if state.lock_foreground {
            let owner = state
                .foreground
                .and_then(|fg| state.find(fg))
                .map(FakeWindow::thread_id);
            let allowed = owner
                .map(|tid| state.attached.contains(&(Self::THREAD_ID, tid)))
                .unwrap_or(true);
            if !allowed {
                return false;
            }
        }

        state.raise(window);
        true
    }

    fn bring_to_top(&self, window: WindowHandle) -> bool {
        self.record(format!("bring_to_top {}", window));
        self.state.read().find(window).is_some()
    }

    fn switch_to(&self, window: WindowHandle) {
        self.record(format!("switch_to {}", window));
        let mut state = self.state.write();
        if state.find(window).is_some() {
            state.raise(window);
        }
    }

    fn minimize(&self, window: WindowHandle) -> bool {
        self.record(format!("minimize {}", window));
        let mut state = self.state.write();
        let Some(w) = state.find_mut(window) else {
            return false;
        };
        w.minimized = true;
        if state.foreground == Some(window) {
            state.foreground = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_desktop_focuses_front_window() {
        let desktop = DryRunDesktop::new();
        assert_eq!(desktop.foreground_window(), Some(WindowHandle(0x1001)));
        assert!(desktop.is_minimized(WindowHandle(0x1004)));
    }

    #[test]
    fn locked_foreground_requires_attached_input() {
        let desktop = DryRunDesktop::new();
        desktop.lock_foreground(true);
        let target = WindowHandle(0x1002);
        assert!(!desktop.set_foreground(target));

        let owner = desktop.window_thread(WindowHandle(0x1001)).unwrap();
        desktop.attach_input(DryRunDesktop::THREAD_ID, owner, true);
        assert!(desktop.set_foreground(target));
        assert_eq!(desktop.top_level_windows()[0], target);
    }

    #[test]
    fn exited_process_missing_from_table() {
        let desktop = DryRunDesktop::empty();
        desktop.add_window(FakeWindow::new(1, "Ghost", 7, "gone.exe").exited());
        assert!(desktop.process_table().is_empty());
        assert_eq!(desktop.executable_path(7), None);
    }
}
