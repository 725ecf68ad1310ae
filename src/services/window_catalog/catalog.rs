use crate::events::WindowRecord;
use crate::trace_if_enabled;
use std::sync::Arc;
use tracing::debug;

use super::r#trait::WindowSystem;

const DESKTOP_MANAGER_TITLE: &str = "Program Manager";

/// Перечисление переключаемых окон верхнего уровня
pub struct WindowCatalog {
    system: Arc<dyn WindowSystem>,
    self_pid: u32,
}

impl WindowCatalog {
    pub fn new(system: Arc<dyn WindowSystem>) -> Self {
        Self::with_self_pid(system, std::process::id())
    }

    pub fn with_self_pid(system: Arc<dyn WindowSystem>, self_pid: u32) -> Self {
        Self { system, self_pid }
    }

    /// Снимок окон в порядке Z (переднее первым).
    ///
    /// Без побочных эффектов, можно вызывать из любого потока.
    pub fn scan(&self) -> Vec<WindowRecord> {
        let shell = self.system.shell_window();
        let processes = self.system.process_table();
        let mut records = Vec::new();

        for handle in self.system.top_level_windows() {
            if Some(handle) == shell {
                continue;
            }
            if !self.system.is_visible(handle) {
                continue;
            }

            // Окна других рабочих столов (SHELL) остаются в списке
            let cloak = self.system.cloak_state(handle);
            if cloak.is_app_cloaked() {
                trace_if_enabled!("Окно {} скрыто приложением (cloak {:#x})", handle, cloak.0);
                continue;
            }

            if self.system.is_tool_window(handle) {
                continue;
            }

            let title = self.system.title(handle);
            if title.is_empty() || title == DESKTOP_MANAGER_TITLE {
                continue;
            }

            let Some(pid) = self.system.process_id(handle) else {
                continue;
            };
            if pid == self.self_pid {
                continue;
            }

            // Процесс мог завершиться между перечислением и снимком
            let Some(exe_name) = processes.get(&pid) else {
                trace_if_enabled!("Процесс {} окна {} не найден", pid, handle);
                continue;
            };

            let mut record = WindowRecord::new(handle, title, display_name(exe_name)).with_pid(pid);
            record.executable_path = self.system.executable_path(pid);
            records.push(record);
        }

        debug!("Сканирование: {} окон", records.len());
        records
    }
}

/// Имя процесса без расширения ".exe", регистр сохраняется
fn display_name(exe_name: &str) -> &str {
    let len = exe_name.len();
    if len > 4 && exe_name.is_char_boundary(len - 4) && exe_name[len - 4..].eq_ignore_ascii_case(".exe") {
        &exe_name[..len - 4]
    } else {
        exe_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowHandle;
    use crate::services::window_catalog::{CloakState, DryRunDesktop, FakeWindow};

    const OWN_PID: u32 = 4242;

    fn desktop() -> Arc<DryRunDesktop> {
        let desktop = DryRunDesktop::empty();
        desktop.add_window(FakeWindow::new(1, "Program Manager", 10, "explorer.exe"));
        desktop.add_window(FakeWindow::new(2, "notes.txt - Notepad", 20, "notepad.exe"));
        desktop.add_window(FakeWindow::new(3, "", 30, "chrome.exe"));
        desktop.add_window(FakeWindow::new(4, "Settings", 40, "tapswitch.exe").with_pid(OWN_PID));
        desktop.add_window(FakeWindow::new(5, "Hidden", 50, "svc.exe").hidden());
        desktop.add_window(FakeWindow::new(6, "Suspended", 60, "calc.exe").cloaked(CloakState::APP));
        desktop.add_window(FakeWindow::new(7, "Other desktop", 70, "code.exe").cloaked(CloakState::SHELL));
        desktop.add_window(FakeWindow::new(8, "Palette", 80, "paint.exe").tool_window());
        desktop.add_window(FakeWindow::new(9, "Inbox", 90, "Outlook.EXE").without_path());
        desktop.add_window(FakeWindow::new(10, "Ghost", 100, "gone.exe").exited());
        desktop.set_shell(WindowHandle(1));
        Arc::new(desktop)
    }

    fn scanned_handles(catalog: &WindowCatalog) -> Vec<isize> {
        catalog.scan().iter().map(|r| r.handle.value()).collect()
    }

    #[test]
    fn test_scan_applies_exclusions() {
        let catalog = WindowCatalog::with_self_pid(desktop(), OWN_PID);
        assert_eq!(scanned_handles(&catalog), vec![2, 7, 9]);
    }

    #[test]
    fn test_scan_never_lists_own_process_or_shell() {
        let catalog = WindowCatalog::with_self_pid(desktop(), OWN_PID);
        for record in catalog.scan() {
            assert_ne!(record.process_id, OWN_PID);
            assert_ne!(record.handle, WindowHandle(1));
            assert!(!record.title.is_empty());
        }
    }

    #[test]
    fn test_scan_resolves_names_and_paths() {
        let catalog = WindowCatalog::with_self_pid(desktop(), OWN_PID);
        let records = catalog.scan();

        assert_eq!(records[0].process_name, "notepad");
        assert!(records[0].executable_path.is_some());
        assert_eq!(records[2].process_name, "Outlook");
        assert_eq!(records[2].executable_path, None);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let catalog = WindowCatalog::with_self_pid(desktop(), OWN_PID);
        assert_eq!(catalog.scan(), catalog.scan());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("notepad.exe"), "notepad");
        assert_eq!(display_name("WINWORD.EXE"), "WINWORD");
        assert_eq!(display_name(".exe"), ".exe");
        assert_eq!(display_name("java"), "java");
    }
}
