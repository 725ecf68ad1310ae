//! WindowSwitcher: активация окон в обход защиты от кражи фокуса
//!
//! Переключатель хранит память последних двух целей: повторная активация той же
//! цели возвращает фокус к предыдущей.

use crate::debug_if_enabled;
use crate::events::{WindowHandle, WindowRecord};
use crate::services::window_catalog::WindowCatalog;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Управление фокусом окон.
///
/// Вызовы не возвращают ошибок: `false` означает, что ОС отказала, и
/// последовательность переходит к следующему шагу.
pub trait FocusControl: Send + Sync {
    fn foreground_window(&self) -> Option<WindowHandle>;
    /// Разрешить любому процессу менять активное окно
    fn allow_any_foreground(&self) -> bool;
    fn is_minimized(&self, window: WindowHandle) -> bool;
    fn restore(&self, window: WindowHandle) -> bool;
    fn show(&self, window: WindowHandle) -> bool;
    fn window_thread(&self, window: WindowHandle) -> Option<u32>;
    fn current_thread(&self) -> u32;
    fn attach_input(&self, from: u32, to: u32, attach: bool) -> bool;
    fn set_foreground(&self, window: WindowHandle) -> bool;
    fn bring_to_top(&self, window: WindowHandle) -> bool;
    /// Активация как при Alt+Tab
    fn switch_to(&self, window: WindowHandle);
    fn minimize(&self, window: WindowHandle) -> bool;
}

/// Две последние цели переключения
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SwitchMemory {
    pub previous_target: Option<WindowHandle>,
    pub last_target: Option<WindowHandle>,
}

impl SwitchMemory {
    /// Запомнить цель и вернуть окно, которое нужно активировать
    pub fn redirect(&mut self, target: WindowHandle) -> WindowHandle {
        match self.previous_target {
            Some(previous) if self.last_target == Some(target) && previous != target => {
                self.previous_target = Some(target);
                self.last_target = Some(previous);
                previous
            }
            _ => {
                self.previous_target = self.last_target;
                self.last_target = Some(target);
                target
            }
        }
    }
}

pub struct WindowSwitcher {
    focus: Arc<dyn FocusControl>,
    catalog: Arc<WindowCatalog>,
    memory: Mutex<SwitchMemory>,
}

impl WindowSwitcher {
    pub fn new(focus: Arc<dyn FocusControl>, catalog: Arc<WindowCatalog>) -> Self {
        Self {
            focus,
            catalog,
            memory: Mutex::new(SwitchMemory::default()),
        }
    }

    #[cfg(test)]
    pub fn memory(&self) -> SwitchMemory {
        *self.memory.lock()
    }

    /// Активировать группу окон.
    ///
    /// Если активное окно уже принадлежит группе, фокус уходит к первому окну
    /// вне группы по свежему сканированию. Возвращает фактическую цель.
    pub fn activate(&self, candidates: &[WindowRecord]) -> Option<WindowHandle> {
        let first = candidates.first()?;
        let in_group = |handle: WindowHandle| candidates.iter().any(|c| c.handle == handle);

        match self.focus.foreground_window() {
            Some(foreground) if in_group(foreground) => {
                let records = self.catalog.scan();
                match records.iter().find(|r| !in_group(r.handle)) {
                    Some(other) => {
                        debug!("Группа уже активна, возврат к {}", other);
                        Some(self.switch(other.handle))
                    }
                    None => {
                        debug!("Группа уже активна, других окон нет");
                        None
                    }
                }
            }
            _ => Some(self.switch(first.handle)),
        }
    }

    /// Переключиться на окно с учётом памяти возврата
    pub fn switch(&self, target: WindowHandle) -> WindowHandle {
        // Память и вызовы ОС под одной блокировкой
        let mut memory = self.memory.lock();
        let target = memory.redirect(target);
        self.bring_to_foreground(target);
        info!("Активировано окно {}", target);
        target
    }

    pub fn minimize(&self, window: WindowHandle) {
        if !self.focus.minimize(window) {
            debug!("Не удалось свернуть {}", window);
        }
    }

    fn bring_to_foreground(&self, target: WindowHandle) {
        let focus = &self.focus;

        if !focus.allow_any_foreground() {
            debug_if_enabled!("AllowSetForegroundWindow отклонён");
        }

        if focus.is_minimized(target) {
            if !focus.restore(target) {
                debug_if_enabled!("Не удалось развернуть {}", target);
            }
        } else if !focus.show(target) {
            debug_if_enabled!("Не удалось показать {}", target);
        }

        if focus.foreground_window() != Some(target) {
            let current = focus.current_thread();
            let owner = focus
                .foreground_window()
                .and_then(|foreground| focus.window_thread(foreground))
                .filter(|&tid| tid != current);

            let attached = owner.filter(|&tid| focus.attach_input(current, tid, true));
            if owner.is_some() && attached.is_none() {
                debug_if_enabled!("AttachThreadInput отклонён");
            }

            if !focus.set_foreground(target) {
                debug_if_enabled!("SetForegroundWindow отклонён для {}", target);
            }
            if !focus.bring_to_top(target) {
                debug_if_enabled!("BringWindowToTop отклонён для {}", target);
            }

            if let Some(tid) = attached {
                focus.attach_input(current, tid, false);
            }
        }

        if focus.foreground_window() != Some(target) {
            debug_if_enabled!("Окно {} не активно, SwitchToThisWindow", target);
            focus.switch_to(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::window_catalog::{DryRunDesktop, FakeWindow};

    const OWN_PID: u32 = 1;

    fn fixture() -> (Arc<DryRunDesktop>, WindowSwitcher) {
        let desktop = Arc::new(DryRunDesktop::empty());
        desktop.add_window(FakeWindow::new(10, "Inbox - Browser", 100, "chrome.exe"));
        desktop.add_window(FakeWindow::new(20, "notes.txt - Notepad", 200, "notepad.exe"));
        desktop.add_window(FakeWindow::new(30, "todo.txt - Notepad", 200, "notepad.exe").minimized());
        desktop.focus_front();

        let catalog = Arc::new(WindowCatalog::with_self_pid(desktop.clone(), OWN_PID));
        let switcher = WindowSwitcher::new(desktop.clone(), catalog);
        (desktop, switcher)
    }

    fn notepad(desktop: &Arc<DryRunDesktop>) -> Vec<WindowRecord> {
        WindowCatalog::with_self_pid(desktop.clone(), OWN_PID)
            .scan()
            .into_iter()
            .filter(|r| r.process_name == "notepad")
            .collect()
    }

    #[test]
    fn test_memory_records_targets() {
        let mut memory = SwitchMemory::default();
        assert_eq!(memory.redirect(WindowHandle(1)), WindowHandle(1));
        assert_eq!(memory.redirect(WindowHandle(2)), WindowHandle(2));
        assert_eq!(
            memory,
            SwitchMemory {
                previous_target: Some(WindowHandle(1)),
                last_target: Some(WindowHandle(2)),
            }
        );
    }

    #[test]
    fn test_memory_toggles_back_on_repeat() {
        let mut memory = SwitchMemory::default();
        memory.redirect(WindowHandle(1));
        memory.redirect(WindowHandle(2));

        assert_eq!(memory.redirect(WindowHandle(2)), WindowHandle(1));
        assert_eq!(memory.last_target, Some(WindowHandle(1)));
        assert_eq!(memory.previous_target, Some(WindowHandle(2)));

        // Без предыдущей цели повтор не перенаправляется
        let mut fresh = SwitchMemory::default();
        fresh.redirect(WindowHandle(5));
        assert_eq!(fresh.redirect(WindowHandle(5)), WindowHandle(5));
    }

    #[test]
    fn test_second_activate_returns_to_original_foreground() {
        let (desktop, switcher) = fixture();
        let original = desktop.foreground_window();
        let candidates = notepad(&desktop);

        let first = switcher.activate(&candidates);
        assert_eq!(first, Some(WindowHandle(20)));
        assert_eq!(desktop.foreground_window(), Some(WindowHandle(20)));

        let second = switcher.activate(&candidates);
        assert_eq!(second, original);
        assert_eq!(desktop.foreground_window(), original);
    }

    #[test]
    fn test_empty_candidates_is_noop() {
        let (desktop, switcher) = fixture();
        desktop.clear_log();
        assert_eq!(switcher.activate(&[]), None);
        assert!(desktop.focus_log().is_empty());
        assert_eq!(switcher.memory(), SwitchMemory::default());
    }

    #[test]
    fn test_minimized_target_is_restored() {
        let (desktop, switcher) = fixture();
        switcher.switch(WindowHandle(30));
        assert!(!desktop.is_minimized(WindowHandle(30)));
        assert!(desktop.focus_log().contains(&"restore 0x1E".to_string()));
        assert_eq!(desktop.foreground_window(), Some(WindowHandle(30)));
    }

    #[test]
    fn test_locked_foreground_uses_thread_attach() {
        let (desktop, switcher) = fixture();
        desktop.lock_foreground(true);
        desktop.clear_log();

        switcher.switch(WindowHandle(20));

        let log = desktop.focus_log();
        let attach = log.iter().position(|c| c.starts_with("attach_input") && c.ends_with("(true)"));
        let set = log.iter().position(|c| c.starts_with("set_foreground"));
        let detach = log.iter().position(|c| c.starts_with("attach_input") && c.ends_with("(false)"));
        assert!(attach.is_some() && attach < set && set < detach, "{:?}", log);
        assert!(!log.iter().any(|c| c.starts_with("switch_to")));
        assert_eq!(desktop.foreground_window(), Some(WindowHandle(20)));
    }

    #[test]
    fn test_last_resort_switch_when_foreground_refused() {
        let (desktop, switcher) = fixture();
        desktop.lock_foreground(true);
        desktop.refuse_attach(true);
        desktop.clear_log();

        switcher.switch(WindowHandle(20));

        let log = desktop.focus_log();
        assert!(!log.iter().any(|c| c.ends_with("(false)")), "{:?}", log);
        assert_eq!(log.last().map(String::as_str), Some("switch_to 0x14"));
        assert_eq!(desktop.foreground_window(), Some(WindowHandle(20)));
    }

    #[test]
    fn test_minimize_has_no_memory_effect() {
        let (desktop, switcher) = fixture();
        switcher.minimize(WindowHandle(10));
        assert!(desktop.is_minimized(WindowHandle(10)));
        assert_eq!(switcher.memory(), SwitchMemory::default());
    }
}
