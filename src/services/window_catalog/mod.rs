//! WindowCatalog: перечисление и группировка окон
//!
//! Модуль отвечает ТОЛЬКО за снимок переключаемых окон верхнего уровня и их
//! группировку по приложениям. Активацией окон занимается WindowSwitcher, решения
//! о сессии принимает SessionController.

mod catalog;
mod dry_run;
mod grouping;
mod r#trait;
#[cfg(windows)]
mod win32;

pub use self::catalog::WindowCatalog;
pub use self::dry_run::{DryRunDesktop, FakeWindow};
pub use self::grouping::build_groups;
pub use self::r#trait::{CloakState, WindowSystem};
#[cfg(windows)]
pub use self::win32::Win32Desktop;

use crate::services::keyboard_hook::{KeyStateProbe, ScriptedKeyboard};
use crate::services::window_switcher::FocusControl;
use std::sync::Arc;

/// Доступ к рабочему столу, разделяемый сервисами
#[derive(Clone)]
pub struct Desktop {
    pub windows: Arc<dyn WindowSystem>,
    pub focus: Arc<dyn FocusControl>,
    pub keys: Arc<dyn KeyStateProbe>,
    /// Эмулируемая клавиатура dry-run режима, общая с эмулируемым хуком
    pub scripted_keys: Option<Arc<ScriptedKeyboard>>,
}

impl Desktop {
    pub fn dry_run() -> Self {
        let desktop = Arc::new(DryRunDesktop::new());
        let keys = Arc::new(ScriptedKeyboard::new());
        Self {
            windows: desktop.clone(),
            focus: desktop,
            keys: keys.clone(),
            scripted_keys: Some(keys),
        }
    }
}

/// Factory function to create the desktop access based on the dry_run flag
#[cfg(windows)]
pub fn create_desktop(dry_run: bool) -> Desktop {
    if dry_run {
        return Desktop::dry_run();
    }

    let desktop = Arc::new(Win32Desktop::new());
    Desktop {
        windows: desktop.clone(),
        focus: desktop.clone(),
        keys: desktop,
        scripted_keys: None,
    }
}

#[cfg(not(windows))]
pub fn create_desktop(dry_run: bool) -> Desktop {
    if !dry_run {
        tracing::warn!("Низкоуровневый доступ к окнам есть только в Windows, включён dry-run");
    }
    Desktop::dry_run()
}
