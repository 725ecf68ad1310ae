//! Presentation: данные для внешнего оверлея
//!
//! Отрисовка не входит в переключатель. Здесь только интерфейс оверлея и
//! выбор источника иконки для каждой строки.

use crate::config::normalize_process_name;
use crate::events::{AppGroup, GroupedApps, Launcher};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Потребитель состояния сессии
pub trait Overlay: Send + Sync {
    fn show(&self, apps: &GroupedApps);
    fn hide(&self);
    fn enabled_changed(&self, enabled: bool);
}

/// Оверлей, который пишет список в лог
#[derive(Debug, Default)]
pub struct LogOverlay;

impl Overlay for LogOverlay {
    fn show(&self, apps: &GroupedApps) {
        info!("Оверлей: {} групп, {} ярлыков", apps.groups.len(), apps.launchers.len());
        for group in &apps.groups {
            let icon = resolve_icon_source(&PresentationRequest::from_group(group));
            debug!("  {} {:?}", group, icon);
        }
        for launcher in &apps.launchers {
            let icon = resolve_icon_source(&PresentationRequest::from_launcher(launcher));
            debug!("  [{}] {} (не запущено) {:?}", launcher.key, launcher.process_name, icon);
        }
    }

    fn hide(&self) {
        debug!("Оверлей скрыт");
    }

    fn enabled_changed(&self, enabled: bool) {
        if enabled {
            info!("Переключатель включён");
        } else {
            info!("Переключатель выключен (двойное нажатие Alt включит снова)");
        }
    }
}

/// Входные данные строки оверлея
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationRequest {
    pub executable_path: Option<PathBuf>,
    pub process_name: String,
    pub title: String,
}

impl PresentationRequest {
    /// По первому окну группы
    pub fn from_group(group: &AppGroup) -> Self {
        match group.primary() {
            Some(window) => Self {
                executable_path: window.executable_path.clone(),
                process_name: window.process_name.clone(),
                title: window.title.clone(),
            },
            None => Self {
                executable_path: group.launch_path.clone(),
                process_name: group.process_name.clone(),
                title: group.process_name.clone(),
            },
        }
    }

    pub fn from_launcher(launcher: &Launcher) -> Self {
        Self {
            executable_path: launcher.launch_path.clone(),
            process_name: launcher.process_name.clone(),
            title: launcher.process_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Откуда оверлею брать иконку
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    Executable(PathBuf),
    /// Буква на цветном круге
    Letter { letter: char, color: Rgb },
}

const DEFAULT_COLOR: Rgb = Rgb(100, 100, 100);

static PROCESS_COLORS: Lazy<HashMap<&'static str, Rgb>> = Lazy::new(|| {
    HashMap::from([
        ("taskmgr", Rgb(0, 120, 215)),
        ("regedit", Rgb(220, 20, 60)),
        ("cmd", Rgb(12, 12, 12)),
        ("powershell", Rgb(1, 36, 86)),
        ("mmc", Rgb(0, 135, 81)),
    ])
});

pub fn resolve_icon_source(request: &PresentationRequest) -> IconSource {
    resolve_icon_source_in(request, system_directory().as_deref())
}

fn resolve_icon_source_in(request: &PresentationRequest, system_dir: Option<&Path>) -> IconSource {
    if let Some(path) = &request.executable_path {
        return IconSource::Executable(path.clone());
    }

    // Системные утилиты часто запущены с повышенными правами и скрывают путь
    if let Some(path) = system_dir.and_then(|dir| system_executable(dir, &request.process_name)) {
        return IconSource::Executable(path);
    }

    let name = normalize_process_name(&request.process_name);
    IconSource::Letter {
        letter: fallback_letter(&name, &request.title),
        color: PROCESS_COLORS.get(name.as_str()).copied().unwrap_or(DEFAULT_COLOR),
    }
}

fn system_directory() -> Option<PathBuf> {
    std::env::var_os("SystemRoot").map(|root| PathBuf::from(root).join("System32"))
}

fn system_executable(dir: &Path, process_name: &str) -> Option<PathBuf> {
    let name = process_name.trim();
    if name.is_empty() {
        return None;
    }

    let exact = dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }

    if !name.to_lowercase().ends_with(".exe") {
        let with_ext = dir.join(format!("{}.exe", name));
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }
    None
}

fn fallback_letter(process_name: &str, title: &str) -> char {
    [process_name, title]
        .iter()
        .filter_map(|s| s.chars().next())
        .find(|c| c.is_alphabetic())
        .map(|c| c.to_uppercase().next().unwrap_or(c))
        .unwrap_or('?')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn request(path: Option<&str>, process: &str, title: &str) -> PresentationRequest {
        PresentationRequest {
            executable_path: path.map(PathBuf::from),
            process_name: process.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_known_path_wins() {
        let source = resolve_icon_source_in(&request(Some("C:\\Apps\\code.exe"), "Code", "main.rs"), None);
        assert_eq!(source, IconSource::Executable(PathBuf::from("C:\\Apps\\code.exe")));
    }

    #[test]
    fn test_system_directory_lookup() {
        let dir = std::env::temp_dir().join(format!("tapswitch-icons-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("taskmgr.exe"), b"").unwrap();

        let source = resolve_icon_source_in(&request(None, "taskmgr", "Task Manager"), Some(&dir));
        assert_eq!(source, IconSource::Executable(dir.join("taskmgr.exe")));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_letter_fallback_with_known_color() {
        let source = resolve_icon_source_in(&request(None, "regedit.exe", "Registry Editor"), None);
        assert_eq!(
            source,
            IconSource::Letter {
                letter: 'R',
                color: Rgb(220, 20, 60)
            }
        );
    }

    #[test]
    fn test_letter_fallback_uses_title_then_question_mark() {
        let source = resolve_icon_source_in(&request(None, "7zfm", "Archive"), None);
        assert_eq!(
            source,
            IconSource::Letter {
                letter: 'A',
                color: DEFAULT_COLOR
            }
        );

        assert_eq!(fallback_letter("", "123"), '?');
    }
}
