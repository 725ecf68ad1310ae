use smallvec::SmallVec;
use std::fmt;
use std::path::PathBuf;

/// Непрозрачный идентификатор окна (HWND на Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn value(&self) -> isize {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Снимок окна на момент сканирования
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowRecord {
    pub handle: WindowHandle,
    pub title: String,
    pub process_name: String,
    pub process_id: u32,
    /// None, если процесс запретил доступ (например, запущен с повышенными правами)
    pub executable_path: Option<PathBuf>,
}

impl WindowRecord {
    pub fn new(handle: WindowHandle, title: impl Into<String>, process_name: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
            process_name: process_name.into(),
            process_id: 0,
            executable_path: None,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.process_id = pid;
        self
    }
}

impl fmt::Display for WindowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({}, {})", self.title, self.process_name, self.handle)
    }
}

pub type GroupWindows = SmallVec<[WindowRecord; 4]>;

/// Группа окон одного приложения
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGroup {
    /// Клавиша из конфигурации или порядковая цифра; None для групп после девятой
    pub key: Option<char>,
    /// Нормализованное имя процесса группы (у настроенных это имя из конфигурации)
    pub process_name: String,
    /// Окна в порядке Z (самое актуальное первым)
    pub windows: GroupWindows,
    pub launch_path: Option<PathBuf>,
}

impl AppGroup {
    pub fn matches_key(&self, key: char) -> bool {
        self.key
            .map(|k| k.eq_ignore_ascii_case(&key))
            .unwrap_or(false)
    }

    pub fn primary(&self) -> Option<&WindowRecord> {
        self.windows.first()
    }
}

impl fmt::Display for AppGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.key.map(String::from).unwrap_or_else(|| "-".to_string());
        write!(f, "[{}] {} ({} окон)", key, self.process_name, self.windows.len())
    }
}

/// Настроенное, но не запущенное приложение
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub key: char,
    pub process_name: String,
    pub launch_path: Option<PathBuf>,
}

/// Результат группировки одного сканирования
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedApps {
    pub groups: Vec<AppGroup>,
    pub launchers: Vec<Launcher>,
}

impl GroupedApps {
    /// Первая группа с клавишей: настроенные идут раньше порядковых
    pub fn group_for_key(&self, key: char) -> Option<&AppGroup> {
        self.groups.iter().find(|g| g.matches_key(key))
    }

    pub fn launcher_for_key(&self, key: char) -> Option<&Launcher> {
        self.launchers
            .iter()
            .find(|l| l.key.eq_ignore_ascii_case(&key))
    }

    /// Клавиши, которые текущая сессия готова обработать
    pub fn claimable_keys(&self) -> Vec<char> {
        self.groups
            .iter()
            .filter_map(|g| g.key)
            .chain(
                self.launchers
                    .iter()
                    .filter(|l| l.launch_path.is_some())
                    .map(|l| l.key),
            )
            .map(|k| k.to_ascii_uppercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn record(h: isize, title: &str, process: &str) -> WindowRecord {
        WindowRecord::new(WindowHandle(h), title, process).with_pid(h as u32)
    }

    #[test]
    fn test_group_lookup_prefers_first_match() {
        let apps = GroupedApps {
            groups: vec![
                AppGroup {
                    key: Some('1'),
                    process_name: "notepad".into(),
                    windows: smallvec![record(1, "a.txt", "notepad")],
                    launch_path: None,
                },
                AppGroup {
                    key: Some('1'),
                    process_name: "chrome".into(),
                    windows: smallvec![record(2, "A", "chrome")],
                    launch_path: None,
                },
            ],
            launchers: vec![],
        };

        assert_eq!(apps.group_for_key('1').map(|g| g.process_name.as_str()), Some("notepad"));
        assert!(apps.group_for_key('2').is_none());
    }

    #[test]
    fn test_claimable_keys_skip_launchers_without_path() {
        let apps = GroupedApps {
            groups: vec![AppGroup {
                key: Some('n'),
                process_name: "notepad".into(),
                windows: smallvec![record(1, "a.txt", "notepad")],
                launch_path: None,
            }],
            launchers: vec![
                Launcher {
                    key: 'T',
                    process_name: "terminal".into(),
                    launch_path: Some(PathBuf::from("wt.exe")),
                },
                Launcher {
                    key: 'X',
                    process_name: "ghost".into(),
                    launch_path: None,
                },
            ],
        };

        assert_eq!(apps.claimable_keys(), vec!['N', 'T']);
        assert!(apps.launcher_for_key('t').is_some());
    }
}
