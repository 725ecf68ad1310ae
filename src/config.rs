use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub switcher: SwitcherConfig,
    #[serde(default)]
    pub apps: Vec<AppBinding>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub double_tap_threshold_ms: u64,
    pub show_delay_ms: u64,
    pub failsafe_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SwitcherConfig {
    /// Глобальный флаг: при false сессии не запускаются до двойного нажатия Alt
    pub enabled: bool,
    /// Показывать только процессы из списка `apps`
    pub whitelist_mode: bool,
}

/// Привязка приложения к клавише
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppBinding {
    pub process_name: String,
    pub shortcut_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_path: Option<PathBuf>,
}

impl AppBinding {
    pub fn new(process_name: impl Into<String>, shortcut_key: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            shortcut_key: shortcut_key.into(),
            launch_path: None,
        }
    }

    pub fn with_launch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.launch_path = Some(path.into());
        self
    }

    /// Клавиша привязки в верхнем регистре (None для невалидной записи)
    pub fn key(&self) -> Option<char> {
        let mut chars = self.shortcut_key.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Some(c.to_ascii_uppercase()),
            _ => None,
        }
    }

    /// Нормализованное имя процесса (нижний регистр, без ".exe")
    pub fn normalized_name(&self) -> String {
        normalize_process_name(&self.process_name)
    }
}

/// Приводит имя процесса к виду, по которому группируются окна
pub fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            double_tap_threshold_ms: 300,
            show_delay_ms: 500,
            failsafe_interval_ms: 200,
        }
    }
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whitelist_mode: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            timing: TimingConfig::default(),
            switcher: SwitcherConfig::default(),
            // Без файла конфигурации начинаем с одной привязки
            apps: vec![AppBinding::new("notepad", "N")],
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = if config_path.exists() {
            Figment::new().merge(Toml::file(config_path))
        } else {
            debug!("Файл {:?} не найден, используются значения по умолчанию", config_path);
            Figment::from(Serialized::defaults(Config::default()))
        };

        let config: Config = figment
            .merge(Env::prefixed("TAPSWITCH_").split("__"))
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "pretty" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.timing.double_tap_threshold_ms == 0 {
            anyhow::bail!("double_tap_threshold_ms должно быть больше 0");
        }

        if self.timing.failsafe_interval_ms < 50 {
            anyhow::bail!("failsafe_interval_ms должно быть минимум 50");
        }

        let mut seen = HashSet::new();
        for (i, app) in self.apps.iter().enumerate() {
            if app.process_name.trim().is_empty() {
                anyhow::bail!("Пустое имя процесса в привязке #{}", i + 1);
            }

            let Some(key) = app.key() else {
                anyhow::bail!(
                    "Клавиша '{}' в привязке #{} должна быть одной буквой или цифрой",
                    app.shortcut_key,
                    i + 1
                );
            };

            if !seen.insert(key) {
                warn!("Клавиша '{}' назначена нескольким приложениям, сработает первое", key);
            }
        }

        Ok(())
    }

    /// Клавиши, которые хук перехватывает помимо цифр
    pub fn bound_keys(&self) -> HashSet<char> {
        self.apps.iter().filter_map(AppBinding::key).collect()
    }

    /// Множество нормализованных имён для режима белого списка
    pub fn whitelisted_names(&self) -> HashSet<String> {
        self.apps.iter().map(AppBinding::normalized_name).collect()
    }
}

/// Источник конфигурации: перечитывает файл при каждом сканировании окон.
///
/// При ошибке чтения остаётся последняя корректная версия.
pub struct ConfigSource {
    path: Option<PathBuf>,
    last_good: RwLock<Arc<Config>>,
}

impl ConfigSource {
    pub fn new(path: impl Into<PathBuf>, initial: Config) -> Self {
        Self {
            path: Some(path.into()),
            last_good: RwLock::new(Arc::new(initial)),
        }
    }

    /// Источник без файла, всегда отдаёт одну и ту же конфигурацию
    pub fn fixed(config: Config) -> Self {
        Self {
            path: None,
            last_good: RwLock::new(Arc::new(config)),
        }
    }

    pub fn current(&self) -> Arc<Config> {
        self.last_good.read().clone()
    }

    pub fn reload(&self) -> Arc<Config> {
        let Some(path) = &self.path else {
            return self.current();
        };

        match Config::load(path) {
            Ok(config) => {
                let config = Arc::new(config);
                *self.last_good.write() = config.clone();
                config
            }
            Err(e) => {
                warn!("Не удалось перечитать конфигурацию: {:#}. Используется предыдущая", e);
                self.current()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.apps.len(), 1);
    }

    #[test]
    fn test_binding_key_is_case_insensitive() {
        let binding = AppBinding::new("notepad", "n");
        assert_eq!(binding.key(), Some('N'));

        let mut config = Config::default();
        config.apps = vec![binding, AppBinding::new("code", "v")];
        assert_eq!(config.bound_keys(), HashSet::from(['N', 'V']));
    }

    #[test]
    fn test_invalid_shortcut_rejected() {
        let mut config = Config::default();
        config.apps = vec![AppBinding::new("notepad", "F1")];
        assert!(config.validate().is_err());

        config.apps = vec![AppBinding::new("  ", "N")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_normalize_process_name() {
        assert_eq!(normalize_process_name("Notepad.EXE"), "notepad");
        assert_eq!(normalize_process_name("chrome"), "chrome");
        assert_eq!(normalize_process_name(" Code.exe "), "code");
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tapswitch.toml",
                r#"
                [switcher]
                enabled = true
                whitelist_mode = true

                [[apps]]
                process_name = "chrome"
                shortcut_key = "c"
                launch_path = "C:\\Program Files\\Chrome\\chrome.exe"
                "#,
            )?;

            let config = Config::load("tapswitch.toml").map_err(|e| e.to_string())?;
            assert!(config.switcher.whitelist_mode);
            assert_eq!(config.timing.show_delay_ms, 500);
            assert_eq!(config.apps.len(), 1);
            assert_eq!(config.apps[0].key(), Some('C'));
            assert!(config.apps[0].launch_path.is_some());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_nested_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tapswitch.toml", "[timing]\ndouble_tap_threshold_ms = 300\nshow_delay_ms = 500\nfailsafe_interval_ms = 200\n")?;
            jail.set_env("TAPSWITCH_TIMING__SHOW_DELAY_MS", "750");

            let config = Config::load("tapswitch.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.timing.show_delay_ms, 750);
            assert!(config.apps.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_seeds_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.apps[0].normalized_name(), "notepad");
            Ok(())
        });
    }

    #[test]
    fn test_source_keeps_last_good_on_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tapswitch.toml", "[[apps]]\nprocess_name = \"code\"\nshortcut_key = \"V\"\n")?;
            let source = ConfigSource::new("tapswitch.toml", Config::default());
            assert_eq!(source.reload().apps[0].process_name, "code");

            jail.create_file("tapswitch.toml", "[[apps]]\nprocess_name = \"code\"\nshortcut_key = \"VV\"\n")?;
            assert_eq!(source.reload().apps[0].process_name, "code");
            Ok(())
        });
    }
}
