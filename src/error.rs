use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwitchError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(windows)]
    #[error("Ошибка Win32: {0}")]
    Win32(#[from] windows::core::Error),

    #[error("Не удалось установить хук клавиатуры: {0}")]
    Hook(String),

    #[error("Не удалось запустить {path:?}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl SwitchError {
    pub fn launch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SwitchError::Launch {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SwitchError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! switch_error {
    (hook, $($arg:tt)*) => {
        $crate::error::SwitchError::Hook(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::SwitchError::Internal(format!($($arg)*))
    };
}
