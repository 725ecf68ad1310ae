use crate::error::{Result, SwitchError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::info;

/// Запуск настроенного, но не запущенного приложения
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, path: &Path) -> Result<()>;
}

/// Запускает процесс отдельно от переключателя и не ждёт его
#[derive(Debug, Default)]
pub struct DetachedLauncher;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

impl ProcessLauncher for DetachedLauncher {
    fn launch(&self, path: &Path) -> Result<()> {
        let mut cmd = Command::new(path);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = path.parent().filter(|d| d.is_dir()) {
            cmd.current_dir(dir);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(DETACHED_PROCESS);
        }

        let child = cmd.spawn().map_err(|e| SwitchError::launch(path, e))?;
        info!("Запущен {:?} (pid {})", path, child.id());
        // Дочерний процесс живёт сам по себе
        drop(child);
        Ok(())
    }
}

/// Записывает запуски вместо выполнения
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    launched: Mutex<Vec<PathBuf>>,
}

impl DryRunLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().clone()
    }
}

impl ProcessLauncher for DryRunLauncher {
    fn launch(&self, path: &Path) -> Result<()> {
        info!("Dry-run: запуск {:?}", path);
        self.launched.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// Factory function to create a process launcher based on the dry_run flag
pub fn create_launcher(dry_run: bool) -> Arc<dyn ProcessLauncher> {
    if dry_run {
        Arc::new(DryRunLauncher::new())
    } else {
        Arc::new(DetachedLauncher)
    }
}
