use crate::error::Result;
use crate::events::VirtualKey;
use std::sync::Arc;

use super::dry_hook::ScriptedKeyboard;
use super::engine::KeyHookEngine;

/// Trait for keyboard hooks that can run in different modes
#[async_trait::async_trait]
pub trait KeyboardHookTrait {
    /// Install the hook and deliver events until the task is dropped
    async fn run(self: Box<Self>) -> Result<()>;
}

/// Live physical key state as reported by the OS
pub trait KeyStateProbe: Send + Sync {
    fn is_down(&self, key: VirtualKey) -> bool;

    /// Ctrl, Shift or either Win key is physically held
    fn any_secondary_down(&self) -> bool {
        VirtualKey::SECONDARY_PROBES
            .iter()
            .any(|key| self.is_down(*key))
    }
}

/// Receiver of classified hook signals.
///
/// Called synchronously from the hook callback: implementations must not block.
pub trait HookConsumer: Send + Sync {
    fn on_modifier_down(&self);
    fn on_modifier_up(&self);
    fn on_double_modifier_tap(&self);
    fn on_session_cancelled(&self);
    /// Returns true when the key should be swallowed
    fn on_bound_key(&self, key: char) -> bool;
}

/// Factory function to create a keyboard hook.
///
/// A scripted keyboard selects the dry-run hook; otherwise the Win32 hook is installed.
pub fn create_keyboard_hook(
    engine: KeyHookEngine,
    scripted_keys: Option<Arc<ScriptedKeyboard>>,
) -> Result<Box<dyn KeyboardHookTrait + Send>> {
    if let Some(keyboard) = scripted_keys {
        return Ok(Box::new(super::dry_hook::DryRunKeyboardHook::new(engine, keyboard)));
    }

    #[cfg(windows)]
    {
        Ok(Box::new(super::win_hook::Win32KeyboardHook::new(engine)))
    }

    #[cfg(not(windows))]
    {
        Err(crate::switch_error!(hook, "низкоуровневый хук доступен только в Windows"))
    }
}
