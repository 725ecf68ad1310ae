use crate::error::Result;
use crate::events::{RawKeyEvent, VirtualKey};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::engine::KeyHookEngine;
use super::r#trait::{KeyStateProbe, KeyboardHookTrait};

/// Эмулируемая клавиатура: физическое состояние клавиш для dry-run и тестов
#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    pressed: RwLock<HashSet<u32>>,
}

impl ScriptedKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: VirtualKey, down: bool) {
        let mut pressed = self.pressed.write();
        if down {
            pressed.insert(key.value());
        } else {
            pressed.remove(&key.value());
        }
    }

    pub fn release_all(&self) {
        self.pressed.write().clear();
    }
}

impl KeyStateProbe for ScriptedKeyboard {
    fn is_down(&self, key: VirtualKey) -> bool {
        let pressed = self.pressed.read();
        if pressed.contains(&key.value()) {
            return true;
        }
        // Обобщённые коды отвечают за обе стороны клавиатуры
        match key {
            VirtualKey::CONTROL => {
                pressed.contains(&VirtualKey::LCONTROL.value())
                    || pressed.contains(&VirtualKey::RCONTROL.value())
            }
            VirtualKey::SHIFT => {
                pressed.contains(&VirtualKey::LSHIFT.value())
                    || pressed.contains(&VirtualKey::RSHIFT.value())
            }
            VirtualKey::MENU => {
                pressed.contains(&VirtualKey::LMENU.value())
                    || pressed.contains(&VirtualKey::RMENU.value())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Press(VirtualKey),
    Release(VirtualKey),
    Wait(u64),
}

/// Хук без ОС: проигрывает сценарии удержания Alt через тот же движок
pub struct DryRunKeyboardHook {
    engine: KeyHookEngine,
    keyboard: Arc<ScriptedKeyboard>,
}

impl DryRunKeyboardHook {
    pub fn new(engine: KeyHookEngine, keyboard: Arc<ScriptedKeyboard>) -> Self {
        info!("Инициализация DryRunKeyboardHook");
        Self { engine, keyboard }
    }

    fn scenarios() -> Vec<(&'static str, Vec<Step>)> {
        use Step::*;
        let alt = VirtualKey::LMENU;
        let digit = VirtualKey(0x31);
        let letter = VirtualKey(0x4E);
        let ctrl = VirtualKey::LCONTROL;
        let double_tap = vec![
            Press(alt),
            Wait(60),
            Release(alt),
            Wait(150),
            Press(alt),
            Wait(60),
            Release(alt),
        ];

        vec![
            (
                "Alt+1 с показом оверлея",
                vec![Press(alt), Wait(700), Press(digit), Wait(50), Release(digit), Release(alt)],
            ),
            (
                "быстрый Alt+N",
                vec![Press(alt), Wait(120), Press(letter), Wait(40), Release(letter), Release(alt)],
            ),
            ("двойное нажатие Alt", double_tap.clone()),
            (
                "Ctrl+Alt отменяет сессию",
                vec![Press(alt), Wait(100), Press(ctrl), Wait(100), Release(ctrl), Release(alt)],
            ),
            ("повторное двойное нажатие", double_tap),
        ]
    }

    fn apply(&mut self, step: Step) {
        let event = match step {
            Step::Press(key) => {
                self.keyboard.set(key, true);
                RawKeyEvent::press(key, Instant::now())
            }
            Step::Release(key) => {
                self.keyboard.set(key, false);
                RawKeyEvent::release(key, Instant::now())
            }
            Step::Wait(_) => return,
        };
        let decision = self.engine.handle(event);
        debug!("Dry-run: {} -> {:?}", event, decision);
    }

    async fn run_impl(mut self) -> Result<()> {
        info!("Dry-run режим - хук клавиатуры работает в режиме эмуляции");

        let scenarios = Self::scenarios();
        let mut index = 0;

        loop {
            sleep(Duration::from_secs(3)).await;

            let (name, steps) = &scenarios[index];
            info!("Dry-run: сценарий \"{}\"", name);
            for step in steps.iter().copied() {
                if let Step::Wait(ms) = step {
                    sleep(Duration::from_millis(ms)).await;
                } else {
                    self.apply(step);
                }
            }
            self.keyboard.release_all();

            index = (index + 1) % scenarios.len();
        }
    }
}

#[async_trait::async_trait]
impl KeyboardHookTrait for DryRunKeyboardHook {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_codes_cover_both_sides() {
        let keyboard = ScriptedKeyboard::new();
        assert!(!keyboard.any_secondary_down());

        keyboard.set(VirtualKey::RCONTROL, true);
        assert!(keyboard.is_down(VirtualKey::CONTROL));
        assert!(keyboard.any_secondary_down());

        keyboard.release_all();
        keyboard.set(VirtualKey::LMENU, true);
        assert!(keyboard.is_down(VirtualKey::MENU));
        assert!(!keyboard.any_secondary_down());
    }
}
