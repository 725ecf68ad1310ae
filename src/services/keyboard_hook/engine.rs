use crate::events::{HookDecision, RawKeyEvent, VirtualKey};
use crate::{debug_if_enabled, trace_if_enabled};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use super::key_mapping::KeyMapper;
use super::modifier_state::ModifierSessionState;
use super::r#trait::{HookConsumer, KeyStateProbe};

/// Классификатор событий глобального хука.
///
/// Работает в потоке хука и должен возвращать решение за микросекунды:
/// никаких блокировок, общих с контроллером, никакого ожидания потребителя.
pub struct KeyHookEngine {
    state: ModifierSessionState,
    mapper: KeyMapper,
    double_tap_threshold: Duration,
    probe: Arc<dyn KeyStateProbe>,
    consumer: Arc<dyn HookConsumer>,
}

impl KeyHookEngine {
    pub fn new(
        bound_keys: impl IntoIterator<Item = char>,
        double_tap_threshold: Duration,
        probe: Arc<dyn KeyStateProbe>,
        consumer: Arc<dyn HookConsumer>,
    ) -> Self {
        Self {
            state: ModifierSessionState::new(),
            mapper: KeyMapper::new(bound_keys),
            double_tap_threshold,
            probe,
            consumer,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &ModifierSessionState {
        &self.state
    }

    /// Обработать событие. Паника внутри классификации или потребителя
    /// не выходит за границу хука: событие пропускается дальше.
    pub fn handle(&mut self, event: RawKeyEvent) -> HookDecision {
        match panic::catch_unwind(AssertUnwindSafe(|| self.classify(event))) {
            Ok(decision) => decision,
            Err(_) => {
                error!("Паника при обработке {}, событие пропущено", event);
                HookDecision::PassThrough
            }
        }
    }

    fn classify(&mut self, event: RawKeyEvent) -> HookDecision {
        trace_if_enabled!("Хук: {}", event);

        if event.key == VirtualKey::LMENU {
            self.handle_modifier(event);
            return HookDecision::PassThrough;
        }

        if !self.state.is_modifier_down() {
            if event.is_down() {
                self.state.invalidate_tap();
            }
            return HookDecision::PassThrough;
        }

        self.handle_held_key(event)
    }

    fn handle_modifier(&mut self, event: RawKeyEvent) {
        if event.is_down() {
            // Автоповтор удерживаемого Alt
            if self.state.is_modifier_down() {
                return;
            }

            let others_held = self.probe.any_secondary_down();
            let is_double = self
                .state
                .press(event.timestamp, others_held, self.double_tap_threshold);

            debug_if_enabled!("Alt нажат (tainted: {}, double: {})", others_held, is_double);

            if is_double {
                self.consumer.on_double_modifier_tap();
            }
            self.consumer.on_modifier_down();
        } else {
            // Отпускание уже отправлено самовосстановлением
            if !self.state.is_modifier_down() {
                return;
            }

            self.state.release(event.timestamp);
            debug_if_enabled!("Alt отпущен (clean: {})", self.state.last_modifier_up().is_some());
            self.consumer.on_modifier_up();
        }
    }

    fn handle_held_key(&mut self, event: RawKeyEvent) -> HookDecision {
        if event.is_down() {
            self.state.taint();

            if event.key.is_secondary_modifier() {
                debug_if_enabled!("Модификатор {} при удержании Alt, сессия отменена", event.key);
                self.consumer.on_session_cancelled();
            }
        }

        // Отпускание Alt мог перехватить другой хук
        if !self.probe.is_down(VirtualKey::LMENU) {
            debug_if_enabled!("Alt физически отпущен, но флаг установлен: сбрасываем");
            self.state.force_release();
            self.consumer.on_modifier_up();
            return HookDecision::PassThrough;
        }

        if !event.is_down() {
            return HookDecision::PassThrough;
        }

        let Some(key) = self.mapper.bound_char(event.key) else {
            return HookDecision::PassThrough;
        };

        // Ctrl+Alt+X и подобные сочетания принадлежат системе
        if self.probe.any_secondary_down() {
            return HookDecision::PassThrough;
        }

        if self.consumer.on_bound_key(key) {
            debug_if_enabled!("Клавиша '{}' перехвачена", key);
            HookDecision::Swallow
        } else {
            HookDecision::PassThrough
        }
    }
}
