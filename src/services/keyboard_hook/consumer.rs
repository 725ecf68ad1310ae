use crate::debug_if_enabled;
use crate::events::SessionMessage;
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use super::r#trait::HookConsumer;

/// Разрешение хуку забрать одну клавишу привязки за сессию.
///
/// Контроллер открывает шлюз с набором клавиш текущей группировки, хук
/// закрывает его при первом перехвате. Поток хука никогда не ждёт блокировку:
/// если набор клавиш в этот момент обновляется, клавиша пропускается.
#[derive(Debug, Default)]
pub struct BoundKeyGate {
    open: AtomicBool,
    keys: RwLock<SmallVec<[char; 16]>>,
}

impl BoundKeyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, keys: impl IntoIterator<Item = char>) {
        {
            let mut guard = self.keys.write();
            guard.clear();
            guard.extend(keys.into_iter().map(|c| c.to_ascii_uppercase()));
        }
        self.open.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Повторно открыть с прежним набором клавиш
    pub fn reopen(&self) {
        self.open.store(true, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Попытаться забрать клавишу. Успех закрывает шлюз.
    pub fn claims(&self, key: char) -> bool {
        if !self.is_open() {
            return false;
        }

        let Some(keys) = self.keys.try_read() else {
            return false;
        };
        if !keys.contains(&key.to_ascii_uppercase()) {
            return false;
        }
        drop(keys);

        self.open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Потребитель сигналов хука, пишущий в канал контроллера
pub struct ChannelConsumer {
    tx: UnboundedSender<SessionMessage>,
    gate: Arc<BoundKeyGate>,
}

impl ChannelConsumer {
    pub fn new(tx: UnboundedSender<SessionMessage>, gate: Arc<BoundKeyGate>) -> Self {
        Self { tx, gate }
    }

    fn post(&self, message: SessionMessage) {
        if self.tx.send(message).is_err() {
            debug_if_enabled!("Контроллер остановлен, {:?} отброшено", message);
        }
    }
}

impl HookConsumer for ChannelConsumer {
    fn on_modifier_down(&self) {
        self.post(SessionMessage::ModifierDown);
    }

    fn on_modifier_up(&self) {
        self.post(SessionMessage::ModifierUp);
    }

    fn on_double_modifier_tap(&self) {
        self.post(SessionMessage::DoubleModifierTap);
    }

    fn on_session_cancelled(&self) {
        self.post(SessionMessage::SessionCancelled);
    }

    fn on_bound_key(&self, key: char) -> bool {
        if !self.gate.claims(key) {
            return false;
        }
        self.post(SessionMessage::BoundKey(key.to_ascii_uppercase()));
        true
    }
}
