use std::fmt;

/// Сообщения, которые получает контроллер сессии.
///
/// Все источники (хук, таймеры) пишут в один упорядоченный канал.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMessage {
    ModifierDown,
    ModifierUp,
    DoubleModifierTap,
    SessionCancelled,
    BoundKey(char),
    ShowDelayElapsed(u64),
    FailsafeTick(u64),
}

/// Фаза сессии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    ArmedWaitingShow,
    Visible,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::ArmedWaitingShow => "armed",
            SessionPhase::Visible => "visible",
        };
        f.write_str(name)
    }
}

/// Публикуемое состояние контроллера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub disabled: bool,
}
