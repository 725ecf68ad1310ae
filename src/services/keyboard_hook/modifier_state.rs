use std::time::{Duration, Instant};

/// Состояние удержания левого Alt.
///
/// `session_tainted` истинно, если за текущее удержание была нажата любая другая
/// клавиша или модификатор. Только чистое отпускание взводит таймер двойного нажатия.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierSessionState {
    is_modifier_down: bool,
    session_tainted: bool,
    last_modifier_up: Option<Instant>,
}

impl ModifierSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_modifier_down(&self) -> bool {
        self.is_modifier_down
    }

    pub fn is_tainted(&self) -> bool {
        self.session_tainted
    }

    pub fn last_modifier_up(&self) -> Option<Instant> {
        self.last_modifier_up
    }

    /// Новое нажатие. Возвращает true, если это второе нажатие двойного тапа.
    pub fn press(&mut self, now: Instant, others_held: bool, threshold: Duration) -> bool {
        self.is_modifier_down = true;
        self.session_tainted = others_held;

        self.last_modifier_up
            .map(|up| now.saturating_duration_since(up) < threshold)
            .unwrap_or(false)
    }

    pub fn release(&mut self, now: Instant) {
        self.is_modifier_down = false;
        self.last_modifier_up = if self.session_tainted { None } else { Some(now) };
    }

    pub fn taint(&mut self) {
        self.session_tainted = true;
    }

    /// Нажатие другой клавиши после отпускания сбрасывает таймер
    pub fn invalidate_tap(&mut self) {
        self.last_modifier_up = None;
    }

    /// Отпускание, которое хук не увидел
    pub fn force_release(&mut self) {
        self.is_modifier_down = false;
        self.last_modifier_up = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(300);

    #[test]
    fn clean_tap_arms_timer() {
        let t0 = Instant::now();
        let mut state = ModifierSessionState::new();
        assert!(!state.press(t0, false, THRESHOLD));
        state.release(t0 + Duration::from_millis(50));
        assert_eq!(state.last_modifier_up(), Some(t0 + Duration::from_millis(50)));
        assert!(state.press(t0 + Duration::from_millis(200), false, THRESHOLD));
    }

    #[test]
    fn tainted_release_disarms_timer() {
        let t0 = Instant::now();
        let mut state = ModifierSessionState::new();
        state.press(t0, false, THRESHOLD);
        state.taint();
        state.release(t0 + Duration::from_millis(50));
        assert_eq!(state.last_modifier_up(), None);
        assert!(!state.press(t0 + Duration::from_millis(100), false, THRESHOLD));
    }

    #[test]
    fn press_with_other_modifier_starts_tainted() {
        let mut state = ModifierSessionState::new();
        state.press(Instant::now(), true, THRESHOLD);
        assert!(state.is_tainted());
        state.release(Instant::now());
        state.press(Instant::now(), false, THRESHOLD);
        assert!(!state.is_tainted());
    }

    #[test]
    fn threshold_is_exclusive() {
        let t0 = Instant::now();
        let mut state = ModifierSessionState::new();
        state.press(t0, false, THRESHOLD);
        state.release(t0);
        assert!(!state.press(t0 + THRESHOLD, false, THRESHOLD));
    }
}
