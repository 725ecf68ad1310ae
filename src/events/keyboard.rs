use std::fmt;
use std::time::Instant;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Виртуальный код клавиши (значения Win32 VK_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualKey(pub u32);

impl VirtualKey {
    pub const SHIFT: VirtualKey = VirtualKey(0x10);
    pub const CONTROL: VirtualKey = VirtualKey(0x11);
    pub const MENU: VirtualKey = VirtualKey(0x12);
    pub const LWIN: VirtualKey = VirtualKey(0x5B);
    pub const RWIN: VirtualKey = VirtualKey(0x5C);
    pub const LSHIFT: VirtualKey = VirtualKey(0xA0);
    pub const RSHIFT: VirtualKey = VirtualKey(0xA1);
    pub const LCONTROL: VirtualKey = VirtualKey(0xA2);
    pub const RCONTROL: VirtualKey = VirtualKey(0xA3);
    /// Левый Alt: единственный модификатор, управляющий сессией
    pub const LMENU: VirtualKey = VirtualKey(0xA4);
    pub const RMENU: VirtualKey = VirtualKey(0xA5);
    pub const TAB: VirtualKey = VirtualKey(0x09);

    /// Вторичные модификаторы, проверяемые по физическому состоянию
    pub const SECONDARY_PROBES: [VirtualKey; 4] = [
        VirtualKey::CONTROL,
        VirtualKey::SHIFT,
        VirtualKey::LWIN,
        VirtualKey::RWIN,
    ];

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Ctrl, Shift или Win в любом варианте (не Alt)
    pub fn is_secondary_modifier(&self) -> bool {
        matches!(
            *self,
            VirtualKey::CONTROL
                | VirtualKey::SHIFT
                | VirtualKey::LWIN
                | VirtualKey::RWIN
                | VirtualKey::LSHIFT
                | VirtualKey::RSHIFT
                | VirtualKey::LCONTROL
                | VirtualKey::RCONTROL
        )
    }

    /// Символ клавиши для 0-9 и A-Z
    pub fn to_char(&self) -> Option<char> {
        match self.0 {
            0x30..=0x39 | 0x41..=0x5A => char::from_u32(self.0),
            _ => None,
        }
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_char() {
            Some(c) => write!(f, "VK_{}", c),
            None => write!(f, "VK_0x{:02X}", self.0),
        }
    }
}

/// Событие клавиатуры, полученное из хука
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub key: VirtualKey,
    pub state: KeyState,
    /// WM_SYSKEYDOWN / WM_SYSKEYUP
    pub is_system_key: bool,
    pub timestamp: Instant,
}

impl RawKeyEvent {
    pub fn new(key: VirtualKey, state: KeyState, is_system_key: bool, timestamp: Instant) -> Self {
        Self {
            key,
            state,
            is_system_key,
            timestamp,
        }
    }

    pub fn press(key: VirtualKey, timestamp: Instant) -> Self {
        Self::new(key, KeyState::Pressed, false, timestamp)
    }

    pub fn release(key: VirtualKey, timestamp: Instant) -> Self {
        Self::new(key, KeyState::Released, false, timestamp)
    }

    pub fn is_down(&self) -> bool {
        self.state == KeyState::Pressed
    }
}

impl fmt::Display for RawKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}{}",
            self.key,
            self.state,
            if self.is_system_key { " (sys)" } else { "" }
        )
    }
}

/// Решение хука по событию
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    PassThrough,
    Swallow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_chars() {
        assert_eq!(VirtualKey(0x31).to_char(), Some('1'));
        assert_eq!(VirtualKey(0x4E).to_char(), Some('N'));
        assert_eq!(VirtualKey::LMENU.to_char(), None);
    }

    #[test]
    fn test_secondary_modifiers() {
        assert!(VirtualKey::LCONTROL.is_secondary_modifier());
        assert!(VirtualKey::RWIN.is_secondary_modifier());
        assert!(!VirtualKey::LMENU.is_secondary_modifier());
        assert!(!VirtualKey::RMENU.is_secondary_modifier());
        assert!(!VirtualKey::TAB.is_secondary_modifier());
    }
}
