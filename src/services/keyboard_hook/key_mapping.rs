use crate::events::VirtualKey;
use std::collections::HashSet;

/// Определяет, какие клавиши хук передаёт контроллеру во время удержания Alt
pub struct KeyMapper {
    bound: HashSet<char>,
}

impl KeyMapper {
    pub fn new(bound: impl IntoIterator<Item = char>) -> Self {
        Self {
            bound: bound.into_iter().map(|c| c.to_ascii_uppercase()).collect(),
        }
    }

    /// Цифры поддерживаются всегда, буквы только из конфигурации
    pub fn bound_char(&self, key: VirtualKey) -> Option<char> {
        let c = key.to_char()?;
        if c.is_ascii_digit() || self.bound.contains(&c) {
            Some(c)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_always_bound() {
        let mapper = KeyMapper::new([]);
        assert_eq!(mapper.bound_char(VirtualKey(0x35)), Some('5'));
        assert_eq!(mapper.bound_char(VirtualKey(0x4E)), None);
    }

    #[test]
    fn configured_letters_bound_case_insensitive() {
        let mapper = KeyMapper::new(['n']);
        assert_eq!(mapper.bound_char(VirtualKey(0x4E)), Some('N'));
        assert_eq!(mapper.bound_char(VirtualKey::TAB), None);
    }
}
