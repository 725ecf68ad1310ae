//! KeyboardHook: классификация сырых событий клавиатуры
//!
//! Модуль отвечает ТОЛЬКО за разбор потока клавиш на сигналы сессии (нажатие и
//! отпускание левого Alt, двойное нажатие, отмена, клавиша привязки). Решения о
//! переключении окон принимает SessionController; хук лишь отправляет сообщения
//! в канал и никогда не ждёт их обработки.

mod consumer;
mod dry_hook;
mod engine;
mod key_mapping;
mod modifier_state;
mod r#trait;
#[cfg(windows)]
mod win_hook;

pub use self::consumer::{BoundKeyGate, ChannelConsumer};
pub use self::dry_hook::ScriptedKeyboard;
pub use self::engine::KeyHookEngine;
pub use self::r#trait::{create_keyboard_hook, KeyStateProbe};
