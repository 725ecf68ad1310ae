//! SessionController: конечный автомат сессии удержания Alt
//!
//! Контроллер принимает решения по сигналам хука: сканирует окна при нажатии,
//! показывает оверлей после задержки, активирует группу или запускает приложение
//! по клавише привязки. Таймеры работают через тот же канал сообщений.

mod controller;
mod timers;

pub use self::controller::{SessionController, SessionServices};
