use crate::events::SessionMessage;
use crate::trace_if_enabled;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};

/// Таймер сессии, отправляющий сообщения с номером поколения.
///
/// Повторный запуск отменяет прежний экземпляр; сообщения старых поколений
/// контроллер отбрасывает через `is_current`.
pub struct SessionTimer {
    name: &'static str,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            handle: None,
        }
    }

    pub fn start_once(
        &mut self,
        delay: Duration,
        tx: &WeakUnboundedSender<SessionMessage>,
        message: fn(u64) -> SessionMessage,
    ) {
        let generation = self.next_generation();
        let tx = tx.clone();

        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(message(generation));
            }
        }));
        trace_if_enabled!("Таймер {} #{} запущен на {:?}", self.name, generation, delay);
    }

    pub fn start_recurring(
        &mut self,
        period: Duration,
        tx: &WeakUnboundedSender<SessionMessage>,
        message: fn(u64) -> SessionMessage,
    ) {
        let generation = self.next_generation();
        let tx = tx.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Канал закрыт: контроллер остановлен
                let Some(tx) = tx.upgrade() else {
                    break;
                };
                if tx.send(message(generation)).is_err() {
                    break;
                }
            }
        }));
        trace_if_enabled!("Таймер {} #{} запущен с периодом {:?}", self.name, generation, period);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Сообщение принадлежит работающему экземпляру
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_active() && generation == self.generation
    }

    fn next_generation(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SessionTimer::new("show");
        timer.start_once(Duration::from_millis(500), &tx.downgrade(), SessionMessage::ShowDelayElapsed);

        sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().ok(), Some(SessionMessage::ShowDelayElapsed(1)));
        assert!(timer.is_current(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_previous_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SessionTimer::new("show");
        timer.start_once(Duration::from_millis(100), &tx.downgrade(), SessionMessage::ShowDelayElapsed);
        timer.start_once(Duration::from_millis(100), &tx.downgrade(), SessionMessage::ShowDelayElapsed);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(rx.try_recv().ok(), Some(SessionMessage::ShowDelayElapsed(2)));
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_current(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recurring_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = SessionTimer::new("failsafe");
        timer.start_recurring(Duration::from_millis(200), &tx.downgrade(), SessionMessage::FailsafeTick);

        sleep(Duration::from_millis(650)).await;
        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 3);

        timer.cancel();
        assert!(!timer.is_current(1));
        sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }
}
