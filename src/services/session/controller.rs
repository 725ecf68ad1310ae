use crate::config::ConfigSource;
use crate::error::Result;
use crate::events::{GroupedApps, SessionMessage, SessionPhase, SessionStatus, VirtualKey};
use crate::services::keyboard_hook::{BoundKeyGate, KeyStateProbe};
use crate::services::launcher::ProcessLauncher;
use crate::services::presentation::Overlay;
use crate::services::window_catalog::{build_groups, WindowCatalog};
use crate::services::window_switcher::WindowSwitcher;
use crate::debug_if_enabled;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use super::timers::SessionTimer;

/// Сервисы, с которыми работает контроллер
pub struct SessionServices {
    pub catalog: Arc<WindowCatalog>,
    pub switcher: Arc<WindowSwitcher>,
    pub keys: Arc<dyn KeyStateProbe>,
    pub overlay: Arc<dyn Overlay>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub gate: Arc<BoundKeyGate>,
}

/// Конечный автомат сессии переключения.
///
/// Все переходы выполняются в одной задаче, которая читает упорядоченный канал
/// сообщений от хука и таймеров.
pub struct SessionController {
    phase: SessionPhase,
    disabled: bool,
    config: Arc<ConfigSource>,
    services: SessionServices,
    apps: GroupedApps,
    show_timer: SessionTimer,
    failsafe_timer: SessionTimer,
    tx: WeakUnboundedSender<SessionMessage>,
    status: watch::Sender<SessionStatus>,
    pending_activation: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(
        config: Arc<ConfigSource>,
        services: SessionServices,
        tx: &UnboundedSender<SessionMessage>,
    ) -> Self {
        let disabled = !config.current().switcher.enabled;
        if disabled {
            info!("Переключатель выключен в конфигурации, двойное нажатие Alt включит его");
        }

        let (status, _) = watch::channel(SessionStatus {
            phase: SessionPhase::Idle,
            disabled,
        });

        Self {
            phase: SessionPhase::Idle,
            disabled,
            config,
            services,
            apps: GroupedApps::default(),
            show_timer: SessionTimer::new("show-delay"),
            failsafe_timer: SessionTimer::new("failsafe"),
            tx: tx.downgrade(),
            status,
            pending_activation: None,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Группы последнего сканирования
    #[cfg(test)]
    pub fn apps(&self) -> &GroupedApps {
        &self.apps
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Обрабатывать сообщения, пока хук не закроет канал
    pub async fn run(mut self, mut rx: UnboundedReceiver<SessionMessage>) -> Result<()> {
        info!("SessionController запущен");

        while let Some(message) = rx.recv().await {
            self.handle(message);
        }

        self.end_session();
        self.settle().await;
        info!("SessionController остановлен");
        Ok(())
    }

    pub fn handle(&mut self, message: SessionMessage) {
        debug_if_enabled!("Сессия [{}]: {:?}", self.phase, message);

        match message {
            SessionMessage::ModifierDown => self.on_modifier_down(),
            SessionMessage::ModifierUp | SessionMessage::SessionCancelled => self.end_session(),
            SessionMessage::DoubleModifierTap => self.toggle_enabled(),
            SessionMessage::BoundKey(key) => {
                if !self.on_bound_key(key) {
                    debug!("Клавиша '{}' не обработана", key);
                }
            }
            SessionMessage::ShowDelayElapsed(generation) => self.on_show_delay(generation),
            SessionMessage::FailsafeTick(generation) => self.on_failsafe(generation),
        }
    }

    /// Дождаться запущенной активации окна
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending_activation.take() {
            if let Err(e) = handle.await {
                warn!("Задача активации завершилась с ошибкой: {}", e);
            }
        }
    }

    fn on_modifier_down(&mut self) {
        if self.disabled || self.phase != SessionPhase::Idle {
            return;
        }

        let config = self.config.reload();
        let records = self.services.catalog.scan();
        self.apps = build_groups(&records, &config);
        self.services.gate.open(self.apps.claimable_keys());

        self.set_phase(SessionPhase::ArmedWaitingShow);
        self.show_timer.start_once(
            Duration::from_millis(config.timing.show_delay_ms),
            &self.tx,
            SessionMessage::ShowDelayElapsed,
        );
        self.failsafe_timer.start_recurring(
            Duration::from_millis(config.timing.failsafe_interval_ms),
            &self.tx,
            SessionMessage::FailsafeTick,
        );

        debug!(
            "Сессия начата: {} групп, {} ярлыков",
            self.apps.groups.len(),
            self.apps.launchers.len()
        );
    }

    fn on_show_delay(&mut self, generation: u64) {
        if !self.show_timer.is_current(generation) {
            return;
        }
        self.show_timer.cancel();

        if self.phase != SessionPhase::ArmedWaitingShow {
            return;
        }

        // Удержание Ctrl/Shift/Win означает системное сочетание
        if self.services.keys.any_secondary_down() {
            debug!("Вторичный модификатор удерживается, показ отменён");
            self.end_session();
            return;
        }

        self.set_phase(SessionPhase::Visible);
        self.services.overlay.show(&self.apps);
    }

    fn on_failsafe(&mut self, generation: u64) {
        if !self.failsafe_timer.is_current(generation) || self.phase == SessionPhase::Idle {
            return;
        }

        if !self.services.keys.is_down(VirtualKey::LMENU) {
            warn!("Alt отпущен без события, сессия сброшена");
            self.end_session();
        }
    }

    fn on_bound_key(&mut self, key: char) -> bool {
        if self.phase == SessionPhase::Idle {
            return false;
        }

        if let Some(group) = self.apps.group_for_key(key) {
            info!("Клавиша '{}': {}", key, group);
            let candidates = group.windows.to_vec();
            let switcher = self.services.switcher.clone();

            self.pending_activation = Some(tokio::task::spawn_blocking(move || {
                if switcher.activate(&candidates).is_none() {
                    debug!("Активация без смены окна");
                }
            }));
            self.end_session();
            return true;
        }

        if let Some(launcher) = self.apps.launcher_for_key(key) {
            if let Some(path) = launcher.launch_path.clone() {
                info!("Клавиша '{}': запуск {}", key, launcher.process_name);
                if let Err(e) = self.services.launcher.launch(&path) {
                    error!("{}", e);
                }
                self.end_session();
                return true;
            }
        }

        // Хук закрыл шлюз при перехвате, ждём следующую клавишу
        self.services.gate.reopen();
        false
    }

    fn toggle_enabled(&mut self) {
        self.disabled = !self.disabled;
        debug!(
            "Двойное нажатие Alt: переключатель {}",
            if self.disabled { "выключен" } else { "включён" }
        );
        self.services.overlay.enabled_changed(!self.disabled);

        if self.phase != SessionPhase::Idle {
            self.end_session();
        } else {
            self.publish();
        }
    }

    fn end_session(&mut self) {
        self.show_timer.cancel();
        self.failsafe_timer.cancel();
        self.services.gate.close();

        if self.phase != SessionPhase::Idle {
            self.set_phase(SessionPhase::Idle);
            self.services.overlay.hide();
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            debug_if_enabled!("Сессия: {} -> {}", self.phase, phase);
            self.phase = phase;
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(SessionStatus {
            phase: self.phase,
            disabled: self.disabled,
        });
    }
}
