use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::{Config, ConfigSource};
use services::{
    create_desktop, create_keyboard_hook, create_launcher, BoundKeyGate, ChannelConsumer,
    KeyHookEngine, LogOverlay, SessionController, SessionServices, WindowCatalog, WindowSwitcher,
};

#[derive(Parser, Debug)]
#[command(name = "tapswitch")]
#[command(about = "Переключатель приложений по удержанию левого Alt")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "tapswitch.toml")]
    config: String,

    /// Режим сухого запуска (эмуляция клавиатуры и окон)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Конфигурация нужна раньше логирования: в ней уровень и формат
    let config = Config::load(&args.config)?;

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск tapswitch v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);
    info!("Привязок приложений: {}", config.apps.len());

    if args.dry_run {
        warn!("Режим сухого запуска - клавиатура и окна эмулируются");
    }

    // Инициализация компонентов
    let desktop = create_desktop(args.dry_run);
    let launcher = create_launcher(desktop.scripted_keys.is_some());
    let catalog = Arc::new(WindowCatalog::new(desktop.windows.clone()));
    let switcher = Arc::new(WindowSwitcher::new(desktop.focus.clone(), catalog.clone()));
    let gate = Arc::new(BoundKeyGate::new());

    // Набор клавиш хука фиксируется при запуске
    let bound_keys = config.bound_keys();
    let double_tap_threshold = Duration::from_millis(config.timing.double_tap_threshold_ms);

    let (tx, rx) = mpsc::unbounded_channel();
    let controller = SessionController::new(
        Arc::new(ConfigSource::new(&args.config, config)),
        SessionServices {
            catalog,
            switcher,
            keys: desktop.keys.clone(),
            overlay: Arc::new(LogOverlay),
            launcher,
            gate: gate.clone(),
        },
        &tx,
    );

    let consumer = Arc::new(ChannelConsumer::new(tx, gate));
    let engine = KeyHookEngine::new(bound_keys, double_tap_threshold, desktop.keys.clone(), consumer);
    let keyboard_hook = create_keyboard_hook(engine, desktop.scripted_keys.clone())?;

    info!("Все компоненты инициализированы");

    // Состояние переключателя для пользователя
    let mut status = controller.subscribe();
    let status_handle = tokio::spawn(async move {
        let mut disabled = status.borrow_and_update().disabled;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().disabled;
            if current != disabled {
                disabled = current;
                info!(
                    "Переключатель {}",
                    if disabled { "выключен" } else { "включён" }
                );
            }
        }
    });

    // Контроллер завершится сам, когда хук закроет канал
    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(rx).await {
            error!("Ошибка в SessionController: {}", e);
        }
    });
    let hook_handle = tokio::spawn(async move {
        if let Err(e) = keyboard_hook.run().await {
            error!("Ошибка в KeyboardHook: {}", e);
        }
    });

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
        }
    }

    info!("Завершение работы...");

    // Снятие хука закрывает канал контроллера
    hook_handle.abort();

    // Ожидаем завершения задач (с таймаутом)
    let shutdown_timeout = Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = hook_handle.await;
        let _ = controller_handle.await;
        let _ = status_handle.await;
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("tapswitch завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let fmt_layer = match format {
        "pretty" => tracing_subscriber::fmt::layer().pretty().boxed(),
        _ => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
