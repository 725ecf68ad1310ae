use crate::error::{Result, SwitchError};
use crate::events::keyboard::KeyState;
use crate::events::{HookDecision, RawKeyEvent, VirtualKey};
use crate::switch_error;
use std::cell::RefCell;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    TranslateMessage, UnhookWindowsHookEx, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL, WM_KEYDOWN,
    WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::engine::KeyHookEngine;
use super::r#trait::KeyboardHookTrait;

thread_local! {
    // Движок живёт только в потоке хука
    static ENGINE: RefCell<Option<KeyHookEngine>> = const { RefCell::new(None) };
}

/// Низкоуровневый хук клавиатуры Windows на выделенном потоке
pub struct Win32KeyboardHook {
    engine: KeyHookEngine,
}

impl Win32KeyboardHook {
    pub fn new(engine: KeyHookEngine) -> Self {
        info!("Инициализация Win32KeyboardHook");
        Self { engine }
    }

    async fn run_impl(self) -> Result<()> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<u32>>();
        let engine = self.engine;

        let thread = std::thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || hook_thread(engine, ready_tx))?;

        let thread_id = match ready_rx.await {
            Ok(Ok(id)) => id,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(switch_error!(hook, "Поток хука завершился до установки")),
        };
        info!("Хук клавиатуры установлен (поток {})", thread_id);

        // Снятие задачи завершает цикл сообщений потока хука
        let guard = QuitOnDrop(thread_id);

        let joined = tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|e| switch_error!(internal, "Ожидание потока хука: {}", e))?;
        drop(guard);

        match joined {
            Ok(result) => result,
            Err(_) => Err(switch_error!(hook, "Поток хука аварийно завершился")),
        }
    }
}

#[async_trait::async_trait]
impl KeyboardHookTrait for Win32KeyboardHook {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

struct QuitOnDrop(u32);

impl Drop for QuitOnDrop {
    fn drop(&mut self) {
        unsafe {
            let _ = PostThreadMessageW(self.0, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }
}

fn hook_thread(engine: KeyHookEngine, ready: oneshot::Sender<Result<u32>>) -> Result<()> {
    ENGINE.with(|cell| *cell.borrow_mut() = Some(engine));

    let hook = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(low_level_keyboard_proc), None, 0) } {
        Ok(hook) => hook,
        Err(e) => {
            error!("Не удалось установить хук клавиатуры: {}", e);
            let _ = ready.send(Err(SwitchError::from(e)));
            return Ok(());
        }
    };

    let thread_id = unsafe { GetCurrentThreadId() };
    let _ = ready.send(Ok(thread_id));

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        if let Err(e) = UnhookWindowsHookEx(hook) {
            warn!("Ошибка снятия хука: {}", e);
        }
    }

    ENGINE.with(|cell| cell.borrow_mut().take());
    info!("Хук клавиатуры снят");
    Ok(())
}

extern "system" fn low_level_keyboard_proc(ncode: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if ncode >= 0 {
        if let Some(event) = unsafe { decode_event(wparam, lparam) } {
            let decision = ENGINE.with(|cell| match cell.try_borrow_mut() {
                Ok(mut slot) => slot
                    .as_mut()
                    .map(|engine| engine.handle(event))
                    .unwrap_or(HookDecision::PassThrough),
                // Повторный вход из обработчика
                Err(_) => HookDecision::PassThrough,
            });

            if decision == HookDecision::Swallow {
                return LRESULT(1);
            }
        }
    }

    unsafe { CallNextHookEx(None, ncode, wparam, lparam) }
}

unsafe fn decode_event(wparam: WPARAM, lparam: LPARAM) -> Option<RawKeyEvent> {
    let (state, is_system_key) = match wparam.0 as u32 {
        WM_KEYDOWN => (KeyState::Pressed, false),
        WM_SYSKEYDOWN => (KeyState::Pressed, true),
        WM_KEYUP => (KeyState::Released, false),
        WM_SYSKEYUP => (KeyState::Released, true),
        _ => return None,
    };

    let info = (lparam.0 as *const KBDLLHOOKSTRUCT).as_ref()?;
    Some(RawKeyEvent::new(
        VirtualKey(info.vkCode),
        state,
        is_system_key,
        Instant::now(),
    ))
}
