use crate::events::{VirtualKey, WindowHandle};
use crate::services::keyboard_hook::KeyStateProbe;
use crate::services::window_switcher::FocusControl;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::PathBuf;
use tracing::{debug, info};
use windows::core::{BOOL, PWSTR};
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_CLOAKED};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    AttachThreadInput, GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW,
    PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    AllowSetForegroundWindow, BringWindowToTop, EnumWindows, GetForegroundWindow, GetShellWindow,
    GetWindowLongW, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, IsIconic,
    IsWindowVisible, SetForegroundWindow, ShowWindow, SwitchToThisWindow, ASFW_ANY, GWL_EXSTYLE,
    SW_MINIMIZE, SW_RESTORE, SW_SHOW, WS_EX_TOOLWINDOW,
};

use super::r#trait::{CloakState, WindowSystem};

/// Рабочий стол Windows: перечисление окон, фокус и состояние клавиш
#[derive(Debug, Default)]
pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        info!("Инициализация Win32Desktop");
        Self
    }
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.value() as *mut c_void)
}

fn handle_of(hwnd: HWND) -> Option<WindowHandle> {
    if hwnd.0.is_null() {
        None
    } else {
        Some(WindowHandle(hwnd.0 as isize))
    }
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    handles.push(WindowHandle(hwnd.0 as isize));
    BOOL(1)
}

fn utf16_to_string(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

impl WindowSystem for Win32Desktop {
    fn top_level_windows(&self) -> Vec<WindowHandle> {
        let mut handles: Vec<WindowHandle> = Vec::new();
        // EnumWindows отдаёт окна в порядке Z
        let result = unsafe {
            EnumWindows(
                Some(collect_window),
                LPARAM(&mut handles as *mut Vec<WindowHandle> as isize),
            )
        };
        if let Err(e) = result {
            debug!("EnumWindows завершился с ошибкой: {}", e);
        }
        handles
    }

    fn shell_window(&self) -> Option<WindowHandle> {
        handle_of(unsafe { GetShellWindow() })
    }

    fn is_visible(&self, window: WindowHandle) -> bool {
        unsafe { IsWindowVisible(hwnd(window)).as_bool() }
    }

    fn cloak_state(&self, window: WindowHandle) -> CloakState {
        let mut cloaked: u32 = 0;
        let result = unsafe {
            DwmGetWindowAttribute(
                hwnd(window),
                DWMWA_CLOAKED,
                &mut cloaked as *mut u32 as *mut c_void,
                std::mem::size_of::<u32>() as u32,
            )
        };
        match result {
            Ok(()) => CloakState(cloaked),
            Err(_) => CloakState::NONE,
        }
    }

    fn is_tool_window(&self, window: WindowHandle) -> bool {
        let ex_style = unsafe { GetWindowLongW(hwnd(window), GWL_EXSTYLE) } as u32;
        ex_style & WS_EX_TOOLWINDOW.0 != 0
    }

    fn title(&self, window: WindowHandle) -> String {
        unsafe {
            let len = GetWindowTextLengthW(hwnd(window));
            if len <= 0 {
                return String::new();
            }
            let mut buf = vec![0u16; len as usize + 1];
            let copied = GetWindowTextW(hwnd(window), &mut buf);
            if copied <= 0 {
                return String::new();
            }
            String::from_utf16_lossy(&buf[..copied as usize])
        }
    }

    fn process_id(&self, window: WindowHandle) -> Option<u32> {
        let mut pid: u32 = 0;
        unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut pid)) };
        (pid != 0).then_some(pid)
    }

    fn process_table(&self) -> HashMap<u32, String> {
        let mut table = HashMap::new();
        unsafe {
            let snapshot = match CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    debug!("Снимок процессов недоступен: {}", e);
                    return table;
                }
            };

            let mut entry = PROCESSENTRY32W {
                dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            };

            if Process32FirstW(snapshot, &mut entry).is_ok() {
                loop {
                    table.insert(entry.th32ProcessID, utf16_to_string(&entry.szExeFile));
                    if Process32NextW(snapshot, &mut entry).is_err() {
                        break;
                    }
                }
            }

            let _ = CloseHandle(snapshot);
        }
        table
    }

    fn executable_path(&self, pid: u32) -> Option<PathBuf> {
        unsafe {
            // Процессы с повышенными правами здесь отказывают в доступе
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
            let mut buf = [0u16; 1024];
            let mut size = buf.len() as u32;
            let result = QueryFullProcessImageNameW(
                handle,
                PROCESS_NAME_WIN32,
                PWSTR(buf.as_mut_ptr()),
                &mut size,
            );
            let _ = CloseHandle(handle);
            result.ok()?;
            Some(PathBuf::from(String::from_utf16_lossy(&buf[..size as usize])))
        }
    }
}

impl FocusControl for Win32Desktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        handle_of(unsafe { GetForegroundWindow() })
    }

    fn allow_any_foreground(&self) -> bool {
        unsafe { AllowSetForegroundWindow(ASFW_ANY).is_ok() }
    }

    fn is_minimized(&self, window: WindowHandle) -> bool {
        unsafe { IsIconic(hwnd(window)).as_bool() }
    }

    // ShowWindow возвращает прежнюю видимость, а не результат
    fn restore(&self, window: WindowHandle) -> bool {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_RESTORE);
        }
        true
    }

    fn show(&self, window: WindowHandle) -> bool {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_SHOW);
        }
        true
    }

    fn window_thread(&self, window: WindowHandle) -> Option<u32> {
        let tid = unsafe { GetWindowThreadProcessId(hwnd(window), None) };
        (tid != 0).then_some(tid)
    }

    fn current_thread(&self) -> u32 {
        unsafe { GetCurrentThreadId() }
    }

    fn attach_input(&self, from: u32, to: u32, attach: bool) -> bool {
        unsafe { AttachThreadInput(from, to, attach).as_bool() }
    }

    fn set_foreground(&self, window: WindowHandle) -> bool {
        unsafe { SetForegroundWindow(hwnd(window)).as_bool() }
    }

    fn bring_to_top(&self, window: WindowHandle) -> bool {
        unsafe { BringWindowToTop(hwnd(window)).is_ok() }
    }

    fn switch_to(&self, window: WindowHandle) {
        unsafe { SwitchToThisWindow(hwnd(window), true) }
    }

    fn minimize(&self, window: WindowHandle) -> bool {
        unsafe {
            let _ = ShowWindow(hwnd(window), SW_MINIMIZE);
        }
        true
    }
}

impl KeyStateProbe for Win32Desktop {
    fn is_down(&self, key: VirtualKey) -> bool {
        // Старший бит: клавиша удерживается сейчас
        unsafe { GetAsyncKeyState(key.value() as i32) < 0 }
    }
}
