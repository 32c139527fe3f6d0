use widestring::U16CString;
use windows::Win32::Foundation::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleExW;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::*;

use super::InputQueue;
use super::window_class::CLASS_NAME;
use crate::config::SandboxConfig;
use crate::error::SandboxResult;

pub fn get_handle_to_file_used_to_create_the_calling_process() -> SandboxResult<HMODULE> {
    let mut out = Default::default();
    unsafe { GetModuleHandleExW(Default::default(), None, &mut out) }?;
    Ok(out)
}

/// Creates a hidden window whose client area matches the configured size.
/// `inputs` must outlive the window; key presses are queued into it.
pub fn create_window(
    our_module: HMODULE,
    config: &SandboxConfig,
    inputs: &InputQueue,
) -> SandboxResult<HWND> {
    let (width, height) = config.window_size;
    let mut window_rect = RECT {
        left: 0,
        top: 0,
        right: width as i32,
        bottom: height as i32,
    };
    unsafe { AdjustWindowRect(&mut window_rect, WS_OVERLAPPEDWINDOW, false) }?;

    let title = if config.use_warp_device {
        format!("{} (WARP)", config.title)
    } else {
        config.title.clone()
    };
    let title = U16CString::from_str_truncate(title);

    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            CLASS_NAME,
            PCWSTR(title.as_ptr()),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            window_rect.right - window_rect.left,
            window_rect.bottom - window_rect.top,
            None,
            None,
            Some(our_module.into()),
            Some(inputs as *const InputQueue as _),
        )
    }?;
    Ok(hwnd)
}
