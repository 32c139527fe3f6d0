//! Win32 window, message pump and error dialog.

mod create_window;
mod window_class;

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::info;
use widestring::U16CString;
use windows::Win32::Foundation::*;
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::*;

use crate::config::SandboxConfig;
use crate::d3d12::D3d12Api;
use crate::d3d12::create_context;
use crate::error::SandboxResult;
use crate::input::InputAction;
use crate::session::RenderSession;
use crate::session::SceneAssets;
use create_window::create_window;
use create_window::get_handle_to_file_used_to_create_the_calling_process;
use window_class::register_window_class;

/// Actions queued by the window procedure, drained by the main loop.
#[derive(Default)]
pub struct InputQueue {
    actions: RefCell<VecDeque<InputAction>>,
}

impl InputQueue {
    pub fn push(&self, action: InputAction) {
        self.actions.borrow_mut().push_back(action);
    }

    pub fn pop(&self) -> Option<InputAction> {
        self.actions.borrow_mut().pop_front()
    }
}

/// Opens the window, bootstraps Direct3D 12 and renders until the window
/// closes, Escape is pressed or a frame fails.
pub fn run(config: &SandboxConfig) -> SandboxResult<()> {
    let our_module = get_handle_to_file_used_to_create_the_calling_process()?;
    register_window_class(our_module)?;

    let inputs = Box::new(InputQueue::default());
    let hwnd = create_window(our_module, config, &inputs)?;

    let assets = SceneAssets::load(config)?;
    let context = create_context(config, hwnd)?;
    let mut session = RenderSession::<D3d12Api>::new(context, config, &assets)?;

    unsafe { _ = ShowWindow(hwnd, SW_SHOW) };

    let mut quit = false;
    while !quit && session.is_running() {
        let mut message = MSG::default();
        if unsafe { PeekMessageW(&mut message, None, 0, 0, PM_REMOVE) }.into() {
            unsafe {
                _ = TranslateMessage(&message);
                DispatchMessageW(&message);
            }
            if message.message == WM_QUIT {
                quit = true;
            }
            continue;
        }

        while let Some(action) = inputs.pop() {
            session.apply_input(action);
        }
        if !session.is_running() {
            break;
        }
        session.update();
        session.render();
    }

    info!("Leaving the message loop after {} frames", session.frames_rendered());
    session.cleanup();
    drop(session);

    if !quit {
        unsafe { DestroyWindow(hwnd) }?;
    }
    Ok(())
}

/// Shows a blocking error dialog.
pub fn show_fatal_error(message: &str) {
    let text = U16CString::from_str_truncate(message);
    unsafe {
        MessageBoxW(
            None,
            PCWSTR(text.as_ptr()),
            w!("DX12 Sandbox"),
            MB_OK | MB_ICONERROR,
        )
    };
}
