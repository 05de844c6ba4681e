//! Panic hook that records state before the default handler runs.
//!
//! The hook logs the panic through `tracing` so it lands in the log file,
//! writes a short report to stderr and then chains to the previous hook.
//! Applications can register a state callback (for example a summary of the
//! loaded tiles) that is included in the report.

use std::io::Write;
use std::panic::{self, PanicHookInfo};
use std::sync::{Mutex, OnceLock};

use tracing::error;

type StateCallback = Box<dyn Fn() -> String + Send + Sync>;

static STATE_CALLBACK: OnceLock<Mutex<Option<StateCallback>>> = OnceLock::new();

/// Installs the panic hook. Call once at startup; later calls stack hooks.
pub fn init() {
    let _ = STATE_CALLBACK.get_or_init(|| Mutex::new(None));

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        handle_panic(info);
        original_hook(info);
    }));
}

/// Sets the callback whose output is included in panic reports.
pub fn set_state_callback<F>(callback: F)
where
    F: Fn() -> String + Send + Sync + 'static,
{
    if let Some(slot) = STATE_CALLBACK.get() {
        if let Ok(mut guard) = slot.lock() {
            *guard = Some(Box::new(callback));
        }
    }
}

pub fn clear_state_callback() {
    if let Some(slot) = STATE_CALLBACK.get() {
        if let Ok(mut guard) = slot.lock() {
            *guard = None;
        }
    }
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(message) = info.payload().downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn capture_state() -> Option<String> {
    let slot = STATE_CALLBACK.get()?;
    // try_lock: the panic may have happened while the callback was being set
    let guard = slot.try_lock().ok()?;
    guard.as_ref().map(|callback| callback())
}

fn handle_panic(info: &PanicHookInfo<'_>) {
    let message = panic_message(info);
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    let state = capture_state();

    error!(
        location = %location,
        state = state.as_deref().unwrap_or(""),
        "Panic: {}",
        message
    );

    // Logging may itself be broken, so report on stderr as well
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "━━━ tilescape panic ━━━");
    let _ = writeln!(stderr, "Location: {}", location);
    let _ = writeln!(stderr, "Message:  {}", message);
    if let Some(state) = state {
        let _ = writeln!(stderr, "State:    {}", state);
    }
    let _ = writeln!(stderr);
    let _ = stderr.flush();
}
