use crate::render::SharedDisplay;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Best-effort single-keypress listener. `v` flips the display between
/// verbose and collapsed under the shared display lock; nothing else is
/// acted on. If raw mode cannot be acquired the toggle is silently
/// disabled and the display stays verbose.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    raw_mode: bool,
}

impl KeyListener {
    pub fn spawn(display: SharedDisplay, enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        if let Err(err) = enable_raw_mode() {
            tracing::debug!(%err, "no interactive terminal; display toggle disabled");
            return Self::disabled();
        }
        display.lock().set_raw_newlines(true);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = tokio::task::spawn_blocking(move || listen_loop(display, stop_flag));
        Self {
            stop,
            handle: Some(handle),
            raw_mode: true,
        }
    }

    fn disabled() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(true)),
            handle: None,
            raw_mode: false,
        }
    }

    /// Stop the listener and restore the terminal. Returns once the
    /// blocking task has observed the stop flag.
    pub async fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        if self.raw_mode {
            let _ = disable_raw_mode();
            self.raw_mode = false;
        }
    }
}

impl Drop for KeyListener {
    // Raw mode must be undone on every exit path, including panics.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.raw_mode {
            let _ = disable_raw_mode();
        }
    }
}

fn listen_loop(display: SharedDisplay, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if matches!(key.code, KeyCode::Char('v') | KeyCode::Char('V')) {
                        let _ = display.lock().toggle_verbose();
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%err, "keyboard read failed; stopping listener");
                    break;
                }
            },
            // Poll timeouts double as the spinner refresh while collapsed.
            Ok(false) => {
                let _ = display.lock().refresh_status();
            }
            Err(err) => {
                tracing::debug!(%err, "keyboard poll failed; stopping listener");
                break;
            }
        }
    }
}
