use crate::git;
use crate::interpreter::EventInterpreter;
use crate::keyboard::KeyListener;
use crate::render::SharedDisplay;
use crate::types;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub iteration: u32,
    pub mode: String,
    pub model: String,
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Draining,
    Closed,
}

/// Orchestrates one run: the line-read loop, the keypress listener, and
/// the start/end bookkeeping (git snapshots, header, footer).
///
/// Every termination path — end of input, Ctrl-C, the downstream pipe
/// closing — drains the same way and the process exits 0.
pub struct Session {
    config: SessionConfig,
    display: SharedDisplay,
    phase: Phase,
}

impl Session {
    pub fn new(config: SessionConfig, display: SharedDisplay) -> Self {
        Self {
            config,
            display,
            phase: Phase::Idle,
        }
    }

    pub async fn run<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut dump = self.open_dump()?;
        let before = git::status_snapshot();
        let toggle_enabled = self.display.lock().interactive();
        let listener = KeyListener::spawn(self.display.clone(), toggle_enabled);
        let mut interpreter = EventInterpreter::new(self.display.clone());
        self.set_phase(Phase::Running);

        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(raw)) => {
                            let line = raw.trim();
                            if line.is_empty() {
                                continue;
                            }
                            if let Some(file) = dump.as_mut() {
                                if let Err(err) = writeln!(file, "{line}").and_then(|_| file.flush()) {
                                    tracing::debug!(%err, "dump write failed; disabling dump");
                                    dump = None;
                                }
                            }
                            let Some(event) = types::decode_line(line) else {
                                continue;
                            };
                            if let Err(err) = interpreter.handle(event) {
                                // Downstream is gone; stop reading and wrap up.
                                tracing::debug!(%err, "output write failed; draining");
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            tracing::debug!(%err, "input read failed; draining");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        self.set_phase(Phase::Draining);
        listener.shutdown().await;
        {
            let mut display = self.display.lock();
            display.set_raw_newlines(false);
            let _ = display.finish_stream();
            // In case zero events arrived the banner still belongs above
            // the footer.
            let _ = display.print_header();
        }
        let after = git::status_snapshot();
        let changed = git::diff_files(&before, &after);
        let _ = self.display.lock().print_footer(&changed);
        self.set_phase(Phase::Closed);
        Ok(())
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "session phase change");
        self.phase = phase;
    }

    fn open_dump(&self) -> Result<Option<File>> {
        let Some(path) = self.config.dump.as_ref() else {
            return Ok(None);
        };
        let file = File::create(path)
            .with_context(|| format!("cannot open dump file {}", path.display()))?;
        Ok(Some(file))
    }
}
