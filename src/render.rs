use crate::util::fmt_duration;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RESET: &str = "\x1b[0m";
pub const CYAN: &str = "\x1b[36m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const WHITE: &str = "\x1b[37m";

const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const DEFAULT_WIDTH: usize = 80;

/// Color for a tool-call line. Unknown tools render neutral.
pub fn tool_color(name: &str) -> &'static str {
    match name {
        "Read" | "Glob" | "Grep" | "LS" => BLUE,
        "Edit" | "Write" | "NotebookEdit" => YELLOW,
        "Bash" => GREEN,
        "Task" => MAGENTA,
        "WebFetch" | "WebSearch" => CYAN,
        _ => WHITE,
    }
}

/// Terminal capabilities, detected once at startup and consumed
/// thereafter. When stdout is not an interactive terminal the width
/// falls back to a fixed value and the keypress toggle stays disabled.
#[derive(Debug, Clone, Copy)]
pub struct TermCaps {
    pub color: bool,
    pub interactive: bool,
    pub fallback_width: usize,
}

impl TermCaps {
    pub fn detect() -> Self {
        Self {
            color: detect_color_support(),
            interactive: io::stdout().is_terminal(),
            fallback_width: DEFAULT_WIDTH,
        }
    }

    /// Fixed caps for captured-output tests: no colors, no terminal.
    pub fn plain() -> Self {
        Self {
            color: false,
            interactive: false,
            fallback_width: DEFAULT_WIDTH,
        }
    }
}

fn detect_color_support() -> bool {
    if std::env::var("LOOPWATCH_FORCE_COLOR")
        .ok()
        .and_then(crate::util::parse_bool_flag)
        .unwrap_or(false)
    {
        return true;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    io::stdout().is_terminal()
}

/// All terminal output state for one run: the sink, the session counters,
/// and the display-mode flags shared with the keypress listener.
///
/// Methods write directly and flush per operation; callers hold the
/// surrounding `SharedDisplay` lock for exactly one operation at a time.
pub struct Display {
    out: Box<dyn Write + Send>,
    caps: TermCaps,
    iteration: u32,
    mode_label: String,
    model_label: String,
    start: Instant,
    verbose: bool,
    status_shown: bool,
    spinner_tick: usize,
    in_tool: bool,
    printed_header: bool,
    raw_newlines: bool,
    tool_calls: usize,
    tool_names: Vec<String>,
    text_chars: usize,
}

impl Display {
    pub fn new(
        out: Box<dyn Write + Send>,
        caps: TermCaps,
        iteration: u32,
        mode_label: impl Into<String>,
        model_label: impl Into<String>,
    ) -> Self {
        Self {
            out,
            caps,
            iteration,
            mode_label: mode_label.into(),
            model_label: model_label.into(),
            start: Instant::now(),
            verbose: true,
            status_shown: false,
            spinner_tick: 0,
            in_tool: false,
            printed_header: false,
            raw_newlines: false,
            tool_calls: 0,
            tool_names: Vec::new(),
            text_chars: 0,
        }
    }

    pub fn interactive(&self) -> bool {
        self.caps.interactive
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    pub fn tool_names(&self) -> &[String] {
        self.tool_names.as_slice()
    }

    pub fn text_chars(&self) -> usize {
        self.text_chars
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// While crossterm raw mode is active, output post-processing is off
    /// and "\n" alone no longer returns the carriage.
    pub fn set_raw_newlines(&mut self, enabled: bool) {
        self.raw_newlines = enabled;
    }

    fn cols(&self) -> usize {
        if !self.caps.interactive {
            return self.caps.fallback_width;
        }
        crossterm::terminal::size()
            .map(|(w, _)| w as usize)
            .unwrap_or(self.caps.fallback_width)
    }

    fn style(&self, code: &'static str) -> &'static str {
        if self.caps.color {
            code
        } else {
            ""
        }
    }

    fn push(&mut self, text: &str) -> io::Result<()> {
        if self.raw_newlines && text.contains('\n') {
            let converted = text.replace('\n', "\r\n");
            self.out.write_all(converted.as_bytes())
        } else {
            self.out.write_all(text.as_bytes())
        }
    }

    /// Horizontal rule filling the terminal width, with optional labels
    /// embedded at the left and right ends.
    fn hrule(&self, left: &str, right: &str, cap_l: &str, cap_r: &str) -> String {
        let left_str = if left.is_empty() {
            String::new()
        } else {
            format!(" {left} ")
        };
        let right_str = if right.is_empty() {
            String::new()
        } else {
            format!(" {right} ")
        };
        let used = cap_l.width() + left_str.width() + right_str.width() + cap_r.width();
        let fill = self.cols().saturating_sub(used);
        format!("{cap_l}{left_str}{}{right_str}{cap_r}", "─".repeat(fill))
    }

    /// Print the session banner. Idempotent: only the first call draws.
    pub fn print_header(&mut self) -> io::Result<()> {
        if self.printed_header {
            return Ok(());
        }
        self.printed_header = true;
        let left = format!("Iteration {}", self.iteration);
        let right = format!("{} | {}", self.mode_label, self.model_label);
        let line = self.hrule(&left, &right, "┌─", "─┐");
        let (bold, reset) = (self.style(BOLD), self.style(RESET));
        self.push(&format!("\n{bold}{line}{reset}\n\n"))?;
        self.out.flush()
    }

    /// Print the closing summary: changed files, elapsed time, tool count.
    pub fn print_footer(&mut self, changed: &[String]) -> io::Result<()> {
        self.clear_status()?;
        if !changed.is_empty() {
            let (dim, reset) = (self.style(DIM), self.style(RESET));
            self.push(&format!("\n  {dim}Files changed:{reset}\n"))?;
            for path in changed {
                self.push(&format!("    {path}\n"))?;
            }
        }
        let mut parts = vec![
            fmt_duration(self.elapsed_secs()),
            format!("{} tool calls", self.tool_calls),
        ];
        if !changed.is_empty() {
            parts.push(format!("{} files changed", changed.len()));
        }
        let line = self.hrule("", &parts.join(" | "), "└─", "─┘");
        let (bold, reset) = (self.style(BOLD), self.style(RESET));
        self.push(&format!("\n{bold}{line}{reset}\n\n"))?;
        self.out.flush()
    }

    /// Print a tool-call line. Always visible regardless of display mode.
    pub fn print_tool(&mut self, name: &str, arg: &str) -> io::Result<()> {
        self.clear_status()?;
        if !self.in_tool {
            self.push("\n")?;
        }
        self.in_tool = true;
        self.tool_calls += 1;
        self.tool_names.push(name.to_string());
        let color = self.style(tool_color(name));
        let (bold, dim, reset) = (self.style(BOLD), self.style(DIM), self.style(RESET));
        let arg_str = if arg.is_empty() {
            String::new()
        } else {
            format!("  {dim}{arg}{reset}")
        };
        self.push(&format!("  {color}>{reset} {bold}{name}{reset}{arg_str}\n"))?;
        if !self.verbose {
            self.draw_status()?;
        }
        self.out.flush()
    }

    /// Print raw assistant text. Accounted for in all modes, drawn only
    /// when verbose.
    pub fn print_text(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.text_chars += text.chars().count();
        if !self.verbose {
            return self.draw_status();
        }
        self.clear_status()?;
        if self.in_tool {
            self.push("\n")?;
            self.in_tool = false;
        }
        self.push(text)?;
        self.out.flush()
    }

    /// Erase the in-place status line if it is currently drawn.
    pub fn clear_status(&mut self) -> io::Result<()> {
        if self.status_shown {
            self.push("\r\x1b[2K")?;
            self.status_shown = false;
            self.out.flush()?;
        }
        Ok(())
    }

    /// Draw or refresh the in-place status line (collapsed mode).
    pub fn draw_status(&mut self) -> io::Result<()> {
        self.spinner_tick += 1;
        let glyph = SPINNER[self.spinner_tick % SPINNER.len()];
        let left = format!(
            "  {glyph} streaming | {} tools | {}",
            self.tool_calls,
            fmt_duration(self.elapsed_secs())
        );
        let right = "[v] show";
        let pad = self
            .cols()
            .saturating_sub(left.width() + right.width())
            .max(1);
        let (dim, reset) = (self.style(DIM), self.style(RESET));
        self.push(&format!(
            "\r\x1b[2K{dim}{left}{}{right}{reset}",
            " ".repeat(pad)
        ))?;
        self.status_shown = true;
        self.out.flush()
    }

    /// Redraw the spinner if the status line is on screen. Called from
    /// the listener's poll-timeout ticks.
    pub fn refresh_status(&mut self) -> io::Result<()> {
        if !self.verbose && self.status_shown {
            return self.draw_status();
        }
        Ok(())
    }

    /// Flip between verbose and collapsed display. Collapsed draws the
    /// status line, verbose erases it.
    pub fn toggle_verbose(&mut self) -> io::Result<bool> {
        self.verbose = !self.verbose;
        if self.verbose {
            self.clear_status()?;
        } else {
            self.draw_status()?;
        }
        Ok(self.verbose)
    }

    /// End-of-stream cleanup: drop the status line and close the final
    /// text line if any raw text was printed.
    pub fn finish_stream(&mut self) -> io::Result<()> {
        self.clear_status()?;
        if self.text_chars > 0 {
            self.push("\n")?;
        }
        self.out.flush()
    }
}

/// The one lock shared between the line-processing context and the
/// keypress listener. Held for single output operations only.
#[derive(Clone)]
pub struct SharedDisplay {
    inner: Arc<Mutex<Display>>,
}

impl SharedDisplay {
    pub fn new(display: Display) -> Self {
        Self {
            inner: Arc::new(Mutex::new(display)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Display> {
        // A panic while printing must not wedge the other context.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn test_display(sink: &Capture) -> Display {
        Display::new(Box::new(sink.clone()), TermCaps::plain(), 3, "build", "sonnet")
    }

    #[test]
    fn test_header_prints_once_and_fills_width() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        display.print_header().unwrap();
        display.print_header().unwrap();

        let out = sink.contents();
        assert_eq!(out.matches("Iteration 3").count(), 1);
        let rule = out
            .lines()
            .find(|l| l.contains("Iteration"))
            .expect("banner line");
        assert_eq!(UnicodeWidthStr::width(rule), 80);
        assert!(rule.starts_with("┌─ Iteration 3 "));
        assert!(rule.ends_with(" build | sonnet ─┐"));
    }

    #[test]
    fn test_tool_line_and_newline_placement() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        display.print_tool("Read", "src/lib.rs").unwrap();
        display.print_tool("Bash", "").unwrap();
        display.print_text("done\n").unwrap();

        let out = sink.contents();
        // Blank line before the first tool of a run, none between tools,
        // one before returning to text.
        assert_eq!(out, "\n  > Read  src/lib.rs\n  > Bash\n\ndone\n");
        assert_eq!(display.tool_calls(), 2);
        assert_eq!(display.tool_names(), ["Read", "Bash"]);
    }

    #[test]
    fn test_collapsed_mode_counts_but_hides_text() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        display.toggle_verbose().unwrap();
        display.print_text("hidden words").unwrap();

        let out = sink.contents();
        assert!(!out.contains("hidden words"));
        assert!(out.contains("streaming | 0 tools"));
        assert_eq!(display.text_chars(), "hidden words".chars().count());
    }

    #[test]
    fn test_status_line_erased_before_other_output() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        display.toggle_verbose().unwrap();
        display.print_tool("Grep", "needle").unwrap();

        let out = sink.contents();
        let erase_at = out.find("\r\x1b[2K").expect("erase sequence");
        let tool_at = out.find("> Grep").expect("tool line");
        assert!(erase_at < tool_at);
        // Collapsed mode redraws the status after the tool line.
        assert!(out.rfind("[v] show").unwrap() > tool_at);
    }

    #[test]
    fn test_footer_lists_changed_files() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        let changed = vec![" M src/lib.rs".to_string(), "?? notes.md".to_string()];
        display.print_footer(&changed).unwrap();

        let out = sink.contents();
        assert!(out.contains("Files changed:"));
        assert!(out.contains("     M src/lib.rs\n"));
        assert!(out.contains("2 files changed"));
        assert!(out.contains("0 tool calls"));
        assert!(out.contains("└─"));
    }

    #[test]
    fn test_finish_stream_adds_trailing_newline_only_after_text() {
        let sink = Capture::default();
        let mut display = test_display(&sink);
        display.finish_stream().unwrap();
        assert_eq!(sink.contents(), "");

        display.print_text("tail").unwrap();
        display.finish_stream().unwrap();
        assert_eq!(sink.contents(), "tail\n");
    }

    #[test]
    fn test_tool_color_table() {
        assert_eq!(tool_color("Read"), BLUE);
        assert_eq!(tool_color("Bash"), GREEN);
        assert_eq!(tool_color("Task"), MAGENTA);
        assert_eq!(tool_color("SomethingNew"), WHITE);
    }
}
