use loopwatch::render::{Display, SharedDisplay, TermCaps};
use loopwatch::session::{Session, SessionConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;

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

/// A downstream pipe that disappears immediately.
struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }
}

fn config(dump: Option<PathBuf>) -> SessionConfig {
    SessionConfig {
        iteration: 1,
        mode: "build".to_string(),
        model: "sonnet".to_string(),
        dump,
    }
}

fn shared(out: Box<dyn Write + Send>) -> SharedDisplay {
    SharedDisplay::new(Display::new(out, TermCaps::plain(), 1, "build", "sonnet"))
}

#[tokio::test]
async fn test_result_only_stream_shows_header_and_footer() {
    let sink = Capture::default();
    let session = Session::new(config(None), shared(Box::new(sink.clone())));
    let input = BufReader::new(&b"{\"type\":\"result\"}\n"[..]);
    session.run(input).await.expect("run succeeds");

    let out = sink.contents();
    assert_eq!(out.matches("\u{250c}\u{2500}").count(), 1, "one header: {out:?}");
    assert_eq!(out.matches("\u{2514}\u{2500}").count(), 1, "one footer: {out:?}");
    assert!(!out.contains("> "), "no tool lines: {out:?}");
    assert!(out.contains("0 tool calls"));
}

#[tokio::test]
async fn test_empty_stream_still_shows_banner_and_footer() {
    let sink = Capture::default();
    let session = Session::new(config(None), shared(Box::new(sink.clone())));
    let input = BufReader::new(&b""[..]);
    session.run(input).await.expect("run succeeds");

    let out = sink.contents();
    assert_eq!(out.matches("Iteration 1").count(), 1);
    assert!(out.contains("0 tool calls"));
}

#[tokio::test]
async fn test_full_stream_renders_tools_and_footer_counts() {
    let sink = Capture::default();
    let session = Session::new(config(None), shared(Box::new(sink.clone())));
    let stream = concat!(
        "{\"type\":\"system\",\"subtype\":\"init\"}\n",
        "{\"type\":\"assistant\",\"message\":{\"id\":\"m1\",\"content\":[",
        "{\"type\":\"text\",\"text\":\"Checking.\\n\"},",
        "{\"type\":\"tool_use\",\"name\":\"Bash\",\"input\":{\"command\":\"ls\"}}]}}\n",
        "not json\n",
        "{\"type\":\"result\"}\n",
    );
    let input = BufReader::new(stream.as_bytes());
    session.run(input).await.expect("run succeeds");

    let out = sink.contents();
    assert!(out.contains("Checking.\n"));
    assert!(out.contains("> Bash  ls"));
    assert!(out.contains("1 tool calls"));
    // Text was printed, so the stream is closed with a newline before the
    // footer rule.
    let footer_at = out.find('\u{2514}').expect("footer present");
    assert!(out[..footer_at].ends_with("\n\n"));
}

#[tokio::test]
async fn test_dump_records_trimmed_lines_pre_decode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dump_path = dir.path().join("stream.jsonl");
    let sink = Capture::default();
    let session = Session::new(
        config(Some(dump_path.clone())),
        shared(Box::new(sink.clone())),
    );
    let stream = "  {\"type\":\"result\"}  \n\n   \nnot json but still dumped\n";
    let input = BufReader::new(stream.as_bytes());
    session.run(input).await.expect("run succeeds");

    let dumped = std::fs::read_to_string(&dump_path).expect("dump file exists");
    assert_eq!(dumped, "{\"type\":\"result\"}\nnot json but still dumped\n");
}

#[tokio::test]
async fn test_broken_output_pipe_is_a_clean_shutdown() {
    let session = Session::new(config(None), shared(Box::new(BrokenSink)));
    let stream = concat!(
        "{\"type\":\"assistant\",\"message\":{\"id\":\"m1\",\"content\":[",
        "{\"type\":\"text\",\"text\":\"hello\"}]}}\n",
        "{\"type\":\"result\"}\n",
    );
    let input = BufReader::new(stream.as_bytes());
    // The write failure must drain, not error: exit status stays 0.
    session.run(input).await.expect("broken pipe is graceful");
}
