use crate::render::SharedDisplay;
use crate::state::{BlockTracker, PendingToolCall};
use crate::tool_arg::extract_tool_arg;
use crate::types::{AssistantMessage, ContentPiece, Delta, StreamEvent};
use serde_json::Value;
use std::io;

/// Routes each decoded event to accumulator updates and display calls.
///
/// Handles the two overlapping protocols: batched `assistant` messages
/// carrying full accumulated content, and fine-grained `content_block_*`
/// deltas. Either way every text suffix and tool line reaches the display
/// exactly once per message identity. Malformed or unknown events are
/// no-ops; the only errors surfaced are display write failures.
pub struct EventInterpreter {
    tracker: BlockTracker,
    pending_tool: Option<PendingToolCall>,
    display: SharedDisplay,
}

impl EventInterpreter {
    pub fn new(display: SharedDisplay) -> Self {
        Self {
            tracker: BlockTracker::new(),
            pending_tool: None,
            display,
        }
    }

    pub fn handle(&mut self, event: StreamEvent) -> io::Result<()> {
        // Banner goes out on the first decoded event of any kind.
        self.display.lock().print_header()?;

        match event {
            StreamEvent::System | StreamEvent::Init | StreamEvent::Result => {}
            StreamEvent::Assistant { message } => self.handle_assistant(message)?,
            StreamEvent::MessageStart { message } => {
                self.tracker.reset_for_identity(&message.id);
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                if content_block.block_type.as_deref() == Some("tool_use") {
                    let name = content_block.name.unwrap_or_else(|| "?".to_string());
                    // Tool-call starts arrive one at a time; a prior
                    // unfinished builder is abandoned, not merged.
                    self.pending_tool = Some(PendingToolCall::new(name, index));
                }
            }
            StreamEvent::ContentBlockDelta { index, delta } => self.handle_delta(index, delta)?,
            StreamEvent::ContentBlockStop { .. } => self.finish_pending_tool()?,
            StreamEvent::ToolCall {
                subtype,
                tool_name,
                name,
                input,
            } => {
                if subtype == "started" {
                    let name = tool_name.or(name).unwrap_or_else(|| "?".to_string());
                    let arg = extract_tool_arg(&name, &input);
                    self.display.lock().print_tool(&name, &arg)?;
                }
            }
            StreamEvent::Unknown => {
                tracing::debug!("ignoring unrecognized event kind");
            }
        }
        Ok(())
    }

    /// Batched protocol: content pieces carry full accumulated values, so
    /// text emits only the suffix beyond what was already printed and a
    /// tool piece emits once its input is populated.
    fn handle_assistant(&mut self, message: AssistantMessage) -> io::Result<()> {
        self.tracker.reset_for_identity(&message.id);
        for (index, piece) in message.content.iter().enumerate() {
            match piece {
                ContentPiece::Text { text } => {
                    let total = text.chars().count();
                    let prev = self.tracker.emitted_len(index);
                    if total > prev {
                        let suffix: String = text.chars().skip(prev).collect();
                        self.display.lock().print_text(&suffix)?;
                        self.tracker.advance(index, total);
                    }
                }
                ContentPiece::ToolUse { name, input } => {
                    if self.tracker.tool_emitted(index) {
                        continue;
                    }
                    // Partial batches send an empty {} placeholder first;
                    // the populated input shows up in a later event.
                    if input_is_populated(input) {
                        let arg = extract_tool_arg(name, input);
                        self.display.lock().print_tool(name, &arg)?;
                        self.tracker.mark_tool_emitted(index);
                    }
                }
                ContentPiece::Other => {}
            }
        }
        Ok(())
    }

    /// Delta protocol: text fragments are already suffixes and emit
    /// immediately; argument fragments accumulate on the pending builder.
    fn handle_delta(&mut self, index: usize, delta: Delta) -> io::Result<()> {
        match delta.delta_type.as_deref() {
            Some("text_delta") => {
                let text = delta.text.unwrap_or_default();
                if !text.is_empty() {
                    self.display.lock().print_text(&text)?;
                    let prev = self.tracker.emitted_len(index);
                    self.tracker.advance(index, prev + text.chars().count());
                }
            }
            Some("input_json_delta") => {
                if let Some(pending) = self.pending_tool.as_mut() {
                    pending.push_fragment(delta.partial_json.as_deref().unwrap_or_default());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_pending_tool(&mut self) -> io::Result<()> {
        let Some(pending) = self.pending_tool.take() else {
            return Ok(());
        };
        let input = pending.parse_input();
        let arg = extract_tool_arg(&pending.name, &input);
        self.display.lock().print_tool(&pending.name, &arg)?;
        self.tracker.mark_tool_emitted(pending.index);
        Ok(())
    }
}

/// Mirrors loose truthiness on the wire: `{}`, `""`, `[]`, `null`, `0`
/// and `false` all count as "not populated yet".
fn input_is_populated(input: &Value) -> bool {
    match input {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
