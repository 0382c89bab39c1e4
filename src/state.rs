use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Per-message emission bookkeeping for the stream interpreter.
///
/// Tracks how many characters have already been printed for each content
/// position and which positions already produced a tool line, so the two
/// overlapping event protocols can both feed the display without
/// duplicating output. All state is scoped to one message identity.
#[derive(Debug, Default)]
pub struct BlockTracker {
    message_id: Option<String>,
    text_emitted: HashMap<usize, usize>,
    tools_emitted: HashSet<usize>,
}

impl BlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the message identity the current state belongs to. A new,
    /// non-empty identity clears all position bookkeeping; an empty or
    /// unchanged identity leaves it alone. Returns true when a reset
    /// happened.
    pub fn reset_for_identity(&mut self, id: &str) -> bool {
        if id.is_empty() || self.message_id.as_deref() == Some(id) {
            return false;
        }
        self.message_id = Some(id.to_string());
        self.text_emitted.clear();
        self.tools_emitted.clear();
        true
    }

    /// Characters already printed for this content position.
    pub fn emitted_len(&self, index: usize) -> usize {
        self.text_emitted.get(&index).copied().unwrap_or(0)
    }

    /// Advance the printed-length record. Monotone: never moves backwards.
    pub fn advance(&mut self, index: usize, new_len: usize) {
        let entry = self.text_emitted.entry(index).or_insert(0);
        *entry = (*entry).max(new_len);
    }

    pub fn tool_emitted(&self, index: usize) -> bool {
        self.tools_emitted.contains(&index)
    }

    pub fn mark_tool_emitted(&mut self, index: usize) {
        self.tools_emitted.insert(index);
    }
}

/// A tool invocation announced by `content_block_start` whose arguments
/// are still arriving as `input_json_delta` fragments. At most one exists
/// at a time; `content_block_stop` finalizes and clears it.
#[derive(Debug)]
pub struct PendingToolCall {
    pub name: String,
    pub index: usize,
    partial_json: String,
}

impl PendingToolCall {
    pub fn new(name: String, index: usize) -> Self {
        Self {
            name,
            index,
            partial_json: String::new(),
        }
    }

    pub fn push_fragment(&mut self, fragment: &str) {
        self.partial_json.push_str(fragment);
    }

    /// Parse the accumulated buffer. An empty or malformed buffer yields
    /// an empty object so the tool line still renders.
    pub fn parse_input(&self) -> Value {
        if self.partial_json.is_empty() {
            return Value::Object(serde_json::Map::new());
        }
        serde_json::from_str(&self.partial_json).unwrap_or_else(|err| {
            tracing::debug!(%err, tool = %self.name, "tool argument buffer was not valid JSON");
            Value::Object(serde_json::Map::new())
        })
    }
}
