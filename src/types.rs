use serde::Deserialize;
use serde_json::Value;

fn default_json_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn unknown_tool_name() -> String {
    "?".to_string()
}

/// One decoded line of the agent's stream-json output.
///
/// Every payload field defaults when absent so that a recognized kind with
/// a missing sub-field decodes to an empty value instead of failing the
/// whole line. Unrecognized kinds land in `Unknown` and are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    System,
    Init,
    Assistant {
        #[serde(default)]
        message: AssistantMessage,
    },
    MessageStart {
        #[serde(default)]
        message: MessageHeader,
    },
    ContentBlockStart {
        #[serde(default)]
        index: usize,
        #[serde(default)]
        content_block: BlockHeader,
    },
    ContentBlockDelta {
        #[serde(default)]
        index: usize,
        #[serde(default)]
        delta: Delta,
    },
    ContentBlockStop {
        #[serde(default)]
        index: usize,
    },
    ToolCall {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        tool_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_json_object")]
        input: Value,
    },
    Result,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: Vec<ContentPiece>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageHeader {
    #[serde(default)]
    pub id: String,
}

/// A content piece inside a batched assistant message. Text pieces carry
/// the full accumulated text so far, not a delta.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPiece {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default = "unknown_tool_name")]
        name: String,
        #[serde(default = "default_json_object")]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeader {
    #[serde(rename = "type")]
    #[serde(default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(rename = "type")]
    #[serde(default)]
    pub delta_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub partial_json: Option<String>,
}

/// Decode one trimmed input line. Lines that are not valid JSON objects
/// with a string `type` field are skipped.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(%err, "skipping undecodable input line");
            None
        }
    }
}
