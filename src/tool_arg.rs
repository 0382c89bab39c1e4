use crate::util::truncate_chars;
use serde_json::Value;

/// Display arguments longer than this are cut with a "..." tail.
pub const ARG_PREVIEW_MAX: usize = 60;

// Checked in order when the tool name has no dedicated rule.
const FALLBACK_KEYS: &[&str] = &[
    "file_path",
    "path",
    "pattern",
    "command",
    "query",
    "url",
    "description",
];

fn str_field<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(|v| v.as_str())
}

/// Pull the most informative single argument out of a tool input for the
/// one-line display. Total: absent or unrecognized inputs yield "".
pub fn extract_tool_arg(name: &str, input: &Value) -> String {
    if !input.is_object() {
        return String::new();
    }
    match name {
        "Read" | "Write" | "Edit" | "NotebookEdit" => str_field(input, "file_path")
            .or_else(|| str_field(input, "notebook_path"))
            .unwrap_or_default()
            .to_string(),
        "Bash" => truncate_chars(str_field(input, "command").unwrap_or_default(), ARG_PREVIEW_MAX),
        "Glob" | "Grep" => str_field(input, "pattern").unwrap_or_default().to_string(),
        "Task" => str_field(input, "description")
            .or_else(|| str_field(input, "subagent_type"))
            .unwrap_or_default()
            .to_string(),
        "WebFetch" => str_field(input, "url").unwrap_or_default().to_string(),
        "WebSearch" => str_field(input, "query").unwrap_or_default().to_string(),
        _ => FALLBACK_KEYS
            .iter()
            .find_map(|key| input.get(key))
            .map(|value| match value.as_str() {
                Some(s) => truncate_chars(s, ARG_PREVIEW_MAX),
                None => truncate_chars(&value.to_string(), ARG_PREVIEW_MAX),
            })
            .unwrap_or_default(),
    }
}
