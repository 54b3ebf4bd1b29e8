//! Tool usage extraction.
//!
//! The agent's raw result can report tool calls in several shapes:
//!
//! - direct: `{"tool_calls": [{"name", "arguments", "result"}]}`
//! - items: `{"items": [{"type": "tool_call_item", "name", "arguments", "output"}]}`
//! - history: `{"history": [<chat messages>]}` where assistant messages carry
//!   `tool_calls[].function` and `role: "tool"` messages carry the results
//!
//! Shapes are tried in that order and the first one yielding records wins.
//! Anything else, including malformed data, means "no tool usage".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder content for a tool call whose result was not found.
pub const NO_RESULT: &str = "No result";

/// Function name and arguments of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// A single tool invocation and its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub function: FunctionCall,
    pub content: Value,
}

impl ToolInvocationRecord {
    pub fn new(name: impl Into<String>, arguments: Value, content: Option<Value>) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
            content: content
                .filter(has_content)
                .unwrap_or_else(|| Value::String(NO_RESULT.to_string())),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function.name
    }
}

/// Tool calls observed while answering one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsage {
    pub tool_calls: Vec<ToolInvocationRecord>,
    pub has_tools: bool,
}

impl ToolUsage {
    fn from_records(records: Vec<ToolInvocationRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            has_tools: true,
            tool_calls: records,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DirectToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Option<Vec<HistoryToolCall>>,
    #[serde(default)]
    tool_call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryToolCall {
    #[serde(default)]
    id: Option<String>,
    function: FunctionRef,
}

#[derive(Debug, Deserialize)]
struct FunctionRef {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// The recognised raw-result representations.
#[derive(Debug)]
enum RawToolData {
    Direct(Vec<DirectToolCall>),
    Items(Vec<ResultItem>),
    History(Vec<HistoryMessage>),
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &Value, keys: &[&str]) -> Option<Vec<T>> {
    let list = keys.iter().find_map(|k| raw.get(*k))?;
    match serde_json::from_value(list.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!(error = %e, field = keys[0], "Ignoring malformed tool usage data");
            None
        }
    }
}

/// Candidate shapes present in `raw`, in priority order.
fn candidates(raw: &Value) -> Vec<RawToolData> {
    let mut shapes = Vec::new();
    if let Some(calls) = decode(raw, &["tool_calls", "toolCalls"]) {
        shapes.push(RawToolData::Direct(calls));
    }
    if let Some(items) = decode(raw, &["items", "new_items"]) {
        shapes.push(RawToolData::Items(items));
    }
    if let Some(messages) = decode(raw, &["history", "messages"]) {
        shapes.push(RawToolData::History(messages));
    }
    shapes
}

fn records(data: RawToolData) -> Vec<ToolInvocationRecord> {
    match data {
        RawToolData::Direct(calls) => calls
            .into_iter()
            .map(|c| ToolInvocationRecord::new(c.name, c.arguments, c.result))
            .collect(),
        RawToolData::Items(items) => from_items(items),
        RawToolData::History(messages) => from_history(&messages),
    }
}

fn from_items(items: Vec<ResultItem>) -> Vec<ToolInvocationRecord> {
    let mut out: Vec<(Option<String>, ToolInvocationRecord)> = Vec::new();
    for item in items {
        if !item.kind.to_ascii_lowercase().contains("tool") {
            continue;
        }
        match item.name {
            Some(name) => {
                let record = ToolInvocationRecord::new(name, item.arguments, item.output);
                out.push((item.call_id, record));
            }
            // Output-only items complete an earlier call with the same id.
            None => {
                let (Some(id), Some(output)) = (item.call_id, item.output) else {
                    continue;
                };
                if let Some((_, record)) = out
                    .iter_mut()
                    .find(|(call_id, _)| call_id.as_deref() == Some(id.as_str()))
                {
                    if has_content(&output) {
                        record.content = output;
                    }
                }
            }
        }
    }
    out.into_iter().map(|(_, record)| record).collect()
}

fn from_history(messages: &[HistoryMessage]) -> Vec<ToolInvocationRecord> {
    let result_for = |id: Option<&str>| -> Option<Value> {
        let id = id?;
        messages
            .iter()
            .find(|m| m.role == "tool" && m.tool_call_id.as_deref() == Some(id))
            .and_then(|m| m.content.clone())
    };

    messages
        .iter()
        .filter_map(|m| m.tool_calls.as_ref())
        .flatten()
        .map(|call| {
            ToolInvocationRecord::new(
                call.function.name.clone(),
                call.function.arguments.clone(),
                result_for(call.id.as_deref()),
            )
        })
        .collect()
}

/// Extract tool usage from an agent's raw result.
///
/// Returns `None` when no recognised shape yields any tool call.
pub fn normalize(raw: &Value) -> Option<ToolUsage> {
    if !raw.is_object() {
        return None;
    }
    candidates(raw)
        .into_iter()
        .map(records)
        .find(|r| !r.is_empty())
        .and_then(ToolUsage::from_records)
}
