//! # Conversation model
//!
//! The typed conversation history sent to the model on every call.
//! Turns and parts are wire-shaped: serializing a `Turn` produces exactly
//! the provider's `contents` entry, so no ad hoc JSON assembly is needed
//! at the request boundary.
//!
//! ## Design
//! - `History` is owned by the orchestrator and is append-only
//! - Readers only ever see `&[Turn]`
//! - A `Part` holds exactly one of: text, a function call, a function result

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One entry in the conversation: a role plus one or more parts.
///
/// Order within `History` is semantically significant - it is the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(part: Part) -> Self {
        Self {
            role: Role::User,
            parts: vec![part],
        }
    }

    pub fn model(part: Part) -> Self {
        Self {
            role: Role::Model,
            parts: vec![part],
        }
    }
}

/// The smallest unit of conversation content.
///
/// Exactly one variant populates a part at a time. The untagged
/// representation matches the provider wire format, where a part object
/// carries a single `text`, `functionCall`, or `functionResponse` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Text { text: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn function_response(name: impl Into<String>, content: impl Into<String>) -> Self {
        Part::FunctionResponse {
            function_response: FunctionResponse {
                name: name.into(),
                response: FunctionResult {
                    content: content.into(),
                },
            },
        }
    }

    /// Get the text content, if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Get the function call, if this part requests one
    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Part::FunctionCall { function_call } => Some(function_call),
            _ => None,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// The result of a tool invocation, fed back as a user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: FunctionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub content: String,
}

/// Append-only conversation history.
///
/// Owned exclusively by the orchestrator for the lifetime of one workflow
/// run; never truncated or replayed.
#[derive(Debug, Clone, Default)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn carrying plain text
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::user(Part::text(text)));
    }

    /// Append a model turn carrying the part returned by the API
    pub fn push_model_part(&mut self, part: Part) {
        self.turns.push(Turn::model(part));
    }

    /// Append a user turn carrying a function result
    pub fn push_function_response(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.turns
            .push(Turn::user(Part::function_response(name, content)));
    }

    /// Immutable view of the accumulated turns
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_turn_wire_shape() {
        let turn = Turn::user(Part::text("hello"));
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "parts": [{"text": "hello"}]
            })
        );
    }

    #[test]
    fn test_function_response_wire_shape() {
        let turn = Turn::user(Part::function_response("read_file", "file contents"));
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "parts": [{
                    "functionResponse": {
                        "name": "read_file",
                        "response": {"content": "file contents"}
                    }
                }]
            })
        );
    }

    #[test]
    fn test_function_call_deserializes() {
        let json = serde_json::json!({
            "functionCall": {
                "name": "write_file",
                "args": {"filePath": "src/main/java/Foo.java", "fileContent": "class Foo {}"}
            }
        });
        let part: Part = serde_json::from_value(json).unwrap();
        let call = part.as_function_call().expect("function call part");
        assert_eq!(call.name, "write_file");
        assert_eq!(call.args["filePath"], "src/main/java/Foo.java");
    }

    #[test]
    fn test_text_part_deserializes() {
        let part: Part = serde_json::from_value(serde_json::json!({"text": "thinking..."})).unwrap();
        assert_eq!(part.as_text(), Some("thinking..."));
        assert!(part.as_function_call().is_none());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut history = History::new();
        history.push_user_text("start");
        history.push_model_part(Part::text("ok"));
        history.push_function_response("run_maven_test", "BUILD SUCCESS");

        assert_eq!(history.len(), 3);
        assert_eq!(history.turns()[0].role, Role::User);
        assert_eq!(history.turns()[1].role, Role::Model);
        assert_eq!(history.turns()[2].role, Role::User);
    }
}
