//! Key-substitution prompt bodies.
//!
//! Prompt-based tasks and evaluators list their input keys in the user
//! message of their chat template, one `key: {key}` line per key. The
//! backend substitutes `{key}` with the state value at execution time.

use crate::model::PromptMessage;
use serde_json::{Map, Value};

const USER_ROLES: [&str; 2] = ["human", "user"];

/// Render `keys` as newline-joined `key: {key}` lines, preserving order.
#[must_use]
pub fn render_key_lines(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("{key}: {{{key}}}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_user_role(role: &str) -> bool {
    USER_ROLES.contains(&role)
}

/// Replace the body of the last user message in `messages`, appending one
/// if the template has none.
pub fn apply_to_messages(messages: &mut Vec<PromptMessage>, keys: &[String]) {
    let body = render_key_lines(keys);
    match messages.iter_mut().rev().find(|m| is_user_role(&m.role)) {
        Some(message) => message.content = body,
        None => messages.push(PromptMessage {
            role: USER_ROLES[0].to_string(),
            content: body,
        }),
    }
}

/// Same as [`apply_to_messages`] for untyped tool parameters, where the
/// template lives under `prompt_template`.
pub fn apply_to_parameters(parameters: &mut Value, keys: &[String]) {
    if !parameters.is_object() {
        *parameters = Value::Object(Map::new());
    }
    let Some(object) = parameters.as_object_mut() else {
        return;
    };

    let template = object
        .entry("prompt_template")
        .or_insert_with(|| Value::Array(vec![]));
    if !template.is_array() {
        *template = Value::Array(vec![]);
    }
    let Some(messages) = template.as_array_mut() else {
        return;
    };

    let body = Value::String(render_key_lines(keys));
    let user_message = messages.iter_mut().rev().find_map(|m| {
        let is_user = m.get("role").and_then(Value::as_str).is_some_and(is_user_role);
        if is_user { m.as_object_mut() } else { None }
    });

    match user_message {
        Some(message) => {
            message.insert("content".to_string(), body);
        }
        None => {
            let mut message = Map::new();
            message.insert("role".to_string(), Value::String(USER_ROLES[0].to_string()));
            message.insert("content".to_string(), body);
            messages.push(Value::Object(message));
        }
    }
}
