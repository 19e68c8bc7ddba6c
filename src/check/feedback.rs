//! Feedback message trail and render-time template expansion.
//!
//! Messages accumulate on a state as templates plus parameters; they
//! are only expanded into text when feedback is actually produced. At
//! render time each entry sees a sliding window of parameters: its own
//! under `{{name}}`, the previous entry's under `{{parent.name}}`, and
//! the next entry's under `{{child.name}}`, so a message can refer to
//! the construct it is nested inside without eager formatting.

use std::collections::HashMap;

use crate::diagnostics::Span;

/// One entry on a state's message trail
#[derive(Debug, Clone, Default)]
pub struct MessageEntry {
    pub template: String,
    pub kwargs: HashMap<String, String>,
}

impl MessageEntry {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            kwargs: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// Rendered feedback for the caller: the message text and the source
/// span to highlight, if one was recorded.
#[derive(Debug, Clone)]
pub struct Feedback {
    pub message: String,
    pub highlight: Option<Span>,
}

/// Expand a whole trail in order. Entries concatenate with no
/// inserted separator; a template carries its own trailing spacing.
pub fn render_trail(entries: &[MessageEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let parent = i.checked_sub(1).and_then(|p| entries.get(p));
        let child = entries.get(i + 1);
        out.push_str(&render_entry(entry, parent, child));
    }
    out
}

fn render_entry(
    entry: &MessageEntry,
    parent: Option<&MessageEntry>,
    child: Option<&MessageEntry>,
) -> String {
    expand(&entry.template, |key| {
        if let Some(name) = key.strip_prefix("parent.") {
            return parent.and_then(|p| p.kwargs.get(name)).cloned();
        }
        if let Some(name) = key.strip_prefix("child.") {
            return child.and_then(|c| c.kwargs.get(name)).cloned();
        }
        entry.kwargs.get(key).cloned()
    })
}

/// Replace each `{{key}}` placeholder via the resolver; unresolved
/// placeholders expand to nothing.
fn expand(template: &str, resolve: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = resolve(key) {
                    out.push_str(&value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
