//! Thought classification and final-answer extraction.
//!
//! Classification is total: a thought that matches no marker comes back
//! verbatim as [`ThoughtKind::Unclassified`].

use std::sync::LazyLock;

use regex::Regex;
use spaces_types::thought::{ClassifiedThought, ThoughtKind};

const TOOL_MARKER: &str = "🎯 Tool";
const TOOL_DONE_MARKER: &str = "completed its mission";
const TOOL_RESULT_LABEL: &str = "Result:";
const COMMAND_OUTPUT_MARKER: &str = "Observed output of cmd";
const TOOL_SELECTION_MARKER: &str = "app.agent.toolcall:think:";
const TOOL_SELECTION_FALLBACK: &str = "Selected tools for next action";

static BACKTICK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid backtick pattern"));

/// Classifies raw thoughts emitted by a named agent.
#[derive(Debug, Clone)]
pub struct ThoughtClassifier {
    agent_name: String,
    reasoning_marker: String,
    selection_marker: String,
    selection_fragment: Option<Regex>,
}

impl ThoughtClassifier {
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        let selection_fragment = Regex::new(&format!(
            r"{} selected \d+ tools? to use",
            regex::escape(&agent_name)
        ))
        .ok();
        Self {
            reasoning_marker: format!("✨ {agent_name}'s thoughts:"),
            selection_marker: format!("{agent_name} selected"),
            selection_fragment,
            agent_name,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Decide the kind and display text of one raw thought.
    pub fn classify(&self, raw: &str) -> ClassifiedThought {
        let (kind, display_text) = if let Some(rest) = segment_after(raw, &self.reasoning_marker) {
            (ThoughtKind::Reasoning, rest.trim().to_string())
        } else if raw.contains(TOOL_MARKER) && raw.contains(TOOL_DONE_MARKER) {
            (ThoughtKind::ToolResult, format!("Result: {}", tool_result(raw)))
        } else if raw.contains(TOOL_MARKER) {
            (ThoughtKind::ToolActivity, raw.to_string())
        } else if raw.contains(TOOL_SELECTION_MARKER) && raw.contains(&self.selection_marker) {
            let fragment = self
                .selection_fragment
                .as_ref()
                .and_then(|re| re.find(raw))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| TOOL_SELECTION_FALLBACK.to_string());
            (ThoughtKind::ToolSelection, fragment)
        } else {
            (ThoughtKind::Unclassified, raw.to_string())
        };

        ClassifiedThought {
            raw: raw.to_string(),
            kind,
            display_text,
        }
    }

    pub fn classify_all<S: AsRef<str>>(&self, raws: &[S]) -> Vec<ClassifiedThought> {
        raws.iter().map(|raw| self.classify(raw.as_ref())).collect()
    }

    /// Pick the text that becomes the assistant turn of a finished task.
    ///
    /// The most recent reasoning thought whose display text contains one of
    /// `markers` wins; otherwise `raw_result` is returned verbatim.
    pub fn final_answer<S: AsRef<str>>(
        &self,
        thoughts: &[S],
        raw_result: &str,
        markers: &[String],
    ) -> String {
        thoughts
            .iter()
            .rev()
            .map(|raw| self.classify(raw.as_ref()))
            .find(|t| {
                t.kind == ThoughtKind::Reasoning
                    && markers.iter().any(|m| !m.is_empty() && t.display_text.contains(m.as_str()))
            })
            .map(|t| t.display_text)
            .unwrap_or_else(|| raw_result.to_string())
    }
}

/// Text between the first occurrence of `marker` and the next one (or the end).
fn segment_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.split(marker).nth(1)
}

/// Result text of a tool-completion notice.
fn tool_result(raw: &str) -> String {
    let Some(after_label) = segment_after(raw, TOOL_RESULT_LABEL) else {
        return raw.to_string();
    };
    let result = after_label.trim();
    match segment_after(result, COMMAND_OUTPUT_MARKER) {
        Some(output) => {
            let unwrapped = BACKTICK_SPAN.replace(output.trim(), "$1");
            unwrapped.trim().replacen("executed:", "", 1).trim().to_string()
        }
        None => result.to_string(),
    }
}
