use std::borrow::Cow;
use std::path::Path;

use tracing::{info, warn};

use sprout_core::error::{Result, SproutError};

/// System prompt loaded once at startup and shared by every chat.
///
/// The template itself never changes. The greet-once instruction embedded in
/// it is swapped for the follow-up instruction per call, based on the
/// requesting chat's own `greeted` flag.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
    greeting_instruction: String,
    followup_instruction: String,
}

impl PromptTemplate {
    pub fn new(
        text: impl Into<String>,
        greeting_instruction: impl Into<String>,
        followup_instruction: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            greeting_instruction: greeting_instruction.into(),
            followup_instruction: followup_instruction.into(),
        }
    }

    /// Read the prompt file. A missing or unreadable file is fatal.
    pub fn load(
        path: &Path,
        greeting_instruction: impl Into<String>,
        followup_instruction: impl Into<String>,
    ) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SproutError::Prompt {
            path: path.display().to_string(),
            source,
        })?;
        let template = Self::new(text, greeting_instruction, followup_instruction);

        info!(path = %path.display(), chars = template.text.len(), "system prompt loaded");
        if !template.has_greeting_instruction() {
            warn!(
                instruction = %template.greeting_instruction,
                "greeting instruction not found in prompt; it will be sent unchanged to every chat"
            );
        }
        Ok(template)
    }

    /// The prompt as sent for a chat in the given state.
    pub fn render(&self, greeted: bool) -> Cow<'_, str> {
        if greeted && self.has_greeting_instruction() {
            Cow::Owned(
                self.text
                    .replace(&self.greeting_instruction, &self.followup_instruction),
            )
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    pub fn raw(&self) -> &str {
        &self.text
    }

    pub fn has_greeting_instruction(&self) -> bool {
        !self.greeting_instruction.is_empty() && self.text.contains(&self.greeting_instruction)
    }
}
