//! Prompt Model
//!
//! A prompt is a system instruction plus an ordered list of turns. Turn text
//! is assembled with [`PromptBuilder`] so every template shares the same
//! section layout.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// System instruction plus turns, sent to the prompt capability as one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub turns: Vec<Message>,
}

impl Prompt {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns: Vec::new(),
        }
    }

    /// Append a user turn
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.turns.push(Message::user(content));
        self
    }

    /// Append an assistant turn (few-shot examples)
    pub fn assistant(mut self, content: impl Into<String>) -> Self {
        self.turns.push(Message::assistant(content));
        self
    }

    /// Total characters across system and turns
    pub fn char_len(&self) -> usize {
        self.system.len() + self.turns.iter().map(|t| t.content.len()).sum::<usize>()
    }
}

// =============================================================================
// Prompt Builder
// =============================================================================

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Custom section
    Custom(String),
}

/// Builder for turn text with a consistent section layout
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn custom(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Custom(content.to_string()));
        self
    }

    /// Build the final turn text
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Custom(content) => {
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_turns_keep_order() {
        let prompt = Prompt::new("system")
            .user("first")
            .assistant("example")
            .user("second");

        assert_eq!(prompt.turns.len(), 3);
        assert_eq!(prompt.turns[1].role, Role::Assistant);
        assert_eq!(prompt.turns[2].content, "second");
        assert_eq!(prompt.char_len(), "system".len() + 5 + 7 + 6);
    }

    #[test]
    fn test_builder_layout() {
        let text = PromptBuilder::new()
            .role("database architect", "ER modelling")
            .objectives(&["Find tables", "Find relationships"])
            .section("Procedure", "sp_payroll")
            .code("sql", "SELECT 1")
            .build();

        assert!(text.starts_with("<ROLE>"));
        assert!(text.contains("1. Find tables\n2. Find relationships"));
        assert!(text.contains("# Procedure\n\nsp_payroll"));
        assert!(text.ends_with("```sql\nSELECT 1\n```"));
    }
}
