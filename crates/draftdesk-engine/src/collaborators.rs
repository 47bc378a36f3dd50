//! Boundaries to the text-producing collaborators (the hosted LLM).
//!
//! The engine treats both as opaque: a generator returns document text to be
//! split into paragraphs, an editor returns replacement text for a selection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("Edit failed: {0}")]
    Edit(String),
    #[error("Collaborator returned no usable text")]
    EmptyOutput,
}

/// What a generator is asked to produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    /// The user's request, also used as the snapshot description.
    pub instruction: String,
    /// Full text of the current document, when there is one.
    pub document_text: Option<String>,
}

impl PromptContext {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            document_text: None,
        }
    }

    pub fn with_document(mut self, text: impl Into<String>) -> Self {
        self.document_text = Some(text.into());
        self
    }
}

pub trait Generator {
    fn generate(&self, prompt: &PromptContext) -> Result<String, CollaboratorError>;
}

pub trait TextEditor {
    /// Rewrite `original_markdown` following `instruction`.
    ///
    /// Receives the source substring with its formatting, never the rendered text.
    fn edit_text(&self, original_markdown: &str, instruction: &str)
    -> Result<String, CollaboratorError>;
}

impl<F> Generator for F
where
    F: Fn(&PromptContext) -> Result<String, CollaboratorError>,
{
    fn generate(&self, prompt: &PromptContext) -> Result<String, CollaboratorError> {
        self(prompt)
    }
}

impl<F> TextEditor for F
where
    F: Fn(&str, &str) -> Result<String, CollaboratorError>,
{
    fn edit_text(
        &self,
        original_markdown: &str,
        instruction: &str,
    ) -> Result<String, CollaboratorError> {
        self(original_markdown, instruction)
    }
}

/// Reject empty or whitespace-only collaborator output.
pub fn require_text(text: String) -> Result<String, CollaboratorError> {
    if text.trim().is_empty() {
        return Err(CollaboratorError::EmptyOutput);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\n\t\n")]
    fn rejects_blank_output(#[case] text: &str) {
        assert!(matches!(
            require_text(text.to_string()),
            Err(CollaboratorError::EmptyOutput)
        ));
    }

    #[test]
    fn keeps_usable_output_verbatim() {
        assert_eq!(require_text(" hi\n".to_string()).unwrap(), " hi\n");
    }

    #[test]
    fn closures_act_as_collaborators() {
        let generator = |prompt: &PromptContext| -> Result<String, CollaboratorError> {
            Ok(format!("about {}", prompt.instruction))
        };
        let editor =
            |text: &str, _: &str| -> Result<String, CollaboratorError> { Ok(text.to_uppercase()) };

        let prompt = PromptContext::new("cats").with_document("old");
        assert_eq!(generator.generate(&prompt).unwrap(), "about cats");
        assert_eq!(editor.edit_text("**a**", "shout").unwrap(), "**A**");
    }
}
