//! Prompt composition

use crate::retrieval::RetrievalResult;

/// Phrase the model is told to use when the context does not cover the question
pub const REFUSAL_PHRASE: &str = "I don't have enough information to answer this question.";

/// Grounded-answer template. `{context}` and `{question}` are substituted.
pub const DEFAULT_TEMPLATE: &str = "Answer the question based only on the following context. \
If you cannot answer the question based on the context, say \"I don't have enough information to answer this question.\"

Context:
{context}

Question: {question}

Answer:";

/// Separator between retrieved chunks inside `{context}`
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Context + question prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Use a custom template; it must contain both placeholders
    pub fn new(template: impl Into<String>) -> Result<Self, String> {
        let template = template.into();
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(format!("prompt template is missing {placeholder}"));
            }
        }
        Ok(Self { template })
    }

    /// Render the prompt from the retrieved chunks, in rank order
    pub fn render(&self, context: &RetrievalResult, question: &str) -> String {
        let context = context
            .iter()
            .map(|c| c.text())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        self.render_raw(&context, question)
    }

    /// Render the prompt from an already-joined context string
    pub fn render_raw(&self, context: &str, question: &str) -> String {
        // Single pass: placeholders inside the substituted text stay literal
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix("{context}") {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{question}") {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}
