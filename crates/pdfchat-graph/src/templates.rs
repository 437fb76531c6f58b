/// Literal answer the model is told to give, and the transcript fallback
/// when a cleaned answer comes back empty.
pub const NOT_FOUND: &str = "Not found";

pub const DEFAULT_EXCERPT_CHARS: usize = 3000;

/// System instruction for one turn. `{pdf_content}` is replaced with the
/// truncated document excerpt.
pub const PDF_ASSISTANT_PROMPT_TEMPLATE: &str = "You are a PDF assistant. Answer ONLY the user's current question using the PDF content.
DO NOT include previous chat context or explanations.
Return ONLY the exact answer.
If the answer is not in the PDF, reply 'Not found'.

PDF Content: {pdf_content}";

pub fn pdf_assistant_prompt(excerpt: &str) -> String {
    PDF_ASSISTANT_PROMPT_TEMPLATE.replace("{pdf_content}", excerpt)
}
