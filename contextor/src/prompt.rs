//! Prompt builder: numbered context block + system instructions.

use rag_base::structs::search_result::SearchResult;

/// Context used when retrieval returns nothing.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found.";

/// Name of the retrieval tool offered in tool mode.
pub const SEARCH_TOOL_NAME: &str = "searchKnowledgeBase";

/// Formats results as `[Document i] <content>` blocks separated by a blank line.
///
/// # Example
/// ```
/// # use contextor::prompt::{format_context, NO_RELEVANT_DOCUMENTS};
/// assert_eq!(format_context(&[]), NO_RELEVANT_DOCUMENTS);
/// ```
pub fn format_context(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RELEVANT_DOCUMENTS.to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Document {}] {}", i + 1, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System prompt for the single-shot path: retrieved context inlined.
pub fn build_system_prompt(context: &str, model: &str) -> String {
    format!(
        "You are a helpful AI assistant with access to a document database.

Retrieved Context from Database:
{context}

Instructions:
- You are running on model: {model}
- Use the context above to answer the user's question accurately.
- If the context helps, cite document numbers in your replies.
- If the context has no relevant info, say so.
- Be clear, concise, and helpful."
    )
}

/// System prompt for tool mode: the model fetches context itself.
pub fn build_tool_system_prompt(model: &str) -> String {
    format!(
        "You are a helpful AI assistant with access to a document database.

Instructions:
- You are running on model: {model}
- Before answering questions about the user's documents, call the `{SEARCH_TOOL_NAME}` tool with a focused search query.
- Use the returned documents to answer accurately, and cite document numbers in your replies.
- If the search returns no relevant info, say so.
- Be clear, concise, and helpful."
    )
}
