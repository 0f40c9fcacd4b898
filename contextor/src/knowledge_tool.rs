//! `searchKnowledgeBase` tool: definition offered to the model and its executor.

use ai_llm_service::chat_types::ToolDefinition;
use rag_base::RagService;
use rag_base::structs::rag_base_config::SearchConfig;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::prompt::{SEARCH_TOOL_NAME, format_context};

/// Function-tool schema: `{ query: string }`.
pub fn search_tool_definition() -> ToolDefinition {
    ToolDefinition::function(
        SEARCH_TOOL_NAME,
        "Search the user's uploaded documents for passages relevant to a query.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the knowledge base."
                }
            },
            "required": ["query"]
        }),
    )
}

/// Parses raw tool arguments; malformed JSON is kept as a string under `raw`.
pub fn parse_tool_input(arguments: &str) -> Value {
    serde_json::from_str::<Value>(arguments).unwrap_or_else(|_| json!({ "raw": arguments }))
}

/// Result of one tool call: text for the model, JSON for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub content: String,
    pub output: Value,
}

impl ToolOutcome {
    fn failure(msg: String) -> Self {
        Self {
            output: json!({ "error": msg }),
            content: msg,
        }
    }
}

/// Runs a tool call. Failures are reported to the model, never raised.
pub async fn execute_tool(
    rag: &RagService,
    search: &SearchConfig,
    name: &str,
    input: &Value,
) -> ToolOutcome {
    if name != SEARCH_TOOL_NAME {
        warn!(target: "contextor::tools", tool = name, "unknown tool requested");
        return ToolOutcome::failure(format!("Unknown tool: {name}"));
    }

    let query = match input.get("query").and_then(Value::as_str) {
        Some(q) if !q.trim().is_empty() => q,
        _ => return ToolOutcome::failure("`query` is required".to_string()),
    };

    match rag
        .search(query, Some(search.tool_top_k), Some(search.tool_min_similarity))
        .await
    {
        Ok(results) => {
            info!(
                target: "contextor::tools",
                results = results.len(),
                "knowledge base searched"
            );
            let content = format_context(&results);
            ToolOutcome {
                output: json!({ "context": content, "results": results }),
                content,
            }
        }
        Err(e) => {
            warn!(target: "contextor::tools", error = %e, "knowledge base search failed");
            ToolOutcome::failure(format!("Search failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rag_with;

    #[test]
    fn definition_requires_query() {
        let def = search_tool_definition();
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["type"], "function");
        assert_eq!(v["function"]["name"], "searchKnowledgeBase");
        assert_eq!(v["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn malformed_arguments_are_preserved() {
        assert_eq!(parse_tool_input(r#"{"query":"a"}"#), json!({"query": "a"}));
        assert_eq!(parse_tool_input("{oops"), json!({"raw": "{oops"}));
    }

    #[tokio::test]
    async fn search_results_are_formatted_for_the_model() {
        let rag = rag_with(&["Our return policy allows 30 days."]).await;
        let out = execute_tool(
            &rag,
            &SearchConfig::default(),
            SEARCH_TOOL_NAME,
            &json!({"query": "return policy"}),
        )
        .await;
        assert!(out.content.starts_with("[Document 1] "));
        assert!(out.content.contains("30 days"));
        assert_eq!(out.output["results"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn bad_calls_become_tool_errors() {
        let rag = rag_with(&[]).await;
        let unknown = execute_tool(&rag, &SearchConfig::default(), "rm_rf", &json!({})).await;
        assert!(unknown.output["error"].is_string());

        let missing =
            execute_tool(&rag, &SearchConfig::default(), SEARCH_TOOL_NAME, &json!({})).await;
        assert_eq!(missing.content, "`query` is required");
    }
}
