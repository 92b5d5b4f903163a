//! Stage one: choose a function from the catalog.

use crate::catalog::FunctionCatalog;
use crate::error::Result;
use crate::extractor::{ExtractionRequest, StructuredExtractor};
use crate::history::ChatHistory;
use crate::prompts;
use crate::retry::{AttemptOutcome, RetryPolicy, RetryState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Stage one answer.
///
/// `function_name` is only guaranteed to be in the catalog if
/// [`FunctionSelector::select`] succeeded within its retry budget; callers
/// must check before using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSelection {
    pub chat: String,
    pub function_name: String,
}

impl FunctionSelection {
    fn from_value(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        Self {
            chat: field("chat"),
            function_name: field("function_name"),
        }
    }
}

/// Picks one function name, re-prompting when the model answers with a name
/// outside the catalog.
#[derive(Clone)]
pub struct FunctionSelector {
    catalog: Arc<FunctionCatalog>,
    extractor: StructuredExtractor,
    policy: RetryPolicy,
    system_prompt: String,
    schema: Value,
}

impl FunctionSelector {
    pub fn new(
        catalog: Arc<FunctionCatalog>,
        extractor: StructuredExtractor,
        policy: RetryPolicy,
    ) -> Self {
        let system_prompt = prompts::selection_system_prompt(&catalog);
        let schema = prompts::selection_schema(&catalog);
        Self {
            catalog,
            extractor,
            policy,
            system_prompt,
            schema,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run stage one.
    ///
    /// Makes one call when the first answer is valid and at most
    /// `max_retries + 1` calls otherwise. After the budget is spent the last
    /// (invalid) selection is returned unchanged.
    pub async fn select(
        &self,
        user_text: &str,
        history: &ChatHistory,
        cancel: &CancellationToken,
    ) -> Result<FunctionSelection> {
        let valid = self.catalog.names();
        let mut state = self.policy.start();
        let mut prompt_text = user_text.to_string();
        let mut last = None;

        while let Some(attempt) = state.attempt() {
            let request = ExtractionRequest::new(
                &self.system_prompt,
                history,
                &prompt_text,
                &self.schema,
                prompts::SELECTION_SCHEMA_NAME,
            );
            let extraction = self.extractor.extract(request, cancel).await?;

            info!(
                stage = "select",
                attempt,
                input_tokens = extraction.usage.map(|u| u.input_tokens),
                output_tokens = extraction.usage.map(|u| u.output_tokens),
                "Function selection response received"
            );

            let selection = FunctionSelection::from_value(&extraction.value);
            match self.check(selection) {
                AttemptOutcome::Valid(selection) => {
                    if state.is_retry() {
                        info!(attempt, function = %selection.function_name, "Selection succeeded after retry");
                    }
                    return Ok(selection);
                }
                AttemptOutcome::Invalid(selection) => {
                    warn!(
                        attempt,
                        function = %selection.function_name,
                        "Model chose a function outside the catalog"
                    );
                    prompt_text = prompts::selection_correction(
                        user_text,
                        &selection.function_name,
                        &valid,
                    );
                    last = Some(selection);
                    state = state.after_invalid();
                }
            }
        }

        if let RetryState::Exhausted { attempts } = state {
            error!(attempts, "Function selection retries exhausted");
        }

        Ok(last.unwrap_or_else(|| FunctionSelection {
            chat: String::new(),
            function_name: String::new(),
        }))
    }

    fn check(&self, selection: FunctionSelection) -> AttemptOutcome<FunctionSelection, FunctionSelection> {
        if self.catalog.contains(&selection.function_name) {
            AttemptOutcome::Valid(selection)
        } else {
            AttemptOutcome::Invalid(selection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::testing::ScriptedModel;
    use llm::LlmError;

    fn selector(model: Arc<ScriptedModel>, retries: u32) -> FunctionSelector {
        let catalog = Arc::new(FunctionCatalog::builtin().unwrap());
        FunctionSelector::new(catalog, StructuredExtractor::new(model), RetryPolicy::new(retries))
    }

    #[tokio::test]
    async fn test_valid_first_answer_makes_one_call() {
        let model = Arc::new(ScriptedModel::replies([
            r#"{"chat": "Removing every layer.", "function_name": "remove_all_map_layers"}"#,
        ]));
        let selection = selector(model.clone(), 2)
            .select("remove everything from the map", &ChatHistory::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(selection.function_name, "remove_all_map_layers");
        assert_eq!(selection.chat, "Removing every layer.");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_name_is_retried_with_correction() {
        let model = Arc::new(ScriptedModel::replies([
            r#"{"chat": "Loading.", "function_name": "load_map_data"}"#,
            r#"{"chat": "Loading OSM.", "function_name": "add_map_layer"}"#,
        ]));
        let selection = selector(model.clone(), 2)
            .select("add OpenStreetMap imagery", &ChatHistory::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(selection.function_name, "add_map_layer");
        assert_eq!(model.call_count(), 2);

        let prompts = model.last_messages();
        assert_eq!(prompts[0], "add OpenStreetMap imagery");
        assert!(prompts[1].starts_with("add OpenStreetMap imagery"));
        assert!(prompts[1].contains("\"load_map_data\""));
        assert!(prompts[1].contains("remove_all_map_layers"));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_invalid_selection() {
        let model = Arc::new(ScriptedModel::replies([
            r#"{"chat": "a", "function_name": "first_bad"}"#,
            r#"{"chat": "b", "function_name": "second_bad"}"#,
            r#"{"chat": "c", "function_name": "third_bad"}"#,
            r#"{"chat": "d", "function_name": "add_map_layer"}"#,
        ]));
        let selection = selector(model.clone(), 2)
            .select("do something", &ChatHistory::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(model.call_count(), 3);
        assert_eq!(selection.function_name, "third_bad");
        assert_eq!(selection.chat, "c");
    }

    #[tokio::test]
    async fn test_history_is_preserved_across_retries() {
        let model = Arc::new(ScriptedModel::replies([
            r#"{"chat": "?", "function_name": ""}"#,
            r#"{"chat": "Going to Paris.", "function_name": "go_to_location"}"#,
        ]));
        let history = ChatHistory::from_entries(["hi", "Hello!"], 8, Default::default());
        selector(model.clone(), 2)
            .select("go to paris", &history, &CancellationToken::new())
            .await
            .unwrap();

        for request in model.requests() {
            assert_eq!(request.messages[1].content, "hi");
            assert_eq!(request.messages[2].content, "Hello!");
        }
        assert!(model.last_messages()[1].contains("did not contain a function_name"));
    }

    #[tokio::test]
    async fn test_non_object_answer_counts_as_invalid() {
        let model = Arc::new(ScriptedModel::replies([
            "I think you want add_map_layer",
            r#"{"chat": "ok", "function_name": "add_map_layer"}"#,
        ]));
        let selection = selector(model.clone(), 1)
            .select("add osm", &ChatHistory::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(selection.function_name, "add_map_layer");
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_error_is_not_retried() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(LlmError::ServiceUnavailable("down".to_string())),
            Ok(r#"{"chat": "ok", "function_name": "add_map_layer"}"#.to_string()),
        ]));
        let result = selector(model.clone(), 2)
            .select("add osm", &ChatHistory::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProtocolError::Extraction(_))));
        assert_eq!(model.call_count(), 1);
    }
}
