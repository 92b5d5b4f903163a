//! Stage two: fill in the chosen function's parameters.

use crate::catalog::FunctionCatalog;
use crate::error::{ProtocolError, Result};
use crate::extractor::{ExtractionRequest, StructuredExtractor};
use crate::history::ChatHistory;
use crate::project::ProjectDescription;
use crate::prompts;
use crate::retry::{AttemptOutcome, RetryPolicy};
use crate::schema::SchemaValidator;
use llm::Message;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Validated parameters, keyed by parameter name.
pub type ParameterSet = Map<String, Value>;

/// Asks the model for parameters and validates them against the function's
/// schema, re-prompting with the validation errors on failure.
#[derive(Clone)]
pub struct ParameterResolver {
    catalog: Arc<FunctionCatalog>,
    extractor: StructuredExtractor,
    policy: RetryPolicy,
}

impl ParameterResolver {
    pub fn new(
        catalog: Arc<FunctionCatalog>,
        extractor: StructuredExtractor,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            catalog,
            extractor,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run stage two for `function_name`.
    ///
    /// Only meaningful for functions that take parameters; a parameterless
    /// function resolves to an empty set without calling the model.
    /// Coordinates and other numbers are passed through as the model gave
    /// them; validation is structural only.
    pub async fn resolve(
        &self,
        function_name: &str,
        user_text: &str,
        project: &ProjectDescription,
        history: &ChatHistory,
        cancel: &CancellationToken,
    ) -> Result<ParameterSet> {
        let spec = self.catalog.get(function_name)?;
        let validator = match self.catalog.validator(function_name)? {
            Some(validator) => validator,
            None => return Ok(ParameterSet::new()),
        };

        let system_prompt = prompts::resolution_system_prompt(spec, validator.schema(), project);
        let request = ExtractionRequest::new(
            &system_prompt,
            history,
            user_text,
            validator.schema(),
            &spec.name,
        );

        extract_until_valid(
            &self.extractor,
            validator,
            request,
            self.policy,
            LoopLabel::new(RESOLVE_STAGE, &spec.name),
            object_parameters,
            cancel,
        )
        .await
    }
}

pub(crate) const RESOLVE_STAGE: &str = "resolve";

/// Names a corrective extraction loop in logs and errors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopLabel<'a> {
    pub stage: &'static str,
    pub subject: &'a str,
}

impl<'a> LoopLabel<'a> {
    pub fn new(stage: &'static str, subject: &'a str) -> Self {
        Self { stage, subject }
    }
}

/// A schema-valid value that cannot be used, paired with the reason.
pub(crate) type Rejection = (Value, String);

/// Accept only JSON objects as parameter sets.
fn object_parameters(value: Value) -> std::result::Result<ParameterSet, Rejection> {
    match value {
        Value::Object(parameters) => Ok(parameters),
        other => Err((other, "parameters are not a JSON object".to_string())),
    }
}

/// Extract, validate, convert and re-prompt until the output satisfies
/// `validator` and `convert`, or the retry budget is spent.
///
/// Each retry keeps the original prompt and history and appends the invalid
/// response plus a correction message carrying the schema and the
/// validation errors. A conversion failure counts as an invalid attempt.
pub(crate) async fn extract_until_valid<T>(
    extractor: &StructuredExtractor,
    validator: &SchemaValidator,
    base: ExtractionRequest<'_>,
    policy: RetryPolicy,
    label: LoopLabel<'_>,
    convert: impl Fn(Value) -> std::result::Result<T, Rejection>,
    cancel: &CancellationToken,
) -> Result<T> {
    let LoopLabel { stage, subject } = label;
    let mut state = policy.start();
    let mut follow_up: Vec<Message> = Vec::new();
    let mut last_failure: Option<Rejection> = None;

    while let Some(attempt) = state.attempt() {
        let request = base.clone().with_follow_up(follow_up.clone());
        let extraction = extractor.extract(request, cancel).await?;

        info!(
            stage,
            subject,
            attempt,
            input_tokens = extraction.usage.map(|u| u.input_tokens),
            output_tokens = extraction.usage.map(|u| u.output_tokens),
            "Structured response received"
        );

        let outcome = match validator.validate(&extraction.value) {
            Ok(()) => match convert(extraction.value) {
                Ok(output) => AttemptOutcome::Valid(output),
                Err(rejection) => AttemptOutcome::Invalid(rejection),
            },
            Err(diagnostic) => AttemptOutcome::Invalid((extraction.value, diagnostic)),
        };

        match outcome {
            AttemptOutcome::Valid(output) => {
                if state.is_retry() {
                    info!(stage, subject, attempt, "Validation succeeded after retry");
                }
                return Ok(output);
            }
            AttemptOutcome::Invalid((value, diagnostic)) => {
                warn!(stage, subject, attempt, errors = %diagnostic, "Response failed schema validation");
                follow_up = vec![
                    Message::assistant(extraction.raw.clone()),
                    Message::human(prompts::validation_correction(
                        &extraction.raw,
                        validator.schema(),
                        &diagnostic,
                    )),
                ];
                last_failure = Some((value, diagnostic));
                state = state.after_invalid();
            }
        }
    }

    let (last_response, diagnostic) = last_failure.unwrap_or((Value::Null, String::new()));
    let attempts = policy.total_attempts();
    error!(stage, subject, attempts, errors = %diagnostic, "Schema validation retries exhausted");

    Err(ProtocolError::SchemaValidation {
        function_name: subject.to_string(),
        attempts,
        diagnostic,
        last_response,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    const OSM: &str = "type=xyz&url=https://tile.openstreetmap.org/{z}/{x}/{y}.png";

    fn resolver(model: Arc<ScriptedModel>, retries: u32) -> ParameterResolver {
        let catalog = Arc::new(FunctionCatalog::builtin().unwrap());
        ParameterResolver::new(catalog, StructuredExtractor::new(model), RetryPolicy::new(retries))
    }

    fn complete_layer() -> String {
        json!({"uri": OSM, "layer_name": "OpenStreetMap", "provider": "wms"}).to_string()
    }

    #[tokio::test]
    async fn test_valid_parameters_first_try() {
        let model = Arc::new(ScriptedModel::replies([complete_layer()]));
        let parameters = resolver(model.clone(), 2)
            .resolve(
                "add_map_layer",
                "add OpenStreetMap imagery",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(parameters["uri"], OSM);
        assert_eq!(parameters["provider"], "wms");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_provider_triggers_one_corrective_retry() {
        let incomplete = json!({"uri": OSM, "layer_name": "OpenStreetMap"}).to_string();
        let model = Arc::new(ScriptedModel::replies([incomplete.clone(), complete_layer()]));

        let parameters = resolver(model.clone(), 2)
            .resolve(
                "add_map_layer",
                "add OpenStreetMap imagery",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(parameters["provider"], "wms");
        assert_eq!(model.call_count(), 2);

        let retry = &model.requests()[1];
        let n = retry.messages.len();
        assert_eq!(retry.messages[n - 2].content, incomplete);
        let correction = &retry.messages[n - 1].content;
        assert!(correction.contains(&incomplete));
        assert!(correction.contains("\"provider\" is a required property"), "{}", correction);
        assert!(correction.contains("\"enum\""));
    }

    #[tokio::test]
    async fn test_exhaustion_is_schema_validation_error() {
        let bad = json!({"uri": "https://example.com", "layer_name": "x", "provider": "wms"}).to_string();
        let model = Arc::new(ScriptedModel::replies([bad.clone(), bad.clone(), bad]));

        let result = resolver(model.clone(), 2)
            .resolve(
                "add_map_layer",
                "add tiles",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(model.call_count(), 3);
        match result {
            Err(ProtocolError::SchemaValidation {
                function_name,
                attempts,
                diagnostic,
                last_response,
            }) => {
                assert_eq!(function_name, "add_map_layer");
                assert_eq!(attempts, 3);
                assert!(diagnostic.contains("/uri"), "{}", diagnostic);
                assert_eq!(last_response["uri"], "https://example.com");
            }
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
    }

    async fn run_permissive(model: Arc<ScriptedModel>) -> Result<ParameterSet> {
        let validator = SchemaValidator::compile(json!({})).unwrap();
        let history = ChatHistory::default();
        let base = ExtractionRequest::new("system", &history, "text", validator.schema(), "anything");
        extract_until_valid(
            &StructuredExtractor::new(model),
            &validator,
            base,
            RetryPolicy::new(2),
            LoopLabel::new(RESOLVE_STAGE, "anything"),
            object_parameters,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_non_object_output_is_corrected() {
        let model = Arc::new(ScriptedModel::replies(["[1, 2]", r#"{"a": 1}"#]));
        let parameters = run_permissive(model.clone()).await.unwrap();

        assert_eq!(parameters["a"], 1);
        assert_eq!(model.call_count(), 2);
        let requests = model.requests();
        let correction = &requests[1].messages.last().unwrap().content;
        assert!(correction.contains("not a JSON object"), "{}", correction);
    }

    #[tokio::test]
    async fn test_non_object_exhaustion_reports_every_attempt() {
        let model = Arc::new(ScriptedModel::replies(["[1]", "[2]", "7"]));
        match run_permissive(model.clone()).await {
            Err(ProtocolError::SchemaValidation {
                function_name,
                attempts,
                diagnostic,
                last_response,
            }) => {
                assert_eq!(function_name, "anything");
                assert_eq!(attempts, 3);
                assert_eq!(diagnostic, "parameters are not a JSON object");
                assert_eq!(last_response, json!(7));
            }
            other => panic!("expected SchemaValidation, got {:?}", other),
        }
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_corrective_retry_returns_the_corrected_value() {
        let invalid = json!({"west": "far", "south": 0, "east": 1, "north": 1}).to_string();
        let model = Arc::new(ScriptedModel::replies([
            invalid,
            r#"{"west": 0.5, "south": 0, "east": 1, "north": 1}"#.to_string(),
        ]));
        let parameters = resolver(model.clone(), 1)
            .resolve(
                "go_to_location",
                "go somewhere",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(parameters["west"], json!(0.5));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retries_do_not_accumulate_follow_ups() {
        let model = Arc::new(ScriptedModel::replies(["{}", "{}", "{}"]));
        let _ = resolver(model.clone(), 2)
            .resolve(
                "go_to_location",
                "go to paris",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await;

        let lengths: Vec<usize> = model.requests().iter().map(|r| r.messages.len()).collect();
        assert_eq!(lengths, vec![2, 4, 4]);
    }

    #[tokio::test]
    async fn test_project_description_is_embedded() {
        let model = Arc::new(ScriptedModel::replies([json!({
            "layer_name": "zoning",
            "renderer_name": "residential",
            "color": [255, 0, 0]
        })
        .to_string()]));
        let project = ProjectDescription::new(json!({
            "title": "City",
            "layers": [{"name": "zoning", "categories": ["residential"]}]
        }));

        let parameters = resolver(model.clone(), 2)
            .resolve(
                "color_category",
                "make residential red",
                &project,
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(parameters["color"], json!([255, 0, 0]));
        let system = &model.requests()[0].messages[0].content;
        assert!(system.contains("residential"));
        assert!(system.contains("\"maxItems\": 3"));
    }

    #[tokio::test]
    async fn test_coordinates_pass_through_unclamped() {
        let model = Arc::new(ScriptedModel::replies([
            r#"{"west": -500.5, "south": 48.8151, "east": 2.4699, "north": 948.9}"#,
        ]));
        let parameters = resolver(model, 0)
            .resolve(
                "go_to_location",
                "go somewhere odd",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(parameters["west"], json!(-500.5));
        assert_eq!(parameters["north"], json!(948.9));
    }

    #[tokio::test]
    async fn test_parameterless_function_skips_model() {
        let model = Arc::new(ScriptedModel::replies(Vec::<String>::new()));
        let parameters = resolver(model.clone(), 2)
            .resolve(
                "remove_all_map_layers",
                "clear",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(parameters.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_function_is_not_found() {
        let model = Arc::new(ScriptedModel::replies(Vec::<String>::new()));
        let result = resolver(model, 2)
            .resolve(
                "load_map_data",
                "x",
                &ProjectDescription::empty(),
                &ChatHistory::default(),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(ProtocolError::NotFound(_))));
    }
}
