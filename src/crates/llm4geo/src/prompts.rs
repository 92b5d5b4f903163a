//! Prompt text for each protocol stage.

use crate::catalog::{FunctionCatalog, FunctionSpec};
use crate::project::ProjectDescription;
use serde_json::{json, Value};

/// Structured-output name for stage one.
pub const SELECTION_SCHEMA_NAME: &str = "GetFunctionName";

/// System prompt for function selection. Embeds every catalog entry.
pub fn selection_system_prompt(catalog: &FunctionCatalog) -> String {
    let mut prompt = String::from(
        "You help a user run a procedure in QGIS by choosing exactly one function to call. \
         Give helpful feedback in `chat`, explaining briefly which function fits their request \
         and why. Assume the user is new and go step by step. Don't describe the project \
         unless the answer uses it.\n\n\
         Choose `function_name` from the functions below. Note the options each function \
         accepts and use them when deciding; for example a user who wants road 'data' most \
         often means features or vector data. Only use the listed names and never make up \
         new ones.\n\nAvailable functions:\n",
    );

    for spec in catalog.list() {
        prompt.push_str(&describe_function(spec));
        prompt.push('\n');
    }

    prompt
}

fn describe_function(spec: &FunctionSpec) -> String {
    match &spec.parameter_schema {
        Some(schema) => format!(
            "- {}: {}\n  parameters: {}",
            spec.name,
            spec.description,
            schema.to_json_schema()
        ),
        None => format!("- {}: {}\n  parameters: none", spec.name, spec.description),
    }
}

/// Schema for stage one: a chat reply plus one catalog name.
pub fn selection_schema(catalog: &FunctionCatalog) -> Value {
    json!({
        "type": "object",
        "properties": {
            "chat": {
                "type": "string",
                "description": "Brief feedback to the user on which function should be called and why."
            },
            "function_name": {
                "type": "string",
                "description": "One of the available function names.",
                "enum": catalog.names(),
            }
        },
        "required": ["chat", "function_name"]
    })
}

/// Corrective user message after an out-of-catalog answer.
pub fn selection_correction(user_text: &str, invalid_name: &str, valid: &[String]) -> String {
    let problem = if invalid_name.is_empty() {
        "Your previous answer did not contain a function_name.".to_string()
    } else {
        format!(
            "Your previous answer used function_name \"{}\", which is not an available function.",
            invalid_name
        )
    };

    format!(
        "{}\n\n{} Choose exactly one of: {}.",
        user_text,
        problem,
        valid.join(", ")
    )
}

/// System prompt for parameter resolution.
pub fn resolution_system_prompt(
    spec: &FunctionSpec,
    schema: &Value,
    project: &ProjectDescription,
) -> String {
    format!(
        "You fill in the parameters for the QGIS function `{name}`.\n\
         Function description: {description}\n\n\
         Answer with a JSON object that matches this schema exactly, including every \
         required property and only allowed enumeration values:\n{schema}\n\n\
         Ground layer, category, range and rule names in the current project. \
         The project is described as:\n{project}",
        name = spec.name,
        description = spec.description,
        schema = pretty(schema),
        project = project.to_prompt_string(),
    )
}

/// Follow-up after parameters failed validation.
pub fn validation_correction(invalid_response: &str, schema: &Value, errors: &str) -> String {
    format!(
        "Your previous response was:\n{}\n\n\
         It does not validate against the schema:\n{}\n\n\
         Validation errors: {}\n\n\
         Respond again with a corrected JSON object that satisfies the schema.",
        invalid_response,
        pretty(schema),
        errors
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
