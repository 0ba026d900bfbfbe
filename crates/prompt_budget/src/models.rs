//! Model variants and their context budgets.
//!
//! Lookup is an exact name match. Names arrive from user settings or request
//! headers and may be stale or empty, so an unknown name resolves to the
//! cheapest model instead of failing.

use serde::Serialize;

/// Name of the model used when a lookup does not match.
pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: &'static str,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Maximum context tokens the model accepts as input.
    pub max_token: u32,
    /// Relative cost unit of one call.
    pub cost_per_call: u32,
}

static MODELS: [ModelSpec; 4] = [
    ModelSpec {
        name: DEFAULT_MODEL_NAME,
        temperature: 0.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        max_token: 4000,
        cost_per_call: 1,
    },
    ModelSpec {
        name: "gpt-4",
        temperature: 0.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        max_token: 8000,
        cost_per_call: 60,
    },
    ModelSpec {
        name: "gpt-4-turbo",
        temperature: 0.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        max_token: 4000,
        cost_per_call: 20,
    },
    ModelSpec {
        name: "gpt-4o",
        temperature: 0.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        max_token: 4000,
        cost_per_call: 10,
    },
];

/// All registered models, default first.
pub fn models() -> &'static [ModelSpec] {
    &MODELS
}

/// Get a model by exact name, falling back to the default model.
pub fn get_model(name: &str) -> &'static ModelSpec {
    match MODELS.iter().find(|model| model.name == name) {
        Some(model) => model,
        None => {
            if !name.is_empty() {
                log::debug!("Unknown model '{}', using {}", name, DEFAULT_MODEL_NAME);
            }
            &MODELS[0]
        }
    }
}

impl ModelSpec {
    /// Budget as a signed value for prompt accounting.
    pub fn budget(&self) -> i64 {
        i64::from(self.max_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_model_by_exact_name() {
        let model = get_model("gpt-4");
        assert_eq!(model.name, "gpt-4");
        assert_eq!(model.max_token, 8000);
        assert_eq!(model.cost_per_call, 60);
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        assert_eq!(get_model("gpt-5-ultra").name, DEFAULT_MODEL_NAME);
        assert_eq!(get_model("").name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn match_is_exact_not_prefix() {
        assert_eq!(get_model("gpt-4o-mini").name, DEFAULT_MODEL_NAME);
        assert_eq!(get_model("GPT-4").name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn registry_has_default_and_positive_budgets() {
        assert!(models().iter().any(|m| m.name == DEFAULT_MODEL_NAME));
        assert!(models().iter().all(|m| m.max_token > 0));
    }

    #[test]
    fn default_is_cheapest() {
        let default = get_model(DEFAULT_MODEL_NAME);
        assert!(models()
            .iter()
            .all(|m| m.cost_per_call >= default.cost_per_call));
    }
}
