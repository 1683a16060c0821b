//! The recipe card the extraction service is asked to fill.
//!
//! Two artifacts live here: the JSON Schema payload sent with every
//! structured-completion request (strict mode, so the service may only
//! return exactly these fields), and a typed mirror for callers that want
//! to parse the raw response text. The pipeline itself never parses
//! responses; it carries them verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Schema name announced to the service alongside the JSON Schema body.
pub const SCHEMA_NAME: &str = "recipe_card";

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: i64,
    pub unit: String,
}

/// Structured description of a single recipe, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCard {
    pub title: String,
    pub servings: i64,
    pub cooking_time: i64,
    pub allergens: Vec<String>,
    pub dietaries: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub special_equipment: Vec<String>,
    /// Catch-all for notes that fit no other field.
    pub additional: Vec<String>,
    pub instructions: Vec<String>,
}

impl RecipeCard {
    /// Parse a raw service response into a typed card.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// JSON Schema for [`RecipeCard`], in the strict structured-output dialect:
/// every field required, no additional properties at any level.
pub fn recipe_card_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "servings": { "type": "integer" },
            "cooking_time": { "type": "integer" },
            "allergens": string_array(),
            "dietaries": string_array(),
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "quantity": { "type": "integer" },
                        "unit": { "type": "string" }
                    },
                    "required": ["name", "quantity", "unit"],
                    "additionalProperties": false
                }
            },
            "special_equipment": string_array(),
            "additional": string_array(),
            "instructions": string_array()
        },
        "required": [
            "title",
            "servings",
            "cooking_time",
            "allergens",
            "dietaries",
            "ingredients",
            "special_equipment",
            "additional",
            "instructions"
        ],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_a_strict_object() {
        let schema = recipe_card_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in [
            "title",
            "servings",
            "cooking_time",
            "allergens",
            "dietaries",
            "ingredients",
            "special_equipment",
            "additional",
            "instructions",
        ] {
            assert!(required.contains(&field), "missing required field {field}");
        }
    }

    #[test]
    fn ingredient_items_are_strict_too() {
        let schema = recipe_card_schema();
        let items = &schema["properties"]["ingredients"]["items"];
        assert_eq!(items["type"], "object");
        assert_eq!(items["additionalProperties"], false);
        assert_eq!(
            items["required"],
            json!(["name", "quantity", "unit"])
        );
    }

    #[test]
    fn parses_a_service_response() {
        let raw = r#"{
            "title": "Ratatouille",
            "servings": 4,
            "cooking_time": 55,
            "allergens": [],
            "dietaries": ["vegetarian", "vegan"],
            "ingredients": [
                { "name": "aubergine", "quantity": 2, "unit": "whole" },
                { "name": "olive oil", "quantity": 3, "unit": "tbsp" }
            ],
            "special_equipment": ["casserole dish"],
            "additional": ["best the next day"],
            "instructions": ["Slice the vegetables.", "Layer and bake."]
        }"#;

        let card = RecipeCard::from_json(raw).unwrap();
        assert_eq!(card.title, "Ratatouille");
        assert_eq!(card.servings, 4);
        assert_eq!(card.ingredients.len(), 2);
        assert_eq!(card.ingredients[0].name, "aubergine");
        assert_eq!(card.instructions.len(), 2);
    }

    #[test]
    fn rejects_a_malformed_response() {
        assert!(RecipeCard::from_json("{\"title\": \"incomplete\"}").is_err());
    }
}
