//! Prompts sent with every structured-completion request.
//!
//! Centralised so the default behaviour lives in exactly one place and unit
//! tests can inspect the request text without a live service. Callers can
//! override the extraction prompt via [`crate::config::RunConfig::prompt`];
//! the system prompt is fixed.

/// System message accompanying every extraction request.
pub const SYSTEM_PROMPT: &str = "Extract the event information.";

/// Default user-facing extraction instruction.
///
/// Used when `RunConfig::prompt` is `None`. The recipe structure itself is
/// not described here; it is enforced by the JSON Schema sent alongside
/// (see [`crate::recipe::recipe_card_schema`]).
pub const DEFAULT_EXTRACTION_PROMPT: &str = "process the attached file, extract \
verbatim info to fill in the following json structure for each recipe you find.";
