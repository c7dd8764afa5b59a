// Cross-cutting prompt fragments. Each pipeline that calls the LLM keeps its
// own prompts.rs alongside it and composes these in.

/// Instruction appended to every system prompt that expects JSON back.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
