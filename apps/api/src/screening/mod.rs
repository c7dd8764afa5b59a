// Resume screening pipeline: column extraction, per-resume evaluation,
// report assembly and export. All model calls go through llm_client.

pub mod column_extractor;
pub mod columns;
pub mod evaluator;
pub mod export;
pub mod extract;
pub mod handlers;
pub mod prompts;
pub mod report;

#[cfg(test)]
pub mod test_support;
