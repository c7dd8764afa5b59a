//! Resume evaluation pipeline.
//!
//! Flow: read every resume concurrently → extract columns → build schema →
//!       evaluate each resume in turn → assemble the tabular report.
//!
//! Nothing in the per-resume path is fatal. A failed call gets one flattened
//! retry; unusable output becomes a default-filled record carrying Notes, so
//! every resume contributes at least one row.

use anyhow::anyhow;
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::documents::read_document_text_blocking;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{ChatMessage, ChatModel, ChatRequest, ResponseSchema};
use crate::screening::column_extractor::extract_output_columns;
use crate::screening::columns::{CandidateRecord, ColumnSchema};
use crate::screening::extract::extract_json;
use crate::screening::prompts::{
    DIRECT_COMPLETION_TEMPLATE, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM_TEMPLATE,
};
use crate::screening::report::{build_tabular_report, EvaluationReport, NOTES_FIELD};

const SNAPSHOT_CHARS: usize = 500;

/// An uploaded resume. The original file name doubles as the candidate's
/// name when the model cannot find one.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub id: Uuid,
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug)]
struct ResumeText {
    id: Uuid,
    file_name: String,
    text: String,
}

/// Outcome of the model call(s) for one resume.
#[derive(Debug)]
pub enum ModelReply {
    Response(Value),
    Failed(String),
}

/// Runs a full evaluation. Fails only when a resume cannot be read.
pub async fn evaluate_resumes(
    llm: &dyn ChatModel,
    resumes: Vec<ResumeUpload>,
    criteria: &str,
    job_description: &str,
    model: &str,
) -> Result<EvaluationReport, AppError> {
    // A run with an unreadable resume fails before any model call.
    let texts = read_resumes(resumes).await?;

    let columns = extract_output_columns(llm, criteria, model).await;
    info!("Evaluating with {} columns: {:?}", columns.len(), columns);
    let schema = ColumnSchema::new(&columns);

    let system = format!(
        "{}\n{JSON_ONLY_INSTRUCTION}",
        EVALUATION_SYSTEM_TEMPLATE.replace("{schema}", &schema_description(&schema))
    );

    let mut rows: Vec<CandidateRecord> = Vec::new();
    for resume in &texts {
        info!("Evaluating resume {} ({})", resume.id, resume.file_name);
        let user = EVALUATION_PROMPT_TEMPLATE
            .replace("{criteria}", criteria)
            .replace("{job_description}", job_description)
            .replace("{file_name}", &resume.file_name)
            .replace("{resume_text}", &resume.text);

        let reply = invoke_with_fallback(llm, &schema, &system, &user, model).await;
        let records = records_from_reply(&schema, &resume.file_name, reply);
        info!(
            "Resume {} produced {} record(s)",
            resume.file_name,
            records.len()
        );
        rows.extend(records);
    }

    Ok(build_tabular_report(&schema, rows))
}

/// Reads every resume concurrently. On the first failure the reads still
/// in flight are aborted.
async fn read_resumes(resumes: Vec<ResumeUpload>) -> Result<Vec<ResumeText>, AppError> {
    let reads: Vec<_> = resumes
        .into_iter()
        .map(|resume| {
            let task = tokio::spawn(read_document_text_blocking(
                resume.file_name.clone(),
                resume.bytes,
            ));
            (resume.id, resume.file_name, task)
        })
        .collect();

    let mut texts = Vec::with_capacity(reads.len());
    let mut pending = reads.into_iter();
    while let Some((id, file_name, task)) = pending.next() {
        let result = match task.await {
            Ok(read) => read.map_err(AppError::from),
            Err(e) => Err(AppError::Internal(anyhow!("Resume read task failed: {e}"))),
        };
        match result {
            Ok(text) => texts.push(ResumeText {
                id,
                file_name,
                text,
            }),
            Err(e) => {
                warn!("Failed to read resume {file_name}: {e}");
                for (_, _, task) in pending {
                    task.abort();
                }
                return Err(e);
            }
        }
    }
    Ok(texts)
}

fn schema_description(schema: &ColumnSchema) -> String {
    serde_json::to_string_pretty(&schema.json_schema()).unwrap_or_default()
}

/// Structured call first; on failure one flattened direct completion.
async fn invoke_with_fallback(
    llm: &dyn ChatModel,
    schema: &ColumnSchema,
    system: &str,
    user: &str,
    model: &str,
) -> ModelReply {
    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        response_format: Some(ResponseSchema {
            name: "candidate_evaluation".to_string(),
            schema: schema.json_schema(),
        }),
    };

    let primary_error = match llm.invoke(&request).await {
        Ok(raw) => return ModelReply::Response(raw),
        Err(e) => e,
    };
    warn!("Evaluation call failed, attempting direct completion: {primary_error}");

    let flattened = DIRECT_COMPLETION_TEMPLATE
        .replace("{system}", system)
        .replace("{user}", user);
    let fallback = ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(flattened)],
        response_format: None,
    };

    match llm.invoke(&fallback).await {
        Ok(raw) => ModelReply::Response(raw),
        Err(e) => {
            warn!("Direct completion fallback failed: {e}");
            ModelReply::Failed(format!("{primary_error}; fallback: {e}"))
        }
    }
}

/// Turns one model reply into candidate records. Always at least one.
pub fn records_from_reply(
    schema: &ColumnSchema,
    file_name: &str,
    reply: ModelReply,
) -> Vec<CandidateRecord> {
    let raw = match reply {
        ModelReply::Response(raw) => raw,
        ModelReply::Failed(error) => {
            return vec![fallback_record(
                schema,
                file_name,
                format!("Model invocation failed: {error}"),
            )];
        }
    };
    debug!("Raw evaluation response for {file_name}: {raw}");

    let Some(parsed) = extract_json(&raw) else {
        warn!("No JSON in model response for {file_name}");
        return vec![fallback_record(
            schema,
            file_name,
            format!(
                "Failed to parse model response. Raw snapshot: {}",
                snapshot(&raw)
            ),
        )];
    };

    let mut records = match validate_candidates(schema, &parsed) {
        Ok(records) => records,
        Err(reason) => {
            warn!("Response for {file_name} failed validation ({reason}); normalizing");
            normalize_candidates(schema, &parsed)
        }
    };

    if records.is_empty() {
        return vec![fallback_record(
            schema,
            file_name,
            format!(
                "Model returned no candidates. Raw snapshot: {}",
                snapshot(&raw)
            ),
        )];
    }

    for record in &mut records {
        schema.backfill_name(record, file_name);
    }
    records
}

fn validate_candidates(
    schema: &ColumnSchema,
    parsed: &Value,
) -> Result<Vec<CandidateRecord>, String> {
    let candidates = parsed
        .get("candidates")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing candidates array".to_string())?;
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            schema
                .validate_record(c)
                .map_err(|e| format!("candidates[{i}]: {e}"))
        })
        .collect()
}

fn normalize_candidates(schema: &ColumnSchema, parsed: &Value) -> Vec<CandidateRecord> {
    let items: Vec<&Value> = match parsed {
        Value::Array(items) => items.iter().collect(),
        _ => match parsed.get("candidates").and_then(Value::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![parsed],
        },
    };
    items
        .into_iter()
        .map(|item| schema.normalize_record(item))
        .collect()
}

fn fallback_record(schema: &ColumnSchema, file_name: &str, notes: String) -> CandidateRecord {
    let mut record = schema.default_record();
    schema.backfill_name(&mut record, file_name);
    record.insert(NOTES_FIELD.to_string(), Value::String(notes));
    record
}

fn snapshot(raw: &Value) -> String {
    let text = match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(SNAPSHOT_CHARS).collect()
}
