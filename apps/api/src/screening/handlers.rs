//! Axum route handlers for the Screening API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::documents::read_document_text_blocking;
use crate::errors::AppError;
use crate::screening::column_extractor::extract_output_columns;
use crate::screening::columns::{ColumnKind, ColumnSchema};
use crate::screening::evaluator::{evaluate_resumes, ResumeUpload};
use crate::screening::export::{rows_to_csv, CSV_FILE_NAME};
use crate::screening::report::{demo_report, EvaluationReport, ResponseKind};
use crate::state::AppState;

const DEFAULT_DEMO_RESUMES: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ColumnsRequest {
    pub criteria: String,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

#[derive(Debug, Serialize)]
pub struct ColumnsResponse {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
pub struct CsvExportRequest {
    #[serde(rename = "excelData")]
    pub excel_data: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct DemoQuery {
    pub kind: Option<ResponseKind>,
    pub resumes: Option<usize>,
}

/// Fields collected from the evaluation form.
#[derive(Debug, Default)]
struct EvaluationForm {
    criteria: String,
    job_description: String,
    job_description_file: Option<(String, Bytes)>,
    model: Option<String>,
    resumes: Vec<ResumeUpload>,
}

impl EvaluationForm {
    fn validate(&self) -> Result<(), AppError> {
        if self.criteria.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter evaluation criteria".to_string(),
            ));
        }
        if self.job_description.trim().is_empty() && self.job_description_file.is_none() {
            return Err(AppError::Validation(
                "Please provide a job description".to_string(),
            ));
        }
        if self.resumes.is_empty() {
            return Err(AppError::Validation(
                "Please upload at least one resume".to_string(),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/columns
///
/// Previews the output columns a run with these criteria would use,
/// along with each column's inferred kind.
pub async fn handle_extract_columns(
    State(state): State<AppState>,
    Json(request): Json<ColumnsRequest>,
) -> Result<Json<ColumnsResponse>, AppError> {
    if request.criteria.trim().is_empty() {
        return Err(AppError::Validation(
            "criteria cannot be empty".to_string(),
        ));
    }

    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    let columns = extract_output_columns(state.llm.as_ref(), &request.criteria, &model).await;
    let kinds = ColumnSchema::new(&columns)
        .columns()
        .map(|(name, kind)| ColumnInfo {
            name: name.to_string(),
            kind,
        })
        .collect();

    Ok(Json(ColumnsResponse { columns, kinds }))
}

/// POST /api/v1/evaluations
///
/// Multipart form: `criteria`, `job_description` (or a `job_description_file`),
/// optional `model`, and one `resumes` part per resume file.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationReport>, AppError> {
    let form = read_evaluation_form(multipart).await?;
    form.validate()?;

    let job_description = match (&form.job_description_file, form.job_description.trim()) {
        (Some((file_name, bytes)), "") => {
            read_document_text_blocking(file_name.clone(), bytes.clone()).await?
        }
        (_, text) => text.to_string(),
    };
    let model = form
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    info!(
        "Evaluation requested: {} resume(s), model {model}",
        form.resumes.len()
    );
    let report = evaluate_resumes(
        state.llm.as_ref(),
        form.resumes,
        &form.criteria,
        &job_description,
        &model,
    )
    .await?;

    Ok(Json(report))
}

/// POST /api/v1/exports/csv
///
/// Renders the `excelData` rows of a report as a downloadable CSV file.
pub async fn handle_export_csv(
    Json(request): Json<CsvExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.excel_data.is_empty() {
        return Err(AppError::Validation(
            "excelData must contain at least one row".to_string(),
        ));
    }

    let csv = rows_to_csv(&request.excel_data)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}

/// GET /api/v1/demo?kind=json|tabular|text&resumes=N
///
/// Canned report for exercising the UI without a model call.
pub async fn handle_demo(Query(query): Query<DemoQuery>) -> Json<EvaluationReport> {
    Json(demo_report(
        query.kind.unwrap_or_default(),
        query.resumes.unwrap_or(DEFAULT_DEMO_RESUMES),
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart parsing
// ────────────────────────────────────────────────────────────────────────────

fn invalid_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {e}"))
}

async fn read_evaluation_form(mut multipart: Multipart) -> Result<EvaluationForm, AppError> {
    let mut form = EvaluationForm::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "criteria" => form.criteria = field.text().await.map_err(invalid_multipart)?,
            "job_description" => {
                form.job_description = field.text().await.map_err(invalid_multipart)?
            }
            "model" => {
                let model = field.text().await.map_err(invalid_multipart)?;
                form.model = Some(model.trim().to_string()).filter(|m| !m.is_empty());
            }
            "job_description_file" => {
                let file_name = field
                    .file_name()
                    .unwrap_or("job_description.txt")
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                if !bytes.is_empty() {
                    form.job_description_file = Some((file_name, bytes));
                }
            }
            "resumes" | "resumes[]" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("resume-{}.txt", form.resumes.len() + 1));
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                debug!("Received resume {file_name} ({} bytes)", bytes.len());
                form.resumes.push(ResumeUpload {
                    id: Uuid::new_v4(),
                    file_name,
                    bytes,
                });
            }
            other => debug!("Ignoring multipart field '{other}'"),
        }
    }

    Ok(form)
}
