//! Report assembly: raw candidate rows plus the flattened export view.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::screening::columns::{is_truthy, CandidateRecord, ColumnSchema};

/// Diagnostic field carried on fallback records and copied into exports.
pub const NOTES_FIELD: &str = "Notes";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Json,
    #[default]
    Tabular,
    Text,
}

/// What the UI renders and exports. `data` holds the raw rows for tabular
/// reports; `excel_data` is the flattened, spreadsheet-ready view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    pub data: Value,
    #[serde(rename = "excelData", default, skip_serializing_if = "Option::is_none")]
    pub excel_data: Option<Vec<Map<String, Value>>>,
}

/// Flattens one row for export using each column's display rule. A truthy
/// Notes value is carried over verbatim.
pub fn flatten_row(schema: &ColumnSchema, row: &CandidateRecord) -> Map<String, Value> {
    let mut out: Map<String, Value> = schema
        .columns()
        .map(|(name, kind)| (name.to_string(), kind.display(row.get(name))))
        .collect();
    if let Some(notes) = row.get(NOTES_FIELD).filter(|v| is_truthy(v)) {
        out.insert(NOTES_FIELD.to_string(), notes.clone());
    }
    out
}

pub fn build_tabular_report(schema: &ColumnSchema, rows: Vec<CandidateRecord>) -> EvaluationReport {
    let excel_data = rows.iter().map(|row| flatten_row(schema, row)).collect();
    EvaluationReport {
        kind: ResponseKind::Tabular,
        data: Value::Array(rows.into_iter().map(Value::Object).collect()),
        excel_data: Some(excel_data),
    }
}

fn object_rows(rows: Value) -> Vec<Map<String, Value>> {
    match rows {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Three quarters of `n`, rounded down.
fn qualified_share(n: usize) -> usize {
    n - n.div_ceil(4)
}

/// Canned reports for previewing the UI without calling a model.
pub fn demo_report(kind: ResponseKind, resume_count: usize) -> EvaluationReport {
    match kind {
        ResponseKind::Json => EvaluationReport {
            kind,
            data: json!({
                "summary": "Resume evaluation completed",
                "totalResumes": resume_count,
                "averageScore": 7.5,
                "topCandidates": [
                    { "name": "John Doe", "score": 9.2, "match": "95%" },
                    { "name": "Jane Smith", "score": 8.7, "match": "87%" },
                    { "name": "Mike Johnson", "score": 8.1, "match": "81%" }
                ]
            }),
            excel_data: Some(object_rows(json!([
                { "Name": "John Doe", "Score": 9.2, "Match": "95%", "Skills": "React, TypeScript, Node.js" },
                { "Name": "Jane Smith", "Score": 8.7, "Match": "87%", "Skills": "Python, Django, PostgreSQL" },
                { "Name": "Mike Johnson", "Score": 8.1, "Match": "81%", "Skills": "Java, Spring Boot, MySQL" }
            ]))),
        },
        ResponseKind::Tabular => {
            let rows = [
                ("John Doe", "5 years", "React, TypeScript", 9.2),
                ("Jane Smith", "3 years", "Python, Django", 8.7),
                ("Mike Johnson", "4 years", "Java, Spring", 8.1),
                ("Sarah Wilson", "6 years", "Angular, Node.js", 7.9),
            ];
            EvaluationReport {
                kind,
                data: rows
                    .iter()
                    .map(|(name, exp, skills, score)| {
                        json!({ "candidate": name, "experience": exp, "skills": skills, "score": score })
                    })
                    .collect(),
                excel_data: Some(object_rows(
                    rows.iter()
                        .map(|(name, exp, skills, score)| {
                            json!({ "Candidate": name, "Experience": exp, "Skills": skills, "Score": score })
                        })
                        .collect(),
                )),
            }
        }
        ResponseKind::Text => EvaluationReport {
            kind,
            data: Value::String(format!(
                "Resume Evaluation Report\n\n\
                 Based on the provided evaluation criteria and job description, we have analyzed {resume_count} resumes.\n\n\
                 Key Findings:\n\
                 • 75% of candidates meet the basic requirements\n\
                 • Top 3 candidates show strong technical skills alignment\n\
                 • Average experience level: 4.5 years\n\
                 • Most common skills: JavaScript, React, Python\n\n\
                 Recommendations:\n\
                 1. Schedule interviews with top 3 candidates\n\
                 2. Consider additional technical assessments\n\
                 3. Review soft skills during interviews\n\n\
                 Detailed analysis shows strong potential in the candidate pool with several \
                 standout profiles that closely match the job requirements."
            )),
            excel_data: Some(object_rows(json!([
                { "Metric": "Total Resumes", "Value": resume_count },
                { "Metric": "Qualified Candidates", "Value": qualified_share(resume_count) },
                { "Metric": "Average Score", "Value": 7.5 },
                { "Metric": "Top Score", "Value": 9.2 }
            ]))),
        },
    }
}
