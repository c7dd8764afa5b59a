// Prompt text for the screening pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for column extraction.
pub const COLUMN_EXTRACTION_SYSTEM: &str = r#"You extract the column names for a candidate evaluation spreadsheet from a job description and evaluation criteria.

Rules:
1. Return STRICT JSON only, exactly: {"columns": ["Col_Name_One", "Col_Name_Two", ...]}.
2. Merge columns from both sources. If the evaluation criteria contain an "Output Requirements:" section, take exactly those items and prefer their naming. Otherwise infer columns from responsibilities, skills and qualifications.
3. Normalize names to TitleCase words joined by underscores (Years_of_Experience, SQL_Proficiency). Drop punctuation; spaces become underscores.
4. Naming hints:
   - proficiency or rating columns: SQL_Proficiency, Python_Proficiency (scored 1-5).
   - durations: Years_of_Experience, AWS_Experience_Years.
   - lists of tools or services: AWS_Services, ETL_Tools, Certifications.
   - yes/no flags: Data_Pipeline_Experience, Serverless_Functions_Implemented.
   - always include Candidate_Name and Current_Role; Overall_Fit_Percentage is optional.
5. Merge near-duplicates. Order by importance: identity and role first, core proficiencies next, supporting skills and certifications last.
6. Do not invent columns that neither source supports.
"#;

/// User prompt for column extraction. Replace `{criteria}`.
pub const COLUMN_EXTRACTION_PROMPT_TEMPLATE: &str = "Evaluation Criteria:\n{criteria}";

/// System prompt for per-resume evaluation. Replace `{schema}`.
pub const EVALUATION_SYSTEM_TEMPLATE: &str = r#"You screen resumes.
Read the job description, the evaluation criteria and the candidate resume, then score the candidate.
Return ONLY JSON matching this schema:
{schema}

Populate every field. Use the field's default (0, "", false or []) when the resume gives no evidence.
If the resume does not state the candidate's name, use the file name as the name.
Respond with a top-level object {"candidates": [ { ... } ]} and nothing else.
"#;

/// User prompt for per-resume evaluation.
/// Replace: {criteria}, {job_description}, {file_name}, {resume_text}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluation Criteria:
{criteria}

Job Description:
{job_description}

Resume ({file_name}):
{resume_text}"#;

/// Flattened single-turn prompt used when the structured call fails.
/// Replace: {system}, {user}
pub const DIRECT_COMPLETION_TEMPLATE: &str = "SYSTEM:\n{system}\n\nUSER:\n{user}";
