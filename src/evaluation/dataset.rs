use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labelled question from the golden dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCase {
    pub question: String,
    pub ground_truth_answer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_context: Option<String>,
}

/// Load a golden dataset: a JSON array of evaluation cases
pub fn load_dataset(path: &Path) -> Result<Vec<EvaluationCase>> {
    if !path.exists() {
        return Err(RagError::DatasetNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
        source: e,
        context: format!("Failed to read dataset: {}", path.display()),
    })?;

    let cases: Vec<EvaluationCase> = serde_json::from_str(&content).map_err(|e| RagError::Json {
        source: e,
        context: format!("Invalid golden dataset: {}", path.display()),
    })?;

    if let Some(i) = cases.iter().position(|c| c.question.trim().is_empty()) {
        return Err(RagError::InvalidInput(format!(
            "case {} in {} has an empty question",
            i + 1,
            path.display()
        )));
    }

    tracing::info!("Loaded {} test cases from {}", cases.len(), path.display());
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("golden.json");
        std::fs::write(
            &path,
            r#"[
                {"question": "Q1", "ground_truth_answer": "A1", "ground_truth_context": "C1"},
                {"question": "Q2", "ground_truth_answer": "A2"}
            ]"#,
        )
        .unwrap();

        let cases = load_dataset(&path).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].ground_truth_context.as_deref(), Some("C1"));
        assert_eq!(cases[1].ground_truth_context, None);
    }

    #[test]
    fn test_missing_dataset() {
        let dir = TempDir::new().unwrap();
        let err = load_dataset(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, RagError::DatasetNotFound { .. }));
        assert!(err.to_string().contains("ground_truth_answer"));
    }

    #[test]
    fn test_malformed_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"question": "not an array"}"#).unwrap();
        assert!(matches!(load_dataset(&path), Err(RagError::Json { .. })));

        std::fs::write(&path, r#"[{"question": " ", "ground_truth_answer": "x"}]"#).unwrap();
        assert!(matches!(load_dataset(&path), Err(RagError::InvalidInput(_))));
    }
}
