use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use triage_core::{ClassificationResult, Classifier, EmailInput};

/// Reads a JSON array of `{subject, body}` objects.
pub fn load_batch(path: &Path) -> Result<Vec<EmailInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch input {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing batch input {}", path.display()))
}

/// Classifies every email with at most `concurrency` in flight. Results
/// come back in input order.
pub async fn classify_batch(
    classifier: &Classifier,
    emails: Vec<EmailInput>,
    concurrency: usize,
) -> Vec<ClassificationResult> {
    let total = emails.len();
    let tasks = emails
        .into_iter()
        .map(|email| async move { classifier.classify(&email).await });
    let results: Vec<ClassificationResult> = futures::stream::iter(tasks)
        .buffered(concurrency.max(1))
        .collect()
        .await;
    let fallbacks = results.iter().filter(|r| r.is_fallback()).count();
    tracing::info!(total, fallbacks, "batch classified");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn batch_file_allows_missing_body() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"subject":"a","body":"b"}},{{"subject":"only"}}]"#).unwrap();
        let emails = load_batch(file.path()).unwrap();
        assert_eq!(
            emails,
            vec![EmailInput::new("a", "b"), EmailInput::new("only", "")]
        );
    }

    #[test]
    fn malformed_batch_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = load_batch(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing batch input"));
    }
}
