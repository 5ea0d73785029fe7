/// Headerless `name,image` CSV for bulk candidate import and export.
use csv::{ReaderBuilder, Trim, WriterBuilder};
use thiserror::Error;

use crate::types::{Candidate, CandidateDraft};
use crate::validation::{normalize_image, validate_candidate, ValidationError};

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: expected 2 fields (name,image), found {found}")]
    FieldCount { line: u64, found: usize },
    #[error("line {line}: {source}")]
    InvalidRow {
        line: u64,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Parse candidate rows. The first bad record fails the whole import.
///
/// Blank lines are skipped. An empty image field means no image.
pub fn parse_candidates(input: &str) -> Result<Vec<CandidateDraft>, CsvError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut drafts = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != 2 {
            return Err(CsvError::FieldCount { line, found: record.len() });
        }

        let draft = CandidateDraft::new(&record[0], normalize_image(Some(record[1].to_string())));
        validate_candidate(&draft).map_err(|source| CsvError::InvalidRow { line, source })?;
        drafts.push(draft);
    }
    Ok(drafts)
}

/// Render candidates as `name,image` records in the given order.
pub fn write_candidates(candidates: &[Candidate]) -> Result<String, CsvError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for c in candidates {
        writer.write_record([c.name.as_str(), c.image.as_deref().unwrap_or("")])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Csv(csv::Error::from(e.into_error())))?;
    // Input was all &str, so the output is UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let input = "Pikachu,https://img.example/25.png\nJigglypuff,\n\n\"Mr. Mime, Sr.\",\n";
        let drafts = parse_candidates(input).unwrap();
        assert_eq!(
            drafts,
            vec![
                CandidateDraft::new("Pikachu", Some("https://img.example/25.png".to_string())),
                CandidateDraft::new("Jigglypuff", None),
                CandidateDraft::new("Mr. Mime, Sr.", None),
            ],
        );
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = parse_candidates("Pikachu,https://a.io/p.png\nOnix\n").unwrap_err();
        assert!(matches!(err, CsvError::FieldCount { line: 2, found: 1 }), "{err:?}");

        let err = parse_candidates("a,b,c\n").unwrap_err();
        assert!(matches!(err, CsvError::FieldCount { line: 1, found: 3 }), "{err:?}");
    }

    #[test]
    fn test_parse_rejects_bad_image() {
        let err = parse_candidates("Ok,\nBad,not-a-url\n").unwrap_err();
        assert!(
            matches!(err, CsvError::InvalidRow { line: 2, source: ValidationError::InvalidImageUrl(_) }),
            "{err:?}",
        );
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        let err = parse_candidates(",https://a.io/x.png\n").unwrap_err();
        assert!(matches!(err, CsvError::InvalidRow { line: 1, .. }));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_candidates("").unwrap().is_empty());
    }

    #[test]
    fn test_export_then_import() {
        let candidates = vec![
            CandidateDraft::new("Snorlax", Some("https://img.example/143.png".to_string())),
            CandidateDraft::new("Farfetch'd, the duck", None),
        ]
        .into_iter()
        .map(|d| d.into_candidate(&"lb".into()))
        .collect::<Vec<_>>();

        let text = write_candidates(&candidates).unwrap();
        assert_eq!(
            text,
            "Snorlax,https://img.example/143.png\n\"Farfetch'd, the duck\",\n",
        );

        let back = parse_candidates(&text).unwrap();
        let names: Vec<&str> = back.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Snorlax", "Farfetch'd, the duck"]);
        assert_eq!(back[0].image, candidates[0].image);
        assert_eq!(back[1].image, None);
    }
}
