//! Document reading.

use std::io;

use report_sorter_core::{ReportDocument, ValidationResult, Validator};
use tracing::warn;

use crate::scan::ScannedDocument;

/// Reads the raw bytes of a scanned file.
pub fn read_document(scanned: &ScannedDocument) -> io::Result<ReportDocument> {
    let bytes = std::fs::read(&scanned.path)?;
    Ok(ReportDocument::new(scanned.name.clone(), bytes))
}

/// Reads and validates one file. A read failure yields an unreadable result
/// instead of an error.
pub fn validate_scanned(validator: &Validator, scanned: &ScannedDocument) -> ValidationResult {
    match read_document(scanned) {
        Ok(document) => validator.validate(&document),
        Err(err) => {
            warn!(document = %scanned.name, error = %err, "cannot read document");
            ValidationResult::unreadable(scanned.name.clone(), format!("read failed: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use report_sorter_core::{Classification, ValidatorConfig};

    use super::*;

    #[test]
    fn test_missing_file_becomes_unreadable_result() {
        let dir = tempfile::tempdir().unwrap();
        let scanned = ScannedDocument {
            path: dir.path().join("gone.md"),
            name: "gone.md".to_string(),
        };
        let validator = Validator::new(ValidatorConfig::default()).unwrap();

        let result = validate_scanned(&validator, &scanned);
        assert_eq!(result.classification, Classification::Invalid);
        assert!(result.is_unreadable());
        assert_eq!(result.document, "gone.md");
    }

    #[test]
    fn test_binary_content_becomes_unreadable_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.md");
        std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();
        let scanned = ScannedDocument {
            path,
            name: "blob.md".to_string(),
        };
        let validator = Validator::new(ValidatorConfig::default()).unwrap();

        assert!(validate_scanned(&validator, &scanned).is_unreadable());
    }
}
