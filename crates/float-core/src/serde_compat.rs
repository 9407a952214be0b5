//! JSON wire format for FloatAST documents.
//!
//! Documents are tagged with a semantic version string. Import peeks at
//! the major version before full deserialization and rejects anything
//! this build does not understand rather than guessing compatibility.

use serde::Deserialize;

use crate::ast::{AST_VERSION, FloatAST};
use crate::error::{CoreError, ValidationError};

/// Major version this build accepts.
const SUPPORTED_MAJOR: &str = "1";

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: String,
}

/// Serialize a document to pretty JSON.
pub fn export_json(ast: &FloatAST) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ast)
}

/// Parse a document, enforcing the major-version gate.
pub fn import_json(json: &str) -> Result<FloatAST, CoreError> {
    let probe: VersionProbe = serde_json::from_str(json)?;
    let major = probe.version.split('.').next().unwrap_or("");
    if major != SUPPORTED_MAJOR {
        return Err(ValidationError::UnknownVersion(probe.version).into());
    }
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FloatAST {
        FloatAST::parse_conversation(
            "Assistant: exporting documents now\nUser: re-importing documents works?",
            "wire test",
        )
    }

    #[test]
    fn test_roundtrip_preserves_counts() {
        let ast = sample();
        let json = export_json(&ast).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.id, ast.id);
        assert_eq!(back.nodes.len(), ast.nodes.len());
        assert_eq!(back.edges.len(), ast.edges.len());
        let keys: Vec<_> = ast.concepts.keys().collect();
        let back_keys: Vec<_> = back.concepts.keys().collect();
        assert_eq!(keys, back_keys);
    }

    #[test]
    fn test_version_tag_present() {
        let json = export_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], AST_VERSION);
    }

    #[test]
    fn test_future_major_rejected() {
        let mut ast = sample();
        ast.version = "2.0".to_string();
        let json = serde_json::to_string(&ast).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_minor_version_accepted() {
        let mut ast = sample();
        ast.version = "1.3".to_string();
        let json = serde_json::to_string(&ast).unwrap();
        assert!(import_json(&json).is_ok());
    }

    #[test]
    fn test_missing_version_rejected() {
        let err = import_json(r#"{"id": "not-a-document"}"#).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownVersion(_))
        ));
    }
}
