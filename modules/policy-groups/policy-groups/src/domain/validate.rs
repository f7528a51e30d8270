//! Structural validation of policy revision documents.
//!
//! A revision document is a bounded-size JSON manifest carrying `name`,
//! `revision_id`, a `run_list`, and a `cookbook_locks` map. Validation
//! is total and side-effect-free; it never touches storage. Failures
//! are structured so the caller can name the offending field, the
//! expected pattern, or the cookbook whose lock failed.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use policy_groups_sdk::{CookbookLock, ValidDocument};

/// Grammar for policy and revision identifiers.
pub const NAME_PATTERN: &str = r"^[A-Za-z0-9_.:-]{1,255}$";
/// Grammar for cookbook names (no colons, unlike policy names).
pub const COOKBOOK_NAME_PATTERN: &str = r"^[A-Za-z0-9_.-]{1,255}$";
/// Lock identifiers are content hashes.
pub const IDENTIFIER_PATTERN: &str = r"^[0-9a-fA-F]{1,64}$";
/// Dotted decimal version, two or three components.
pub const VERSION_PATTERN: &str = r"^\d+(\.\d+){1,2}$";
/// Run list entries reference a recipe or a role.
pub const RUN_LIST_ITEM_PATTERN: &str = r"^(recipe|role)\[[A-Za-z0-9_:.-]+\]$";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("invalid name pattern"));
static COOKBOOK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COOKBOOK_NAME_PATTERN).expect("invalid cookbook name pattern"));
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENTIFIER_PATTERN).expect("invalid identifier pattern"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VERSION_PATTERN).expect("invalid version pattern"));
static RUN_LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RUN_LIST_ITEM_PATTERN).expect("invalid run list pattern"));

/// Structural validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document exceeds maximum size of {max} bytes")]
    TooLarge { max: usize },

    #[error("invalid JSON: {message}")]
    Syntax { message: String },

    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("field '{field}' does not match pattern {pattern}")]
    Malformed {
        field: String,
        pattern: &'static str,
    },

    #[error("cookbook lock '{cookbook}' is invalid: {source}")]
    CookbookLock {
        cookbook: String,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("field 'name' ('{body}') does not match the policy name in the request path ('{url}')")]
    NameMismatch { url: String, body: String },
}

/// Validate a raw request body as a policy revision document.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the first failing field; a
/// failing cookbook lock rejects the whole document and names the
/// cookbook.
pub fn validate_document(raw: &[u8], max_bytes: usize) -> Result<ValidDocument, ValidationError> {
    if raw.len() > max_bytes {
        return Err(ValidationError::TooLarge { max: max_bytes });
    }
    let document: Value = serde_json::from_slice(raw).map_err(|e| ValidationError::Syntax {
        message: e.to_string(),
    })?;
    let object = document.as_object().ok_or(ValidationError::NotAnObject)?;

    let name = required_string(object, "name")?;
    matches_pattern(&NAME_RE, "name", name, NAME_PATTERN)?;

    let revision_id = required_string(object, "revision_id")?;
    matches_pattern(&NAME_RE, "revision_id", revision_id, NAME_PATTERN)?;

    let run_list = validate_run_list(object)?;
    let cookbook_locks = validate_cookbook_locks(object)?;

    Ok(ValidDocument {
        name: name.to_owned(),
        revision_id: revision_id.to_owned(),
        run_list,
        cookbook_locks,
        raw: document,
    })
}

fn validate_run_list(object: &Map<String, Value>) -> Result<Vec<String>, ValidationError> {
    let value = object
        .get("run_list")
        .ok_or_else(|| missing("run_list"))?
        .as_array()
        .ok_or_else(|| wrong_type("run_list", "an array"))?;

    let mut run_list = Vec::with_capacity(value.len());
    for (i, entry) in value.iter().enumerate() {
        let field = format!("run_list[{i}]");
        let entry = entry
            .as_str()
            .ok_or_else(|| wrong_type(&field, "a string"))?;
        matches_pattern(&RUN_LIST_ITEM_RE, &field, entry, RUN_LIST_ITEM_PATTERN)?;
        run_list.push(entry.to_owned());
    }
    Ok(run_list)
}

fn validate_cookbook_locks(
    object: &Map<String, Value>,
) -> Result<BTreeMap<String, CookbookLock>, ValidationError> {
    let locks = object
        .get("cookbook_locks")
        .ok_or_else(|| missing("cookbook_locks"))?
        .as_object()
        .ok_or_else(|| wrong_type("cookbook_locks", "an object"))?;

    let mut cookbook_locks = BTreeMap::new();
    for (cookbook, lock) in locks {
        matches_pattern(
            &COOKBOOK_NAME_RE,
            &format!("cookbook_locks.{cookbook}"),
            cookbook,
            COOKBOOK_NAME_PATTERN,
        )?;
        let lock = validate_lock(lock).map_err(|e| ValidationError::CookbookLock {
            cookbook: cookbook.clone(),
            source: Box::new(e),
        })?;
        cookbook_locks.insert(cookbook.clone(), lock);
    }
    Ok(cookbook_locks)
}

fn validate_lock(value: &Value) -> Result<CookbookLock, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let identifier = required_string(object, "identifier")?;
    matches_pattern(&IDENTIFIER_RE, "identifier", identifier, IDENTIFIER_PATTERN)?;

    let version = required_string(object, "version")?;
    matches_pattern(&VERSION_RE, "version", version, VERSION_PATTERN)?;

    let dotted_decimal_identifier = match object.get("dotted_decimal_identifier") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let value = value
                .as_str()
                .ok_or_else(|| wrong_type("dotted_decimal_identifier", "a string"))?;
            matches_pattern(
                &VERSION_RE,
                "dotted_decimal_identifier",
                value,
                VERSION_PATTERN,
            )?;
            Some(value.to_owned())
        }
    };

    Ok(CookbookLock {
        identifier: identifier.to_owned(),
        version: version.to_owned(),
        dotted_decimal_identifier,
    })
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, ValidationError> {
    object
        .get(field)
        .ok_or_else(|| missing(field))?
        .as_str()
        .ok_or_else(|| wrong_type(field, "a string"))
}

fn matches_pattern(
    re: &Regex,
    field: &str,
    value: &str,
    pattern: &'static str,
) -> Result<(), ValidationError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::Malformed {
            field: field.to_owned(),
            pattern,
        })
    }
}

fn missing(field: &str) -> ValidationError {
    ValidationError::MissingField {
        field: field.to_owned(),
    }
}

fn wrong_type(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        field: field.to_owned(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const MAX: usize = 1_048_576;

    fn valid_doc() -> Value {
        json!({
            "name": "web",
            "revision_id": "909c26701e291510eacdc6c06d626b9fa5350d25",
            "run_list": ["recipe[web::default]", "role[base]"],
            "cookbook_locks": {
                "web": {
                    "identifier": "f04cc40faf628253fe7d9566d66a1733fb1afbe9",
                    "version": "1.2.0"
                },
                "base": {
                    "identifier": "aaaa40faf628253fe7d9566d66a1733fb1afbe9b",
                    "version": "0.9",
                    "dotted_decimal_identifier": "123.456.789"
                }
            }
        })
    }

    fn validate(doc: &Value) -> Result<ValidDocument, ValidationError> {
        validate_document(&serde_json::to_vec(doc).unwrap(), MAX)
    }

    #[test]
    fn accepts_a_valid_document() {
        let doc = valid_doc();
        let valid = validate(&doc).unwrap();
        assert_eq!(valid.name, "web");
        assert_eq!(valid.revision_id, "909c26701e291510eacdc6c06d626b9fa5350d25");
        assert_eq!(valid.run_list.len(), 2);
        assert_eq!(valid.cookbook_locks.len(), 2);
        assert_eq!(
            valid.cookbook_locks["base"].dotted_decimal_identifier.as_deref(),
            Some("123.456.789")
        );
        assert_eq!(valid.raw, doc);
    }

    #[test]
    fn rejects_oversized_bodies() {
        let body = serde_json::to_vec(&valid_doc()).unwrap();
        let err = validate_document(&body, 16).unwrap_err();
        assert_eq!(err, ValidationError::TooLarge { max: 16 });
    }

    #[test]
    fn rejects_invalid_json() {
        let err = validate_document(b"{not json", MAX).unwrap_err();
        assert!(matches!(err, ValidationError::Syntax { .. }));
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = validate_document(b"[1, 2]", MAX).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject);
    }

    #[test]
    fn rejects_missing_name() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("name");
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "name".to_owned()
            }
        );
    }

    #[test]
    fn rejects_malformed_revision_id() {
        let mut doc = valid_doc();
        doc["revision_id"] = json!("no spaces allowed");
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                field: "revision_id".to_owned(),
                pattern: NAME_PATTERN
            }
        );
    }

    #[test]
    fn rejects_non_array_run_list() {
        let mut doc = valid_doc();
        doc["run_list"] = json!("recipe[web]");
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                field: "run_list".to_owned(),
                expected: "an array"
            }
        );
    }

    #[test]
    fn rejects_bad_run_list_entries() {
        let mut doc = valid_doc();
        doc["run_list"] = json!(["recipe[web::default]", "cookbook[web]"]);
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Malformed {
                field: "run_list[1]".to_owned(),
                pattern: RUN_LIST_ITEM_PATTERN
            }
        );
    }

    #[test]
    fn rejects_malformed_cookbook_names() {
        let mut doc = valid_doc();
        doc["cookbook_locks"]["has space"] = doc["cookbook_locks"]["web"].clone();
        let err = validate(&doc).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { field, .. } if field == "cookbook_locks.has space"));
    }

    #[test]
    fn rejects_lock_missing_identifier() {
        let mut doc = valid_doc();
        doc["cookbook_locks"]["web"]
            .as_object_mut()
            .unwrap()
            .remove("identifier");
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CookbookLock {
                cookbook: "web".to_owned(),
                source: Box::new(ValidationError::MissingField {
                    field: "identifier".to_owned()
                })
            }
        );
    }

    #[test]
    fn rejects_lock_with_bad_version() {
        let mut doc = valid_doc();
        doc["cookbook_locks"]["web"]["version"] = json!("1.2.3.4");
        let err = validate(&doc).unwrap_err();
        assert!(matches!(err, ValidationError::CookbookLock { cookbook, .. } if cookbook == "web"));
    }

    #[test]
    fn rejects_lock_with_bad_dotted_decimal_identifier() {
        let mut doc = valid_doc();
        doc["cookbook_locks"]["base"]["dotted_decimal_identifier"] = json!("not.a.version");
        let err = validate(&doc).unwrap_err();
        assert!(matches!(err, ValidationError::CookbookLock { cookbook, .. } if cookbook == "base"));
    }

    #[test]
    fn one_bad_lock_among_many_rejects_the_document() {
        let mut doc = valid_doc();
        for i in 0..9 {
            doc["cookbook_locks"][format!("cookbook{i}")] = json!({
                "identifier": "f04cc40faf628253fe7d9566d66a1733fb1afbe9",
                "version": "2.0.0"
            });
        }
        doc["cookbook_locks"]["cookbook4"]["identifier"] = json!("not-hex!");
        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CookbookLock {
                cookbook: "cookbook4".to_owned(),
                source: Box::new(ValidationError::Malformed {
                    field: "identifier".to_owned(),
                    pattern: IDENTIFIER_PATTERN
                })
            }
        );
    }

    #[test]
    fn accepts_two_component_versions() {
        let mut doc = valid_doc();
        doc["cookbook_locks"]["web"]["version"] = json!("12.7");
        assert!(validate(&doc).is_ok());
    }
}
