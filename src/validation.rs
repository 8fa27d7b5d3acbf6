//! Structural request validation. Violations are collected into a single
//! [`ServiceError::ValidationFailed`] rather than failing on the first.

use uuid::Uuid;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::errors::ServiceError;

/// Runs derive-based validation and flattens every violation into one error.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ServiceError> {
    match request.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let mut messages = Vec::new();
            collect_messages(&errors, "", &mut messages);
            messages.sort();
            Err(ServiceError::ValidationFailed(messages))
        }
    }
}

/// Every mutating operation requires a caller-supplied actor. A nil id is
/// rejected rather than replaced with a fabricated identity.
pub fn require_actor(actor_id: Uuid) -> Result<(), ServiceError> {
    if actor_id.is_nil() {
        return Err(ServiceError::ValidationFailed(vec![
            "actor_id is required".to_string(),
        ]));
    }
    Ok(())
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(nested, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
