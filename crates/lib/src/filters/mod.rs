//! Parameter filters enforcing field-set boundaries
//!
//! Free-form records move through this system in three roles: credentials,
//! user-profile data, and session data. These roles must never bleed into
//! each other — a password must not reach the user or session stores, and a
//! generic update must not alter identity fields. The four filters below are
//! the single enforcement point for that boundary: every desk method that
//! accepts a free-form record routes it through exactly one of them before
//! forwarding anything to a backend.
//!
//! A filter either returns the accepted sub-record in full or fails with a
//! [`FilterError`]; there is no partial result.

use std::collections::HashMap;

use serde_json::Value;

pub mod errors;

pub use errors::FilterError;

/// Free-form field/value record, as accepted from applications and stored by
/// the user and session backends.
pub type Record = HashMap<String, Value>;

/// A named field-set filter: required fields, an accept-the-rest policy, and
/// excluded fields.
#[derive(Debug, Clone, Copy)]
pub struct FieldFilter {
    name: &'static str,
    required: &'static [&'static str],
    excluded: &'static [&'static str],
    accept_rest: bool,
}

/// Credential filter: exactly `user_id` and `password`, both required.
pub const CREDENTIAL: FieldFilter = FieldFilter {
    name: "credential",
    required: &["user_id", "password"],
    excluded: &[],
    accept_rest: false,
};

/// Profile filter: requires `user_id` and `moniker`, accepts everything else
/// except credential fields.
pub const PROFILE: FieldFilter = FieldFilter {
    name: "profile",
    required: &["user_id", "moniker"],
    excluded: &["password", "confirm_password"],
    accept_rest: true,
};

/// Session-seed filter: requires `user_id`, accepts everything else except
/// credential fields.
pub const SESSION_SEED: FieldFilter = FieldFilter {
    name: "session-seed",
    required: &["user_id"],
    excluded: &["password", "confirm_password"],
    accept_rest: true,
};

/// Profile-update filter: no required fields; identity and credential fields
/// are stripped so they cannot be altered through a generic update call.
pub const PROFILE_UPDATE: FieldFilter = FieldFilter {
    name: "profile-update",
    required: &[],
    excluded: &["user_id", "password", "confirm_password"],
    accept_rest: true,
};

impl FieldFilter {
    /// The filter's name, as used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply the filter to an input record.
    ///
    /// Returns the sub-record containing exactly the accepted and required
    /// fields present in the input, minus excluded fields, if and only if
    /// every required field is present and non-empty.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if a required field is absent, null, or an
    /// empty string. No partial result is produced.
    pub fn apply(&self, input: &Record) -> crate::Result<Record> {
        for field in self.required {
            match input.get(*field) {
                None => {
                    return Err(FilterError::MissingField {
                        filter: self.name,
                        field,
                    }
                    .into());
                }
                Some(value) if is_empty_value(value) => {
                    return Err(FilterError::EmptyField {
                        filter: self.name,
                        field,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }

        let accepted = input
            .iter()
            .filter(|(name, _)| {
                if self.excluded.contains(&name.as_str()) {
                    return false;
                }
                self.accept_rest || self.required.contains(&name.as_str())
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(accepted)
    }
}

/// Extract a required string field from an already-filtered record.
///
/// Filters guarantee presence and non-emptiness of required fields; this
/// additionally rejects non-string values so identifiers and passwords have a
/// single canonical form on the way to the backends.
pub fn required_str<'a>(
    record: &'a Record,
    filter: &FieldFilter,
    field: &'static str,
) -> crate::Result<&'a str> {
    match record.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) | Some(Value::Null) => Err(FilterError::EmptyField {
            filter: filter.name,
            field,
        }
        .into()),
        Some(_) => Err(FilterError::NotAString {
            filter: filter.name,
            field,
        }
        .into()),
        None => Err(FilterError::MissingField {
            filter: filter.name,
            field,
        }
        .into()),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
