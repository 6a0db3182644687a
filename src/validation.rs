use crate::error::{PipelineError, Result};
use crate::records::RawPerson;
use serde_json::Value;
use url::Url;

/// A single field-level rejection, kept structured so the envelope error can
/// report every failing record in one message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    pub record_index: usize,
    pub field: &'static str,
    pub reason: String,
}

impl std::fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}: {}: {}", self.record_index, self.field, self.reason)
    }
}

/// Validates a raw response envelope and produces the typed batch.
///
/// The envelope must carry a `data` array; each entry must deserialize into
/// a [`RawPerson`] and pass the field-level checks. Any failure rejects the
/// whole page; there is no partial acceptance at this stage.
pub fn validate_envelope(payload: &Value) -> Result<Vec<RawPerson>> {
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Envelope("response has no 'data' list".to_string()))?;

    let mut persons = Vec::with_capacity(data.len());
    let mut failures = Vec::new();
    for (index, item) in data.iter().enumerate() {
        match validate_record(index, item) {
            Ok(person) => persons.push(person),
            Err(mut record_failures) => failures.append(&mut record_failures),
        }
    }

    if failures.is_empty() {
        Ok(persons)
    } else {
        let summary = failures
            .iter()
            .map(FieldFailure::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(PipelineError::Validation(summary))
    }
}

fn validate_record(index: usize, item: &Value) -> std::result::Result<RawPerson, Vec<FieldFailure>> {
    let person: RawPerson = match serde_json::from_value(item.clone()) {
        Ok(person) => person,
        Err(e) => {
            return Err(vec![FieldFailure {
                record_index: index,
                field: "record",
                reason: e.to_string(),
            }])
        }
    };

    let mut failures = Vec::new();
    if !is_valid_email(&person.email) {
        failures.push(FieldFailure {
            record_index: index,
            field: "email",
            reason: format!("'{}' is not a valid email address", person.email),
        });
    }
    for (field, value) in [("website", &person.website), ("image", &person.image)] {
        if Url::parse(value).is_err() {
            failures.push(FieldFailure {
                record_index: index,
                field,
                reason: format!("'{}' is not a valid URL", value),
            });
        }
    }
    // Precision is checked against the wire text, not the parsed float
    for field in ["latitude", "longitude"] {
        let text = item
            .get("address")
            .and_then(|a| a.get(field))
            .map(Value::to_string)
            .unwrap_or_default();
        if !decimal_within(&text, 9, 6) {
            failures.push(FieldFailure {
                record_index: index,
                field,
                reason: format!("'{}' exceeds 9 total digits or 6 decimal places", text),
            });
        }
    }

    if failures.is_empty() {
        Ok(person)
    } else {
        Err(failures)
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Accepts a plain decimal literal bounded to `max_digits` total digits and
/// `max_scale` fractional digits.
fn decimal_within(text: &str, max_digits: usize, max_scale: usize) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if int_part.is_empty()
        || !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }
    let int_digits = int_part.trim_start_matches('0').len();
    int_digits + frac_part.len() <= max_digits && frac_part.len() <= max_scale
}
