use crate::constants::MASK_SENTINEL;
use crate::records::{AnonymizedRecord, IngestedRecord};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Anonymizes one batch of ingested rows. Pure, row-independent and
/// order-preserving: a malformed row degrades its derived fields to
/// null/sentinel instead of failing the batch.
pub fn anonymize_batch(rows: &[IngestedRecord], current_year: i32) -> Vec<AnonymizedRecord> {
    rows.iter()
        .map(|row| anonymize_record(row, current_year))
        .collect()
}

fn anonymize_record(row: &IngestedRecord, current_year: i32) -> AnonymizedRecord {
    AnonymizedRecord {
        id: row.id,
        firstname: MASK_SENTINEL.to_string(),
        lastname: MASK_SENTINEL.to_string(),
        phone: MASK_SENTINEL.to_string(),
        gender: MASK_SENTINEL.to_string(),
        website: MASK_SENTINEL.to_string(),
        image: MASK_SENTINEL.to_string(),
        unique_id: row.unique_id.clone(),
        processed_at: MASK_SENTINEL.to_string(),
        age_group: age_group(&row.birthday, current_year),
        email_provider: email_provider(&row.email),
        country: country_of(&row.address),
    }
}

/// Decade bucket from year-only subtraction. Month and day are ignored, so
/// people whose birthday has not yet occurred this year land one year high.
pub fn age_group(birthday: &str, current_year: i32) -> Option<String> {
    let date = NaiveDate::parse_from_str(birthday.trim(), "%Y-%m-%d").ok()?;
    let age = current_year - date.year();
    let bucket = age.div_euclid(10) * 10;
    Some(format!("{}-{}", bucket, bucket + 9))
}

/// Domain portion of the email; values without `@` have no provider.
pub fn email_provider(email: &str) -> Option<String> {
    email.split('@').nth(1).map(str::to_string)
}

/// `country` member of the address object; anything that is not a JSON
/// object (masked values included) yields the mask sentinel.
pub fn country_of(address: &str) -> String {
    match serde_json::from_str::<Value>(address) {
        Ok(Value::Object(map)) => map
            .get("country")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| MASK_SENTINEL.to_string()),
        _ => MASK_SENTINEL.to_string(),
    }
}
