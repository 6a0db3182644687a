use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Nested address object as returned by the remote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub street: String,
    #[serde(rename = "streetName")]
    pub street_name: String,
    #[serde(rename = "buildingNumber")]
    pub building_number: String,
    pub city: String,
    pub zipcode: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One person record as fetched from the remote source, validated once and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPerson {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub birthday: String,
    pub gender: String,
    pub address: Address,
    pub website: String,
    pub image: String,
}

/// A raw person plus the two fields stamped at ingestion time. This is the
/// row shape of the raw batch files; the `address` column carries the nested
/// object in its JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub birthday: String,
    pub gender: String,
    pub address: String,
    pub website: String,
    pub image: String,
    pub unique_id: String,
    pub processed_at: String,
}

impl IngestedRecord {
    /// Stamps `unique_id` and `processed_at` onto a validated person.
    ///
    /// The dedup key hashes every field except the source `id`, in wire
    /// column order, so identical content under different source ids maps
    /// to the same key. `processed_at` is stamped after hashing and never
    /// contributes.
    pub fn from_person(person: &RawPerson, processed_at: &str) -> Result<Self> {
        let address = serde_json::to_string(&person.address)?;
        let unique_id = content_hash(&[
            &person.firstname,
            &person.lastname,
            &person.email,
            &person.phone,
            &person.birthday,
            &person.gender,
            &address,
            &person.website,
            &person.image,
        ]);
        Ok(Self {
            id: person.id,
            firstname: person.firstname.clone(),
            lastname: person.lastname.clone(),
            email: person.email.clone(),
            phone: person.phone.clone(),
            birthday: person.birthday.clone(),
            gender: person.gender.clone(),
            address,
            website: person.website.clone(),
            image: person.image.clone(),
            unique_id,
            processed_at: processed_at.to_string(),
        })
    }
}

/// MD5 over the concatenated string forms of the given fields.
pub fn content_hash(fields: &[&str]) -> String {
    let joined = fields.concat();
    format!("{:x}", md5::compute(joined.as_bytes()))
}

/// Anonymized row shape produced by the transformer. Only `id` and
/// `unique_id` survive unmasked; `age_group`, `email_provider` and
/// `country` are derived; everything else is the mask sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymizedRecord {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub gender: String,
    pub website: String,
    pub image: String,
    pub unique_id: String,
    pub processed_at: String,
    pub age_group: Option<String>,
    pub email_provider: Option<String>,
    pub country: String,
}

#[cfg(test)]
pub(crate) fn sample_person(id: i64) -> RawPerson {
    RawPerson {
        id,
        firstname: "Lucile".to_string(),
        lastname: "Beer".to_string(),
        email: "lucile.beer@example.com".to_string(),
        phone: "+12036749662".to_string(),
        birthday: "1989-08-05".to_string(),
        gender: "female".to_string(),
        address: Address {
            id: 1,
            street: "24489 Jordon Vista Suite 117".to_string(),
            street_name: "Terry Tunnel".to_string(),
            building_number: "9630".to_string(),
            city: "Zemlakfort".to_string(),
            zipcode: "58755".to_string(),
            country: "Bolivia".to_string(),
            country_code: "BO".to_string(),
            latitude: -30.408098,
            longitude: -83.648103,
        },
        website: "http://example.com/".to_string(),
        image: "http://example.com/image.png".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_matches_manual_md5() {
        let person = sample_person(1);
        let record = IngestedRecord::from_person(&person, "2024-01-01T00:00:00+00:00").unwrap();

        let address_json = serde_json::to_string(&person.address).unwrap();
        let joined = format!(
            "{}{}{}{}{}{}{}{}{}",
            person.firstname,
            person.lastname,
            person.email,
            person.phone,
            person.birthday,
            person.gender,
            address_json,
            person.website,
            person.image,
        );
        assert_eq!(record.unique_id, format!("{:x}", md5::compute(joined)));
    }

    #[test]
    fn unique_id_ignores_source_identifier() {
        let a = IngestedRecord::from_person(&sample_person(1), "t").unwrap();
        let b = IngestedRecord::from_person(&sample_person(999), "t").unwrap();
        assert_eq!(a.unique_id, b.unique_id);
    }

    #[test]
    fn unique_id_changes_with_any_content_field() {
        let person = sample_person(1);
        let mut other = sample_person(1);
        other.phone = "+10000000000".to_string();
        let a = IngestedRecord::from_person(&person, "t").unwrap();
        let b = IngestedRecord::from_person(&other, "t").unwrap();
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[test]
    fn unique_id_does_not_depend_on_processed_at() {
        let a = IngestedRecord::from_person(&sample_person(1), "2024-01-01T00:00:00+00:00").unwrap();
        let b = IngestedRecord::from_person(&sample_person(1), "2025-06-01T12:30:00+00:00").unwrap();
        assert_eq!(a.unique_id, b.unique_id);
    }
}
