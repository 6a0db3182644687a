use crate::error::{PipelineError, Result};
use crate::records::{AnonymizedRecord, IngestedRecord};
use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Conversion between typed rows and the Arrow batches the storage layer
/// persists. Each row type declares its own column layout.
pub trait Columnar: Sized {
    fn schema() -> SchemaRef;
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

fn utf8_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Schema(format!("missing column '{}'", name)))?;
    column
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PipelineError::Schema(format!("column '{}' is not utf8", name)))
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Schema(format!("missing column '{}'", name)))?;
    column
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| PipelineError::Schema(format!("column '{}' is not int64", name)))
}

impl Columnar for IngestedRecord {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("firstname", DataType::Utf8, false),
            Field::new("lastname", DataType::Utf8, false),
            Field::new("email", DataType::Utf8, false),
            Field::new("phone", DataType::Utf8, false),
            Field::new("birthday", DataType::Utf8, false),
            Field::new("gender", DataType::Utf8, false),
            Field::new("address", DataType::Utf8, false),
            Field::new("website", DataType::Utf8, false),
            Field::new("image", DataType::Utf8, false),
            Field::new("unique_id", DataType::Utf8, false),
            Field::new("processed_at", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.firstname.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lastname.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.email.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.phone.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.birthday.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.gender.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.address.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.website.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.image.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.unique_id.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.processed_at.as_str()))),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let id = int64_column(batch, "id")?;
        let firstname = utf8_column(batch, "firstname")?;
        let lastname = utf8_column(batch, "lastname")?;
        let email = utf8_column(batch, "email")?;
        let phone = utf8_column(batch, "phone")?;
        let birthday = utf8_column(batch, "birthday")?;
        let gender = utf8_column(batch, "gender")?;
        let address = utf8_column(batch, "address")?;
        let website = utf8_column(batch, "website")?;
        let image = utf8_column(batch, "image")?;
        let unique_id = utf8_column(batch, "unique_id")?;
        let processed_at = utf8_column(batch, "processed_at")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(IngestedRecord {
                id: id.value(i),
                firstname: firstname.value(i).to_string(),
                lastname: lastname.value(i).to_string(),
                email: email.value(i).to_string(),
                phone: phone.value(i).to_string(),
                birthday: birthday.value(i).to_string(),
                gender: gender.value(i).to_string(),
                address: address.value(i).to_string(),
                website: website.value(i).to_string(),
                image: image.value(i).to_string(),
                unique_id: unique_id.value(i).to_string(),
                processed_at: processed_at.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}

impl Columnar for AnonymizedRecord {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("firstname", DataType::Utf8, false),
            Field::new("lastname", DataType::Utf8, false),
            Field::new("phone", DataType::Utf8, false),
            Field::new("gender", DataType::Utf8, false),
            Field::new("website", DataType::Utf8, false),
            Field::new("image", DataType::Utf8, false),
            Field::new("unique_id", DataType::Utf8, false),
            Field::new("processed_at", DataType::Utf8, false),
            Field::new("age_group", DataType::Utf8, true),
            Field::new("email_provider", DataType::Utf8, true),
            Field::new("country", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.firstname.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lastname.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.phone.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.gender.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.website.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.image.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.unique_id.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.processed_at.as_str()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.age_group.as_deref()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.email_provider.as_deref()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.country.as_str()))),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let id = int64_column(batch, "id")?;
        let firstname = utf8_column(batch, "firstname")?;
        let lastname = utf8_column(batch, "lastname")?;
        let phone = utf8_column(batch, "phone")?;
        let gender = utf8_column(batch, "gender")?;
        let website = utf8_column(batch, "website")?;
        let image = utf8_column(batch, "image")?;
        let unique_id = utf8_column(batch, "unique_id")?;
        let processed_at = utf8_column(batch, "processed_at")?;
        let age_group = utf8_column(batch, "age_group")?;
        let email_provider = utf8_column(batch, "email_provider")?;
        let country = utf8_column(batch, "country")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(AnonymizedRecord {
                id: id.value(i),
                firstname: firstname.value(i).to_string(),
                lastname: lastname.value(i).to_string(),
                phone: phone.value(i).to_string(),
                gender: gender.value(i).to_string(),
                website: website.value(i).to_string(),
                image: image.value(i).to_string(),
                unique_id: unique_id.value(i).to_string(),
                processed_at: processed_at.value(i).to_string(),
                age_group: (!age_group.is_null(i)).then(|| age_group.value(i).to_string()),
                email_provider: (!email_provider.is_null(i))
                    .then(|| email_provider.value(i).to_string()),
                country: country.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}
