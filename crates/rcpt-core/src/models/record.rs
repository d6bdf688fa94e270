//! Extraction schema and the flat table row built from it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Receipt data as returned by the extraction model.
///
/// Every field defaults to an empty string. Numbers and booleans are kept
/// in their text form, `null` becomes empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedReceipt {
    /// Transaction or invoice identifier.
    #[serde(deserialize_with = "lenient_string")]
    pub transaction_id: String,

    /// Identifier sent under `invoice_id`; folded into `transaction_id`
    /// by [`parse_response`] when that one is empty.
    #[serde(skip_serializing, deserialize_with = "lenient_string")]
    pub invoice_id: String,

    /// Payment method (e.g. Pix).
    #[serde(deserialize_with = "lenient_string")]
    pub payment_method: String,

    /// Issue date, DD/MM/YYYY as printed.
    #[serde(deserialize_with = "lenient_string")]
    pub invoice_date: String,

    /// Issue time, HH:MM:SS as printed.
    #[serde(deserialize_with = "lenient_string")]
    pub invoice_time: String,

    /// Amount as printed, locale formatting preserved.
    #[serde(deserialize_with = "lenient_string")]
    pub amount: String,

    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,

    /// Paying party.
    pub sender: Option<SenderInfo>,

    /// Receiving party.
    pub recipient: Option<RecipientInfo>,

    #[serde(deserialize_with = "lenient_string")]
    pub additional_data: String,

    /// Visual classification: replay, screenshot, live or others.
    #[serde(deserialize_with = "lenient_string")]
    pub image_type: String,
}

/// Sender block of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,

    /// CNPJ or CPF of the sender.
    #[serde(rename = "cnpj/cpf", alias = "cnpj_cpf", deserialize_with = "lenient_string")]
    pub cnpj_cpf: String,

    /// Institution that sent the payment.
    #[serde(deserialize_with = "lenient_string")]
    pub institution: String,

    #[serde(deserialize_with = "lenient_string")]
    pub institution_cnpj: String,
}

/// Recipient block of a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,

    /// CNPJ or CPF of the recipient.
    #[serde(rename = "cnpj/cpf", alias = "cnpj_cpf", deserialize_with = "lenient_string")]
    pub cnpj_cpf: String,

    #[serde(deserialize_with = "lenient_string")]
    pub institution: String,

    /// Pix key the payment was sent to.
    #[serde(deserialize_with = "lenient_string")]
    pub pix_key: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Parse normalized model output into the receipt schema.
pub fn parse_response(text: &str) -> Result<ExtractedReceipt, serde_json::Error> {
    let mut receipt: ExtractedReceipt = serde_json::from_str(text)?;
    if receipt.transaction_id.is_empty() {
        receipt.transaction_id = std::mem::take(&mut receipt.invoice_id);
    }
    Ok(receipt)
}

/// Column names of a [`FlatRecord`], in table order.
pub const FLAT_FIELDS: [&str; 17] = [
    "transaction_id",
    "payment_method",
    "invoice_date",
    "invoice_time",
    "amount",
    "currency",
    "additional_data",
    "image_type",
    "sender_name",
    "sender_cnpj_cpf",
    "sender_institution",
    "sender_institution_cnpj",
    "recipient_name",
    "recipient_cnpj_cpf",
    "recipient_institution",
    "recipient_pix_key",
    "filename",
];

/// Single-level receipt row with a fixed column set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub transaction_id: String,
    pub payment_method: String,
    pub invoice_date: String,
    pub invoice_time: String,
    pub amount: String,
    pub currency: String,
    pub additional_data: String,
    pub image_type: String,
    pub sender_name: String,
    pub sender_cnpj_cpf: String,
    pub sender_institution: String,
    pub sender_institution_cnpj: String,
    pub recipient_name: String,
    pub recipient_cnpj_cpf: String,
    pub recipient_institution: String,
    pub recipient_pix_key: String,
    pub filename: String,
}

impl FlatRecord {
    /// Flatten a receipt, treating a missing party as one with no fields.
    pub fn from_receipt(receipt: &ExtractedReceipt, filename: &str) -> Self {
        let sender = receipt.sender.clone().unwrap_or_default();
        let recipient = receipt.recipient.clone().unwrap_or_default();

        Self {
            transaction_id: receipt.transaction_id.clone(),
            payment_method: receipt.payment_method.clone(),
            invoice_date: receipt.invoice_date.clone(),
            invoice_time: receipt.invoice_time.clone(),
            amount: receipt.amount.clone(),
            currency: receipt.currency.clone(),
            additional_data: receipt.additional_data.clone(),
            image_type: receipt.image_type.clone(),
            sender_name: sender.name,
            sender_cnpj_cpf: sender.cnpj_cpf,
            sender_institution: sender.institution,
            sender_institution_cnpj: sender.institution_cnpj,
            recipient_name: recipient.name,
            recipient_cnpj_cpf: recipient.cnpj_cpf,
            recipient_institution: recipient.institution,
            recipient_pix_key: recipient.pix_key,
            filename: filename.to_string(),
        }
    }

    /// All `(column, value)` pairs in [`FLAT_FIELDS`] order.
    pub fn fields(&self) -> [(&'static str, &str); 17] {
        [
            (FLAT_FIELDS[0], self.transaction_id.as_str()),
            (FLAT_FIELDS[1], self.payment_method.as_str()),
            (FLAT_FIELDS[2], self.invoice_date.as_str()),
            (FLAT_FIELDS[3], self.invoice_time.as_str()),
            (FLAT_FIELDS[4], self.amount.as_str()),
            (FLAT_FIELDS[5], self.currency.as_str()),
            (FLAT_FIELDS[6], self.additional_data.as_str()),
            (FLAT_FIELDS[7], self.image_type.as_str()),
            (FLAT_FIELDS[8], self.sender_name.as_str()),
            (FLAT_FIELDS[9], self.sender_cnpj_cpf.as_str()),
            (FLAT_FIELDS[10], self.sender_institution.as_str()),
            (FLAT_FIELDS[11], self.sender_institution_cnpj.as_str()),
            (FLAT_FIELDS[12], self.recipient_name.as_str()),
            (FLAT_FIELDS[13], self.recipient_cnpj_cpf.as_str()),
            (FLAT_FIELDS[14], self.recipient_institution.as_str()),
            (FLAT_FIELDS[15], self.recipient_pix_key.as_str()),
            (FLAT_FIELDS[16], self.filename.as_str()),
        ]
    }
}

/// Error message used when the extraction call itself failed.
pub const PROCESSING_FAILED: &str = "Processing failed";

/// One row of batch output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultRow {
    /// Successfully extracted and flattened receipt.
    Record(FlatRecord),
    /// File that could not be extracted or parsed.
    Error { filename: String, error: String },
}

impl ResultRow {
    /// Build an error row.
    pub fn error(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            filename: filename.into(),
            error: error.into(),
        }
    }

    /// File the row belongs to.
    pub fn filename(&self) -> &str {
        match self {
            Self::Record(record) => &record.filename,
            Self::Error { filename, .. } => filename,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// `(column, value)` pairs in column order.
    pub fn cells(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Record(record) => record.fields().to_vec(),
            Self::Error { filename, error } => {
                vec![("filename", filename.as_str()), ("error", error.as_str())]
            }
        }
    }
}
