//! Immutable records and their scalar field values
//!
//! A [`Record`] is one row of input data: a sale fetched from the products API
//! or a synthetic task assignment. Records are built once at load time and
//! never mutated afterwards; every derived value lives in a new result type.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PipelineError, Result};

/// Field names used by the sales dataset served by the products API.
pub mod sales {
    pub const PRODUCT: &str = "Produto";
    pub const CATEGORY: &str = "Categoria do Produto";
    pub const PRICE: &str = "Preço";
    pub const FREIGHT: &str = "Frete";
    pub const PURCHASE_DATE: &str = "Data da Compra";
    pub const SELLER: &str = "Vendedor";
    pub const LOCATION: &str = "Local da compra";
    pub const RATING: &str = "Avaliação da compra";
    pub const PAYMENT_TYPE: &str = "Tipo de pagamento";
    pub const INSTALLMENTS: &str = "Quantidade de parcelas";
    pub const LAT: &str = "lat";
    pub const LON: &str = "lon";

    /// Date layout used by the API for the purchase date
    pub const PURCHASE_DATE_FORMAT: &str = "%d/%m/%Y";
}

/// Field names of synthetic task-assignment records.
pub mod tasks {
    pub const USER_ID: &str = "user_id";
    pub const ISSUE_KEY: &str = "issue_key";
    pub const TASK: &str = "task";
    pub const HOURS: &str = "hours";
    pub const DELIVERY: &str = "delivery";
}

/// A scalar field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

/// One immutable input row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion, used while materializing a record
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_number)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_text)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).and_then(Value::as_date)
    }

    /// Numeric value of `field`, failing the batch when absent or mistyped
    pub fn require_number(&self, field: &str) -> Result<f64> {
        self.number(field)
            .filter(|n| n.is_finite())
            .ok_or_else(|| PipelineError::malformed(field))
    }

    /// Value of `field` rendered as a grouping key
    pub fn require_key(&self, field: &str) -> Result<String> {
        self.get(field)
            .map(ToString::to_string)
            .ok_or_else(|| PipelineError::malformed(field))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this record restricted to `columns`; unknown names are skipped
    pub fn project(&self, columns: &[String]) -> Record {
        let fields = columns
            .iter()
            .filter_map(|c| self.fields.get(c).map(|v| (c.clone(), v.clone())))
            .collect();
        Record { fields }
    }

    /// Build a record from one flat JSON object.
    ///
    /// Strings become text, numbers become numbers and `null` fields are
    /// dropped. Any field listed in `date_fields` is parsed with its paired
    /// `chrono` format. Nested arrays or objects make the record malformed.
    pub fn from_json_object(
        object: &serde_json::Map<String, serde_json::Value>,
        date_fields: &[(&str, &str)],
    ) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for (name, raw) in object {
            let value = match raw {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => {
                    match date_fields.iter().find(|(field, _)| field == name) {
                        Some((_, format)) => NaiveDate::parse_from_str(s, format)
                            .map(Value::Date)
                            .map_err(|_| PipelineError::malformed(name.as_str()))?,
                        None => Value::Text(s.clone()),
                    }
                }
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .map(Value::Number)
                    .ok_or_else(|| PipelineError::malformed(name.as_str()))?,
                serde_json::Value::Bool(b) => Value::Text(b.to_string()),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(PipelineError::malformed(name.as_str()))
                }
            };
            fields.insert(name.clone(), value);
        }
        Ok(Record { fields })
    }
}

/// Restrict every record to `columns`, the raw-data page's column picker
pub fn select_columns(records: &[Record], columns: &[String]) -> Vec<Record> {
    records.iter().map(|r| r.project(columns)).collect()
}
