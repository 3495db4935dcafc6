use std::collections::HashMap;

/// A loosely-typed CSV row: trimmed header name to trimmed cell value.
pub type Record = HashMap<String, String>;

/// One repair order header.
#[allow(dead_code)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoHeader {
    pub ro_number: String,
    pub ro_date: String,
    pub advisor: Option<String>,
    pub vin: Option<String>,
    pub mileage: Option<String>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One declined service line. `declined_amount` stays free-form until analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclinedLine {
    pub ro_number: String,
    pub line_desc: String,
    pub declined_amount: String,
    pub declined_category: Option<String>,
}

/// A repair order with declined work worth following up on.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub ro_number: String,
    pub ro_date: String,
    pub advisor: Option<String>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub declined_total: f64,
    pub line_count: usize,
    pub top_categories: String,
}

fn required(record: &Record, key: &str) -> String {
    record.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn optional(record: &Record, key: &str) -> Option<String> {
    non_empty(record.get(key).map(String::as_str))
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl From<&Record> for RoHeader {
    fn from(record: &Record) -> Self {
        Self {
            ro_number: required(record, "ro_number"),
            ro_date: required(record, "ro_date"),
            advisor: optional(record, "advisor"),
            vin: optional(record, "vin"),
            mileage: optional(record, "mileage"),
            customer_name: optional(record, "customer_name"),
            phone: optional(record, "phone"),
            email: optional(record, "email"),
        }
    }
}

impl From<&Record> for DeclinedLine {
    fn from(record: &Record) -> Self {
        Self {
            ro_number: required(record, "ro_number"),
            line_desc: required(record, "line_desc"),
            declined_amount: required(record, "declined_amount"),
            declined_category: optional(record, "declined_category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dealer {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub id: i64,
    pub dealer_id: i64,
    pub ro_number: String,
    pub status: String,
    pub notes: Option<String>,
    pub next_follow_up: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub dealer_name: String,
    pub run_dir: String,
    pub row_count: i64,
    pub declined_total: f64,
    pub created_at: String,
}
