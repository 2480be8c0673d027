use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a stored record: an integer key on the relational backend,
/// a hex object id on the document backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Object(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Object(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PersonInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[schema(value_type = String, format = "date", example = "1990-05-17")]
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Person {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: PersonInput,
}

/// Whether enrolling a member or employee reused an existing person record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PersonOrigin {
    Found,
    Created,
}

impl PersonOrigin {
    pub fn reused(self) -> bool {
        self == PersonOrigin::Found
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Enrollment<E> {
    #[serde(flatten)]
    pub record: E,
    pub person_origin: PersonOrigin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MemberInput {
    #[serde(flatten)]
    pub person: PersonInput,
    #[serde(default)]
    pub membership_id: Option<RecordId>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date", example = "2025-01-06")]
    pub join_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Member {
    pub id: RecordId,
    pub person: Person,
    pub membership_id: Option<RecordId>,
    #[schema(value_type = String, format = "date", example = "2025-01-06")]
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Employment {
    #[schema(value_type = String, format = "date", example = "2024-08-01")]
    pub hire_date: NaiveDate,
    #[serde(default)]
    pub job_title_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    pub salary: f64,
    pub employment_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EmployeeInput {
    #[serde(flatten)]
    pub person: PersonInput,
    #[serde(flatten)]
    pub employment: Employment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Employee {
    pub id: RecordId,
    pub person: Person,
    #[serde(flatten)]
    pub employment: Employment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct MembershipInput {
    pub membership_name: String,
    pub price_per_month: f64,
    #[serde(default)]
    pub access_level: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub max_class_bookings: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Membership {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: MembershipInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ProductInput {
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Product {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: ProductInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassInput {
    pub class_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub class_type: Option<String>,
    #[serde(default)]
    pub duration_min: Option<i32>,
    pub max_participants: i32,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub center_id: Option<i64>,
    #[schema(value_type = String, format = "date", example = "2025-11-24")]
    pub schedule_date: NaiveDate,
    #[schema(value_type = String, example = "06:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "07:00:00")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Class {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: ClassInput,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Pending,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Pending => "PENDING",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "PENDING" => Ok(BookingStatus::Pending),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct BookingInput {
    pub class_id: i64,
    pub member_id: i64,
    #[serde(default = "Utc::now")]
    #[schema(value_type = String, format = "date-time", example = "2025-11-20T18:30:00Z")]
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Booking {
    pub id: RecordId,
    #[serde(flatten)]
    pub details: BookingInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_untagged() {
        let int: RecordId = serde_json::from_str("42").unwrap();
        assert_eq!(int, RecordId::Int(42));
        let object: RecordId = serde_json::from_str(r#""65f1c0ffee""#).unwrap();
        assert_eq!(object, RecordId::Object("65f1c0ffee".into()));
        assert_eq!(serde_json::to_string(&RecordId::Int(7)).unwrap(), "7");
    }

    #[test]
    fn test_booking_input_defaults() {
        let input: BookingInput =
            serde_json::from_str(r#"{"class_id": 1, "member_id": 2}"#).unwrap();
        assert_eq!(input.status, BookingStatus::Confirmed);
        assert_eq!(
            serde_json::to_value(input.status).unwrap(),
            serde_json::json!("CONFIRMED")
        );
    }

    #[test]
    fn test_enrollment_flattens_record() {
        let enrollment = Enrollment {
            record: Product {
                id: RecordId::Int(1),
                details: ProductInput {
                    product_name: "Shaker".into(),
                    description: None,
                    price: 9.5,
                    stock_quantity: 3,
                    category_id: None,
                },
            },
            person_origin: PersonOrigin::Found,
        };
        let value = serde_json::to_value(&enrollment).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["product_name"], "Shaker");
        assert_eq!(value["person_origin"], "found");
    }
}
