use chrono::{Local, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{
    BookingInput, ClassInput, EmployeeInput, MemberInput, MembershipInput, PersonInput,
    ProductInput,
};

pub const MAX_PRICE_PER_MONTH: f64 = 10_000.0;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex compiles"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").expect("regex compiles"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}+(?:[ '-]\p{L}+)*$").expect("regex compiles"));
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}\s,.'/-]*$").expect("regex compiles"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Phone number must be exactly 8 digits")]
    InvalidPhone,
    #[error("Invalid {0}")]
    InvalidName(&'static str),
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Date of birth cannot be in the future")]
    FutureBirthDate,
    #[error("Invalid PricePerMonth provided.")]
    InvalidPricePerMonth,
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error("Start time must be before end time")]
    InvalidSchedule,
    #[error("Invalid negative capacity or 0")]
    InvalidCapacity,
    #[error("Referenced {0} does not exist")]
    UnknownReference(&'static str),
}

/// Checks an input and hands back its normalized form.
pub trait Validate: Sized {
    fn validated(self) -> Result<Self, ValidationError>;
}

pub fn validate_email(value: &str) -> Result<String, ValidationError> {
    let email = value.trim().to_lowercase();
    if EMAIL_RE.is_match(&email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(field))
    }
}

pub fn validate_address(value: &str) -> Result<(), ValidationError> {
    if ADDRESS_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress)
    }
}

pub fn validate_birth_date(value: NaiveDate) -> Result<(), ValidationError> {
    if value > Local::now().date_naive() {
        Err(ValidationError::FutureBirthDate)
    } else {
        Ok(())
    }
}

/// Accepts prices in `(0, 10000]` and rounds them to whole cents.
pub fn validate_price_per_month(value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value <= 0.0 || value > MAX_PRICE_PER_MONTH {
        return Err(ValidationError::InvalidPricePerMonth);
    }
    Ok((value * 100.0).round() / 100.0)
}

pub fn validate_schedule(start: NaiveTime, end: NaiveTime) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(ValidationError::InvalidSchedule)
    }
}

pub fn validate_capacity(max_participants: i32) -> Result<(), ValidationError> {
    if max_participants > 0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidCapacity)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative(field))
    }
}

impl Validate for PersonInput {
    fn validated(mut self) -> Result<Self, ValidationError> {
        validate_name("first name", &self.first_name)?;
        validate_name("last name", &self.last_name)?;
        self.email = validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        if let Some(address) = &self.address {
            validate_address(address)?;
        }
        validate_birth_date(self.date_of_birth)?;
        Ok(self)
    }
}

impl Validate for MemberInput {
    fn validated(mut self) -> Result<Self, ValidationError> {
        self.person = self.person.validated()?;
        Ok(self)
    }
}

impl Validate for EmployeeInput {
    fn validated(mut self) -> Result<Self, ValidationError> {
        self.person = self.person.validated()?;
        non_negative("Salary", self.employment.salary)?;
        require("Employment status", &self.employment.employment_status)?;
        Ok(self)
    }
}

impl Validate for MembershipInput {
    fn validated(mut self) -> Result<Self, ValidationError> {
        require("Membership name", &self.membership_name)?;
        self.price_per_month = validate_price_per_month(self.price_per_month)?;
        if let Some(max) = self.max_class_bookings {
            non_negative("Max class bookings", f64::from(max))?;
        }
        Ok(self)
    }
}

impl Validate for ProductInput {
    fn validated(self) -> Result<Self, ValidationError> {
        require("Product name", &self.product_name)?;
        non_negative("Price", self.price)?;
        non_negative("Stock quantity", f64::from(self.stock_quantity))?;
        Ok(self)
    }
}

impl Validate for ClassInput {
    fn validated(self) -> Result<Self, ValidationError> {
        require("Class name", &self.class_name)?;
        validate_schedule(self.start_time, self.end_time)?;
        validate_capacity(self.max_participants)?;
        Ok(self)
    }
}

impl Validate for BookingInput {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(self)
    }
}
