//! Booking admission control.
//!
//! Decides whether a member may book a class given what the store reports
//! about the member's existing booking, the class record and the number of
//! bookings the class already holds. Everything here is pure; the caller does
//! the I/O.
//!
//! Capacity uses a single inclusive boundary everywhere: a class holding
//! `max_participants` bookings is full. A class with a non-positive capacity
//! can never admit anyone.

use std::fmt;

use thiserror::Error;

use crate::models::Booking;

/// The part of a class record that admission needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCapacity {
    pub max_participants: i64,
}

impl ClassCapacity {
    pub fn new(max_participants: i64) -> Self {
        Self { max_participants }
    }
}

/// Whether a class holding `booking_count` bookings has no seat left.
pub fn capacity_reached(max_participants: i64, booking_count: i64) -> bool {
    booking_count >= max_participants
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("Invalid class data (cannot be null)")]
    MissingClass,
    #[error("Invalid negative capacity or 0")]
    InvalidCapacity,
}

/// Standalone capacity check for a single class.
pub fn is_class_full(
    class: Option<&ClassCapacity>,
    booking_count: i64,
) -> Result<bool, CapacityError> {
    let class = class.ok_or(CapacityError::MissingClass)?;
    if class.max_participants <= 0 {
        return Err(CapacityError::InvalidCapacity);
    }
    Ok(capacity_reached(class.max_participants, booking_count))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectionReason {
    #[error("You have already booked this class")]
    AlreadyBooked,
    #[error("Class does not exist")]
    ClassNotFound,
    #[error("Class is already full")]
    ClassFull,
}

/// Every reason a booking was refused, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reasons: Vec<RejectionReason>,
}

impl Rejection {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reasons: vec![reason],
        }
    }

    pub fn reasons(&self) -> &[RejectionReason] {
        &self.reasons
    }

    pub fn contains(&self, reason: RejectionReason) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn messages(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }

    fn push(&mut self, reason: RejectionReason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for Rejection {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Admitted,
    Rejected(Rejection),
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted)
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            AdmissionOutcome::Admitted => Ok(()),
            AdmissionOutcome::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Collects every applicable rejection reason instead of stopping at the first.
pub fn evaluate_booking_admission(
    existing_booking: Option<&Booking>,
    class: Option<&ClassCapacity>,
    booking_count: i64,
) -> AdmissionOutcome {
    let mut rejection = Rejection {
        reasons: Vec::new(),
    };

    if existing_booking.is_some() {
        rejection.push(RejectionReason::AlreadyBooked);
    }

    match is_class_full(class, booking_count) {
        Ok(false) => {}
        Ok(true) | Err(CapacityError::InvalidCapacity) => {
            rejection.push(RejectionReason::ClassFull)
        }
        Err(CapacityError::MissingClass) => rejection.push(RejectionReason::ClassNotFound),
    }

    if rejection.reasons.is_empty() {
        AdmissionOutcome::Admitted
    } else {
        AdmissionOutcome::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{BookingInput, BookingStatus, RecordId};

    fn booking(member_id: i64, class_id: i64) -> Booking {
        Booking {
            id: RecordId::Int(1),
            details: BookingInput {
                class_id,
                member_id,
                booking_date: Utc::now(),
                status: BookingStatus::Confirmed,
            },
        }
    }

    fn rejected(outcome: AdmissionOutcome) -> Rejection {
        match outcome {
            AdmissionOutcome::Rejected(rejection) => rejection,
            AdmissionOutcome::Admitted => panic!("expected a rejection"),
        }
    }

    #[test]
    fn test_admits_when_seats_remain() {
        let class = ClassCapacity::new(5);
        assert!(evaluate_booking_admission(None, Some(&class), 0).is_admitted());
        assert!(evaluate_booking_admission(None, Some(&class), 4).is_admitted());
    }

    // A standalone `is_class_full` with a strict `>` boundary would still let a
    // sixth member into a class holding 5/5. Every check here shares
    // `capacity_reached`, so five bookings fill a five-seat class.
    #[test]
    fn test_capacity_boundary_is_inclusive() {
        let class = ClassCapacity::new(5);

        let at_capacity = rejected(evaluate_booking_admission(None, Some(&class), 5));
        assert_eq!(at_capacity.reasons(), &[RejectionReason::ClassFull]);

        let over_capacity = rejected(evaluate_booking_admission(None, Some(&class), 6));
        assert_eq!(over_capacity.reasons(), &[RejectionReason::ClassFull]);

        assert_eq!(is_class_full(Some(&class), 4), Ok(false));
        assert_eq!(is_class_full(Some(&class), 5), Ok(true));
    }

    #[test]
    fn test_existing_booking_is_rejected() {
        let class = ClassCapacity::new(10);
        let existing = booking(1, 1);
        let rejection = rejected(evaluate_booking_admission(Some(&existing), Some(&class), 1));
        assert!(rejection.contains(RejectionReason::AlreadyBooked));
        assert_eq!(rejection.to_string(), "You have already booked this class");
    }

    #[test]
    fn test_missing_class_is_never_admitted() {
        for count in [0, 1, 100] {
            let rejection = rejected(evaluate_booking_admission(None, None, count));
            assert_eq!(rejection.reasons(), &[RejectionReason::ClassNotFound]);
        }
    }

    #[test]
    fn test_collects_all_reasons() {
        let existing = booking(1, 1);
        let rejection = rejected(evaluate_booking_admission(Some(&existing), None, 3));
        assert_eq!(
            rejection.reasons(),
            &[RejectionReason::AlreadyBooked, RejectionReason::ClassNotFound]
        );
        assert_eq!(
            rejection.to_string(),
            "You have already booked this class, Class does not exist"
        );

        let class = ClassCapacity::new(2);
        let rejection = rejected(evaluate_booking_admission(Some(&existing), Some(&class), 2));
        assert_eq!(
            rejection.messages(),
            vec![
                "You have already booked this class".to_string(),
                "Class is already full".to_string()
            ]
        );
    }

    #[test]
    fn test_non_positive_capacity_never_admits() {
        let class = ClassCapacity::new(0);
        let rejection = rejected(evaluate_booking_admission(None, Some(&class), 0));
        assert_eq!(rejection.reasons(), &[RejectionReason::ClassFull]);
    }

    #[test]
    fn test_single_seat_class_fills_after_first_booking() {
        let class = ClassCapacity::new(1);
        assert!(evaluate_booking_admission(None, Some(&class), 0).is_admitted());

        let rejection = rejected(evaluate_booking_admission(None, Some(&class), 1));
        assert_eq!(rejection.to_string(), "Class is already full");
    }

    #[test]
    fn test_is_class_full() {
        let class = ClassCapacity::new(5);
        assert_eq!(is_class_full(Some(&class), 4), Ok(false));
        assert_eq!(is_class_full(Some(&class), 5), Ok(true));
        assert_eq!(is_class_full(Some(&class), 6), Ok(true));
        assert_eq!(is_class_full(Some(&class), -1), Ok(false));
        assert_eq!(
            is_class_full(Some(&ClassCapacity::new(999_999_999)), 1),
            Ok(false)
        );
        assert_eq!(
            is_class_full(Some(&ClassCapacity::new(0)), 0),
            Err(CapacityError::InvalidCapacity)
        );
        assert_eq!(
            is_class_full(Some(&ClassCapacity::new(-1)), 0),
            Err(CapacityError::InvalidCapacity)
        );
        assert_eq!(is_class_full(None, 5), Err(CapacityError::MissingClass));
        assert_eq!(
            CapacityError::MissingClass.to_string(),
            "Invalid class data (cannot be null)"
        );
    }
}
