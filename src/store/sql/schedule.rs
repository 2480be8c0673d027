//! Classes and bookings.
//!
//! Booking creation reads the member's existing booking, the class capacity
//! and the current booking count, asks the admission controller, and writes,
//! all inside one transaction that starts by taking the write lock. The insert
//! re-checks capacity in the same statement and the `(member_id, class_id)`
//! unique index rejects duplicates, so concurrent requests cannot overfill a
//! class.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info};

use super::{SqlStore, parse_id, write_error};
use crate::admission::{
    ClassCapacity, Rejection, RejectionReason, evaluate_booking_admission,
};
use crate::models::{Booking, BookingInput, BookingStatus, Class, ClassInput, RecordId};
use crate::store::{EntityStore, Operation, StoreError, StoreResult, failed};
use crate::validation::Validate;

const SELECT_CLASSES: &str = "SELECT class_id, class_name, description, class_type, duration_min, max_participants, employee_id, center_id, schedule_date, start_time, end_time FROM classes";

const SELECT_BOOKINGS: &str =
    "SELECT booking_id, class_id, member_id, booking_date, status FROM bookings";

fn class_from_row(row: &SqliteRow) -> Result<Class, sqlx::Error> {
    Ok(Class {
        id: RecordId::Int(row.try_get("class_id")?),
        details: ClassInput {
            class_name: row.try_get("class_name")?,
            description: row.try_get("description")?,
            class_type: row.try_get("class_type")?,
            duration_min: row.try_get("duration_min")?,
            max_participants: row.try_get("max_participants")?,
            employee_id: row.try_get("employee_id")?,
            center_id: row.try_get("center_id")?,
            schedule_date: row.try_get("schedule_date")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
        },
    })
}

fn booking_from_row(row: &SqliteRow) -> Result<Booking, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<BookingStatus>()
        .map_err(|err| sqlx::Error::Decode(err.into()))?;
    Ok(Booking {
        id: RecordId::Int(row.try_get("booking_id")?),
        details: BookingInput {
            class_id: row.try_get("class_id")?,
            member_id: row.try_get("member_id")?,
            booking_date: row.try_get("booking_date")?,
            status,
        },
    })
}

struct AdmissionState {
    existing: Option<Booking>,
    class: Option<ClassCapacity>,
    booking_count: i64,
}

async fn load_admission_state(
    conn: &mut SqliteConnection,
    input: &BookingInput,
) -> Result<AdmissionState, sqlx::Error> {
    let existing = sqlx::query(&format!(
        "{SELECT_BOOKINGS} WHERE member_id = ? AND class_id = ?"
    ))
    .bind(input.member_id)
    .bind(input.class_id)
    .fetch_optional(&mut *conn)
    .await?
    .map(|row| booking_from_row(&row))
    .transpose()?;

    let class = sqlx::query_scalar::<_, i64>(
        "SELECT max_participants FROM classes WHERE class_id = ?",
    )
    .bind(input.class_id)
    .fetch_optional(&mut *conn)
    .await?
    .map(ClassCapacity::new);

    let booking_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE class_id = ?")
            .bind(input.class_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(AdmissionState {
        existing,
        class,
        booking_count,
    })
}

#[async_trait]
impl EntityStore<Class> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Class>> {
        self.fetch_all(
            &format!("{SELECT_CLASSES} ORDER BY schedule_date, start_time, class_id"),
            class_from_row,
        )
        .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Class> {
        let id = parse_id::<Class>(id)?;
        self.fetch_one(&format!("{SELECT_CLASSES} WHERE class_id = ?"), id, class_from_row)
            .await
    }

    async fn add(&self, input: ClassInput) -> StoreResult<Class> {
        let input = input.validated()?;
        let result = sqlx::query(
            "INSERT INTO classes (class_name, description, class_type, duration_min, max_participants, employee_id, center_id, schedule_date, start_time, end_time) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.class_name)
        .bind(&input.description)
        .bind(&input.class_type)
        .bind(input.duration_min)
        .bind(input.max_participants)
        .bind(input.employee_id)
        .bind(input.center_id)
        .bind(input.schedule_date)
        .bind(input.start_time)
        .bind(input.end_time)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Class>(Operation::Create, "employee"))?;

        Ok(Class {
            id: RecordId::Int(result.last_insert_rowid()),
            details: input,
        })
    }

    async fn update(&self, id: &str, input: ClassInput) -> StoreResult<Class> {
        let id = parse_id::<Class>(id)?;
        let input = input.validated()?;
        let result = sqlx::query(
            "UPDATE classes SET class_name = ?, description = ?, class_type = ?, duration_min = ?, max_participants = ?, employee_id = ?, center_id = ?, schedule_date = ?, start_time = ?, end_time = ? WHERE class_id = ?",
        )
        .bind(&input.class_name)
        .bind(&input.description)
        .bind(&input.class_type)
        .bind(input.duration_min)
        .bind(input.max_participants)
        .bind(input.employee_id)
        .bind(input.center_id)
        .bind(input.schedule_date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Class>(Operation::Update, "employee"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Class"));
        }
        Ok(Class {
            id: RecordId::Int(id),
            details: input,
        })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Class>("DELETE FROM classes WHERE class_id = ?", id)
            .await
    }
}

#[async_trait]
impl EntityStore<Booking> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Booking>> {
        self.fetch_all(&format!("{SELECT_BOOKINGS} ORDER BY booking_id"), booking_from_row)
            .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Booking> {
        let id = parse_id::<Booking>(id)?;
        self.fetch_one(
            &format!("{SELECT_BOOKINGS} WHERE booking_id = ?"),
            id,
            booking_from_row,
        )
        .await
    }

    async fn add(&self, input: BookingInput) -> StoreResult<Booking> {
        let input = input.validated()?;
        let failure = Operation::Create.failure::<Booking>();
        let mut tx = self.pool.begin().await.map_err(failed(failure.clone()))?;

        // A no-op write takes SQLite's write lock up front, so the reads below
        // cannot be invalidated by a concurrent booking before we insert.
        sqlx::query("UPDATE classes SET class_id = class_id WHERE class_id = ?")
            .bind(input.class_id)
            .execute(&mut *tx)
            .await
            .map_err(failed(failure.clone()))?;

        let state = load_admission_state(&mut *tx, &input)
            .await
            .map_err(failed(failure.clone()))?;
        evaluate_booking_admission(
            state.existing.as_ref(),
            state.class.as_ref(),
            state.booking_count,
        )
        .into_result()
        .inspect_err(|rejection| {
            debug!(
                "Booking of class {} by member {} rejected: {rejection}",
                input.class_id, input.member_id
            )
        })?;

        let result = sqlx::query(
            r"
            INSERT INTO bookings (class_id, member_id, booking_date, status)
            SELECT ?, ?, ?, ?
            WHERE (SELECT COUNT(*) FROM bookings WHERE class_id = ?)
                < (SELECT max_participants FROM classes WHERE class_id = ?)
            ",
        )
        .bind(input.class_id)
        .bind(input.member_id)
        .bind(input.booking_date)
        .bind(input.status.as_str())
        .bind(input.class_id)
        .bind(input.class_id)
        .execute(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Rejection::new(RejectionReason::AlreadyBooked).into()
            }
            other => write_error::<Booking>(Operation::Create, "member")(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(Rejection::new(RejectionReason::ClassFull).into());
        }

        tx.commit().await.map_err(failed(failure))?;

        let booking = Booking {
            id: RecordId::Int(result.last_insert_rowid()),
            details: input,
        };
        info!(
            "Member {} booked class {} (booking {})",
            booking.details.member_id, booking.details.class_id, booking.id
        );
        Ok(booking)
    }

    /// Writes the new values as given; admission is not re-evaluated.
    async fn update(&self, id: &str, input: BookingInput) -> StoreResult<Booking> {
        let id = parse_id::<Booking>(id)?;
        let input = input.validated()?;
        let result = sqlx::query(
            "UPDATE bookings SET class_id = ?, member_id = ?, booking_date = ?, status = ? WHERE booking_id = ?",
        )
        .bind(input.class_id)
        .bind(input.member_id)
        .bind(input.booking_date)
        .bind(input.status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Booking>(Operation::Update, "class or member"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Booking"));
        }
        Ok(Booking {
            id: RecordId::Int(id),
            details: input,
        })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Booking>("DELETE FROM bookings WHERE booking_id = ?", id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};

    use super::*;
    use crate::models::{Member, MemberInput, PersonInput};
    use crate::store::sql::memory_store;
    use crate::validation::ValidationError;

    fn yoga(max_participants: i32) -> ClassInput {
        ClassInput {
            class_name: "Morning yoga".into(),
            description: None,
            class_type: Some("yoga".into()),
            duration_min: Some(60),
            max_participants,
            employee_id: None,
            center_id: Some(1),
            schedule_date: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
            start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        }
    }

    async fn enroll(store: &SqlStore, email: &str) -> i64 {
        let input = MemberInput {
            person: PersonInput {
                first_name: "Alex".into(),
                last_name: "Hansen".into(),
                email: email.into(),
                phone: "87654321".into(),
                address: None,
                date_of_birth: NaiveDate::from_ymd_opt(1988, 2, 2).unwrap(),
            },
            membership_id: None,
            join_date: None,
        };
        match EntityStore::<Member>::add(store, input).await.unwrap().record.id {
            RecordId::Int(id) => id,
            RecordId::Object(_) => panic!("relational ids are integers"),
        }
    }

    async fn schedule(store: &SqlStore, max_participants: i32) -> i64 {
        match EntityStore::<Class>::add(store, yoga(max_participants)).await.unwrap().id {
            RecordId::Int(id) => id,
            RecordId::Object(_) => panic!("relational ids are integers"),
        }
    }

    fn booking(class_id: i64, member_id: i64) -> BookingInput {
        BookingInput {
            class_id,
            member_id,
            booking_date: Utc::now(),
            status: BookingStatus::Confirmed,
        }
    }

    fn rejection(result: StoreResult<Booking>) -> Rejection {
        match result {
            Err(StoreError::Rejected(rejection)) => rejection,
            Err(other) => panic!("expected a rejection, got {other}"),
            Ok(_) => panic!("expected a rejection, got a booking"),
        }
    }

    #[tokio::test]
    async fn test_class_schedule_must_be_ordered() {
        let store = memory_store().await;
        let mut input = yoga(10);
        input.end_time = input.start_time;

        let result = EntityStore::<Class>::add(&store, input).await;
        assert_eq!(
            result.err().map(|err| err.to_string()),
            Some("Start time must be before end time".to_string())
        );
    }

    #[tokio::test]
    async fn test_single_seat_class_fills() {
        let store = memory_store().await;
        let class_id = schedule(&store, 1).await;
        let first = enroll(&store, "x@gym.dk").await;
        let second = enroll(&store, "y@gym.dk").await;

        let admitted = EntityStore::<Booking>::add(&store, booking(class_id, first))
            .await
            .unwrap();
        let fetched = EntityStore::<Booking>::get_by_id(&store, &admitted.id.to_string())
            .await
            .unwrap();
        assert_eq!(fetched.details.member_id, first);
        assert_eq!(fetched.details.status, BookingStatus::Confirmed);

        let refused = rejection(EntityStore::<Booking>::add(&store, booking(class_id, second)).await);
        assert_eq!(refused.reasons(), &[RejectionReason::ClassFull]);
        assert_eq!(refused.to_string(), "Class is already full");
    }

    #[tokio::test]
    async fn test_duplicate_booking_is_rejected() {
        let store = memory_store().await;
        let class_id = schedule(&store, 5).await;
        let member = enroll(&store, "dup@gym.dk").await;

        EntityStore::<Booking>::add(&store, booking(class_id, member))
            .await
            .unwrap();
        let refused = rejection(EntityStore::<Booking>::add(&store, booking(class_id, member)).await);
        assert_eq!(refused.reasons(), &[RejectionReason::AlreadyBooked]);

        let all = EntityStore::<Booking>::get_all(&store).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_class_is_rejected() {
        let store = memory_store().await;
        let member = enroll(&store, "ghost@gym.dk").await;

        let refused = rejection(EntityStore::<Booking>::add(&store, booking(404, member)).await);
        assert_eq!(refused.reasons(), &[RejectionReason::ClassNotFound]);
        assert_eq!(refused.to_string(), "Class does not exist");
    }

    #[tokio::test]
    async fn test_capacity_boundary() {
        let store = memory_store().await;
        let class_id = schedule(&store, 5).await;
        let mut members = Vec::new();
        for n in 0..6 {
            members.push(enroll(&store, &format!("m{n}@gym.dk")).await);
        }

        for member in &members[..5] {
            EntityStore::<Booking>::add(&store, booking(class_id, *member))
                .await
                .unwrap();
        }
        let refused =
            rejection(EntityStore::<Booking>::add(&store, booking(class_id, members[5])).await);
        assert!(refused.contains(RejectionReason::ClassFull));
    }

    #[tokio::test]
    async fn test_update_and_delete_skip_admission() {
        let store = memory_store().await;
        let class_id = schedule(&store, 1).await;
        let member = enroll(&store, "upd@gym.dk").await;
        let created = EntityStore::<Booking>::add(&store, booking(class_id, member))
            .await
            .unwrap();
        let id = created.id.to_string();

        let mut change = created.details.clone();
        change.status = BookingStatus::Cancelled;
        let updated = EntityStore::<Booking>::update(&store, &id, change).await.unwrap();
        assert_eq!(updated.details.status, BookingStatus::Cancelled);

        EntityStore::<Booking>::delete(&store, &id).await.unwrap();
        let missing = EntityStore::<Booking>::get_by_id(&store, &id).await;
        assert!(matches!(missing, Err(StoreError::NotFound("Booking"))));
        let missing = EntityStore::<Booking>::update(&store, &id, booking(class_id, member)).await;
        assert!(matches!(missing, Err(StoreError::NotFound("Booking"))));
    }

    // Bookings only reach members held by this store, which is also why
    // they are refused while members are served by the document backend.
    #[tokio::test]
    async fn test_unknown_member_is_rejected() {
        let store = memory_store().await;
        let class_id = schedule(&store, 3).await;

        let result = EntityStore::<Booking>::add(&store, booking(class_id, 999)).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::UnknownReference("member")))
        ));
        assert_eq!(
            result.err().map(|err| err.to_string()),
            Some("Referenced member does not exist".to_string())
        );
        assert!(EntityStore::<Booking>::get_all(&store).await.unwrap().is_empty());
    }
}
