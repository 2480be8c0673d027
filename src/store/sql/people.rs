//! Members and employees.
//!
//! Both are enrolled in two steps inside one transaction: the person is found
//! by email or created, then the dependent record is inserted. The enrollment
//! reports which branch was taken.

use async_trait::async_trait;
use chrono::Local;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{SqlStore, parse_id, reference_key, write_error};
use crate::models::{
    Employee, EmployeeInput, Employment, Enrollment, Member, MemberInput, Membership, Person,
    PersonInput, PersonOrigin, RecordId,
};
use crate::store::{EntityStore, Operation, StoreError, StoreResult, failed};
use crate::validation::Validate;

const PERSON_COLUMNS: &str =
    "p.person_id, p.first_name, p.last_name, p.email, p.phone, p.address, p.date_of_birth";

fn person_from_row(row: &SqliteRow) -> Result<Person, sqlx::Error> {
    Ok(Person {
        id: RecordId::Int(row.try_get("person_id")?),
        details: PersonInput {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            date_of_birth: row.try_get("date_of_birth")?,
        },
    })
}

fn member_from_row(row: &SqliteRow) -> Result<Member, sqlx::Error> {
    let membership_id: Option<i64> = row.try_get("membership_id")?;
    Ok(Member {
        id: RecordId::Int(row.try_get("member_id")?),
        person: person_from_row(row)?,
        membership_id: membership_id.map(RecordId::Int),
        join_date: row.try_get("join_date")?,
    })
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee, sqlx::Error> {
    Ok(Employee {
        id: RecordId::Int(row.try_get("employee_id")?),
        person: person_from_row(row)?,
        employment: Employment {
            hire_date: row.try_get("hire_date")?,
            job_title_id: row.try_get("job_title_id")?,
            department_id: row.try_get("department_id")?,
            salary: row.try_get("salary")?,
            employment_status: row.try_get("employment_status")?,
        },
    })
}

fn select_members() -> String {
    format!(
        "SELECT m.member_id, m.membership_id, m.join_date, {PERSON_COLUMNS} FROM members m JOIN persons p ON p.person_id = m.person_id"
    )
}

fn select_employees() -> String {
    format!(
        "SELECT e.employee_id, e.hire_date, e.job_title_id, e.department_id, e.salary, e.employment_status, {PERSON_COLUMNS} FROM employees e JOIN persons p ON p.person_id = e.person_id"
    )
}

pub(crate) struct ResolvedPerson {
    pub key: i64,
    pub person: Person,
    pub origin: PersonOrigin,
}

/// Looks a person up by email and inserts one when none exists.
///
/// A found person is returned as stored; the other fields of `input` are not
/// applied to it.
pub(crate) async fn find_or_create_person(
    conn: &mut SqliteConnection,
    input: &PersonInput,
) -> Result<ResolvedPerson, sqlx::Error> {
    let existing = sqlx::query(&format!(
        "SELECT {PERSON_COLUMNS} FROM persons p WHERE p.email = ?"
    ))
    .bind(&input.email)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = existing {
        let key: i64 = row.try_get("person_id")?;
        debug!("Reusing person {key} for {}", input.email);
        return Ok(ResolvedPerson {
            key,
            person: person_from_row(&row)?,
            origin: PersonOrigin::Found,
        });
    }

    let result = sqlx::query(
        "INSERT INTO persons (first_name, last_name, email, phone, address, date_of_birth) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(input.date_of_birth)
    .execute(&mut *conn)
    .await?;

    let key = result.last_insert_rowid();
    Ok(ResolvedPerson {
        key,
        person: Person {
            id: RecordId::Int(key),
            details: input.clone(),
        },
        origin: PersonOrigin::Created,
    })
}

#[async_trait]
impl EntityStore<Member> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Member>> {
        self.fetch_all(&format!("{} ORDER BY m.member_id", select_members()), member_from_row)
            .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Member> {
        let id = parse_id::<Member>(id)?;
        self.fetch_one(
            &format!("{} WHERE m.member_id = ?", select_members()),
            id,
            member_from_row,
        )
        .await
    }

    async fn add(&self, input: MemberInput) -> StoreResult<Enrollment<Member>> {
        let input = input.validated()?;
        let membership_id = input
            .membership_id
            .as_ref()
            .map(reference_key::<Membership>)
            .transpose()?;
        let join_date = input
            .join_date
            .unwrap_or_else(|| Local::now().date_naive());
        let failure = Operation::Create.failure::<Member>();

        let mut tx = self.pool.begin().await.map_err(failed(failure.clone()))?;
        let resolved = find_or_create_person(&mut *tx, &input.person)
            .await
            .map_err(write_error::<Member>(Operation::Create, "person"))?;

        let result = sqlx::query(
            "INSERT INTO members (person_id, membership_id, join_date) VALUES (?, ?, ?)",
        )
        .bind(resolved.key)
        .bind(membership_id)
        .bind(join_date)
        .execute(&mut *tx)
        .await
        .map_err(write_error::<Member>(Operation::Create, "membership"))?;

        tx.commit().await.map_err(failed(failure))?;

        Ok(Enrollment {
            record: Member {
                id: RecordId::Int(result.last_insert_rowid()),
                person: resolved.person,
                membership_id: membership_id.map(RecordId::Int),
                join_date,
            },
            person_origin: resolved.origin,
        })
    }

    /// Changes the membership link and join date; the shared person is untouched.
    async fn update(&self, id: &str, input: MemberInput) -> StoreResult<Member> {
        let id = parse_id::<Member>(id)?;
        let input = input.validated()?;
        let membership_id = input
            .membership_id
            .as_ref()
            .map(reference_key::<Membership>)
            .transpose()?;

        let result = sqlx::query(
            "UPDATE members SET membership_id = ?, join_date = COALESCE(?, join_date) WHERE member_id = ?",
        )
        .bind(membership_id)
        .bind(input.join_date)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Member>(Operation::Update, "membership"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Member"));
        }
        EntityStore::<Member>::get_by_id(self, &id.to_string()).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Member>("DELETE FROM members WHERE member_id = ?", id)
            .await
    }
}

#[async_trait]
impl EntityStore<Employee> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Employee>> {
        self.fetch_all(
            &format!("{} ORDER BY e.employee_id", select_employees()),
            employee_from_row,
        )
        .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Employee> {
        let id = parse_id::<Employee>(id)?;
        self.fetch_one(
            &format!("{} WHERE e.employee_id = ?", select_employees()),
            id,
            employee_from_row,
        )
        .await
    }

    async fn add(&self, input: EmployeeInput) -> StoreResult<Enrollment<Employee>> {
        let input = input.validated()?;
        let failure = Operation::Create.failure::<Employee>();

        let mut tx = self.pool.begin().await.map_err(failed(failure.clone()))?;
        let resolved = find_or_create_person(&mut *tx, &input.person)
            .await
            .map_err(write_error::<Employee>(Operation::Create, "person"))?;

        let employment = input.employment;
        let result = sqlx::query(
            "INSERT INTO employees (person_id, hire_date, job_title_id, department_id, salary, employment_status) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(resolved.key)
        .bind(employment.hire_date)
        .bind(employment.job_title_id)
        .bind(employment.department_id)
        .bind(employment.salary)
        .bind(&employment.employment_status)
        .execute(&mut *tx)
        .await
        .map_err(write_error::<Employee>(Operation::Create, "job title or department"))?;

        tx.commit().await.map_err(failed(failure))?;

        Ok(Enrollment {
            record: Employee {
                id: RecordId::Int(result.last_insert_rowid()),
                person: resolved.person,
                employment,
            },
            person_origin: resolved.origin,
        })
    }

    /// Changes the employment terms only.
    async fn update(&self, id: &str, input: EmployeeInput) -> StoreResult<Employee> {
        let id = parse_id::<Employee>(id)?;
        let input = input.validated()?;
        let employment = input.employment;

        let result = sqlx::query(
            "UPDATE employees SET hire_date = ?, job_title_id = ?, department_id = ?, salary = ?, employment_status = ? WHERE employee_id = ?",
        )
        .bind(employment.hire_date)
        .bind(employment.job_title_id)
        .bind(employment.department_id)
        .bind(employment.salary)
        .bind(&employment.employment_status)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Employee>(Operation::Update, "job title or department"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Employee"));
        }
        EntityStore::<Employee>::get_by_id(self, &id.to_string()).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Employee>("DELETE FROM employees WHERE employee_id = ?", id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::store::sql::memory_store;

    fn person(email: &str) -> PersonInput {
        PersonInput {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: email.into(),
            phone: "12345678".into(),
            address: None,
            date_of_birth: NaiveDate::from_ymd_opt(1992, 3, 14).unwrap(),
        }
    }

    fn coach(email: &str) -> EmployeeInput {
        EmployeeInput {
            person: person(email),
            employment: Employment {
                hire_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                job_title_id: Some(2),
                department_id: None,
                salary: 32_000.0,
                employment_status: "full-time".into(),
            },
        }
    }

    fn member(email: &str) -> MemberInput {
        MemberInput {
            person: person(email),
            membership_id: None,
            join_date: NaiveDate::from_ymd_opt(2025, 1, 6),
        }
    }

    #[tokio::test]
    async fn test_member_and_employee_share_person_by_email() {
        let store = memory_store().await;

        let employee = EntityStore::<Employee>::add(&store, coach("a@b.com")).await.unwrap();
        assert_eq!(employee.person_origin, PersonOrigin::Created);

        let enrolled = EntityStore::<Member>::add(&store, member("A@B.com")).await.unwrap();
        assert_eq!(enrolled.person_origin, PersonOrigin::Found);
        assert!(enrolled.person_origin.reused());
        assert_eq!(enrolled.record.person.id, employee.record.person.id);
    }

    #[tokio::test]
    async fn test_found_person_keeps_stored_details() {
        let store = memory_store().await;
        EntityStore::<Member>::add(&store, member("jane@example.com")).await.unwrap();

        let mut second = coach("jane@example.com");
        second.person.first_name = "Janet".into();
        let employee = EntityStore::<Employee>::add(&store, second).await.unwrap();
        assert_eq!(employee.record.person.details.first_name, "Jane");
    }

    // A person may be a member once; a second registration is refused rather
    // than silently creating a duplicate.
    #[tokio::test]
    async fn test_duplicate_member_email_conflicts() {
        let store = memory_store().await;
        EntityStore::<Member>::add(&store, member("a@b.com")).await.unwrap();

        let second = EntityStore::<Member>::add(&store, member("a@b.com")).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));

        let duplicate_employee = async {
            EntityStore::<Employee>::add(&store, coach("c@d.com")).await?;
            EntityStore::<Employee>::add(&store, coach("c@d.com")).await
        };
        assert!(matches!(duplicate_employee.await, Err(StoreError::Conflict(_))));

        let members = EntityStore::<Member>::get_all(&store).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_membership_is_rejected() {
        let store = memory_store().await;
        let mut input = member("x@y.com");
        input.membership_id = Some(RecordId::Int(77));

        let result = EntityStore::<Member>::add(&store, input).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let mut input = member("x@y.com");
        input.membership_id = Some(RecordId::Object("gold".into()));
        let result = EntityStore::<Member>::add(&store, input).await;
        assert!(matches!(result, Err(StoreError::MalformedId { .. })));
    }

    #[tokio::test]
    async fn test_member_update_validates_person() {
        let store = memory_store().await;
        let created = EntityStore::<Member>::add(&store, member("valid@gym.dk")).await.unwrap();
        let id = created.record.id.to_string();

        let mut change = member("not-an-email");
        change.person.phone = "12".into();
        let result = EntityStore::<Member>::update(&store, &id, change).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let unchanged = EntityStore::<Member>::get_by_id(&store, &id).await.unwrap();
        assert_eq!(unchanged, created.record);
    }

    #[tokio::test]
    async fn test_employee_update_changes_employment_only() {
        let store = memory_store().await;
        let created = EntityStore::<Employee>::add(&store, coach("coach@gym.dk")).await.unwrap();
        let id = created.record.id.to_string();

        let mut change = coach("other@gym.dk");
        change.employment.salary = 35_000.0;
        let updated = EntityStore::<Employee>::update(&store, &id, change).await.unwrap();

        assert_eq!(updated.employment.salary, 35_000.0);
        assert_eq!(updated.person.details.email, "coach@gym.dk");
    }

    #[tokio::test]
    async fn test_member_round_trip() {
        let store = memory_store().await;
        let created = EntityStore::<Member>::add(&store, member("round@trip.dk")).await.unwrap();
        let fetched = EntityStore::<Member>::get_by_id(&store, &created.record.id.to_string())
            .await
            .unwrap();
        assert_eq!(fetched, created.record);

        EntityStore::<Member>::delete(&store, &created.record.id.to_string())
            .await
            .unwrap();
        let again = EntityStore::<Member>::delete(&store, &created.record.id.to_string()).await;
        assert!(matches!(again, Err(StoreError::NotFound("Member"))));
    }
}
