//! Document strategy backed by MongoDB.
//!
//! Covers members, memberships and products. Ids are hex object ids; people
//! live in their own `persons` collection and members point at them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Document as BsonDocument, doc};
use mongodb::{Client, Collection, Database};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Entity, EntityStore, Operation, StoreError, StoreResult, failed};
use crate::models::{
    Enrollment, Member, MemberInput, Membership, MembershipInput, Person, PersonInput,
    PersonOrigin, Product, ProductInput, RecordId,
};
use crate::validation::{Validate, ValidationError};

const PERSONS: &str = "persons";

/// A stored body together with its `_id`.
#[derive(Debug, Serialize, Deserialize)]
struct Stored<T> {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct MemberDocument {
    person_id: ObjectId,
    membership_id: Option<RecordId>,
    join_date: NaiveDate,
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(url: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(url)
            .await
            .map_err(failed("Failed to connect to the document database".into()))?;
        let store = Self {
            db: client.database(database),
        };
        store.ping().await?;
        info!("Document store ready, database {database}");
        Ok(store)
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(failed("Document database is unreachable".into()))?;
        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    async fn list<E, T>(&self, build: fn(ObjectId, T) -> E) -> StoreResult<Vec<E>>
    where
        E: Entity,
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let failure = Operation::Retrieve.failure::<E>();
        let stored: Vec<Stored<T>> = self
            .collection::<Stored<T>>(E::COLLECTION)
            .find(doc! {})
            .await
            .map_err(failed(failure.clone()))?
            .try_collect()
            .await
            .map_err(failed(failure))?;
        Ok(stored.into_iter().map(|doc| build(doc.id, doc.body)).collect())
    }

    async fn find<E, T>(&self, raw_id: &str, build: fn(ObjectId, T) -> E) -> StoreResult<E>
    where
        E: Entity,
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let id = parse_object_id::<E>(raw_id)?;
        let stored = self
            .collection::<Stored<T>>(E::COLLECTION)
            .find_one(doc! { "_id": id })
            .await
            .map_err(failed(format!("Failed to retrieve {}", E::NAME.to_lowercase())))?
            .ok_or(StoreError::NotFound(E::NAME))?;
        Ok(build(stored.id, stored.body))
    }

    async fn insert<E, T>(&self, body: T, build: fn(ObjectId, T) -> E) -> StoreResult<E>
    where
        E: Entity,
        T: Serialize + Send + Sync,
    {
        let failure = Operation::Create.failure::<E>();
        let result = self
            .collection::<T>(E::COLLECTION)
            .insert_one(&body)
            .await
            .map_err(failed(failure.clone()))?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Backend(failure))?;
        Ok(build(id, body))
    }

    async fn replace<E, T>(
        &self,
        raw_id: &str,
        body: T,
        build: fn(ObjectId, T) -> E,
    ) -> StoreResult<E>
    where
        E: Entity,
        T: Serialize + Send + Sync,
    {
        let id = parse_object_id::<E>(raw_id)?;
        let result = self
            .collection::<T>(E::COLLECTION)
            .replace_one(doc! { "_id": id }, &body)
            .await
            .map_err(failed(Operation::Update.failure::<E>()))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(E::NAME));
        }
        Ok(build(id, body))
    }

    async fn remove<E: Entity>(&self, raw_id: &str) -> StoreResult<()> {
        let id = parse_object_id::<E>(raw_id)?;
        let result = self
            .collection::<BsonDocument>(E::COLLECTION)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(failed(Operation::Delete.failure::<E>()))?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(E::NAME));
        }
        Ok(())
    }

    /// Returns the person registered under the (already normalized) email,
    /// inserting one when none exists.
    async fn find_or_create_person(
        &self,
        input: &PersonInput,
    ) -> StoreResult<(Person, PersonOrigin)> {
        let failure = Operation::Create.failure::<Member>();
        let persons = self.collection::<Stored<PersonInput>>(PERSONS);
        if let Some(found) = persons
            .find_one(doc! { "email": input.email.as_str() })
            .await
            .map_err(failed(failure.clone()))?
        {
            debug!("Reusing person {} for {}", found.id, input.email);
            return Ok((person(found.id, found.body), PersonOrigin::Found));
        }

        let result = self
            .collection::<PersonInput>(PERSONS)
            .insert_one(input)
            .await
            .map_err(failed(failure.clone()))?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Backend(failure))?;
        Ok((person(id, input.clone()), PersonOrigin::Created))
    }

    async fn check_membership(&self, membership_id: Option<&RecordId>) -> StoreResult<()> {
        let Some(raw) = membership_id else {
            return Ok(());
        };
        let id = parse_object_id::<Membership>(&raw.to_string())?;
        let exists = self
            .collection::<BsonDocument>(Membership::COLLECTION)
            .count_documents(doc! { "_id": id })
            .await
            .map_err(failed(Operation::Retrieve.failure::<Membership>()))?;
        if exists == 0 {
            return Err(ValidationError::UnknownReference("membership").into());
        }
        Ok(())
    }

    async fn persons_by_id(&self, ids: Vec<ObjectId>) -> StoreResult<HashMap<ObjectId, Person>> {
        let failure = Operation::Retrieve.failure::<Member>();
        let found: Vec<Stored<PersonInput>> = self
            .collection::<Stored<PersonInput>>(PERSONS)
            .find(doc! { "_id": { "$in": ids } })
            .await
            .map_err(failed(failure.clone()))?
            .try_collect()
            .await
            .map_err(failed(failure))?;
        Ok(found
            .into_iter()
            .map(|doc| (doc.id, person(doc.id, doc.body)))
            .collect())
    }
}

/// Parses a hex object id, reporting anything else as malformed.
fn parse_object_id<E: Entity>(raw: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| StoreError::MalformedId {
        entity: E::NAME,
        id: raw.to_string(),
    })
}

fn object_id(id: ObjectId) -> RecordId {
    RecordId::Object(id.to_hex())
}

fn person(id: ObjectId, details: PersonInput) -> Person {
    Person {
        id: object_id(id),
        details,
    }
}

fn membership(id: ObjectId, details: MembershipInput) -> Membership {
    Membership {
        id: object_id(id),
        details,
    }
}

fn product(id: ObjectId, details: ProductInput) -> Product {
    Product {
        id: object_id(id),
        details,
    }
}

fn member(id: ObjectId, person: Person, stored: MemberDocument) -> Member {
    Member {
        id: object_id(id),
        person,
        membership_id: stored.membership_id,
        join_date: stored.join_date,
    }
}

#[async_trait]
impl EntityStore<Membership> for MongoStore {
    async fn get_all(&self) -> StoreResult<Vec<Membership>> {
        self.list(membership).await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Membership> {
        self.find(id, membership).await
    }

    async fn add(&self, input: MembershipInput) -> StoreResult<Membership> {
        self.insert(input.validated()?, membership).await
    }

    async fn update(&self, id: &str, input: MembershipInput) -> StoreResult<Membership> {
        self.replace(id, input.validated()?, membership).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.remove::<Membership>(id).await
    }
}

#[async_trait]
impl EntityStore<Product> for MongoStore {
    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        self.list(product).await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Product> {
        self.find(id, product).await
    }

    async fn add(&self, input: ProductInput) -> StoreResult<Product> {
        self.insert(input.validated()?, product).await
    }

    async fn update(&self, id: &str, input: ProductInput) -> StoreResult<Product> {
        self.replace(id, input.validated()?, product).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.remove::<Product>(id).await
    }
}

#[async_trait]
impl EntityStore<Member> for MongoStore {
    async fn get_all(&self) -> StoreResult<Vec<Member>> {
        let failure = Operation::Retrieve.failure::<Member>();
        let stored: Vec<Stored<MemberDocument>> = self
            .collection::<Stored<MemberDocument>>(Member::COLLECTION)
            .find(doc! {})
            .await
            .map_err(failed(failure.clone()))?
            .try_collect()
            .await
            .map_err(failed(failure))?;

        let mut persons = self
            .persons_by_id(stored.iter().map(|doc| doc.body.person_id).collect())
            .await?;
        // Members whose person document disappeared are skipped.
        Ok(stored
            .into_iter()
            .filter_map(|doc| {
                let person = persons.remove(&doc.body.person_id)?;
                Some(member(doc.id, person, doc.body))
            })
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Member> {
        let id = parse_object_id::<Member>(id)?;
        let failure = format!("Failed to retrieve {}", Member::NAME.to_lowercase());
        let stored = self
            .collection::<Stored<MemberDocument>>(Member::COLLECTION)
            .find_one(doc! { "_id": id })
            .await
            .map_err(failed(failure))?
            .ok_or(StoreError::NotFound(Member::NAME))?;
        let person = self
            .persons_by_id(vec![stored.body.person_id])
            .await?
            .remove(&stored.body.person_id)
            .ok_or(StoreError::NotFound("Person"))?;
        Ok(member(stored.id, person, stored.body))
    }

    async fn add(&self, input: MemberInput) -> StoreResult<Enrollment<Member>> {
        let input = input.validated()?;
        self.check_membership(input.membership_id.as_ref()).await?;
        let (person, origin) = self.find_or_create_person(&input.person).await?;
        let person_id = parse_object_id::<Member>(&person.id.to_string())?;

        let members = self.collection::<MemberDocument>(Member::COLLECTION);
        let failure = Operation::Create.failure::<Member>();
        let enrolled = members
            .count_documents(doc! { "person_id": person_id })
            .await
            .map_err(failed(failure.clone()))?;
        if enrolled > 0 {
            return Err(StoreError::Conflict("Member already exists".into()));
        }

        let stored = MemberDocument {
            person_id,
            membership_id: input.membership_id,
            join_date: input.join_date.unwrap_or_else(|| Local::now().date_naive()),
        };
        let result = members
            .insert_one(&stored)
            .await
            .map_err(failed(failure.clone()))?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Backend(failure))?;

        Ok(Enrollment {
            record: member(id, person, stored),
            person_origin: origin,
        })
    }

    /// Changes the membership and, when given, the join date. Person details
    /// stay as stored.
    async fn update(&self, id: &str, input: MemberInput) -> StoreResult<Member> {
        let key = parse_object_id::<Member>(id)?;
        let input = input.validated()?;
        self.check_membership(input.membership_id.as_ref()).await?;

        let failure = Operation::Update.failure::<Member>();
        let membership_id =
            bson::to_bson(&input.membership_id).map_err(failed(failure.clone()))?;
        let mut changes = doc! { "membership_id": membership_id };
        if let Some(join_date) = input.join_date {
            changes.insert("join_date", join_date.to_string());
        }

        let result = self
            .collection::<BsonDocument>(Member::COLLECTION)
            .update_one(doc! { "_id": key }, doc! { "$set": changes })
            .await
            .map_err(failed(failure))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(Member::NAME));
        }
        EntityStore::<Member>::get_by_id(self, id).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.remove::<Member>(id).await
    }
}
