//! In-process stores backing the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{User, UserPatch};
use crate::contacts::repo::ContactStore;
use crate::contacts::repo_types::{Contact, ContactFilter, ContactPatch, NewContact, Window};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryContactStore {
    // (insertion sequence, record); the sequence breaks created_at ties
    rows: RwLock<Vec<(u64, Contact)>>,
}

impl MemoryContactStore {
    fn materialize(doc: NewContact) -> Contact {
        Contact {
            id: doc.id.unwrap_or_else(Uuid::new_v4),
            user_id: doc.user_id,
            name: doc.name,
            email: doc.email,
            phone: doc.phone,
            category: doc.category,
            favorite: doc.favorite,
            image: doc.image,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn find(
        &self,
        filter: &ContactFilter,
        window: Option<Window>,
    ) -> Result<Vec<Contact>, StoreError> {
        let rows = self.rows.read().await;
        let mut hits: Vec<&(u64, Contact)> = rows.iter().filter(|(_, c)| filter.matches(c)).collect();
        hits.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        let iter = hits.into_iter().map(|(_, c)| c.clone());
        Ok(match window {
            Some(w) => iter
                .skip(usize::try_from(w.skip).unwrap_or(usize::MAX))
                .take(usize::try_from(w.limit).unwrap_or(usize::MAX))
                .collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, filter: &ContactFilter) -> Result<u64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|(_, c)| filter.matches(c)).count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|(_, c)| c.id == id).map(|(_, c)| c.clone()))
    }

    async fn create(&self, doc: NewContact) -> Result<Contact, StoreError> {
        Ok(self.insert_many(vec![doc]).await?.remove(0))
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StoreError> {
        let mut rows = self.rows.write().await;
        Ok(rows.iter_mut().find(|(_, c)| c.id == id).map(|(_, c)| {
            patch.apply(c);
            c.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|(_, c)| c.id != id);
        Ok(rows.len() != before)
    }

    async fn insert_many(&self, docs: Vec<NewContact>) -> Result<Vec<Contact>, StoreError> {
        let mut rows = self.rows.write().await;
        let batch: Vec<Contact> = docs.into_iter().map(Self::materialize).collect();
        for (i, c) in batch.iter().enumerate() {
            let clash = rows.iter().any(|(_, r)| r.id == c.id)
                || batch[..i].iter().any(|b| b.id == c.id);
            if clash {
                return Err(StoreError::Duplicate(format!("contact id {}", c.id)));
            }
        }
        let mut seq = rows.last().map_or(0, |(s, _)| s + 1);
        for c in &batch {
            rows.push((seq, c.clone()));
            seq += 1;
        }
        Ok(batch)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Duplicate(format!("email {email}")));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            if let Some(name) = patch.name {
                u.name = name;
            }
            if let Some(hash) = patch.password_hash {
                u.password_hash = hash;
            }
            u.clone()
        }))
    }
}
