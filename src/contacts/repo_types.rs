use bytes::Bytes;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

pub const DEFAULT_CATEGORY: &str = "personal";

/// Embedded image. Payload, MIME type and filename always travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactImage {
    pub data: Bytes,
    pub content_type: String,
    pub filename: String,
}

/// Contact record as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid, // owner, never reassigned
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: String,
    pub favorite: bool,
    pub image: Option<ContactImage>,
    pub created_at: OffsetDateTime,
}

/// Insert payload; `user_id` is stamped by the service, never taken from the client.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: String,
    pub favorite: bool,
    pub image: Option<ContactImage>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub favorite: Option<bool>,
    pub image: Option<ContactImage>,
}

impl ContactPatch {
    #[cfg(test)]
    pub fn apply(self, contact: &mut Contact) {
        if let Some(v) = self.name {
            contact.name = Some(v);
        }
        if let Some(v) = self.email {
            contact.email = Some(v);
        }
        if let Some(v) = self.phone {
            contact.phone = Some(v);
        }
        if let Some(v) = self.category {
            contact.category = v;
        }
        if let Some(v) = self.favorite {
            contact.favorite = v;
        }
        if let Some(v) = self.image {
            contact.image = Some(v);
        }
    }
}

/// Query filter. The owner is mandatory so a listing can never cross users.
#[derive(Debug, Clone)]
pub struct ContactFilter {
    pub owner: Uuid,
    pub category: Option<String>,
    pub favorite: Option<bool>,
    /// Case-insensitive substring matched against name, email or phone.
    pub search: Option<String>,
}

impl ContactFilter {
    pub fn owned_by(owner: Uuid) -> Self {
        Self {
            owner,
            category: None,
            favorite: None,
            search: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn favorites(mut self) -> Self {
        self.favorite = Some(true);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    #[cfg(test)]
    pub fn matches(&self, c: &Contact) -> bool {
        if c.user_id != self.owner {
            return false;
        }
        if let Some(cat) = &self.category {
            if &c.category != cat {
                return false;
            }
        }
        if let Some(fav) = self.favorite {
            if c.favorite != fav {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let needle = term.to_lowercase();
            let hit = |f: &Option<String>| {
                f.as_deref()
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            };
            if !(hit(&c.name) || hit(&c.email) || hit(&c.phone)) {
                return false;
            }
        }
        true
    }
}

/// Skip/limit window over a sorted listing.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

/// Row shape in PostgreSQL.
#[derive(Debug, FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: String,
    pub favorite: bool,
    pub image_data: Option<Vec<u8>>,
    pub image_content_type: Option<String>,
    pub image_filename: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<ContactRow> for Contact {
    type Error = StoreError;

    fn try_from(r: ContactRow) -> Result<Self, Self::Error> {
        let image = match (r.image_data, r.image_content_type, r.image_filename) {
            (Some(data), Some(content_type), Some(filename)) => Some(ContactImage {
                data: Bytes::from(data),
                content_type,
                filename,
            }),
            (None, None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "contact {} has a partial image",
                    r.id
                )))
            }
        };
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            category: r.category,
            favorite: r.favorite,
            image,
            created_at: r.created_at,
        })
    }
}
