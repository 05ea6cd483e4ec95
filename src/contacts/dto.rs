use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Contact, ContactImage};
use crate::pagination::PaginationMeta;

/// Image as exposed in JSON. The binary payload is never serialized.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageSummary {
    pub exists: bool,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ImageSummary {
    fn listing(img: &ContactImage) -> Self {
        Self {
            exists: true,
            content_type: img.content_type.clone(),
            filename: None,
        }
    }

    fn detail(img: &ContactImage) -> Self {
        Self {
            filename: Some(img.filename.clone()),
            ..Self::listing(img)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub category: String,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ContactView {
    fn build(c: &Contact, image: Option<ImageSummary>) -> Self {
        Self {
            id: c.id,
            user: Some(c.user_id),
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            category: c.category.clone(),
            favorite: c.favorite,
            image,
            created_at: c.created_at,
        }
    }

    /// List shape: image reduced to `{exists, contentType}`.
    pub fn listing(c: &Contact) -> Self {
        Self::build(c, c.image.as_ref().map(ImageSummary::listing))
    }

    /// Single-record shape: image metadata including the filename.
    pub fn detail(c: &Contact) -> Self {
        Self::build(c, c.image.as_ref().map(ImageSummary::detail))
    }

    /// Export shape: like `detail` but without the owner reference.
    pub fn export(c: &Contact) -> Self {
        Self {
            user: None,
            ..Self::detail(c)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactBody {
    pub contact: ContactView,
}

#[derive(Debug, Serialize)]
pub struct ContactsBody {
    pub contacts: Vec<ContactView>,
}

#[derive(Debug, Serialize)]
pub struct ContactsPage {
    pub contacts: Vec<ContactView>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct ImportedCount {
    pub count: usize,
}

/// Fields accepted by create and update (multipart form).
#[derive(Debug, Default)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub image: Option<ContactImage>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub contacts: Vec<ImportContact>,
}

#[derive(Debug, Deserialize)]
pub struct ImportContact {
    #[serde(rename = "_id", alias = "id")]
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub favorite: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn contact_with_image() -> Contact {
        Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: Some("Jane".into()),
            email: None,
            phone: Some("555".into()),
            category: "work".into(),
            favorite: true,
            image: Some(ContactImage {
                data: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
                filename: "jane.png".into(),
            }),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn listing_hides_bytes_and_filename() {
        let v = serde_json::to_value(ContactView::listing(&contact_with_image())).unwrap();
        assert_eq!(v["image"], serde_json::json!({"exists": true, "contentType": "image/png"}));
        assert_eq!(v["type"], "work");
        assert!(v["date"].is_string());
    }

    #[test]
    fn detail_echoes_filename() {
        let v = serde_json::to_value(ContactView::detail(&contact_with_image())).unwrap();
        assert_eq!(v["image"]["filename"], "jane.png");
        assert!(v["image"].get("data").is_none());
    }

    #[test]
    fn export_drops_owner() {
        let c = contact_with_image();
        let v = serde_json::to_value(ContactView::export(&c)).unwrap();
        assert!(v.get("user").is_none());
        assert_eq!(v["_id"], c.id.to_string());
    }

    #[test]
    fn import_accepts_type_and_either_id_spelling() {
        let id = Uuid::new_v4();
        let body = serde_json::json!({
            "contacts": [
                {"name": "A", "type": "family", "favorite": true},
                {"id": id, "phone": "1"}
            ]
        });
        let req: ImportRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.contacts[0].category.as_deref(), Some("family"));
        assert_eq!(req.contacts[1].id, Some(id));
    }
}
