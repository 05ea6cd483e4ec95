//! Contact operations. Each one takes the caller id explicitly, queries the
//! store, runs the ownership guard where a single record is involved, and
//! shapes the response.

use tracing::{debug, info};
use uuid::Uuid;

use super::dto::{ContactForm, ContactView, ContactsPage, ImportContact};
use super::guard::{authorize, Action};
use super::repo::ContactStore;
use super::repo_types::{
    Contact, ContactFilter, ContactImage, ContactPatch, NewContact, Window, DEFAULT_CATEGORY,
};
use crate::error::{ApiError, StoreError};
use crate::pagination::{Page, PaginationMeta};

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation("Invalid contact id"))
}

fn category_or_default(category: Option<String>) -> String {
    category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

async fn fetch_authorized(
    store: &dyn ContactStore,
    caller: Uuid,
    id: Uuid,
    action: Action,
) -> Result<Contact, ApiError> {
    let record = store.find_by_id(id).await?;
    authorize(record, caller, action)
}

async fn paginate(
    store: &dyn ContactStore,
    filter: ContactFilter,
    page: Page,
) -> Result<ContactsPage, ApiError> {
    let total = store.count(&filter).await?;
    let window = Window {
        skip: page.skip(),
        limit: page.limit,
    };
    let contacts = store.find(&filter, Some(window)).await?;
    debug!(total, page = page.page, limit = page.limit, "contacts page");
    Ok(ContactsPage {
        contacts: contacts.iter().map(ContactView::listing).collect(),
        pagination: PaginationMeta::new(total, page),
    })
}

pub async fn list(
    store: &dyn ContactStore,
    caller: Uuid,
    page: Page,
) -> Result<ContactsPage, ApiError> {
    paginate(store, ContactFilter::owned_by(caller), page).await
}

pub async fn list_by_category(
    store: &dyn ContactStore,
    caller: Uuid,
    category: &str,
    page: Page,
) -> Result<ContactsPage, ApiError> {
    paginate(store, ContactFilter::owned_by(caller).category(category), page).await
}

pub async fn list_favorites(
    store: &dyn ContactStore,
    caller: Uuid,
    page: Page,
) -> Result<ContactsPage, ApiError> {
    paginate(store, ContactFilter::owned_by(caller).favorites(), page).await
}

pub async fn get(store: &dyn ContactStore, caller: Uuid, id: Uuid) -> Result<ContactView, ApiError> {
    let contact = fetch_authorized(store, caller, id, Action::View).await?;
    Ok(ContactView::detail(&contact))
}

pub async fn create(
    store: &dyn ContactStore,
    caller: Uuid,
    form: ContactForm,
) -> Result<ContactView, ApiError> {
    let contact = store
        .create(NewContact {
            id: None,
            user_id: caller,
            name: form.name,
            email: form.email,
            phone: form.phone,
            category: category_or_default(form.category),
            favorite: false,
            image: form.image,
        })
        .await?;
    info!(contact_id = %contact.id, user_id = %caller, has_image = contact.image.is_some(), "contact created");
    Ok(ContactView::detail(&contact))
}

/// Partial update. A form without an image keeps the stored one.
pub async fn update(
    store: &dyn ContactStore,
    caller: Uuid,
    id: Uuid,
    form: ContactForm,
) -> Result<ContactView, ApiError> {
    fetch_authorized(store, caller, id, Action::Update).await?;
    let patch = ContactPatch {
        name: form.name,
        email: form.email,
        phone: form.phone,
        category: form.category.filter(|c| !c.trim().is_empty()),
        favorite: None,
        image: form.image,
    };
    let contact = store
        .update_by_id(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;
    info!(contact_id = %id, user_id = %caller, "contact updated");
    Ok(ContactView::detail(&contact))
}

pub async fn delete(store: &dyn ContactStore, caller: Uuid, id: Uuid) -> Result<(), ApiError> {
    fetch_authorized(store, caller, id, Action::Delete).await?;
    if !store.delete_by_id(id).await? {
        return Err(ApiError::not_found("Contact not found"));
    }
    info!(contact_id = %id, user_id = %caller, "contact deleted");
    Ok(())
}

pub async fn toggle_favorite(
    store: &dyn ContactStore,
    caller: Uuid,
    id: Uuid,
) -> Result<ContactView, ApiError> {
    let current = fetch_authorized(store, caller, id, Action::Modify).await?;
    let patch = ContactPatch {
        favorite: Some(!current.favorite),
        ..ContactPatch::default()
    };
    let contact = store
        .update_by_id(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact not found"))?;
    Ok(ContactView::detail(&contact))
}

pub async fn search(
    store: &dyn ContactStore,
    caller: Uuid,
    term: Option<&str>,
) -> Result<Vec<ContactView>, ApiError> {
    let term = term
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Search term is required"))?;
    let contacts = store
        .find(&ContactFilter::owned_by(caller).search(term), None)
        .await?;
    Ok(contacts.iter().map(ContactView::detail).collect())
}

/// Inserts the batch under the caller's ownership and returns how many landed.
pub async fn import(
    store: &dyn ContactStore,
    caller: Uuid,
    contacts: Vec<ImportContact>,
) -> Result<usize, ApiError> {
    if contacts.is_empty() {
        return Err(ApiError::validation("Please provide an array of contacts"));
    }
    let docs = contacts
        .into_iter()
        .map(|c| NewContact {
            id: c.id,
            user_id: caller,
            name: c.name,
            email: c.email,
            phone: c.phone,
            category: category_or_default(c.category),
            favorite: c.favorite.unwrap_or(false),
            image: None,
        })
        .collect();
    let inserted = match store.insert_many(docs).await {
        Ok(v) => v,
        Err(StoreError::Duplicate(detail)) => {
            tracing::warn!(%detail, user_id = %caller, "import rejected on duplicate key");
            return Err(ApiError::conflict(
                "Some contacts could not be imported due to duplicate keys",
            ));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %caller, count = inserted.len(), "contacts imported");
    Ok(inserted.len())
}

pub async fn export(store: &dyn ContactStore, caller: Uuid) -> Result<Vec<ContactView>, ApiError> {
    let contacts = store.find(&ContactFilter::owned_by(caller), None).await?;
    Ok(contacts.iter().map(ContactView::export).collect())
}

/// Raw image of a contact the caller owns.
pub async fn image(
    store: &dyn ContactStore,
    caller: Uuid,
    id: Uuid,
) -> Result<ContactImage, ApiError> {
    let contact = fetch_authorized(store, caller, id, Action::FetchImage).await?;
    contact
        .image
        .ok_or_else(|| ApiError::not_found("No image found"))
}
