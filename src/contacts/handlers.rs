use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        Query, State,
    },
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use super::dto::{
    ContactBody, ContactForm, ContactsBody, ImportRequest, ImportedCount, SearchQuery,
};
use super::repo_types::ContactImage;
use super::services::{self, parse_id};
use crate::{
    auth::jwt::AuthUser,
    envelope::{Empty, Envelope},
    error::ApiError,
    pagination::{Page, PageQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/getcontacts", get(list_contacts))
        .route("/contact/:id", get(get_contact))
        .route("/contact/:id/image", get(get_contact_image))
        .route("/category/:category", get(list_by_category))
        .route("/favorites/all", get(list_favorites))
        .route("/search", get(search_contacts))
        .route("/export", get(export_contacts))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/addcontact", post(add_contact))
        .route("/:id", put(update_contact).delete(delete_contact))
        .route("/:id/favorite", patch(toggle_favorite))
        .route("/import", post(import_contacts))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// --- multipart ---

fn non_empty(v: String) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

fn validated_image(
    data: Bytes,
    content_type: Option<String>,
    filename: Option<String>,
) -> Result<Option<ContactImage>, ApiError> {
    let filename = filename.and_then(non_empty);
    // browsers send an empty file part when nothing was picked
    if data.is_empty() && filename.is_none() {
        return Ok(None);
    }
    let filename = filename.ok_or_else(|| ApiError::validation("Image upload is missing a filename"))?;
    let content_type = content_type
        .filter(|ct| ct.contains('/') && HeaderValue::from_str(ct).is_ok())
        .ok_or_else(|| ApiError::validation("Image upload has an invalid content type"))?;
    Ok(Some(ContactImage {
        data,
        content_type,
        filename,
    }))
}

async fn read_contact_form(
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ContactForm, ApiError> {
    let mut mp = mp.map_err(|e| {
        tracing::debug!(error = %e, "multipart rejected");
        ApiError::validation("Expected a multipart/form-data body")
    })?;
    let mut form = ContactForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let content_type = field.content_type().map(str::to_string);
                let filename = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read image: {e}")))?;
                form.image = validated_image(data, content_type, filename)?;
            }
            Some(key @ ("name" | "email" | "phone" | "type")) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read field: {e}")))?;
                let slot = match key {
                    "name" => &mut form.name,
                    "email" => &mut form.email,
                    "phone" => &mut form.phone,
                    _ => &mut form.category,
                };
                *slot = Some(value);
            }
            _ => {}
        }
    }
    Ok(form)
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = services::list(state.contacts.as_ref(), user_id, Page::from(q)).await?;
    Ok(Envelope::ok(page).with_message("Contacts fetched successfully"))
}

#[instrument(skip(state))]
pub async fn get_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = services::get(state.contacts.as_ref(), user_id, parse_id(&id)?).await?;
    Ok(Envelope::ok(ContactBody { contact }))
}

#[instrument(skip(state, mp))]
pub async fn add_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_contact_form(mp).await?;
    let contact = services::create(state.contacts.as_ref(), user_id, form).await?;
    Ok(Envelope::created(ContactBody { contact }).with_message("Contact saved successfully"))
}

#[instrument(skip(state, mp))]
pub async fn update_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let form = read_contact_form(mp).await?;
    let contact = services::update(state.contacts.as_ref(), user_id, id, form).await?;
    Ok(Envelope::ok(ContactBody { contact }).with_message("Contact updated successfully"))
}

#[instrument(skip(state))]
pub async fn delete_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Empty>, ApiError> {
    services::delete(state.contacts.as_ref(), user_id, parse_id(&id)?).await?;
    Ok(Envelope::message("Contact deleted successfully"))
}

#[instrument(skip(state))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = services::toggle_favorite(state.contacts.as_ref(), user_id, parse_id(&id)?).await?;
    Ok(Envelope::ok(ContactBody { contact }).with_message("Favorite status toggled"))
}

#[instrument(skip(state))]
pub async fn list_by_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(category): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page =
        services::list_by_category(state.contacts.as_ref(), user_id, &category, Page::from(q))
            .await?;
    Ok(Envelope::ok(page))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = services::list_favorites(state.contacts.as_ref(), user_id, Page::from(q)).await?;
    Ok(Envelope::ok(page))
}

#[instrument(skip(state))]
pub async fn search_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = services::search(state.contacts.as_ref(), user_id, q.q.as_deref()).await?;
    Ok(Envelope::ok(ContactsBody { contacts }).with_message("Search results"))
}

#[instrument(skip(state, payload))]
pub async fn import_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) =
        payload.map_err(|_| ApiError::validation("Please provide an array of contacts"))?;
    let count = services::import(state.contacts.as_ref(), user_id, body.contacts).await?;
    Ok(Envelope::created(ImportedCount { count })
        .with_message(format!("Successfully imported {count} contacts")))
}

#[instrument(skip(state))]
pub async fn export_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = services::export(state.contacts.as_ref(), user_id).await?;
    Ok(Envelope::ok(ContactsBody { contacts }).with_message("Contacts exported successfully"))
}

/// Raw image bytes with the stored content type, no JSON envelope.
#[instrument(skip(state))]
pub async fn get_contact_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let img = services::image(state.contacts.as_ref(), user_id, parse_id(&id)?).await?;
    let content_type = HeaderValue::from_str(&img.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], img.data).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_part_means_no_image() {
        let img = validated_image(Bytes::new(), Some("application/octet-stream".into()), Some(String::new()))
            .unwrap();
        assert!(img.is_none());
    }

    #[test]
    fn image_without_filename_is_rejected() {
        let err = validated_image(Bytes::from_static(b"x"), Some("image/png".into()), None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn image_without_content_type_is_rejected() {
        let err = validated_image(Bytes::from_static(b"x"), None, Some("a.png".into())).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = validated_image(Bytes::from_static(b"x"), Some("png".into()), Some("a.png".into()))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn complete_image_is_accepted() {
        let img = validated_image(Bytes::from_static(b"x"), Some("image/png".into()), Some("a.png".into()))
            .unwrap()
            .unwrap();
        assert_eq!(img.filename, "a.png");
        assert_eq!(img.content_type, "image/png");
    }
}
