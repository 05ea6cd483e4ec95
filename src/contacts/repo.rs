use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Contact, ContactFilter, ContactPatch, ContactRow, NewContact, Window};
use crate::error::StoreError;

/// Record Store for contacts. Listings are always sorted newest first.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find(
        &self,
        filter: &ContactFilter,
        window: Option<Window>,
    ) -> Result<Vec<Contact>, StoreError>;
    async fn count(&self, filter: &ContactFilter) -> Result<u64, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>, StoreError>;
    async fn create(&self, doc: NewContact) -> Result<Contact, StoreError>;
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StoreError>;
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Inserts the whole batch or nothing.
    async fn insert_many(&self, docs: Vec<NewContact>) -> Result<Vec<Contact>, StoreError>;
}

#[derive(Clone)]
pub struct PgContactStore {
    db: PgPool,
}

impl PgContactStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const COLUMNS: &str = "id, user_id, name, email, phone, category, favorite, \
                       image_data, image_content_type, image_filename, created_at";

const FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::text IS NULL OR category = $2)
      AND ($3::bool IS NULL OR favorite = $3)
      AND ($4::text IS NULL OR name ILIKE $4 OR email ILIKE $4 OR phone ILIKE $4)
"#;

const INSERT: &str = r#"
    INSERT INTO contacts (id, user_id, name, email, phone, category, favorite,
                          image_data, image_content_type, image_filename)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

/// Escapes LIKE metacharacters and wraps the term for a substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn into_contacts(rows: Vec<ContactRow>) -> Result<Vec<Contact>, StoreError> {
    rows.into_iter().map(Contact::try_from).collect()
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn find(
        &self,
        filter: &ContactFilter,
        window: Option<Window>,
    ) -> Result<Vec<Contact>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM contacts {FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(filter.owner)
            .bind(filter.category.as_deref())
            .bind(filter.favorite)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(window.map(|w| to_i64(w.limit)))
            .bind(window.map(|w| to_i64(w.skip)))
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        into_contacts(rows)
    }

    async fn count(&self, filter: &ContactFilter) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM contacts {FILTER}");
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.owner)
            .bind(filter.category.as_deref())
            .bind(filter.favorite)
            .bind(filter.search.as_deref().map(like_pattern))
            .fetch_one(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1");
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(Contact::try_from).transpose()
    }

    async fn create(&self, doc: NewContact) -> Result<Contact, StoreError> {
        let sql = format!("{INSERT} RETURNING {COLUMNS}");
        let (data, content_type, filename) = split_image(doc.image);
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(doc.id.unwrap_or_else(Uuid::new_v4))
            .bind(doc.user_id)
            .bind(doc.name)
            .bind(doc.email)
            .bind(doc.phone)
            .bind(doc.category)
            .bind(doc.favorite)
            .bind(data)
            .bind(content_type)
            .bind(filename)
            .fetch_one(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Contact::try_from(row)
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StoreError> {
        let sql = format!(
            r#"
            UPDATE contacts SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                category = COALESCE($5, category),
                favorite = COALESCE($6, favorite),
                image_data = COALESCE($7, image_data),
                image_content_type = COALESCE($8, image_content_type),
                image_filename = COALESCE($9, image_filename)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );
        let (data, content_type, filename) = split_image(patch.image);
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email)
            .bind(patch.phone)
            .bind(patch.category)
            .bind(patch.favorite)
            .bind(data)
            .bind(content_type)
            .bind(filename)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(Contact::try_from).transpose()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_many(&self, docs: Vec<NewContact>) -> Result<Vec<Contact>, StoreError> {
        let sql = format!("{INSERT} RETURNING {COLUMNS}");
        let mut tx = self.db.begin().await.map_err(StoreError::from_sqlx)?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let (data, content_type, filename) = split_image(doc.image);
            let row = sqlx::query_as::<_, ContactRow>(&sql)
                .bind(doc.id.unwrap_or_else(Uuid::new_v4))
                .bind(doc.user_id)
                .bind(doc.name)
                .bind(doc.email)
                .bind(doc.phone)
                .bind(doc.category)
                .bind(doc.favorite)
                .bind(data)
                .bind(content_type)
                .bind(filename)
                .fetch_one(&mut *tx)
                .await
                .map_err(StoreError::from_sqlx)?;
            out.push(Contact::try_from(row)?);
        }
        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(out)
    }
}

fn split_image(
    image: Option<super::repo_types::ContactImage>,
) -> (Option<Vec<u8>>, Option<String>, Option<String>) {
    match image {
        Some(img) => (Some(img.data.to_vec()), Some(img.content_type), Some(img.filename)),
        None => (None, None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("ann"), "%ann%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
