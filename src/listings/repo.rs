use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::CreateListingRequest;
use super::query::{escape_like, ListingQuery, SearchPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "listing_kind", rename_all = "lowercase")]
pub enum ListingKind {
    Rent,
    Sale,
}

/// One property record. `seq` is the insertion counter backing stable sort
/// order; it never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub seq: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub regular_price: i64,
    pub discounted_price: i64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub parking: bool,
    pub furnished: bool,
    pub offer: bool,
    pub kind: ListingKind,
    pub image_urls: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const LISTING_COLUMNS: &str =
    "id, seq, owner_id, name, description, address, regular_price, discounted_price, \
     bedrooms, bathrooms, parking, furnished, offer, kind, image_urls, created_at, updated_at";

impl Listing {
    pub async fn insert(
        db: &PgPool,
        owner_id: Uuid,
        req: &CreateListingRequest,
    ) -> sqlx::Result<Listing> {
        sqlx::query_as::<_, Listing>(&format!(
            "INSERT INTO listings (owner_id, name, description, address, regular_price, \
             discounted_price, bedrooms, bathrooms, parking, furnished, offer, kind, image_urls) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.address)
        .bind(req.regular_price)
        .bind(req.discounted_price)
        .bind(req.bedrooms)
        .bind(req.bathrooms)
        .bind(req.parking)
        .bind(req.furnished)
        .bind(req.offer)
        .bind(req.kind)
        .bind(&req.image_urls)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Listing>> {
        sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Persist the full row; callers patch and re-validate the struct first.
    pub async fn update(db: &PgPool, listing: &Listing) -> sqlx::Result<Listing> {
        sqlx::query_as::<_, Listing>(&format!(
            "UPDATE listings \
             SET name = $2, description = $3, address = $4, regular_price = $5, \
                 discounted_price = $6, bedrooms = $7, bathrooms = $8, parking = $9, \
                 furnished = $10, offer = $11, kind = $12, image_urls = $13, updated_at = now() \
             WHERE id = $1 \
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(listing.id)
        .bind(&listing.name)
        .bind(&listing.description)
        .bind(&listing.address)
        .bind(listing.regular_price)
        .bind(listing.discounted_price)
        .bind(listing.bedrooms)
        .bind(listing.bathrooms)
        .bind(listing.parking)
        .bind(listing.furnished)
        .bind(listing.offer)
        .bind(listing.kind)
        .bind(&listing.image_urls)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Newest-first catalog of one owner, for the profile page.
    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> sqlx::Result<Vec<Listing>> {
        sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings \
             WHERE owner_id = $1 \
             ORDER BY created_at DESC, seq DESC"
        ))
        .bind(owner_id)
        .fetch_all(db)
        .await
    }

    /// Run a filter spec against the store. One statement; the page is a pure
    /// function of store state and spec.
    pub async fn search(db: &PgPool, q: &ListingQuery) -> sqlx::Result<SearchPage> {
        let mut builder = build_search(q);
        let items = builder
            .build_query_as::<Listing>()
            .fetch_all(db)
            .await?;
        Ok(SearchPage::new(items, q.limit))
    }
}

/// Assemble the search statement: optional filters, a total order (sort key,
/// then insertion order so ties page deterministically), then the window.
fn build_search(q: &ListingQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new(format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE TRUE"
    ));

    if let Some(term) = &q.search_term {
        builder.push(" AND name ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(term)));
    }
    if let Some(kind) = q.kind {
        builder.push(" AND kind = ");
        builder.push_bind(kind);
    }
    if let Some(parking) = q.parking {
        builder.push(" AND parking = ");
        builder.push_bind(parking);
    }
    if let Some(furnished) = q.furnished {
        builder.push(" AND furnished = ");
        builder.push_bind(furnished);
    }
    if let Some(offer) = q.offer {
        builder.push(" AND offer = ");
        builder.push_bind(offer);
    }

    builder.push(" ORDER BY ");
    builder.push(q.sort.column());
    builder.push(" ");
    builder.push(q.order.sql());
    builder.push(", seq ASC");

    builder.push(" LIMIT ");
    builder.push_bind(q.limit);
    builder.push(" OFFSET ");
    builder.push_bind(q.start_index);

    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::query::{SortKey, SortOrder};

    #[test]
    fn unfiltered_search_has_stable_default_order() {
        let sql = build_search(&ListingQuery::default()).into_sql();
        assert!(sql.contains("FROM listings WHERE TRUE ORDER BY created_at DESC, seq ASC"));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
        assert!(!sql.contains(" AND "));
    }

    #[test]
    fn search_term_becomes_ilike_filter() {
        let q = ListingQuery {
            search_term: Some("villa".into()),
            ..ListingQuery::default()
        };
        let sql = build_search(&q).into_sql();
        assert!(sql.contains("AND name ILIKE $1"));
    }

    #[test]
    fn all_filters_stack() {
        let q = ListingQuery {
            search_term: Some("loft".into()),
            kind: Some(ListingKind::Rent),
            parking: Some(true),
            furnished: Some(true),
            offer: Some(true),
            ..ListingQuery::default()
        };
        let sql = build_search(&q).into_sql();
        assert!(sql.contains("AND name ILIKE $1"));
        assert!(sql.contains("AND kind = $2"));
        assert!(sql.contains("AND parking = $3"));
        assert!(sql.contains("AND furnished = $4"));
        assert!(sql.contains("AND offer = $5"));
        assert!(sql.ends_with("LIMIT $6 OFFSET $7"));
    }

    #[test]
    fn price_sort_keeps_insertion_tiebreak() {
        let q = ListingQuery {
            sort: SortKey::RegularPrice,
            order: SortOrder::Asc,
            ..ListingQuery::default()
        };
        let sql = build_search(&q).into_sql();
        assert!(sql.contains("ORDER BY regular_price ASC, seq ASC"));
    }
}
