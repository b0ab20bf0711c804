use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Listing, ListingKind};
use crate::error::ApiError;

pub const MAX_IMAGES: usize = 6;

/// Create body. There is deliberately no owner field here: the owner is bound
/// from the verified session, and any `userRef` a client sends is dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub name: String,
    pub description: String,
    pub address: String,
    pub regular_price: i64,
    pub discounted_price: i64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub offer: bool,
    pub image_urls: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ListingKind,
}

impl CreateListingRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_fields(
            &self.name,
            &self.description,
            &self.address,
            self.regular_price,
            self.discounted_price,
            self.bedrooms,
            self.bathrooms,
            self.offer,
            &self.image_urls,
        )
    }
}

/// Partial update: each present field replaces the stored value, absent
/// fields stay untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub regular_price: Option<i64>,
    pub discounted_price: Option<i64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking: Option<bool>,
    pub furnished: Option<bool>,
    pub offer: Option<bool>,
    pub image_urls: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<ListingKind>,
}

impl UpdateListingRequest {
    pub fn apply(self, listing: &mut Listing) {
        if let Some(name) = self.name {
            listing.name = name;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(address) = self.address {
            listing.address = address;
        }
        if let Some(regular_price) = self.regular_price {
            listing.regular_price = regular_price;
        }
        if let Some(discounted_price) = self.discounted_price {
            listing.discounted_price = discounted_price;
        }
        if let Some(bedrooms) = self.bedrooms {
            listing.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(parking) = self.parking {
            listing.parking = parking;
        }
        if let Some(furnished) = self.furnished {
            listing.furnished = furnished;
        }
        if let Some(offer) = self.offer {
            listing.offer = offer;
        }
        if let Some(image_urls) = self.image_urls {
            listing.image_urls = image_urls;
        }
        if let Some(kind) = self.kind {
            listing.kind = kind;
        }
    }
}

impl Listing {
    /// Invariant check over the full row; run after every patch, before the
    /// write.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_fields(
            &self.name,
            &self.description,
            &self.address,
            self.regular_price,
            self.discounted_price,
            self.bedrooms,
            self.bathrooms,
            self.offer,
            &self.image_urls,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_fields(
    name: &str,
    description: &str,
    address: &str,
    regular_price: i64,
    discounted_price: i64,
    bedrooms: i32,
    bathrooms: i32,
    offer: bool,
    image_urls: &[String],
) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if description.trim().is_empty() {
        return Err(ApiError::Validation("description is required".into()));
    }
    if address.trim().is_empty() {
        return Err(ApiError::Validation("address is required".into()));
    }
    if regular_price <= 0 {
        return Err(ApiError::Validation("regularPrice must be positive".into()));
    }
    if discounted_price <= 0 {
        return Err(ApiError::Validation(
            "discountedPrice must be positive".into(),
        ));
    }
    if bedrooms < 0 || bathrooms < 0 {
        return Err(ApiError::Validation(
            "bedrooms and bathrooms must not be negative".into(),
        ));
    }
    if image_urls.is_empty() {
        return Err(ApiError::Validation("at least one image is required".into()));
    }
    if image_urls.len() > MAX_IMAGES {
        return Err(ApiError::Validation(format!(
            "at most {MAX_IMAGES} images are allowed"
        )));
    }
    if image_urls.iter().any(|url| url.trim().is_empty()) {
        return Err(ApiError::Validation("image urls must not be empty".into()));
    }
    if offer && discounted_price > regular_price {
        return Err(ApiError::Validation(
            "discounted price must not exceed regular price on an offer".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
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
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub image_urls: Vec<String>,
    pub user_ref: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            name: listing.name,
            description: listing.description,
            address: listing.address,
            regular_price: listing.regular_price,
            discounted_price: listing.discounted_price,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            parking: listing.parking,
            furnished: listing.furnished,
            offer: listing.offer,
            kind: listing.kind,
            image_urls: listing.image_urls,
            user_ref: listing.owner_id,
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateListingRequest {
        CreateListingRequest {
            name: "Seaside villa".into(),
            description: "Three rooms by the shore".into(),
            address: "1 Beach Road".into(),
            regular_price: 1000,
            discounted_price: 900,
            bedrooms: 3,
            bathrooms: 2,
            parking: true,
            furnished: false,
            offer: true,
            image_urls: vec!["https://img.example/1.jpg".into()],
            kind: ListingKind::Rent,
        }
    }

    fn stored(req: &CreateListingRequest) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            seq: 1,
            owner_id: Uuid::new_v4(),
            name: req.name.clone(),
            description: req.description.clone(),
            address: req.address.clone(),
            regular_price: req.regular_price,
            discounted_price: req.discounted_price,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            parking: req.parking,
            furnished: req.furnished,
            offer: req.offer,
            kind: req.kind,
            image_urls: req.image_urls.clone(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn valid_listing_passes() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn images_are_required_and_capped() {
        let mut req = valid_create();
        req.image_urls.clear();
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        req.image_urls = vec!["https://img.example/x.jpg".into(); MAX_IMAGES + 1];
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        req.image_urls.truncate(MAX_IMAGES);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn offer_requires_discount_below_regular() {
        let mut req = valid_create();
        req.offer = true;
        req.discounted_price = req.regular_price + 1;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        // without an active offer the prices are unrelated
        req.offer = false;
        assert!(req.validate().is_ok());

        // equality is allowed on an offer
        req.offer = true;
        req.discounted_price = req.regular_price;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn prices_must_be_positive() {
        let mut req = valid_create();
        req.regular_price = 0;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        req.regular_price = 1000;
        req.discounted_price = -5;
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn create_body_ignores_client_supplied_user_ref() {
        // The owner is bound from the verified session token; a userRef in
        // the body must have no effect.
        let body = serde_json::json!({
            "name": "Spoofed",
            "description": "d",
            "address": "a",
            "regularPrice": 100,
            "discountedPrice": 100,
            "bedrooms": 1,
            "bathrooms": 1,
            "imageUrls": ["https://img.example/1.jpg"],
            "type": "sale",
            "userRef": "11111111-1111-1111-1111-111111111111"
        });
        let req: CreateListingRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.name, "Spoofed");
    }

    #[test]
    fn patch_replaces_only_present_fields() {
        let req = valid_create();
        let mut listing = stored(&req);

        UpdateListingRequest {
            name: Some("Renamed".into()),
            bedrooms: Some(5),
            ..UpdateListingRequest::default()
        }
        .apply(&mut listing);

        assert_eq!(listing.name, "Renamed");
        assert_eq!(listing.bedrooms, 5);
        assert_eq!(listing.description, req.description);
        assert_eq!(listing.regular_price, req.regular_price);
        assert_eq!(listing.kind, ListingKind::Rent);
    }

    #[test]
    fn patch_cannot_break_offer_invariant() {
        let mut listing = stored(&valid_create());

        UpdateListingRequest {
            offer: Some(true),
            discounted_price: Some(listing.regular_price + 500),
            ..UpdateListingRequest::default()
        }
        .apply(&mut listing);

        assert!(matches!(listing.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn response_uses_wire_field_names() {
        let listing = stored(&valid_create());
        let owner = listing.owner_id;
        let json = serde_json::to_string(&ListingResponse::from(listing)).unwrap();
        assert!(json.contains(r#""regularPrice":1000"#));
        assert!(json.contains(r#""type":"rent""#));
        assert!(json.contains(&format!(r#""userRef":"{owner}""#)));
        assert!(json.contains(r#""imageUrls""#));
        assert!(!json.contains("seq"));
    }
}
