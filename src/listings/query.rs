use serde::Deserialize;

use super::repo::{Listing, ListingKind};
use crate::error::ApiError;

pub const DEFAULT_LIMIT: i64 = 9;

/// Raw query-string input. Everything arrives as optional strings so that
/// partial or junk filter input from the search UI degrades to defaults
/// instead of a framework-level rejection; only malformed numerics error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub search_term: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub parking: Option<String>,
    pub furnished: Option<String>,
    pub offer: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub start_index: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    RegularPrice,
}

impl SortKey {
    pub fn column(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::RegularPrice => "regular_price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated filter spec. A given spec against a given store state always
/// produces the same ordered page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub search_term: Option<String>,
    pub kind: Option<ListingKind>,
    pub parking: Option<bool>,
    pub furnished: Option<bool>,
    pub offer: Option<bool>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub start_index: i64,
    pub limit: i64,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            search_term: None,
            kind: None,
            parking: None,
            furnished: None,
            offer: None,
            sort: SortKey::CreatedAt,
            order: SortOrder::Desc,
            start_index: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TryFrom<SearchParams> for ListingQuery {
    type Error = ApiError;

    fn try_from(params: SearchParams) -> Result<Self, ApiError> {
        let start_index = match params.start_index.as_deref() {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| *v >= 0)
                .ok_or_else(|| ApiError::Validation(format!("invalid startIndex: {raw}")))?,
        };

        let limit = match params.limit.as_deref() {
            None | Some("") => DEFAULT_LIMIT,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| ApiError::Validation(format!("invalid limit: {raw}")))?,
        };

        let kind = match params.kind.as_deref() {
            Some("rent") => Some(ListingKind::Rent),
            Some("sale") => Some(ListingKind::Sale),
            // "all", absent, or anything unrecognized disables the filter
            _ => None,
        };

        let sort = match params.sort.as_deref() {
            Some("regularPrice") | Some("regular_price") => SortKey::RegularPrice,
            Some("created_at") | Some("createdAt") => SortKey::CreatedAt,
            _ => SortKey::CreatedAt,
        };

        let order = match params.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Desc,
        };

        Ok(Self {
            search_term: params.search_term.filter(|s| !s.is_empty()),
            kind,
            parking: flag(params.parking),
            furnished: flag(params.furnished),
            offer: flag(params.offer),
            sort,
            order,
            start_index,
            limit,
        })
    }
}

/// Only the literal `true` constrains; `false`, absent and junk all mean
/// "both values pass".
fn flag(raw: Option<String>) -> Option<bool> {
    match raw.as_deref() {
        Some("true") => Some(true),
        _ => None,
    }
}

/// Escape LIKE metacharacters in a user-supplied term so it matches as a
/// literal substring.
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One result window. `has_more_hint` is a heuristic for the client's
/// "load more" control, not an exact total-count check: it is set iff the
/// page came back full.
#[derive(Debug)]
pub struct SearchPage {
    pub items: Vec<Listing>,
    pub has_more_hint: bool,
}

impl SearchPage {
    pub fn new(items: Vec<Listing>, limit: i64) -> Self {
        let has_more_hint = items.len() as i64 == limit;
        Self {
            items,
            has_more_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SearchParams {
        SearchParams::default()
    }

    #[test]
    fn empty_params_yield_documented_defaults() {
        let q = ListingQuery::try_from(params()).unwrap();
        assert_eq!(q, ListingQuery::default());
        assert_eq!(q.sort, SortKey::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.start_index, 0);
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn malformed_start_index_is_a_validation_error() {
        let q = ListingQuery::try_from(SearchParams {
            start_index: Some("abc".into()),
            ..params()
        });
        assert!(matches!(q, Err(ApiError::Validation(_))));
    }

    #[test]
    fn negative_start_index_is_a_validation_error() {
        let q = ListingQuery::try_from(SearchParams {
            start_index: Some("-3".into()),
            ..params()
        });
        assert!(matches!(q, Err(ApiError::Validation(_))));
    }

    #[test]
    fn zero_limit_is_a_validation_error() {
        let q = ListingQuery::try_from(SearchParams {
            limit: Some("0".into()),
            ..params()
        });
        assert!(matches!(q, Err(ApiError::Validation(_))));
    }

    #[test]
    fn numeric_params_parse() {
        let q = ListingQuery::try_from(SearchParams {
            start_index: Some("18".into()),
            limit: Some("9".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(q.start_index, 18);
        assert_eq!(q.limit, 9);
    }

    #[test]
    fn type_all_and_junk_disable_the_filter() {
        for raw in ["all", "castle", ""] {
            let q = ListingQuery::try_from(SearchParams {
                kind: Some(raw.into()),
                ..params()
            })
            .unwrap();
            assert_eq!(q.kind, None, "type={raw:?}");
        }
    }

    #[test]
    fn type_rent_and_sale_filter() {
        let q = ListingQuery::try_from(SearchParams {
            kind: Some("rent".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(q.kind, Some(ListingKind::Rent));

        let q = ListingQuery::try_from(SearchParams {
            kind: Some("sale".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(q.kind, Some(ListingKind::Sale));
    }

    #[test]
    fn only_literal_true_constrains_boolean_filters() {
        assert_eq!(flag(Some("true".into())), Some(true));
        assert_eq!(flag(Some("false".into())), None);
        assert_eq!(flag(Some("yes".into())), None);
        assert_eq!(flag(None), None);
    }

    #[test]
    fn unknown_sort_and_order_fall_back() {
        let q = ListingQuery::try_from(SearchParams {
            sort: Some("bathrooms".into()),
            order: Some("sideways".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(q.sort, SortKey::CreatedAt);
        assert_eq!(q.order, SortOrder::Desc);
    }

    #[test]
    fn sort_aliases_are_accepted() {
        for raw in ["regularPrice", "regular_price"] {
            let q = ListingQuery::try_from(SearchParams {
                sort: Some(raw.into()),
                order: Some("asc".into()),
                ..params()
            })
            .unwrap();
            assert_eq!(q.sort, SortKey::RegularPrice);
            assert_eq!(q.order, SortOrder::Asc);
        }
    }

    #[test]
    fn empty_search_term_is_dropped() {
        let q = ListingQuery::try_from(SearchParams {
            search_term: Some("".into()),
            ..params()
        })
        .unwrap();
        assert_eq!(q.search_term, None);
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("villa"), "villa");
        assert_eq!(escape_like("100%_done"), r"100\%\_done");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
    }

    fn dummy_listing() -> Listing {
        use time::OffsetDateTime;
        use uuid::Uuid;

        Listing {
            id: Uuid::new_v4(),
            seq: 1,
            owner_id: Uuid::new_v4(),
            name: "Cabin".into(),
            description: "One room".into(),
            address: "Forest 1".into(),
            regular_price: 100,
            discounted_price: 100,
            bedrooms: 1,
            bathrooms: 1,
            parking: false,
            furnished: false,
            offer: false,
            kind: ListingKind::Sale,
            image_urls: vec!["https://img.example/1.jpg".into()],
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn only_a_full_page_hints_more() {
        let page = SearchPage::new(Vec::new(), DEFAULT_LIMIT);
        assert!(!page.has_more_hint);

        let page = SearchPage::new(vec![dummy_listing()], 2);
        assert!(!page.has_more_hint);

        let page = SearchPage::new(vec![dummy_listing(), dummy_listing()], 2);
        assert!(page.has_more_hint);
    }
}
