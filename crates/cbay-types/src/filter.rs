//! Listing filter criteria.
//!
//! Criteria arrive as raw query-string values ([`ListingFilterParams`]) and
//! are parsed into a typed [`ListingFilter`]. Every field is optional and
//! supplied fields combine with AND semantics.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid value {value:?} for filter field {field}")]
    InvalidArgument { field: &'static str, value: String },

    #[error("filter field {field} given more than once")]
    Repeated { field: String },
}

/// Raw filter values as they appear on the wire. Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilterParams {
    pub name: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    pub negotiable: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    /// Comma-separated labels.
    pub categories: Option<String>,
    pub date_created: Option<String>,
    /// Hours.
    pub timeframe: Option<String>,
    pub sold: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub university: Option<String>,
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// Case-insensitive substring of the item name.
    pub name: Option<String>,
    pub max_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    /// Only `Some(true)` narrows the result.
    pub negotiable: Option<bool>,
    pub condition: Option<String>,
    pub location: Option<String>,
    /// Any-of match on category labels. Empty means no category filter.
    pub categories: Vec<String>,
    /// Calendar date (UTC) the listing was created on.
    pub date_created: Option<NaiveDate>,
    pub timeframe_hours: Option<u32>,
    pub sold: Option<bool>,
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of the owner's university.
    pub university: Option<String>,
    pub user_email: Option<String>,
}

impl ListingFilter {
    /// True when no field is supplied. `sold == Some(false)` is supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.max_price.is_none()
            && self.min_price.is_none()
            && self.negotiable.is_none()
            && self.condition.is_none()
            && self.location.is_none()
            && self.categories.is_empty()
            && self.date_created.is_none()
            && self.timeframe_hours.is_none()
            && self.sold.is_none()
            && self.user_id.is_none()
            && self.university.is_none()
            && self.user_email.is_none()
    }

    /// Oldest creation time admitted by `timeframe_hours`, relative to `now`.
    /// `None` when the window reaches past the representable range.
    pub fn timeframe_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let hours = self.timeframe_hours?;
        now.checked_sub_signed(TimeDelta::hours(i64::from(hours)))
    }
}

impl TryFrom<ListingFilterParams> for ListingFilter {
    type Error = FilterError;

    fn try_from(params: ListingFilterParams) -> Result<Self, Self::Error> {
        let max_price = parse_opt("maxPrice", params.max_price, parse_price)?;
        let min_price = parse_opt("minPrice", params.min_price, parse_price)?;

        Ok(ListingFilter {
            name: present(params.name),
            max_price,
            min_price,
            negotiable: parse_opt("negotiable", params.negotiable, |v| v.parse().ok())?,
            condition: present(params.condition),
            location: present(params.location),
            categories: split_categories(params.categories.as_deref()),
            date_created: parse_opt("date_created", params.date_created, |v| {
                NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()
            })?,
            timeframe_hours: parse_opt("timeframe", params.timeframe, |v| v.parse().ok())?,
            sold: parse_opt("sold", params.sold, |v| v.parse().ok())?,
            user_id: parse_opt("userID", params.user_id, |v| v.parse().ok())?,
            university: present(params.university),
            user_email: present(params.user_email),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_opt<T>(
    field: &'static str,
    value: Option<String>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, FilterError> {
    match present(value) {
        None => Ok(None),
        Some(v) => match parse(&v) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(FilterError::InvalidArgument { field, value: v }),
        },
    }
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value).ok().filter(|d| !d.is_sign_negative() || d.is_zero())
}

fn split_categories(value: Option<&str>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in value.unwrap_or_default().split(',').map(str::trim) {
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(params: ListingFilterParams) -> Result<ListingFilter, FilterError> {
        ListingFilter::try_from(params)
    }

    #[test]
    fn no_params_is_empty() {
        let filter = parse(ListingFilterParams::default()).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn sold_false_counts_as_supplied() {
        let filter = parse(ListingFilterParams {
            sold: Some("false".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.sold, Some(false));
        assert!(!filter.is_empty());
    }

    #[test]
    fn blank_values_are_absent() {
        let filter = parse(ListingFilterParams {
            name: Some("  ".into()),
            categories: Some(" , ,".into()),
            sold: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn categories_split_on_commas() {
        let filter = parse(ListingFilterParams {
            categories: Some("books, furniture,books".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.categories, vec!["books", "furniture"]);
    }

    #[test]
    fn non_numeric_price_is_invalid_argument() {
        let err = parse(ListingFilterParams {
            max_price: Some("cheap".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidArgument { field: "maxPrice", value: "cheap".into() }
        );
    }

    #[test]
    fn negative_bounds_are_invalid() {
        assert!(parse(ListingFilterParams { min_price: Some("-3".into()), ..Default::default() }).is_err());
        assert!(parse(ListingFilterParams { timeframe: Some("-3".into()), ..Default::default() }).is_err());
    }

    #[test]
    fn malformed_scalars_name_their_field() {
        let cases = [
            (ListingFilterParams { sold: Some("yes".into()), ..Default::default() }, "sold"),
            (ListingFilterParams { negotiable: Some("1".into()), ..Default::default() }, "negotiable"),
            (ListingFilterParams { date_created: Some("03/09/2021".into()), ..Default::default() }, "date_created"),
            (ListingFilterParams { user_id: Some("42".into()), ..Default::default() }, "userID"),
        ];
        for (params, expected) in cases {
            match parse(params) {
                Err(FilterError::InvalidArgument { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidArgument for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn typed_values_parse() {
        let filter = parse(ListingFilterParams {
            min_price: Some("5".into()),
            date_created: Some("2021-03-09".into()),
            timeframe: Some("24".into()),
            negotiable: Some("true".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.min_price, Some(Decimal::from(5)));
        assert_eq!(filter.date_created, NaiveDate::from_ymd_opt(2021, 3, 9));
        assert_eq!(filter.timeframe_hours, Some(24));
        assert_eq!(filter.negotiable, Some(true));
    }

    #[test]
    fn timeframe_cutoff_is_relative_to_now() {
        let now = Utc::now();
        let filter = ListingFilter { timeframe_hours: Some(2), ..Default::default() };
        assert_eq!(filter.timeframe_cutoff(now), Some(now - TimeDelta::hours(2)));
        assert_eq!(ListingFilter::default().timeframe_cutoff(now), None);
    }
}
