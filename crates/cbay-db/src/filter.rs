//! Listing filter resolver.
//!
//! A request with no supplied field short-circuits to the plain "all
//! listings, newest first" query. Otherwise each supplied field adds one
//! independent predicate (AND). The category predicate is evaluated through
//! a join, so a listing matching several labels comes back once per matching
//! row and the result is de-duplicated by id before children are attached.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use tracing::debug;

use cbay_types::filter::ListingFilter;
use cbay_types::money::{ceil_cents, floor_cents};

use crate::listings::{LISTING_ORDER, listing_select, read_listing, with_children};
use crate::models::{ListingDetails, ListingRow};
use crate::{Database, to_db_timestamp};

impl Database {
    pub fn filter_listings(&self, filter: &ListingFilter) -> Result<Vec<ListingDetails>> {
        self.filter_listings_at(filter, Utc::now())
    }

    /// Like [`Database::filter_listings`] with an explicit clock for `timeframe`.
    pub fn filter_listings_at(
        &self,
        filter: &ListingFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListingDetails>> {
        if filter.is_empty() {
            return self.list_listings();
        }

        let query = FilterQuery::build(filter, now);
        debug!("Filtering listings: {}", query.sql);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query.sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(query.values.iter()), read_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            with_children(conn, dedup_by_id(rows))
        })
    }
}

#[derive(Debug, Default)]
struct FilterQuery {
    sql: String,
    values: Vec<Value>,
}

#[derive(Default)]
struct Predicates {
    joins: Vec<&'static str>,
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Predicates {
    fn push(&mut self, clause: impl Into<String>, values: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.into());
        self.values.extend(values);
    }
}

impl FilterQuery {
    fn build(filter: &ListingFilter, now: DateTime<Utc>) -> Self {
        let mut p = Predicates::default();

        if let Some(name) = &filter.name {
            p.push("l.item_name LIKE ? ESCAPE '\\'", [Value::Text(like_pattern(name))]);
        }
        if let Some(max) = filter.max_price {
            p.push("l.price_cents <= ?", [Value::Integer(floor_cents(max))]);
        }
        if let Some(min) = filter.min_price {
            p.push("l.price_cents >= ?", [Value::Integer(ceil_cents(min))]);
        }
        if filter.negotiable == Some(true) {
            p.push("l.negotiable = 1", []);
        }
        if let Some(condition) = &filter.condition {
            p.push("l.condition = ?", [Value::Text(condition.clone())]);
        }
        if let Some(location) = &filter.location {
            p.push("l.location = ?", [Value::Text(location.clone())]);
        }
        if !filter.categories.is_empty() {
            p.joins.push("JOIN categories c ON c.listing_id = l.id");
            let marks = vec!["?"; filter.categories.len()].join(", ");
            p.push(
                format!("c.category_name IN ({marks})"),
                filter.categories.iter().cloned().map(Value::Text),
            );
        }
        if let Some(date) = filter.date_created {
            p.push(
                "substr(l.date_created, 1, 10) = ?",
                [Value::Text(date.format("%Y-%m-%d").to_string())],
            );
        }
        if let Some(cutoff) = filter.timeframe_cutoff(now) {
            p.push("l.date_created >= ?", [Value::Text(to_db_timestamp(cutoff))]);
        }
        if let Some(sold) = filter.sold {
            p.push("l.sold = ?", [Value::Integer(i64::from(sold))]);
        }
        if let Some(user_id) = filter.user_id {
            p.push("l.user_id = ?", [Value::Text(user_id.to_string())]);
        }
        if let Some(university) = &filter.university {
            p.push("u.university LIKE ? ESCAPE '\\'", [Value::Text(like_pattern(university))]);
        }
        if let Some(email) = &filter.user_email {
            p.push("u.email = ?", [Value::Text(email.clone())]);
        }

        let mut sql = listing_select();
        for join in &p.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !p.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&p.clauses.join(" AND "));
        }
        sql.push(' ');
        sql.push_str(LISTING_ORDER);

        Self { sql, values: p.values }
    }
}

/// `%needle%` with LIKE metacharacters escaped. SQLite's LIKE folds ASCII case.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Keeps the first occurrence of each listing id.
fn dedup_by_id(rows: Vec<ListingRow>) -> Vec<ListingRow> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(row.id.clone())).collect()
}
