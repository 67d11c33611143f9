//! Extractors whose rejections are reported through [`ApiError`], so every
//! failed request gets the JSON error body.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::request::Parts,
};
use serde_json::{Map, Value};

use cbay_types::filter::{FilterError, ListingFilterParams};

use crate::error::ApiError;

pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Query string of `GET /listings`.
///
/// `categories` may be repeated (`?categories=books&categories=furniture`);
/// its values are joined as if sent comma-separated. Any other repeated
/// field is an invalid argument.
pub struct FilterQuery(pub ListingFilterParams);

impl<S> FromRequestParts<S> for FilterQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();

        let mut fields = Map::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match fields.get_mut(&*key) {
                None => {
                    fields.insert(key.into_owned(), Value::String(value.into_owned()));
                }
                Some(Value::String(joined)) if key == "categories" => {
                    joined.push(',');
                    joined.push_str(&value);
                }
                Some(_) => {
                    return Err(FilterError::Repeated {
                        field: key.into_owned(),
                    }
                    .into());
                }
            }
        }

        serde_json::from_value(Value::Object(fields))
            .map(Self)
            .map_err(|e| ApiError::Malformed(format!("invalid query string: {}", e)))
    }
}
