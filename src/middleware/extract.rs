//! `Query`, `Path` and `Json` extractors whose rejections render as
//! [`AtlasError`], so malformed input gets the same error body as
//! everything else.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AtlasError;

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AtlasError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AtlasError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AtlasError))]
pub struct ApiJson<T>(pub T);

impl From<QueryRejection> for AtlasError {
    fn from(rejection: QueryRejection) -> Self {
        AtlasError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AtlasError {
    fn from(rejection: PathRejection) -> Self {
        AtlasError::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AtlasError {
    fn from(rejection: JsonRejection) -> Self {
        AtlasError::InvalidRequest(rejection.body_text())
    }
}
