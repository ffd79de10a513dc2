pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;

use crate::{
    db::Database,
    models::{document_to_json, ListResponse, Resource},
    utils::{ApiError, ApiResult},
};
use axum::extract::{FromRequest, FromRequestParts};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

/// JSON body extractor whose rejections use the API error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the API error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Raw query-string pairs, in order, for the list-query builder
pub type QueryPairs = ApiQuery<Vec<(String, String)>>;

/// Every `R` attached to a bootcamp, unpaged
pub(crate) async fn list_for_bootcamp<R: Resource>(
    db: &Database,
    bootcamp_id: ObjectId,
) -> ApiResult<ListResponse> {
    let documents: Vec<Document> = db
        .raw::<R>()
        .find(doc! { "bootcamp": bootcamp_id })
        .sort(doc! { "createdAt": -1, "_id": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(ListResponse::new(
        documents.into_iter().map(document_to_json).collect(),
    ))
}
