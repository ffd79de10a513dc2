use super::{bootcamps::find_bootcamp_for_child, list_for_bootcamp, ApiJson, ApiQuery, QueryPairs};
use crate::{
    auth::AuthUser,
    db::Database,
    models::{
        document_to_json, parse_id, to_json, DataResponse, ListResponse, NewReview, Review,
        ReviewUpdate, Role,
    },
    query::{find_populated, ListQuery, Populate},
    state::AppState,
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use mongodb::{
    bson::{self, doc, oid::ObjectId},
    options::ReturnDocument,
};
use serde_json::{json, Value};
use validator::Validate;

/// Roles allowed to post reviews
const REVIEWERS: [Role; 2] = [Role::User, Role::Admin];

fn review_not_found(id: ObjectId) -> ApiError {
    ApiError::not_found_error(format!("No review found with the id of {}", id))
}

async fn find_review(db: &Database, id: ObjectId) -> ApiResult<Review> {
    db.reviews()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| review_not_found(id))
}

async fn refresh_average_rating(db: &Database, bootcamp_id: ObjectId) {
    if let Err(err) = db.refresh_average_rating(bootcamp_id).await {
        tracing::warn!(bootcamp = %bootcamp_id, "Average rating refresh failed: {}", err);
    }
}

pub async fn get_reviews(
    State(state): State<AppState>,
    ApiQuery(params): QueryPairs,
) -> ApiResult<Json<ListResponse>> {
    let query = ListQuery::parse::<Review>(&params)?;
    let response = query
        .execute::<Review>(&state.db, Some(&Populate::bootcamp_summary()))
        .await?;
    Ok(Json(response))
}

pub async fn get_bootcamp_reviews(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Json<ListResponse>> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    Ok(Json(list_for_bootcamp::<Review>(&state.db, bootcamp_id).await?))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    let id = parse_id(&id)?;
    let review = find_populated::<Review>(&state.db, id, &Populate::bootcamp_summary())
        .await?
        .ok_or_else(|| review_not_found(id))?;
    Ok(Json(DataResponse::new(document_to_json(review))))
}

/// Review a bootcamp; a second review by the same user is a duplicate
pub async fn add_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    ApiJson(payload): ApiJson<NewReview>,
) -> ApiResult<(StatusCode, Json<DataResponse<Value>>)> {
    auth_user.require_role(&REVIEWERS)?;

    let bootcamp_id = parse_id(&bootcamp_id)?;
    find_bootcamp_for_child(&state.db, bootcamp_id).await?;

    let payload = payload.normalized();
    payload.validate()?;

    let mut review = payload.into_review(bootcamp_id, auth_user.id);
    let result = state.db.reviews().insert_one(&review).await?;
    review.id = result.inserted_id.as_object_id();

    refresh_average_rating(&state.db, bootcamp_id).await;
    tracing::info!(review = ?review.id, bootcamp = %bootcamp_id, user = %auth_user.id, "Review added");

    Ok((StatusCode::CREATED, Json(DataResponse::new(to_json(&review)?))))
}

pub async fn update_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ReviewUpdate>,
) -> ApiResult<Json<DataResponse<Value>>> {
    let id = parse_id(&id)?;
    let review = find_review(&state.db, id).await?;
    auth_user.ensure_owner(review.user, &format!("update review {}", id))?;

    let update = update.normalized();
    update.validate()?;

    let set = bson::to_document(&update)?;
    if set.is_empty() {
        return Ok(Json(DataResponse::new(to_json(&review)?)));
    }

    let updated = state
        .db
        .reviews()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| review_not_found(id))?;

    if update.rating.is_some() {
        refresh_average_rating(&state.db, updated.bootcamp).await;
    }

    Ok(Json(DataResponse::new(to_json(&updated)?)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    let id = parse_id(&id)?;
    let review = find_review(&state.db, id).await?;
    auth_user.ensure_owner(review.user, &format!("delete review {}", id))?;

    state.db.reviews().delete_one(doc! { "_id": id }).await?;
    // Recompute after removal
    refresh_average_rating(&state.db, review.bootcamp).await;

    tracing::info!(review = %id, bootcamp = %review.bootcamp, "Review deleted");
    Ok(Json(DataResponse::new(json!({}))))
}
