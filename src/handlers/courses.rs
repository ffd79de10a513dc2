use super::{bootcamps::find_bootcamp_for_child, list_for_bootcamp, ApiJson, ApiQuery, QueryPairs};
use crate::{
    auth::AuthUser,
    db::Database,
    models::{
        document_to_json, parse_id, to_json, Course, CourseUpdate, DataResponse, ListResponse,
        NewCourse, Role,
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

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

fn course_not_found(id: ObjectId) -> ApiError {
    ApiError::not_found_error(format!("No course with the id of {}", id))
}

async fn find_course(db: &Database, id: ObjectId) -> ApiResult<Course> {
    db.courses()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| course_not_found(id))
}

/// Recompute the bootcamp's average cost; failures only get logged
async fn refresh_average_cost(db: &Database, bootcamp_id: ObjectId) {
    if let Err(err) = db.refresh_average_cost(bootcamp_id).await {
        tracing::warn!(bootcamp = %bootcamp_id, "Average cost refresh failed: {}", err);
    }
}

/// All courses, with filtering and paging
pub async fn get_courses(
    State(state): State<AppState>,
    ApiQuery(params): QueryPairs,
) -> ApiResult<Json<ListResponse>> {
    let query = ListQuery::parse::<Course>(&params)?;
    let response = query
        .execute::<Course>(&state.db, Some(&Populate::bootcamp_summary()))
        .await?;
    Ok(Json(response))
}

pub async fn get_bootcamp_courses(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Json<ListResponse>> {
    let bootcamp_id = parse_id(&bootcamp_id)?;
    Ok(Json(list_for_bootcamp::<Course>(&state.db, bootcamp_id).await?))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    let id = parse_id(&id)?;
    let course = find_populated::<Course>(&state.db, id, &Populate::bootcamp_summary())
        .await?
        .ok_or_else(|| course_not_found(id))?;
    Ok(Json(DataResponse::new(document_to_json(course))))
}

pub async fn add_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(bootcamp_id): Path<String>,
    ApiJson(payload): ApiJson<NewCourse>,
) -> ApiResult<(StatusCode, Json<DataResponse<Value>>)> {
    auth_user.require_role(&PUBLISHERS)?;

    let bootcamp_id = parse_id(&bootcamp_id)?;
    let bootcamp = find_bootcamp_for_child(&state.db, bootcamp_id).await?;
    auth_user.ensure_owner(
        bootcamp.user,
        &format!("add a course to bootcamp {}", bootcamp_id),
    )?;

    let payload = payload.normalized();
    payload.validate()?;

    let mut course = payload.into_course(bootcamp_id, auth_user.id);
    let result = state.db.courses().insert_one(&course).await?;
    course.id = result.inserted_id.as_object_id();

    refresh_average_cost(&state.db, bootcamp_id).await;
    tracing::info!(course = ?course.id, bootcamp = %bootcamp_id, "Course added");

    Ok((StatusCode::CREATED, Json(DataResponse::new(to_json(&course)?))))
}

pub async fn update_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<CourseUpdate>,
) -> ApiResult<Json<DataResponse<Value>>> {
    auth_user.require_role(&PUBLISHERS)?;

    let id = parse_id(&id)?;
    let course = find_course(&state.db, id).await?;
    auth_user.ensure_owner(course.user, &format!("update course {}", id))?;

    let update = update.normalized();
    update.validate()?;

    let set = bson::to_document(&update)?;
    if set.is_empty() {
        return Ok(Json(DataResponse::new(to_json(&course)?)));
    }

    let updated = state
        .db
        .courses()
        .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| course_not_found(id))?;

    if update.tuition.is_some() {
        refresh_average_cost(&state.db, updated.bootcamp).await;
    }

    Ok(Json(DataResponse::new(to_json(&updated)?)))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    auth_user.require_role(&PUBLISHERS)?;

    let id = parse_id(&id)?;
    let course = find_course(&state.db, id).await?;
    auth_user.ensure_owner(course.user, &format!("delete course {}", id))?;

    state.db.courses().delete_one(doc! { "_id": id }).await?;
    refresh_average_cost(&state.db, course.bootcamp).await;

    tracing::info!(course = %id, bootcamp = %course.bootcamp, "Course deleted");
    Ok(Json(DataResponse::new(json!({}))))
}
