use super::{ApiJson, ApiQuery, QueryPairs};
use crate::{
    auth::AuthUser,
    db::Database,
    models::{
        bootcamp::slugify, document_to_json, parse_id, to_json, Bootcamp, BootcampUpdate,
        DataResponse, GeoPoint, ListResponse, NewBootcamp, Role,
    },
    query::{ListQuery, Populate},
    state::AppState,
    uploads,
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::ReturnDocument,
};
use serde_json::{json, Value};
use validator::Validate;

/// Earth radius in miles, for turning a distance into radians
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

pub(crate) async fn find_bootcamp(db: &Database, id: ObjectId) -> ApiResult<Bootcamp> {
    db.bootcamps()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| {
            ApiError::not_found_error(format!("Bootcamp with the id of {} not found", id))
        })
}

/// List bootcamps with filtering, paging and their courses
pub async fn get_bootcamps(
    State(state): State<AppState>,
    ApiQuery(params): QueryPairs,
) -> ApiResult<Json<ListResponse>> {
    let query = ListQuery::parse::<Bootcamp>(&params)?;
    let response = query
        .execute::<Bootcamp>(&state.db, Some(&Populate::courses()))
        .await?;
    Ok(Json(response))
}

pub async fn get_bootcamp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    let bootcamp = find_bootcamp(&state.db, parse_id(&id)?).await?;
    Ok(Json(DataResponse::new(to_json(&bootcamp)?)))
}

pub async fn create_bootcamp(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<NewBootcamp>,
) -> ApiResult<(StatusCode, Json<DataResponse<Value>>)> {
    auth_user.require_role(&PUBLISHERS)?;

    let payload = payload.normalized();
    payload.validate()?;

    let location = match (&state.geocoder, payload.address.as_deref()) {
        (Some(geocoder), Some(address)) => Some(GeoPoint::from(geocoder.geocode(address).await?)),
        _ => None,
    };

    let mut bootcamp = payload.into_bootcamp(auth_user.id, location);
    let result = state.db.bootcamps().insert_one(&bootcamp).await?;
    bootcamp.id = result.inserted_id.as_object_id();

    tracing::info!(
        bootcamp = ?bootcamp.id,
        user = %auth_user.id,
        name = %bootcamp.name,
        "Bootcamp created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(to_json(&bootcamp)?)),
    ))
}

pub async fn update_bootcamp(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<BootcampUpdate>,
) -> ApiResult<Json<DataResponse<Value>>> {
    auth_user.require_role(&PUBLISHERS)?;

    let id = parse_id(&id)?;
    let bootcamp = find_bootcamp(&state.db, id).await?;
    auth_user.ensure_owner(bootcamp.user, "update this bootcamp")?;

    let update = update.normalized();
    update.validate()?;
    if update.is_empty() {
        return Ok(Json(DataResponse::new(to_json(&bootcamp)?)));
    }

    let location = match (&state.geocoder, update.address.as_deref()) {
        (Some(geocoder), Some(address)) => Some(GeoPoint::from(geocoder.geocode(address).await?)),
        _ => None,
    };
    let changes = update_changes(&update, location)?;

    let updated = state
        .db
        .bootcamps()
        .find_one_and_update(doc! { "_id": id }, changes)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| {
            ApiError::not_found_error(format!("Bootcamp with the id of {} not found", id))
        })?;

    tracing::info!(bootcamp = %id, user = %auth_user.id, "Bootcamp updated");
    Ok(Json(DataResponse::new(to_json(&updated)?)))
}

/// `$set`/`$unset` for a bootcamp update. A new address either becomes a
/// geocoded `location` or replaces the old one, never both.
pub fn update_changes(
    update: &BootcampUpdate,
    location: Option<GeoPoint>,
) -> ApiResult<Document> {
    let mut set = bson::to_document(update)?;
    let mut unset = Document::new();
    if let Some(name) = &update.name {
        set.insert("slug", slugify(name));
    }
    match location {
        Some(location) => {
            set.insert("location", bson::to_bson(&location)?);
            set.remove("address");
            unset.insert("address", "");
        }
        None if update.address.is_some() => {
            unset.insert("location", "");
        }
        None => {}
    }

    let mut changes = doc! { "$set": set };
    if !unset.is_empty() {
        changes.insert("$unset", unset);
    }
    Ok(changes)
}

/// Delete a bootcamp along with its courses and reviews
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Value>>> {
    auth_user.require_role(&PUBLISHERS)?;

    let id = parse_id(&id)?;
    let bootcamp = find_bootcamp(&state.db, id).await?;
    auth_user.ensure_owner(bootcamp.user, "delete this bootcamp")?;

    state.db.delete_bootcamp_cascade(id).await?;

    Ok(Json(DataResponse::new(json!({}))))
}

/// Parse a radius-search distance in miles
pub fn parse_distance(raw: &str) -> ApiResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            ApiError::bad_request(format!("Distance must be a non-negative number, got `{}`", raw))
        })
}

/// `$geoWithin` filter for a circle of `distance` miles around `[lng, lat]`
pub fn within_radius(longitude: f64, latitude: f64, distance: f64) -> Document {
    let radius = distance / EARTH_RADIUS_MILES;
    doc! {
        "location": {
            "$geoWithin": { "$centerSphere": [[longitude, latitude], radius] }
        }
    }
}

/// Bootcamps within `distance` miles of a zipcode
pub async fn get_bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Json<ListResponse>> {
    let distance = parse_distance(&distance)?;
    let geocoder = state
        .geocoder
        .as_ref()
        .ok_or_else(|| ApiError::internal_error("Geocoder is not configured"))?;

    let origin = geocoder.geocode(&zipcode).await?;
    let filter = within_radius(origin.longitude, origin.latitude, distance);

    let documents: Vec<Document> = state
        .db
        .raw::<Bootcamp>()
        .find(filter)
        .await?
        .try_collect()
        .await?;

    tracing::debug!(zipcode = %zipcode, distance, found = documents.len(), "Radius search");
    Ok(Json(ListResponse::new(
        documents.into_iter().map(document_to_json).collect(),
    )))
}

/// Store a bootcamp photo from the multipart `file` field
pub async fn bootcamp_photo_upload(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DataResponse<String>>> {
    auth_user.require_role(&PUBLISHERS)?;

    let id = parse_id(&id)?;
    let bootcamp = find_bootcamp(&state.db, id).await?;
    auth_user.ensure_owner(bootcamp.user, "update this bootcamp")?;

    let mut multipart = multipart.map_err(|_| ApiError::upload_error("Please upload a file"))?;
    let upload_config = &state.config.upload;
    let photo = uploads::read_photo(&mut multipart, upload_config.max_file_size).await?;

    let file_name = uploads::photo_file_name(&id, &photo.extension());
    uploads::store_photo(&upload_config.upload_path, &file_name, &photo.data).await?;

    state
        .db
        .bootcamps()
        .update_one(doc! { "_id": id }, doc! { "$set": { "photo": file_name.as_str() } })
        .await?;

    Ok(Json(DataResponse::new(file_name)))
}

/// Parent lookup for nested creates, with the message those routes use
pub(crate) async fn find_bootcamp_for_child(db: &Database, id: ObjectId) -> ApiResult<Bootcamp> {
    db.bootcamps()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| ApiError::not_found_error(format!("No bootcamp with the id of {}", id)))
}
