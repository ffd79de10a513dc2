/// Unit tests for the list-query builder, models, validation and error mapping
use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use devcamper_api::{
    geocoder::GeoLocation,
    handlers::bootcamps::{parse_distance, update_changes, within_radius, EARTH_RADIUS_MILES},
    models::{
        bootcamp::slugify, bson_to_json, course::round_average_cost, to_json, Bootcamp,
        BootcampUpdate, Career, Course, GeoPoint, NewBootcamp, NewCourse, NewReview,
        RegisterRequest, Review, Role, User, UserProfile,
    },
    query::{ListQuery, PageRef, Pagination, Populate, DEFAULT_LIMIT},
    utils::{ApiError, ApiErrorKind},
};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde_json::{json, Value};
use validator::Validate;

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn stage_names(pipeline: &[Document]) -> Vec<String> {
    pipeline
        .iter()
        .filter_map(|stage| stage.keys().next().cloned())
        .collect()
}

#[cfg(test)]
mod list_query_tests {
    use super::*;

    #[test]
    fn test_plain_fields_become_equality_filters() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("housing", "true"), ("name", "Devworks")]))
                .unwrap();

        assert_eq!(
            query.filter,
            doc! { "housing": true, "name": "Devworks" }
        );
    }

    #[test]
    fn test_range_operators_merge_on_one_field() {
        let query = ListQuery::parse::<Bootcamp>(&params(&[
            ("averageCost[gte]", "1000"),
            ("averageCost[lte]", "9999.5"),
        ]))
        .unwrap();

        assert_eq!(
            query.filter,
            doc! { "averageCost": { "$gte": 1000_i64, "$lte": 9999.5 } }
        );
    }

    #[test]
    fn test_in_operator_splits_on_commas() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("careers[in]", "Business,UI/UX")])).unwrap();

        assert_eq!(
            query.filter,
            doc! { "careers": { "$in": ["Business", "UI/UX"] } }
        );
    }

    #[test]
    fn test_nested_location_paths_are_accepted() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("location.state", "MA")])).unwrap();
        assert_eq!(query.filter, doc! { "location.state": "MA" });
    }

    #[test]
    fn test_id_fields_are_coerced_to_object_ids() {
        let id = ObjectId::new();
        let query =
            ListQuery::parse::<Course>(&params(&[("bootcamp", &id.to_hex())])).unwrap();
        assert_eq!(query.filter, doc! { "bootcamp": id });
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = ListQuery::parse::<Bootcamp>(&params(&[("averageCost[regex]", "1")]))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Unsupported filter"));
    }

    #[test]
    fn test_operator_field_names_are_rejected() {
        let err = ListQuery::parse::<Bootcamp>(&params(&[("$where", "1")])).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ListQuery::parse::<Review>(&params(&[("password", "x")])).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("password"));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let err =
            ListQuery::parse::<Course>(&params(&[("tuition[gt]", "cheap")])).unwrap_err();
        assert!(err.message.contains("Invalid value `cheap`"));

        let err = ListQuery::parse::<Course>(&params(&[("bootcamp", "nope")])).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_equality_and_operator_on_same_field_conflict() {
        let err = ListQuery::parse::<Course>(&params(&[
            ("tuition", "100"),
            ("tuition[gt]", "50"),
        ]))
        .unwrap_err();
        assert!(err.message.contains("Conflicting filters"));
    }

    #[test]
    fn test_defaults() {
        let query = ListQuery::parse::<Bootcamp>(&[]).unwrap();

        assert!(query.filter.is_empty());
        assert_eq!(query.select, None);
        assert_eq!(query.sort, doc! { "createdAt": -1, "_id": -1 });
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.skip(), 0);
    }

    #[test]
    fn test_sort_directions_and_tiebreak() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("sort", "name,-averageCost")])).unwrap();
        assert_eq!(query.sort, doc! { "name": 1, "averageCost": -1, "_id": -1 });

        let query = ListQuery::parse::<Bootcamp>(&params(&[("sort", "name")])).unwrap();
        assert_eq!(query.sort, doc! { "name": 1, "_id": 1 });
    }

    #[test]
    fn test_invalid_paging_falls_back_to_defaults() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("page", "abc"), ("limit", "0")])).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);

        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("page", "3"), ("limit", "10")])).unwrap();
        assert_eq!(query.skip(), 20);
    }

    #[test]
    fn test_reserved_params_are_not_filters() {
        let query = ListQuery::parse::<Bootcamp>(&params(&[
            ("select", "name,description"),
            ("sort", "-name"),
            ("page", "2"),
            ("limit", "5"),
        ]))
        .unwrap();

        assert!(query.filter.is_empty());
        assert_eq!(
            query.select,
            Some(vec!["name".to_string(), "description".to_string()])
        );
        assert_eq!(query.projection(), Some(doc! { "name": 1, "description": 1 }));
    }

    #[test]
    fn test_pagination_links() {
        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("page", "1"), ("limit", "2")])).unwrap();
        assert_eq!(
            query.pagination(5),
            Pagination {
                next: Some(PageRef { page: 2, limit: 2 }),
                prev: None,
            }
        );

        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("page", "2"), ("limit", "2")])).unwrap();
        let pagination = query.pagination(5);
        assert_eq!(pagination.next, Some(PageRef { page: 3, limit: 2 }));
        assert_eq!(pagination.prev, Some(PageRef { page: 1, limit: 2 }));

        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("page", "3"), ("limit", "2")])).unwrap();
        assert_eq!(
            query.pagination(5),
            Pagination {
                next: None,
                prev: Some(PageRef { page: 2, limit: 2 }),
            }
        );
    }

    #[test]
    fn test_huge_paging_values_stay_positive_in_pipeline() {
        let query = ListQuery::parse::<Bootcamp>(&params(&[
            ("page", "18446744073709551615"),
            ("limit", "9223372036854775808"),
        ]))
        .unwrap();
        assert_eq!(query.limit, i64::MAX as u64);
        assert_eq!(query.page, i64::MAX as u64);

        let pipeline = query.pipeline(None);
        assert!(pipeline[2].get_i64("$skip").unwrap() >= 0);
        assert_eq!(pipeline[3].get_i64("$limit").unwrap(), i64::MAX);
    }

    #[test]
    fn test_pagination_at_the_last_possible_page() {
        let query = ListQuery {
            filter: Document::new(),
            select: None,
            sort: doc! { "createdAt": -1 },
            page: u64::MAX,
            limit: 1,
        };

        let pagination = query.pagination(0);
        assert_eq!(pagination.next, None);
        assert_eq!(
            pagination.prev,
            Some(PageRef {
                page: u64::MAX - 1,
                limit: 1,
            })
        );
    }

    #[test]
    fn test_pagination_serializes_only_present_links() {
        let pagination = Pagination {
            next: Some(PageRef { page: 2, limit: 25 }),
            prev: None,
        };
        assert_eq!(
            serde_json::to_value(&pagination).unwrap(),
            json!({ "next": { "page": 2, "limit": 25 } })
        );
    }

    #[test]
    fn test_pipeline_order_and_populate() {
        let query = ListQuery::parse::<Bootcamp>(&params(&[("housing", "true")])).unwrap();
        let pipeline = query.pipeline(Some(&Populate::courses()));

        assert_eq!(
            stage_names(&pipeline),
            vec!["$match", "$sort", "$skip", "$limit", "$lookup"]
        );
        assert_eq!(pipeline[0], doc! { "$match": { "housing": true } });
    }

    #[test]
    fn test_populate_skipped_when_select_omits_it() {
        let query = ListQuery::parse::<Bootcamp>(&params(&[("select", "name")])).unwrap();
        let pipeline = query.pipeline(Some(&Populate::courses()));
        assert_eq!(
            stage_names(&pipeline),
            vec!["$match", "$sort", "$skip", "$limit", "$project"]
        );

        let query =
            ListQuery::parse::<Bootcamp>(&params(&[("select", "name,courses")])).unwrap();
        let pipeline = query.pipeline(Some(&Populate::courses()));
        assert!(stage_names(&pipeline).contains(&"$lookup".to_string()));
    }

    #[test]
    fn test_bootcamp_summary_unwinds_single_reference() {
        let stages = Populate::bootcamp_summary().stages();
        assert_eq!(stage_names(&stages), vec!["$lookup", "$unwind"]);

        let lookup = stages[0].get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "bootcamps");
        assert_eq!(lookup.get_str("as").unwrap(), "bootcamp");
        let inner = lookup.get_array("pipeline").unwrap();
        assert_eq!(
            inner[1],
            Bson::Document(doc! { "$project": { "name": 1, "description": 1 } })
        );
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  ModernTech -- Bootcamp! "), "moderntech-bootcamp");
        assert_eq!(slugify("UI/UX Academy"), "ui-ux-academy");
    }

    #[test]
    fn test_average_cost_rounds_up_to_tens() {
        assert_eq!(round_average_cost(9333.33), 9340.0);
        assert_eq!(round_average_cost(10000.0), 10000.0);
        assert_eq!(round_average_cost(1.0), 10.0);
    }

    #[test]
    fn test_career_names() {
        assert_eq!(serde_json::to_value(Career::UiUx).unwrap(), json!("UI/UX"));
        let career: Career = serde_json::from_value(json!("Web Development")).unwrap();
        assert_eq!(career, Career::WebDevelopment);
        assert!(serde_json::from_value::<Career>(json!("Cooking")).is_err());
    }

    #[test]
    fn test_new_bootcamp_requires_name() {
        let payload: NewBootcamp = serde_json::from_value(json!({
            "name": "   ",
            "description": "Full stack bootcamp",
            "address": "233 Bay State Rd Boston MA 02215",
            "careers": ["Web Development"]
        }))
        .unwrap();

        let errors = payload.normalized().validate().unwrap_err();
        let err = ApiError::from(errors);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Please add a name"));
    }

    #[test]
    fn test_new_bootcamp_reports_every_violation() {
        let payload = NewBootcamp {
            name: Some("x".repeat(51)),
            website: Some("not a url".to_string()),
            careers: Some(vec![]),
            ..Default::default()
        };

        let err = ApiError::from(payload.validate().unwrap_err());
        for message in [
            "Name can not be more than 50 characters",
            "Please add a description",
            "Please use a valid URL with HTTP or HTTPS",
            "Please add an address",
            "Please add at least one career",
        ] {
            assert!(err.message.contains(message), "missing `{}` in {}", message, err.message);
        }
    }

    #[test]
    fn test_into_bootcamp_defaults() {
        let owner = ObjectId::new();
        let payload: NewBootcamp = serde_json::from_value(json!({
            "name": "Devworks Bootcamp",
            "description": "Full stack bootcamp",
            "address": "233 Bay State Rd Boston MA 02215",
            "careers": ["Web Development", "UI/UX"],
            "housing": true
        }))
        .unwrap();

        let bootcamp = payload.normalized().into_bootcamp(owner, None);
        assert_eq!(bootcamp.slug, "devworks-bootcamp");
        assert_eq!(bootcamp.photo, "no-photo.jpg");
        assert_eq!(bootcamp.user, owner);
        assert!(bootcamp.housing);
        assert!(!bootcamp.job_guarantee);
        assert_eq!(bootcamp.average_cost, None);
        assert_eq!(
            bootcamp.address.as_deref(),
            Some("233 Bay State Rd Boston MA 02215")
        );
    }

    #[test]
    fn test_bootcamp_json_shape() {
        let id = ObjectId::new();
        let owner = ObjectId::new();
        let mut bootcamp = NewBootcamp {
            name: Some("Devworks Bootcamp".to_string()),
            description: Some("Full stack bootcamp".to_string()),
            address: Some("Boston".to_string()),
            careers: Some(vec![Career::Business]),
            ..Default::default()
        }
        .into_bootcamp(owner, None);
        bootcamp.id = Some(id);

        let value = to_json(&bootcamp).unwrap();
        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["user"], json!(owner.to_hex()));
        assert_eq!(value["careers"], json!(["Business"]));
        assert_eq!(value["jobAssistance"], json!(false));
        assert!(value["createdAt"].is_string());
        assert!(value.get("averageCost").is_none());
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_new_course_accepts_numeric_weeks() {
        let payload: NewCourse = serde_json::from_value(json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": 8,
            "tuition": 8000,
            "minimumSkill": "beginner"
        }))
        .unwrap();

        assert_eq!(payload.weeks.as_deref(), Some("8"));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_new_course_rejects_unknown_skill() {
        let result = serde_json::from_value::<NewCourse>(json!({ "minimumSkill": "expert" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_course_negative_tuition() {
        let payload = NewCourse {
            title: Some("Course".to_string()),
            description: Some("About".to_string()),
            weeks: Some("4".to_string()),
            tuition: Some(-1.0),
            minimum_skill: None,
            scholarship_available: None,
        };
        let err = ApiError::from(payload.validate().unwrap_err());
        assert!(err.message.contains("Tuition cost can not be negative"));
        assert!(err.message.contains("Please add a minimum skill"));
    }

    #[test]
    fn test_review_rating_bounds() {
        let review = |rating| NewReview {
            title: Some("Great".to_string()),
            text: Some("Learned a lot".to_string()),
            rating: Some(rating),
        };

        assert!(review(1).validate().is_ok());
        assert!(review(10).validate().is_ok());
        let err = ApiError::from(review(11).validate().unwrap_err());
        assert_eq!(err.message, "Please add a rating between 1 and 10");
        assert!(review(0).validate().is_err());
    }

    #[test]
    fn test_register_refuses_admin_role() {
        let request = RegisterRequest {
            name: Some("Mallory".to_string()),
            email: Some("mallory@example.com".to_string()),
            password: Some("123456".to_string()),
            role: Some(Role::Admin),
        };
        let err = ApiError::from(request.validate().unwrap_err());
        assert_eq!(err.message, "Role must be either user or publisher");

        let request = RegisterRequest {
            role: Some(Role::Publisher),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_register_normalizes_email() {
        let request = RegisterRequest {
            name: Some("  John ".to_string()),
            email: Some(" John@Example.COM ".to_string()),
            password: Some("123456".to_string()),
            role: None,
        }
        .normalized();

        assert_eq!(request.name.as_deref(), Some("John"));
        assert_eq!(request.email.as_deref(), Some("john@example.com"));
    }

    #[test]
    fn test_user_profile_hides_secrets() {
        let id = ObjectId::new();
        let user = User {
            id: Some(id),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: Role::Publisher,
            password: "$argon2id$v=19$...".to_string(),
            reset_password_token: Some("abc".to_string()),
            reset_password_expire: Some(DateTime::now()),
            created_at: DateTime::now(),
        };

        let value = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["role"], json!("publisher"));
        assert!(value.get("password").is_none());
        assert!(value.get("resetPasswordToken").is_none());
    }

    #[test]
    fn test_bson_to_json_conversions() {
        let id = ObjectId::new();
        let value = bson_to_json(Bson::Document(doc! {
            "_id": id,
            "createdAt": DateTime::from_millis(0),
            "rating": 8,
            "tags": ["a", "b"],
            "missing": Bson::Null,
        }));

        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["createdAt"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(value["rating"], json!(8));
        assert_eq!(value["tags"], json!(["a", "b"]));
        assert_eq!(value["missing"], Value::Null);
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, body) = body_of(ApiError::cast_error()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "Resource not found" }));
    }

    #[tokio::test]
    async fn test_empty_message_becomes_server_error() {
        let (status, body) = body_of(ApiError::internal_error("")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("Server Error"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::duplicate_error().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::duplicate_error().message,
            "Duplicate field value entered"
        );
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_authorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::authorization_error("x").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::upload_error("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::payload_too_large().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::server_error().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_object_id_is_a_cast_error() {
        let err = ApiError::from(ObjectId::parse_str("not-a-valid-id").unwrap_err());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Resource not found");
    }
}

#[cfg(test)]
mod radius_tests {
    use super::*;

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("10").unwrap(), 10.0);
        assert_eq!(parse_distance("0").unwrap(), 0.0);
        assert_eq!(parse_distance("2.5").unwrap(), 2.5);
        assert_eq!(
            parse_distance("-1").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert!(parse_distance("far").is_err());
        assert!(parse_distance("NaN").is_err());
    }

    #[test]
    fn test_within_radius_uses_radians() {
        let filter = within_radius(-71.1, 42.35, 3963.0);
        let center = filter
            .get_document("location")
            .unwrap()
            .get_document("$geoWithin")
            .unwrap()
            .get_array("$centerSphere")
            .unwrap();

        assert_eq!(center[0], Bson::Array(vec![Bson::Double(-71.1), Bson::Double(42.35)]));
        assert_eq!(center[1], Bson::Double(3963.0 / EARTH_RADIUS_MILES));
    }
}

#[cfg(test)]
mod bootcamp_update_tests {
    use super::*;

    fn update(body: Value) -> BootcampUpdate {
        serde_json::from_value::<BootcampUpdate>(body)
            .unwrap()
            .normalized()
    }

    fn validation_message(update: &BootcampUpdate) -> String {
        ApiError::from(update.validate().unwrap_err()).message
    }

    #[test]
    fn test_empty_name_asks_for_a_name() {
        let message = validation_message(&update(json!({ "name": "  " })));
        assert!(message.contains("Please add a name"));
        assert!(!message.contains("50 characters"));
    }

    #[test]
    fn test_long_name_reports_the_limit() {
        let message = validation_message(&update(json!({ "name": "x".repeat(51) })));
        assert!(message.contains("Name can not be more than 50 characters"));
        assert!(!message.contains("Please add a name"));
    }

    #[test]
    fn test_empty_description_asks_for_a_description() {
        let message = validation_message(&update(json!({ "description": "" })));
        assert!(message.contains("Please add a description"));
    }

    #[test]
    fn test_name_change_rewrites_slug() {
        let changes = update_changes(&update(json!({ "name": "Codemasters Camp" })), None).unwrap();
        let set = changes.get_document("$set").unwrap();
        assert_eq!(set.get_str("slug").unwrap(), "codemasters-camp");
        assert!(changes.get("$unset").is_none());
    }

    #[test]
    fn test_address_without_geocoder_drops_stale_location() {
        let changes =
            update_changes(&update(json!({ "address": "233 Bay State Rd Boston MA" })), None)
                .unwrap();

        let set = changes.get_document("$set").unwrap();
        assert_eq!(set.get_str("address").unwrap(), "233 Bay State Rd Boston MA");
        assert!(set.get("location").is_none());
        assert_eq!(changes.get_document("$unset").unwrap(), &doc! { "location": "" });
    }

    #[test]
    fn test_geocoded_address_replaces_raw_address() {
        let location = GeoPoint::from(GeoLocation {
            latitude: 42.35,
            longitude: -71.1,
            formatted_address: "233 Bay State Rd, Boston, MA 02215, US".to_string(),
            street: Some("233 Bay State Rd".to_string()),
            city: Some("Boston".to_string()),
            state: Some("MA".to_string()),
            zipcode: Some("02215".to_string()),
            country: Some("US".to_string()),
        });
        let changes = update_changes(
            &update(json!({ "address": "233 Bay State Rd Boston MA" })),
            Some(location),
        )
        .unwrap();

        let set = changes.get_document("$set").unwrap();
        assert!(set.get("address").is_none());
        assert_eq!(
            set.get_document("location").unwrap().get_str("type").unwrap(),
            "Point"
        );
        assert_eq!(changes.get_document("$unset").unwrap(), &doc! { "address": "" });
    }
}
