use crate::{
    auth::protect,
    handlers::{auth as auth_handlers, bootcamps, courses, reviews},
    middleware::{
        cors_layer, health_check, propagate_request_id_layer, request_id_layer, route_not_found,
        trace_layer, validate_request_size,
    },
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

/// Build the HTTP application: `/api/v1` routes, static uploads and the middleware stack
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Create public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/bootcamps", get(bootcamps::get_bootcamps))
        .route("/api/v1/bootcamps/:id", get(bootcamps::get_bootcamp))
        .route(
            "/api/v1/bootcamps/radius/:zipcode/:distance",
            get(bootcamps::get_bootcamps_in_radius),
        )
        .route(
            "/api/v1/bootcamps/:id/courses",
            get(courses::get_bootcamp_courses),
        )
        .route(
            "/api/v1/bootcamps/:id/reviews",
            get(reviews::get_bootcamp_reviews),
        )
        .route("/api/v1/courses", get(courses::get_courses))
        .route("/api/v1/courses/:id", get(courses::get_course))
        .route("/api/v1/reviews", get(reviews::get_reviews))
        .route("/api/v1/reviews/:id", get(reviews::get_review))
        .route("/api/v1/auth/register", post(auth_handlers::register))
        .route("/api/v1/auth/login", post(auth_handlers::login))
        .route(
            "/api/v1/auth/forgotpassword",
            post(auth_handlers::forgot_password),
        )
        .route(
            "/api/v1/auth/resetpassword/:resettoken",
            put(auth_handlers::reset_password),
        );

    // Create protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/v1/bootcamps", post(bootcamps::create_bootcamp))
        .route(
            "/api/v1/bootcamps/:id",
            put(bootcamps::update_bootcamp).delete(bootcamps::delete_bootcamp),
        )
        .route(
            "/api/v1/bootcamps/:id/photo",
            put(bootcamps::bootcamp_photo_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/v1/bootcamps/:id/courses", post(courses::add_course))
        .route("/api/v1/bootcamps/:id/reviews", post(reviews::add_review))
        .route(
            "/api/v1/courses/:id",
            put(courses::update_course).delete(courses::delete_course),
        )
        .route(
            "/api/v1/reviews/:id",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/api/v1/auth/me", get(auth_handlers::me))
        .route(
            "/api/v1/auth/updatedetails",
            put(auth_handlers::update_details),
        )
        .route(
            "/api/v1/auth/updatepassword",
            put(auth_handlers::update_password),
        )
        .route_layer(from_fn_with_state(state.auth_service.clone(), protect));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload.upload_path))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(propagate_request_id_layer())
                .layer(cors_layer(&config))
                .layer(from_fn_with_state(config.clone(), validate_request_size))
                .layer(DefaultBodyLimit::max(config.upload.max_request_size as usize)),
        );

    if config.environment.is_development() {
        app = app.layer(trace_layer());
    }

    app.with_state(state)
}
