pub mod cache;
pub mod checkers;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod evaluation;
pub mod extractors;
pub mod handlers;
pub mod mail;
pub mod models;
pub mod opening;
pub mod ratelimit;
pub mod routes;
pub mod scoreboard;
pub mod seed;
pub mod state;
pub mod statements;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flagstand CTF API",
        version = "1.0.0",
        description = "API for the Flagstand contest platform"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::team::create_team,
        handlers::team::join_team,
        handlers::team::get_team,
        handlers::task::create_task,
        handlers::task::get_task,
        handlers::task::update_task,
        handlers::task::delete_task,
        handlers::task_file::upload_task_file,
        handlers::task_file::list_task_files,
        handlers::task_file::delete_task_file,
        handlers::task_file::download_task_file,
        handlers::contest::create_contest,
        handlers::contest::list_contests,
        handlers::contest::get_contest,
        handlers::contest::update_contest,
        handlers::contest::delete_contest,
        handlers::contest::register_for_contest,
        handlers::contest::list_participants,
        handlers::contest::add_participant,
        handlers::contest::update_participant_status,
        handlers::category::list_categories,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        handlers::task::attach_task,
        handlers::task::detach_task,
        handlers::task::list_contest_tasks,
        handlers::task::view_task,
        handlers::attempt::submit_attempt,
        handlers::attempt::list_attempts,
        handlers::attempt::get_attempt,
        handlers::attempt::review_attempt,
        handlers::opens::get_task_opens,
        handlers::opens::toggle_task_open,
        handlers::scoreboard::get_scoreboard,
        handlers::news::list_news,
        handlers::news::create_news,
        handlers::news::update_news,
        handlers::news::delete_news,
        handlers::import::run_import,
    ),
    tags(
        (name = "Auth", description = "Authentication and user management"),
        (name = "Teams", description = "Team creation and membership"),
        (name = "Tasks", description = "Task CRUD (organizers)"),
        (name = "Task Files", description = "Task attachments and handouts"),
        (name = "Contests", description = "Contest CRUD operations"),
        (name = "Categories", description = "Task categories within contests"),
        (name = "Contest Tasks", description = "Task sets, statements and openness"),
        (name = "Task Opening", description = "Manual open overrides"),
        (name = "Attempts", description = "Answer submission and review"),
        (name = "Scoreboard", description = "Ranked standings"),
        (name = "News", description = "Contest announcements"),
        (name = "Import", description = "Operator bulk load"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();

    axum::Router::new()
        .nest("/api", routes::api_routes(&state.config))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
