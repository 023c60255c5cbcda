use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/teams", team_routes())
        .nest("/tasks", task_routes(config))
        .nest("/contests", contest_routes())
        .route("/import", post(handlers::import::run_import))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn team_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::team::create_team))
        .route("/join", post(handlers::team::join_team))
        .route("/{id}", get(handlers::team::get_team))
}

fn task_routes(config: &AppConfig) -> Router<AppState> {
    let files = Router::new()
        .route(
            "/",
            get(handlers::task_file::list_task_files).post(handlers::task_file::upload_task_file),
        )
        .route("/{file_id}", delete(handlers::task_file::delete_task_file))
        .layer(handlers::task_file::upload_body_limit(
            config.storage.max_file_size,
        ));

    Router::new()
        .route("/", post(handlers::task::create_task))
        .route(
            "/{id}",
            get(handlers::task::get_task)
                .patch(handlers::task::update_task)
                .delete(handlers::task::delete_task),
        )
        .nest("/{id}/files", files)
}

fn contest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::contest::list_contests).post(handlers::contest::create_contest),
        )
        .route(
            "/{id}",
            get(handlers::contest::get_contest)
                .patch(handlers::contest::update_contest)
                .delete(handlers::contest::delete_contest),
        )
        .route("/{id}/register", post(handlers::contest::register_for_contest))
        .nest("/{id}/participants", participant_routes())
        .nest("/{id}/categories", category_routes())
        .nest("/{id}/tasks", contest_task_routes())
        .nest("/{id}/attempts", attempt_routes())
        .route("/{id}/scoreboard", get(handlers::scoreboard::get_scoreboard))
        .nest("/{id}/news", news_routes())
}

fn participant_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::contest::list_participants).post(handlers::contest::add_participant),
        )
        .route(
            "/{participant_id}",
            patch(handlers::contest::update_participant_status),
        )
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::category::list_categories).post(handlers::category::create_category),
        )
        .route(
            "/{category_id}",
            patch(handlers::category::update_category).delete(handlers::category::delete_category),
        )
}

fn contest_task_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::task::list_contest_tasks).post(handlers::task::attach_task),
        )
        .route(
            "/{task_id}",
            get(handlers::task::view_task).delete(handlers::task::detach_task),
        )
        .route(
            "/{task_id}/attempts",
            post(handlers::attempt::submit_attempt),
        )
        .route(
            "/{task_id}/opens",
            get(handlers::opens::get_task_opens).post(handlers::opens::toggle_task_open),
        )
        .route(
            "/{task_id}/files/{file_id}",
            get(handlers::task_file::download_task_file),
        )
}

fn attempt_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::attempt::list_attempts))
        .route(
            "/{attempt_id}",
            get(handlers::attempt::get_attempt).patch(handlers::attempt::review_attempt),
        )
}

fn news_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::news::list_news).post(handlers::news::create_news),
        )
        .route(
            "/{news_id}",
            patch(handlers::news::update_news).delete(handlers::news::delete_news),
        )
}
