use std::{process, sync::Arc, time::Duration};

use foglio::{
    application::{
        authoring::AuthoringService,
        error::AppError,
        feed::{FeedConfig, FeedService},
        render,
        repos::{
            CategoriesRepo, CategoriesWriteRepo, CommentsRepo, PostsRepo, PostsWriteRepo,
            TagsRepo, TagsWriteRepo,
        },
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState},
        telemetry,
    },
};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Some(config::Command::Serve(_)) | None => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let posts: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write: Arc<dyn PostsWriteRepo> = repositories.clone();
    let categories: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let tags: Arc<dyn TagsRepo> = repositories.clone();
    let tags_write: Arc<dyn TagsWriteRepo> = repositories.clone();
    let comments: Arc<dyn CommentsRepo> = repositories.clone();

    let renderer = render::render_service();

    let feed = Arc::new(FeedService::new(
        posts.clone(),
        categories.clone(),
        tags.clone(),
        comments,
        renderer.clone(),
        FeedConfig {
            page_size: settings.blog.page_size,
            recent_limit: settings.blog.recent_posts_limit.get(),
            timezone: settings.blog.timezone,
        },
    ));

    let authoring = Arc::new(AuthoringService::new(
        posts,
        posts_write.clone(),
        categories,
        categories_write,
        tags,
        tags_write,
        renderer,
    ));

    let http_state = HttpState {
        feed,
        posts_write,
        db: repositories.clone(),
        site_title: settings.blog.site_title.clone(),
    };

    let admin_state = AdminState {
        authoring,
        db: repositories,
    };

    serve_http(&settings, http_state, admin_state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "foglio::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace));

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    if tokio::signal::ctrl_c().await.is_err() {
        error!(target = "foglio::serve", "failed to listen for shutdown signal");
        return;
    }

    info!(target = "foglio::serve", "shutdown signal received");

    // In-flight requests get the configured grace window, then the process
    // exits regardless.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "foglio::serve",
            "graceful shutdown window elapsed, exiting"
        );
        process::exit(0);
    });
}
