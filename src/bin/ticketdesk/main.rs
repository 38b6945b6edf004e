use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::{App, HttpServer};
use env_logger::Env;
use std::time::Duration;
use ticketdesk::db::{get_db_pool, init_db};
use ticketdesk::middleware::ClientCtx;
use ticketdesk::session::{expire_sessions, get_sess};

/// How often expired login sessions are purged.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.");
    init_db(database_url)
        .await
        .expect("Database failed to initialize.");

    let secret_key = match std::env::var("SECRET_KEY") {
        Ok(key) => match Key::try_from(key.as_bytes()) {
            Ok(key) => key,
            Err(err) => {
                log::warn!("SECRET_KEY was invalid. Reason: {:?}\r\nA secret key must be at least 64 bytes to be accepted. Using a random key; sessions will not survive a restart.", err);
                Key::generate()
            }
        },
        Err(err) => {
            log::warn!("SECRET_KEY was not set. Reason: {:?}\r\nUsing a random key; sessions will not survive a restart.", err);
            Key::generate()
        }
    };

    actix_web::rt::spawn(async {
        let mut interval = actix_web::rt::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match expire_sessions(get_db_pool(), get_sess()).await {
                Ok(purged) => log::debug!("Expired sessions purged: {}", purged),
                Err(e) => log::error!("expire_sessions: {}", e),
            }
        }
    });

    let server_config = ticketdesk::app_config::server();
    let bind = server_config.bind.clone();
    let static_dir = server_config.static_dir;
    let cookie_secure = ticketdesk::app_config::security().cookie_secure;
    log::info!("Listening on {}", bind);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("X-XSS-Protection", "0"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, ticketdesk::web::error::render_400)
                    .handler(StatusCode::UNAUTHORIZED, ticketdesk::web::error::render_401)
                    .handler(StatusCode::FORBIDDEN, ticketdesk::web::error::render_403)
                    .handler(StatusCode::NOT_FOUND, ticketdesk::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ticketdesk::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(cookie_secure)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(ticketdesk::web::configure)
            .service(actix_files::Files::new("/static", &static_dir))
    })
    .bind(&bind)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
pub fn init_our_mods() {
    ticketdesk::app_config::init();
    ticketdesk::session::init();
}
