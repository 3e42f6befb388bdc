// web-server/src/api/mod.rs
pub mod auth;
pub mod users;

use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

#[get("/")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Wallet Auth API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(api_index)
            .service(
                actix_web::web::scope("/auth")
                    .service(auth::nonce)
                    .service(auth::verify)
                    .service(auth::register)
                    .service(auth::login)
                    .service(auth::logout)
                    .service(auth::session)
            )
            .service(
                actix_web::web::scope("/users")
                    .service(users::get_me)
                    .service(users::update_me)
                    .service(users::delete_me)
            )
    );
}
