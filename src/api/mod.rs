// src/api/mod.rs
pub mod error;
pub mod handlers;
pub mod types;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::biometric::scope())
        .service(handlers::attendance::scope());
}
