use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod otp;
pub mod password;
pub mod repo;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::router()
}
