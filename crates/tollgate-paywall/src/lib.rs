pub mod cookie;
pub mod gate;
pub mod login;
pub mod lookup;
pub mod status;

#[cfg(feature = "axum")]
pub mod axum;
#[cfg(feature = "axum")]
pub mod routes;
