//! HTTP ingress: accepts new notifications and exposes their delivery status.
//!
//! - `POST /notifications` — submit one notification, returns its assigned id
//! - `POST /notifications/batch` — submit a batch, returns assigned ids
//! - `GET /notifications/:id` — fetch a single notification by id
//! - `GET /notifications?ids=a,b,c` — fetch a batch by id
//! - `GET /notifications/pending?limit=N` — inspect the pending queue

pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerError};
