mod repository;

pub use repository::{FileSessionRepository, SessionRepository};
