pub mod pool;
pub mod repos;

// Re-export commonly used items
pub use pool::{create_pool, run_migrations};
pub use repos::comment::{CommentRepo, CommentRow};
pub use repos::post::{PostRepo, PostRow};
pub use repos::propagation::IdentityPropagator;
pub use repos::refresh_token::RefreshTokenStore;
pub use repos::user::{UserRepo, UserRow};
