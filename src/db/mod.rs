pub mod pool;

pub use pool::{create_db_pool, run_migrations};
