mod postgres;
mod store;
mod supabase;

pub use postgres::*;
pub use store::*;
pub use supabase::*;
