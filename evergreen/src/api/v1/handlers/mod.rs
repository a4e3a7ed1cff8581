pub mod family;
pub(crate) mod health;

pub use health::health_check;
