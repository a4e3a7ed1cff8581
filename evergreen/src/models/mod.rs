mod family;
mod payment;

pub use family::*;
pub use payment::*;
