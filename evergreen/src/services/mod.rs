mod family;
pub mod payment;

pub use family::FamilyService;
pub use payment::{processor_from_config, HttpProcessor, PaymentProcessor, SimulatedProcessor};
