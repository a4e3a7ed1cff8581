//! Consumer side of the family API: store/gateway seams, the HTTP client, and
//! the tree container session.

mod http;
mod session;
mod traits;

pub use http::HttpFamilyClient;
pub use session::{FamilyTreeSession, SessionState};
pub use traits::{MemberRecordStore, SubscriptionGateway};
