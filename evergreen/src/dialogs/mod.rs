mod member_form;
mod subscription;

pub use member_form::{FormMode, FormTab, MemberForm, MemberPayload, PremiumToggle};
pub use subscription::{CardDetails, SubscriptionForm};
