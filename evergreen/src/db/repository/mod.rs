mod family_members;
mod subscriptions;

pub use family_members::FamilyMemberRepository;
pub use subscriptions::SubscriptionRepository;
