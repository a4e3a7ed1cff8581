mod detail;

pub use detail::{format_date, Lifespan, MemberDetail, PremiumSection, DISPLAY_DATE_FORMAT};
