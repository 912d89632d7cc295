pub mod drift;
pub mod gamification;
pub mod micro_invest;
