pub mod analytics;
pub mod clock;
pub mod heating;
pub mod interval;
pub mod point;
