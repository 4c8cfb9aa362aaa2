pub mod pricing;
pub mod progress;
pub mod tracking;
