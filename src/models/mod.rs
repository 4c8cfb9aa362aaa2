pub mod pricing;
pub mod route;
pub mod transport;
