pub mod plans;
pub mod services;
