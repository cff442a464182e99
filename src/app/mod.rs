pub mod errors;
pub mod factory;
mod service;

pub use errors::AppError;
pub use factory::{AppFactory, AppPaths};
pub use service::App;
