pub mod logging;
pub mod validate;
