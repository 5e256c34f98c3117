pub mod global_params;
pub mod person;
pub mod task;
