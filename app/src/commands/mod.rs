pub mod history;
pub mod migrate;
pub mod role;
pub mod workflow;
