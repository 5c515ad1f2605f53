pub mod stage;
pub mod vehicle;
