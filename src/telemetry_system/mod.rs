pub mod flight_log;
pub mod link;
pub mod sample;
