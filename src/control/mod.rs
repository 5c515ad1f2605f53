pub mod attitude;
pub mod control_loop;
pub mod guidance;
pub mod mission;
pub mod staging;
pub mod thrust_monitor;
