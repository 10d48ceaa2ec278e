pub mod attendance;
pub mod core;
pub mod resources;
pub mod setup;
pub mod tickets;
pub mod timetable;
