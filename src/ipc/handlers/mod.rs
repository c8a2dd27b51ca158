pub mod assignments;
pub mod attendance;
pub mod core;
pub mod students;
pub mod submissions;
pub mod tutorials;
