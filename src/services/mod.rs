pub mod runs;
pub mod schedule;
pub mod topology;
