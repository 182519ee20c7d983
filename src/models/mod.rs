pub mod assignment;
pub mod geo;
pub mod notification;
pub mod ranking;
pub mod solver;
