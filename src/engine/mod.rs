pub mod expiry;
pub mod matching;
pub mod notify;
pub mod queue;
pub mod ranking;
pub mod scoring;
pub mod worker;
