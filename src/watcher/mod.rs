pub mod classifier;
pub mod connection;
pub mod scanner;
pub mod subscriptions;
pub mod supervisor;
pub mod types;
