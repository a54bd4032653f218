//! Background workers.

pub mod completion;

pub use completion::CompletionWorker;
