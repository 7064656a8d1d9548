//! MongoDB persistence layer

pub mod mongo;
pub mod schemas;

pub use mongo::MongoClient;
