// Persistence module
// LanceDB owns all durable state: vectors plus chunk text and metadata

pub mod lancedb;
