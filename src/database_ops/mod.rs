pub mod adapters;
pub mod batch_writer;
pub mod errors;
pub mod paginator;
pub mod product;
