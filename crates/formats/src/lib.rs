pub mod topology;
pub mod vector_chunk;

pub use topology::*;
pub use vector_chunk::*;
