pub mod array;
pub mod bitmap;
pub mod config;
pub mod datatypes;
pub mod error;
mod interop;
pub mod memory;
mod util;

pub use array::{
    BinaryVector, GenericVarWidthVector, LargeBinaryVector, LargeStringVector, StringVector,
    TransferPair, Vector,
};
pub use arrow;
pub use config::VectorConfig;
pub use datatypes::{BinaryType, DataType, Field, OffsetSize, Utf8Type, VarWidthType};
pub use error::{Error, InvalidScalar, Result, ValidationError};
pub use memory::{AllocationError, Allocator, AllocatorRef, RootAllocator};
