mod binary;
mod offset;
mod state;
mod string;
mod transfer;
mod values;
mod variable;

pub use offset::OffsetBuffer;
pub use state::{SlotState, Transition};
pub use transfer::TransferPair;
pub use values::ValueBuffer;
pub use variable::{Buffers, GenericVarWidthVector, Iter};

use crate::datatypes::{BinaryType, Field, Utf8Type};
use crate::error::{Result, ValidationError};
use std::any::Any;
use std::fmt;

/// A dynamically-typed column.
pub trait Vector: fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn field(&self) -> &Field;

    /// Returns the number of slots.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn null_count(&self) -> usize;

    /// Checks the structure of the buffers.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violation found.
    fn validate(&self) -> Result<()>;

    /// Checks the content of every non-null value.
    ///
    /// # Errors
    ///
    /// Returns every slot whose content is not a legal scalar.
    fn validate_scalars(&self) -> std::result::Result<(), ValidationError>;
}

/// UTF-8 strings with 32-bit offsets.
pub type StringVector = GenericVarWidthVector<Utf8Type, i32>;

/// UTF-8 strings with 64-bit offsets.
pub type LargeStringVector = GenericVarWidthVector<Utf8Type, i64>;

/// Byte strings with 32-bit offsets.
pub type BinaryVector = GenericVarWidthVector<BinaryType, i32>;

/// Byte strings with 64-bit offsets.
pub type LargeBinaryVector = GenericVarWidthVector<BinaryType, i64>;

#[cfg(test)]
mod tests {
    use super::{BinaryVector, StringVector, Vector};
    use crate::datatypes::DataType;
    use crate::memory::RootAllocator;
    use std::sync::Arc;

    #[test]
    fn dynamic_vectors() {
        let allocator = Arc::new(RootAllocator::unlimited());
        let mut strings = StringVector::new("s", allocator.clone());
        strings.push_str(Some("a")).unwrap();
        let binary = BinaryVector::new("b", allocator);
        let columns: Vec<Box<dyn Vector>> = vec![Box::new(strings), Box::new(binary)];

        assert_eq!(DataType::Utf8, columns[0].field().data_type());
        assert_eq!(1, columns[0].len());
        assert!(columns[1].is_empty());
        let strings = columns[0]
            .as_any()
            .downcast_ref::<StringVector>()
            .unwrap();
        assert_eq!(Some("a"), strings.get_str(0).unwrap());
        assert!(columns[1].as_any().downcast_ref::<StringVector>().is_none());
    }
}
