//! Conversion between vectors and `arrow` arrays.
//!
//! Both sides share the same layout, so a vector exported here produces an
//! array whose offset and value buffers hold the same bytes.

use crate::array::{BinaryVector, LargeBinaryVector, LargeStringVector, StringVector};
use crate::error::Result;
use crate::memory::AllocatorRef;
use arrow::array::{Array, BinaryArray, LargeBinaryArray, LargeStringArray, StringArray};
use log::debug;

macro_rules! string_interop {
    ( $vector:ty, $array:ty ) => {
        impl $vector {
            /// Copies the slots into a new `arrow` array.
            ///
            /// # Errors
            ///
            /// Returns an error if a slot does not hold UTF-8 text.
            pub fn to_arrow(&self) -> Result<$array> {
                let values = self.iter_str().collect::<Result<Vec<Option<&str>>>>()?;
                debug!("exporting {} slots of {}", values.len(), self.field().name());
                Ok(<$array>::from(values))
            }

            /// Copies an `arrow` array into a new vector named `name`.
            ///
            /// # Errors
            ///
            /// Returns an error if `allocator` cannot provide the buffers.
            pub fn from_arrow(
                name: &str,
                array: &$array,
                allocator: AllocatorRef,
            ) -> Result<Self> {
                let mut vector = Self::new(name, allocator);
                vector.allocate_new_with(array.value_data().len(), array.len())?;
                for i in 0..array.len() {
                    if array.is_null(i) {
                        vector.set_null_safe(i)?;
                    } else {
                        vector.set_safe_str(i, array.value(i))?;
                    }
                }
                Ok(vector)
            }
        }
    };
}

macro_rules! binary_interop {
    ( $vector:ty, $array:ty ) => {
        impl $vector {
            /// Copies the slots into a new `arrow` array.
            pub fn to_arrow(&self) -> $array {
                let values: Vec<Option<&[u8]>> = self.iter().collect();
                debug!("exporting {} slots of {}", values.len(), self.field().name());
                <$array>::from(values)
            }

            /// Copies an `arrow` array into a new vector named `name`.
            ///
            /// # Errors
            ///
            /// Returns an error if `allocator` cannot provide the buffers.
            pub fn from_arrow(
                name: &str,
                array: &$array,
                allocator: AllocatorRef,
            ) -> Result<Self> {
                let mut vector = Self::new(name, allocator);
                vector.allocate_new_with(array.value_data().len(), array.len())?;
                for i in 0..array.len() {
                    if array.is_null(i) {
                        vector.set_null_safe(i)?;
                    } else {
                        vector.set_safe(i, array.value(i))?;
                    }
                }
                Ok(vector)
            }
        }
    };
}

string_interop!(StringVector, StringArray);
string_interop!(LargeStringVector, LargeStringArray);
binary_interop!(BinaryVector, BinaryArray);
binary_interop!(LargeBinaryVector, LargeBinaryArray);
