use proptest::collection::vec;
use proptest::prelude::*;
use std::convert::TryInto;
use std::sync::Arc;
use varwidth::{
    Allocator, BinaryVector, DataType, Field, LargeBinaryVector, RootAllocator, VectorConfig,
};

#[derive(Clone, Debug)]
enum Op {
    Set(usize, Vec<u8>),
    SetNull(usize),
    SetValueCount(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..48_usize, vec(any::<u8>(), 0..24)).prop_map(|(i, v)| Op::Set(i, v)),
        1 => (0..48_usize).prop_map(Op::SetNull),
        1 => (0..48_usize).prop_map(Op::SetValueCount),
    ]
}

fn small_config() -> VectorConfig {
    VectorConfig {
        initial_slot_capacity: 2,
        average_value_width: 1,
        allocation_limit: None,
    }
}

fn apply(model: &mut Vec<Option<Vec<u8>>>, op: &Op) {
    match op {
        Op::Set(i, v) => {
            if *i >= model.len() {
                model.resize(i + 1, None);
            }
            model[*i] = Some(v.clone());
        }
        Op::SetNull(i) => {
            if *i >= model.len() {
                model.resize(i + 1, None);
            }
            model[*i] = None;
        }
        Op::SetValueCount(n) => model.resize(*n, None),
    }
}

fn decode_offsets(bytes: &[u8], width: usize) -> Vec<u64> {
    bytes
        .chunks(width)
        .map(|chunk| {
            let mut buf = [0_u8; 8];
            buf[..width].copy_from_slice(chunk);
            u64::from_le_bytes(buf)
        })
        .collect()
}

/// Checks the layout invariants that must hold after every mutation.
fn check_layout(
    offsets: &[u8],
    width: usize,
    validity: &[u8],
    model: &[Option<Vec<u8>>],
) -> Result<(), TestCaseError> {
    let offsets = decode_offsets(offsets, width);
    prop_assert_eq!(model.len() + 1, offsets.len());
    prop_assert_eq!(0, offsets[0]);
    for (i, value) in model.iter().enumerate() {
        prop_assert!(offsets[i] <= offsets[i + 1]);
        let length = (offsets[i + 1] - offsets[i]) as usize;
        let valid = validity[i / 8] & (1 << (i % 8)) != 0;
        match value {
            Some(v) => {
                prop_assert!(valid);
                prop_assert_eq!(v.len(), length);
            }
            None => {
                prop_assert!(!valid);
                prop_assert_eq!(0, length);
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn mutations_preserve_layout(ops in vec(op(), 1..60)) {
        let allocator = Arc::new(RootAllocator::unlimited());
        let field = Field::nullable("v", DataType::Binary);
        let mut v = BinaryVector::with_config(field, allocator.clone(), &small_config()).unwrap();
        let mut model: Vec<Option<Vec<u8>>> = Vec::new();

        for op in &ops {
            match op {
                Op::Set(i, bytes) => v.set_safe(*i, bytes).unwrap(),
                Op::SetNull(i) => v.set_null_safe(*i).unwrap(),
                Op::SetValueCount(n) => v.set_value_count(*n).unwrap(),
            }
            apply(&mut model, op);

            prop_assert_eq!(model.len(), v.value_count());
            let buffers = v.buffers();
            check_layout(buffers.offsets, 4, buffers.validity, &model)?;
            prop_assert!(v.validate().is_ok());
        }

        for (i, value) in model.iter().enumerate() {
            prop_assert_eq!(value.as_deref(), v.get(i).unwrap());
        }
        let expected: Vec<u8> = model.iter().flatten().flatten().copied().collect();
        prop_assert_eq!(expected.as_slice(), v.buffers().values);

        drop(v);
        prop_assert_eq!(0, allocator.allocated_bytes());
    }

    #[test]
    fn large_offsets_preserve_layout(ops in vec(op(), 1..40)) {
        let mut v = LargeBinaryVector::new("v", Arc::new(RootAllocator::unlimited()));
        let mut model: Vec<Option<Vec<u8>>> = Vec::new();
        for op in &ops {
            match op {
                Op::Set(i, bytes) => v.set_safe(*i, bytes).unwrap(),
                Op::SetNull(i) => v.set_null_safe(*i).unwrap(),
                Op::SetValueCount(n) => v.set_value_count(*n).unwrap(),
            }
            apply(&mut model, op);
        }
        let buffers = v.buffers();
        check_layout(buffers.offsets, 8, buffers.validity, &model)?;
    }

    #[test]
    fn split_matches_model(
        values in vec(proptest::option::of(vec(any::<u8>(), 0..8)), 0..80),
        start in 0..80_usize,
        length in 0..80_usize
    ) {
        let refs: Vec<Option<&[u8]>> = values.iter().map(Option::as_deref).collect();
        let src: BinaryVector = refs.as_slice().try_into().unwrap();
        let mut dest = BinaryVector::new("dest", src.allocator().clone());
        let result = src.split_and_transfer_to(start, length, &mut dest);
        if start + length > values.len() {
            prop_assert!(result.is_err());
        } else {
            result.unwrap();
            let expected = &refs[start..start + length];
            prop_assert_eq!(expected.to_vec(), dest.iter().collect::<Vec<_>>());
            let buffers = dest.buffers();
            let model: Vec<Option<Vec<u8>>> = values[start..start + length].to_vec();
            check_layout(buffers.offsets, 4, buffers.validity, &model)?;
        }
    }
}
