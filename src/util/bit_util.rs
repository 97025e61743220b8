static BIT_MASK: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// Returns the nearest number that is `>=` than `num` and is a multiple of 64
#[inline]
pub fn round_upto_multiple_of_64(num: usize) -> usize {
    round_upto_power_of_2(num, 64)
}

/// Returns the nearest multiple of `factor` that is `>=` than `num`. Here `factor` must
/// be a power of 2.
fn round_upto_power_of_2(num: usize, factor: usize) -> usize {
    debug_assert!(factor > 0 && (factor & (factor - 1)) == 0);
    (num + (factor - 1)) & !(factor - 1)
}

/// Returns the number of bytes needed to hold `num_bits` bits.
#[inline]
pub fn bytes_for_bits(num_bits: usize) -> usize {
    num_bits / 8 + usize::from(num_bits % 8 > 0)
}

/// Returns whether bit at position `i` in `data` is set or not.
///
/// # Panics
///
/// Panics if `i / 8` is out of bounds of `data`.
#[inline]
pub fn get_bit(data: &[u8], i: usize) -> bool {
    (data[i >> 3] & BIT_MASK[i & 7]) != 0
}

/// Sets bit at position `i` in `data`.
#[inline]
pub fn set_bit(data: &mut [u8], i: usize) {
    data[i >> 3] |= BIT_MASK[i & 7];
}

/// Clears bit at position `i` in `data`.
#[inline]
pub fn unset_bit(data: &mut [u8], i: usize) {
    data[i >> 3] &= !BIT_MASK[i & 7];
}

/// Counts the set bits among the first `num_bits` bits of `data`.
pub fn count_set_bits(data: &[u8], num_bits: usize) -> usize {
    let full = num_bits / 8;
    let mut count: usize = data[..full].iter().map(|b| b.count_ones() as usize).sum();
    for i in full * 8..num_bits {
        if get_bit(data, i) {
            count += 1;
        }
    }
    count
}

/// Copies `len` bits starting at bit `src_offset` of `src` into `dst`,
/// starting at bit 0. The bits of `dst` past `len` are left untouched.
pub fn copy_bits(src: &[u8], src_offset: usize, dst: &mut [u8], len: usize) {
    if src_offset % 8 == 0 {
        let start = src_offset / 8;
        let full = len / 8;
        dst[..full].copy_from_slice(&src[start..start + full]);
        for i in full * 8..len {
            copy_one(src, src_offset + i, dst, i);
        }
    } else {
        for i in 0..len {
            copy_one(src, src_offset + i, dst, i);
        }
    }
}

#[inline]
fn copy_one(src: &[u8], from: usize, dst: &mut [u8], to: usize) {
    if get_bit(src, from) {
        set_bit(dst, to);
    } else {
        unset_bit(dst, to);
    }
}
