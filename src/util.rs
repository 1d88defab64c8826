use super::def::*;

/* clipping within min and max */
#[inline]
pub(crate) fn CLIP3<T: PartialOrd>(min_x: T, max_x: T, value: T) -> T {
    if value < min_x {
        min_x
    } else if value > max_x {
        max_x
    } else {
        value
    }
}

#[inline]
pub(crate) fn CONV_LOG2(v: usize) -> u8 {
    debug_assert!(v.is_power_of_two());
    v.trailing_zeros() as u8
}

pub(crate) const SPLIT_MAX_PART_COUNT: usize = 4;

/* geometry of the four quadtree children of a CU */
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct QtSplitStruct {
    pub(crate) size: usize,
    pub(crate) x_pos: [usize; SPLIT_MAX_PART_COUNT],
    pub(crate) y_pos: [usize; SPLIT_MAX_PART_COUNT],
}

pub(crate) fn qt_split_get_part_structure(x0: usize, y0: usize, size: usize) -> QtSplitStruct {
    let half = size >> 1;
    QtSplitStruct {
        size: half,
        x_pos: [x0, x0 + half, x0, x0 + half],
        y_pos: [y0, y0, y0 + half, y0 + half],
    }
}

/* offset of a block in a CTU-sized array laid out per minimum partition in z-order */
#[inline]
pub(crate) fn zorder_offset(x_in_ctu: usize, y_in_ctu: usize) -> usize {
    let mut x = x_in_ctu >> MIN_PU_LOG2;
    let mut y = y_in_ctu >> MIN_PU_LOG2;
    let mut idx = 0;
    let mut bit = 0;
    while x != 0 || y != 0 {
        idx |= ((x & 1) << (2 * bit)) | ((y & 1) << (2 * bit + 1));
        x >>= 1;
        y >>= 1;
        bit += 1;
    }
    idx * MIN_PU_DIM
}

pub(crate) fn block_copy<T: Copy>(
    src: &[T],
    s_src: usize,
    dst: &mut [T],
    s_dst: usize,
    w: usize,
    h: usize,
) {
    for j in 0..h {
        dst[j * s_dst..j * s_dst + w].copy_from_slice(&src[j * s_src..j * s_src + w]);
    }
}
