use crate::api::*;

/* asymmetric shapes worth testing for a CU */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmpTestModes {
    /* 2NxnU and 2NxnD with motion search */
    pub hor: bool,
    /* nLx2N and nRx2N with motion search */
    pub ver: bool,
    /* horizontal shapes with merge candidates only */
    pub merge_hor: bool,
    /* vertical shapes with merge candidates only */
    pub merge_ver: bool,
}

/* `parent` is the shape of the parent CU, None when the parent was not coded inter */
pub fn derive_test_mode_amp(
    best_part: PartSize,
    best_is_merge: bool,
    best_is_skip: bool,
    parent: Option<PartSize>,
    width: usize,
) -> AmpTestModes {
    let mut modes = AmpTestModes::default();
    if width == 64 {
        return modes;
    }

    match best_part {
        PartSize::SIZE_2NxN => modes.hor = true,
        PartSize::SIZE_Nx2N => modes.ver = true,
        PartSize::SIZE_2Nx2N if !best_is_merge && !best_is_skip => {
            modes.hor = true;
            modes.ver = true;
        }
        _ => {}
    }

    match parent {
        Some(p) if p.is_amp_hor() => modes.merge_hor = true,
        Some(p) if p.is_amp_ver() => modes.merge_ver = true,
        None => match best_part {
            PartSize::SIZE_2NxN => modes.merge_hor = true,
            PartSize::SIZE_Nx2N => modes.merge_ver = true,
            _ => {}
        },
        _ => {}
    }

    if best_part == PartSize::SIZE_2Nx2N && !best_is_skip {
        modes.merge_hor = true;
        modes.merge_ver = true;
    }
    modes
}

#[cfg(test)]
mod test {
    use super::*;
    use interpolate_name::interpolate_test;
    use pretty_assertions::assert_eq;

    fn modes(hor: bool, ver: bool, merge_hor: bool, merge_ver: bool) -> AmpTestModes {
        AmpTestModes {
            hor,
            ver,
            merge_hor,
            merge_ver,
        }
    }

    #[interpolate_test(hor_2nxn, PartSize::SIZE_2NxN, false, false, Some(PartSize::SIZE_2Nx2N), modes(true, false, false, false))]
    #[interpolate_test(ver_nx2n, PartSize::SIZE_Nx2N, false, false, Some(PartSize::SIZE_2Nx2N), modes(false, true, false, false))]
    #[interpolate_test(both_2nx2n, PartSize::SIZE_2Nx2N, false, false, Some(PartSize::SIZE_2Nx2N), modes(true, true, true, true))]
    #[interpolate_test(merge_2nx2n, PartSize::SIZE_2Nx2N, true, false, Some(PartSize::SIZE_2Nx2N), modes(false, false, true, true))]
    #[interpolate_test(skip_2nx2n, PartSize::SIZE_2Nx2N, true, true, Some(PartSize::SIZE_2Nx2N), modes(false, false, false, false))]
    #[interpolate_test(parent_amp_hor, PartSize::SIZE_Nx2N, false, false, Some(PartSize::SIZE_2NxnD), modes(false, true, true, false))]
    #[interpolate_test(parent_amp_ver, PartSize::SIZE_2NxN, false, false, Some(PartSize::SIZE_nLx2N), modes(true, false, false, true))]
    #[interpolate_test(parent_intra_hor, PartSize::SIZE_2NxN, false, false, None, modes(true, false, true, false))]
    #[interpolate_test(parent_intra_ver, PartSize::SIZE_Nx2N, false, false, None, modes(false, true, false, true))]
    #[interpolate_test(nxn, PartSize::SIZE_NxN, false, false, Some(PartSize::SIZE_2NxN), modes(false, false, false, false))]
    fn amp_modes(
        best: PartSize,
        merge: bool,
        skip: bool,
        parent: Option<PartSize>,
        expected: AmpTestModes,
    ) {
        assert_eq!(derive_test_mode_amp(best, merge, skip, parent, 32), expected);
        /* same inputs, same answer */
        assert_eq!(
            derive_test_mode_amp(best, merge, skip, parent, 32),
            derive_test_mode_amp(best, merge, skip, parent, 32)
        );
    }

    #[test]
    fn largest_cu_has_no_amp() {
        for &part in [PartSize::SIZE_2Nx2N, PartSize::SIZE_2NxN, PartSize::SIZE_Nx2N].iter() {
            assert_eq!(
                derive_test_mode_amp(part, false, false, None, 64),
                AmpTestModes::default()
            );
        }
    }
}
