use crate::api::*;
use crate::def::*;
use crate::util::*;

/*****************************************************************************
 * motion
 *****************************************************************************/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mv {
    pub x: i16,
    pub y: i16,
}

impl Mv {
    pub fn new(x: i16, y: i16) -> Self {
        Mv { x, y }
    }

    #[inline]
    pub fn abs_sum(&self) -> i32 {
        (self.x as i32).abs() + (self.y as i32).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MvField {
    pub mv: Mv,
    pub ref_idx: i8,
}

impl Default for MvField {
    fn default() -> Self {
        MvField {
            mv: Mv::default(),
            ref_idx: REFI_INVALID,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeCand {
    pub inter_dir: u8,
    pub mv_field: [MvField; REFP_NUM],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MergeCandList {
    pub cands: [MergeCand; MRG_MAX_NUM_CANDS],
    pub num: usize,
}

/* motion of one prediction unit */
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PuMotion {
    pub merge: bool,
    pub merge_idx: u8,
    pub inter_dir: u8,
    pub mv_field: [MvField; REFP_NUM],
    pub mvd: [Mv; REFP_NUM],
    pub mvp_idx: [u8; REFP_NUM],
}

pub const MAX_NUM_PU: usize = 4;

/*****************************************************************************
 * decisions of a coding unit
 *****************************************************************************/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CuData {
    pub x: usize,
    pub y: usize,
    pub size: usize,
    pub depth: usize,
    pub part_size: PartSize,
    pub pred_mode: PredMode,
    pub skip: bool,
    pub pu: [PuMotion; MAX_NUM_PU],
    /* luma and chroma intra directions */
    pub intra_dir: [u8; 2],
    pub cbf: [bool; N_C],
    pub transquant_bypass: bool,
    pub ipcm: bool,
    pub qp: i32,
    pub ref_qp: i32,
    pub chroma_qp_adj: u8,
}

impl Default for CuData {
    fn default() -> Self {
        CuData {
            x: 0,
            y: 0,
            size: 0,
            depth: 0,
            part_size: PartSize::SIZE_2Nx2N,
            pred_mode: PredMode::MODE_INTER,
            skip: false,
            pu: [PuMotion::default(); MAX_NUM_PU],
            intra_dir: [0; 2],
            cbf: [false; N_C],
            transquant_bypass: false,
            ipcm: false,
            qp: 0,
            ref_qp: 0,
            chroma_qp_adj: 0,
        }
    }
}

impl CuData {
    #[inline]
    pub fn is_inter(&self) -> bool {
        self.pred_mode == PredMode::MODE_INTER
    }

    #[inline]
    pub fn is_intra(&self) -> bool {
        self.pred_mode == PredMode::MODE_INTRA
    }

    #[inline]
    pub fn is_lossless(&self) -> bool {
        self.transquant_bypass
    }

    /* merge flag of the first prediction unit */
    #[inline]
    pub fn is_merge(&self) -> bool {
        self.pu[0].merge
    }

    /* any coded residual */
    #[inline]
    pub fn root_cbf(&self) -> bool {
        self.cbf[Y_C] || self.cbf[U_C] || self.cbf[V_C]
    }

    /* reset everything but geometry and reference QP */
    fn reset_modes(&mut self, qp: i32, lossless: bool) {
        *self = CuData {
            x: self.x,
            y: self.y,
            size: self.size,
            depth: self.depth,
            ref_qp: self.ref_qp,
            qp,
            transquant_bypass: lossless,
            ..Default::default()
        };
    }
}

/*****************************************************************************
 * CU candidate
 *****************************************************************************/
#[derive(Debug, Clone)]
pub struct CodingUnit {
    pub data: CuData,
    pub bits: u64,
    pub bins: u64,
    pub dist: u64,
    pub cost: f64,
    /* set when the candidate is the union of four sub-CUs */
    pub split: bool,
    /* leaf decisions of a split candidate in z-order */
    pub leaves: Vec<CuData>,
    /* quantized coefficients per component, z-ordered per minimum partition */
    pub coeff: [Vec<TCoeff>; N_C],
    /* luma coefficients before rounding, scaled by 1 << ARL_C_PRECISION */
    pub arl_coeff_y: Vec<TCoeff>,
    /* original samples kept for lossless CUs */
    pub pcm_sample: [Vec<pel>; N_C],
    pub chroma_sampling: ChromaSampling,
}

impl CodingUnit {
    pub fn new(size: usize, depth: usize, chroma_sampling: ChromaSampling) -> Self {
        let (xdec, ydec) = chroma_sampling.decimation();
        let c_area = if chroma_sampling == ChromaSampling::Cs400 {
            0
        } else {
            (size >> xdec) * (size >> ydec)
        };
        let min_leaves = (size / MIN_CU_SIZE).max(1);
        CodingUnit {
            data: CuData {
                size,
                depth,
                ..Default::default()
            },
            bits: 0,
            bins: 0,
            dist: 0,
            cost: MAX_COST,
            split: false,
            leaves: Vec::with_capacity(min_leaves * min_leaves),
            coeff: [vec![0; size * size], vec![0; c_area], vec![0; c_area]],
            arl_coeff_y: vec![0; size * size],
            pcm_sample: [vec![0; size * size], vec![0; c_area], vec![0; c_area]],
            chroma_sampling,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.size
    }

    fn reset_costs(&mut self) {
        self.bits = 0;
        self.bins = 0;
        self.dist = 0;
        self.cost = MAX_COST;
        self.split = false;
        self.leaves.clear();
    }

    pub fn init_ctu(&mut self, x: usize, y: usize, qp: i32, ref_qp: i32) {
        self.data = CuData {
            x,
            y,
            size: self.data.size,
            depth: 0,
            qp,
            ref_qp,
            ..Default::default()
        };
        self.reset_costs();
    }

    /* position the candidate on quadrant `part_idx` of `parent` */
    pub fn init_sub_cu(&mut self, parent: &CuData, part_idx: usize, qp: i32) {
        let split = qt_split_get_part_structure(parent.x, parent.y, parent.size);
        debug_assert_eq!(split.size, self.data.size);
        self.data = CuData {
            x: split.x_pos[part_idx],
            y: split.y_pos[part_idx],
            size: self.data.size,
            depth: parent.depth + 1,
            qp,
            ref_qp: parent.ref_qp,
            ..Default::default()
        };
        self.reset_costs();
    }

    /* reset before testing a new mode */
    pub fn init_est_data(&mut self, qp: i32, lossless: bool) {
        self.data.reset_modes(qp, lossless);
        self.reset_costs();
    }

    /* accumulate the decision of sub-CU `part_idx` into this candidate */
    pub fn copy_part_from(&mut self, child: &CodingUnit, part_idx: usize) {
        if !self.split {
            self.split = true;
            self.leaves.clear();
            self.cost = 0.0;
        }
        self.bits += child.bits;
        self.bins += child.bins;
        self.dist += child.dist;
        self.cost += child.cost;
        self.leaves.extend_from_slice(child.decisions());

        for c in 0..N_C {
            let n = child.coeff[c].len();
            self.coeff[c][part_idx * n..(part_idx + 1) * n].copy_from_slice(&child.coeff[c]);
            let n = child.pcm_sample[c].len();
            self.pcm_sample[c][part_idx * n..(part_idx + 1) * n]
                .copy_from_slice(&child.pcm_sample[c]);
        }
        let n = child.arl_coeff_y.len();
        self.arl_coeff_y[part_idx * n..(part_idx + 1) * n].copy_from_slice(&child.arl_coeff_y);
    }

    /* leaf decisions covered by this candidate in z-order */
    pub fn decisions(&self) -> &[CuData] {
        if self.split {
            &self.leaves
        } else {
            std::slice::from_ref(&self.data)
        }
    }

    pub fn has_residual(&self) -> bool {
        self.decisions().iter().any(|cu| cu.root_cbf())
    }

    pub fn is_skipped(&self) -> bool {
        !self.split && self.data.skip
    }

    /* give every leaf the same QP */
    pub fn set_qp_sub_parts(&mut self, qp: i32) {
        self.data.qp = qp;
        for leaf in self.leaves.iter_mut() {
            leaf.qp = qp;
        }
    }

    /* leaves coded before the first one carrying residual take `qp`; returns whether residual was found */
    pub fn set_qp_sub_cus(&mut self, qp: i32) -> bool {
        if !self.split {
            if self.data.root_cbf() {
                return true;
            }
            self.data.qp = qp;
            return false;
        }
        for leaf in self.leaves.iter_mut() {
            if leaf.root_cbf() {
                return true;
            }
            leaf.qp = qp;
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(size: usize, depth: usize, parent: &CuData, idx: usize, cbf: bool) -> CodingUnit {
        let mut cu = CodingUnit::new(size, depth, ChromaSampling::Cs420);
        cu.init_sub_cu(parent, idx, 30);
        cu.init_est_data(30, false);
        cu.data.cbf[Y_C] = cbf;
        cu.bits = 10 + idx as u64;
        cu.dist = 100;
        cu.cost = 5.0;
        for v in cu.coeff[Y_C].iter_mut() {
            *v = idx as i32 + 1;
        }
        cu
    }

    #[test]
    fn sub_cu_positions() {
        let mut parent = CodingUnit::new(64, 0, ChromaSampling::Cs420);
        parent.init_ctu(64, 0, 32, 32);
        let mut child = CodingUnit::new(32, 1, ChromaSampling::Cs420);
        child.init_sub_cu(&parent.data, 3, 30);
        assert_eq!((child.data.x, child.data.y), (96, 32));
        assert_eq!(child.data.depth, 1);
        assert_eq!(child.cost, MAX_COST);
    }

    #[test]
    fn copy_parts_accumulates_in_zorder() {
        let mut parent = CodingUnit::new(16, 0, ChromaSampling::Cs420);
        parent.init_ctu(0, 0, 30, 30);
        parent.init_est_data(30, false);
        for idx in 0..4 {
            let child = leaf(8, 1, &parent.data.clone(), idx, idx == 2);
            parent.copy_part_from(&child, idx);
        }
        assert!(parent.split);
        assert_eq!(parent.bits, 10 + 11 + 12 + 13);
        assert_eq!(parent.dist, 400);
        assert_eq!(parent.cost, 20.0);
        assert_eq!(parent.decisions().len(), 4);
        assert_eq!(parent.decisions()[1].x, 8);
        assert_eq!(parent.coeff[Y_C][zorder_offset(0, 8)], 3);
        assert_eq!(parent.coeff[Y_C][zorder_offset(8, 8)], 4);
        assert!(parent.has_residual());
    }

    #[test]
    fn qp_of_leaves_before_residual() {
        let mut parent = CodingUnit::new(16, 0, ChromaSampling::Cs420);
        parent.init_ctu(0, 0, 30, 26);
        parent.init_est_data(30, false);
        for idx in 0..4 {
            let child = leaf(8, 1, &parent.data.clone(), idx, idx == 2);
            parent.copy_part_from(&child, idx);
        }
        assert!(parent.set_qp_sub_cus(26));
        let qps: Vec<i32> = parent.decisions().iter().map(|cu| cu.qp).collect();
        assert_eq!(qps, vec![26, 26, 30, 30]);
    }

    #[test]
    fn est_data_keeps_geometry() {
        let mut cu = CodingUnit::new(32, 1, ChromaSampling::Cs420);
        cu.data.x = 32;
        cu.data.ref_qp = 22;
        cu.data.skip = true;
        cu.bits = 7;
        cu.init_est_data(27, true);
        assert_eq!(cu.data.x, 32);
        assert_eq!(cu.data.ref_qp, 22);
        assert_eq!(cu.data.qp, 27);
        assert!(cu.data.transquant_bypass);
        assert!(!cu.data.skip);
        assert_eq!(cu.bits, 0);
    }
}
