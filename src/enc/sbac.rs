use lazy_static::lazy_static;
use num_derive::{FromPrimitive, ToPrimitive};

use super::cu::*;
use crate::api::*;
use crate::def::*;

/*****************************************************************************
 * entropy coder seen by the mode decision
 *****************************************************************************/
pub trait EntropyCoder {
    /* adaptive state saved and restored between competing candidates */
    type State: Clone;

    fn reset_bits(&mut self);
    fn num_written_bits(&self) -> u64;
    fn num_bins_coded(&self) -> u64;

    fn encode_split_flag(&mut self, cu: &CuData, split: bool);
    fn encode_skip_flag(&mut self, cu: &CuData);
    fn encode_pred_mode(&mut self, cu: &CuData);
    fn encode_part_size(&mut self, cu: &CuData);
    fn encode_merge_index(&mut self, cu: &CuData);
    fn encode_ipcm_info(&mut self, cu: &CuData);
    fn encode_pred_info(&mut self, cu: &CuData);
    fn encode_coeff(&mut self, cu: &CuData, coeff: &[Vec<TCoeff>; N_C]);
    fn encode_qp(&mut self, cu: &CuData);
    fn encode_cu_transquant_bypass_flag(&mut self, cu: &CuData);

    fn save(&self) -> Self::State;
    fn restore(&mut self, state: &Self::State);
}

/*****************************************************************************
 * checkpoints
 *****************************************************************************/
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum CiIdx {
    /* state before the current CU */
    CI_CURR_BEST = 0,
    /* state after coding the best candidate */
    CI_NEXT_BEST = 1,
    /* state after coding the last tested candidate */
    CI_TEMP_BEST = 2,
}

pub const NUM_CI: usize = 3;

// Entropy states saved per CU depth.
#[derive(Debug, Clone)]
pub struct Checkpoints<S: Clone> {
    slots: Vec<[S; NUM_CI]>,
}

impl<S: Clone> Checkpoints<S> {
    pub fn new(num_depths: usize, init: &S) -> Self {
        Checkpoints {
            slots: vec![[init.clone(), init.clone(), init.clone()]; num_depths],
        }
    }

    pub fn num_depths(&self) -> usize {
        self.slots.len()
    }

    pub fn store<E: EntropyCoder<State = S>>(&mut self, depth: usize, ci: CiIdx, coder: &E) {
        self.slots[depth][ci as usize] = coder.save();
    }

    pub fn load<E: EntropyCoder<State = S>>(&self, depth: usize, ci: CiIdx, coder: &mut E) {
        coder.restore(&self.slots[depth][ci as usize]);
    }

    pub fn copy(&mut self, from: (usize, CiIdx), to: (usize, CiIdx)) {
        if from == to {
            return;
        }
        let state = self.slots[from.0][from.1 as usize].clone();
        self.slots[to.0][to.1 as usize] = state;
    }

    pub fn get(&self, depth: usize, ci: CiIdx) -> &S {
        &self.slots[depth][ci as usize]
    }
}

/*****************************************************************************
 * bit estimation with adaptive binary contexts
 *****************************************************************************/
/* fixed point unit of the fractional bit counter */
const FRAC_BITS_SHIFT: u32 = 15;

// Entry i is -log2((i + 0.5) / 1024) in units of 2^-FRAC_BITS_SHIFT bits.
// A bin whose probability is s / 512 costs entry 2s.
lazy_static! {
    static ref entropy_bits: Box<[u32]> = {
        let mut bits = vec![0; 1024].into_boxed_slice();
        for i in 0..1024 {
            let p = (512.0 * (i as f64 + 0.5)) / 1024.0;
            bits[i] = (-32768.0 * (p.log10() / (2.0f64).log10() - 9.0)) as u32;
        }
        bits
    };
}

fn biari_no_bits(bin: u32, model: SBAC_CTX_MODEL) -> u64 {
    let mps = (model & 1) as u32;
    let state = model >> 1;
    let state = if bin != mps { state } else { 512 - state };
    entropy_bits[(state as usize) << 1] as u64
}

#[derive(Debug, Clone, Copy, Default)]
struct SbacCounter {
    frac_bits: u64,
    bins: u64,
}

impl SbacCounter {
    fn encode_bin(&mut self, model: &mut SBAC_CTX_MODEL, bin: u32) {
        self.bins += 1;
        self.frac_bits += biari_no_bits(bin, *model);

        let mut state = *model >> 1;
        let mut mps = *model & 1;
        if bin != mps as u32 {
            state = state + ((512 - state + 16) >> 5);
            if state > 256 {
                mps = 1 - mps;
                state = 512 - state;
            }
        } else {
            state = state - ((state + 16) >> 5);
        }
        *model = (state << 1) + mps;
    }

    fn encode_bin_ep(&mut self) {
        self.bins += 1;
        self.frac_bits += 1 << FRAC_BITS_SHIFT;
    }

    fn encode_bins_ep(&mut self, num_bin: u32) {
        self.bins += num_bin as u64;
        self.frac_bits += (num_bin as u64) << FRAC_BITS_SHIFT;
    }

    /* raw bits written without binarization */
    fn write_raw(&mut self, num_bits: u64) {
        self.frac_bits += num_bits << FRAC_BITS_SHIFT;
    }

    fn write_truncate_unary_sym(&mut self, model: &mut [SBAC_CTX_MODEL], sym: u32, max_num: u32) {
        for i in 0..max_num.saturating_sub(1) {
            let bin = if i == sym { 0 } else { 1 };
            let idx = (i as usize).min(model.len() - 1);
            self.encode_bin(&mut model[idx], bin);
            if bin == 0 {
                break;
            }
        }
    }

    /* k-th order exp-golomb in bypass bins */
    fn write_exp_golomb_ep(&mut self, mut sym: u32, mut k: u32) {
        let mut num_bins = 0;
        while sym >= (1 << k) {
            num_bins += 1;
            sym -= 1 << k;
            k += 1;
        }
        self.encode_bins_ep(num_bins + 1 + k);
    }
}

// Estimates the bits of the CU syntax with adaptive contexts; nothing is
// written to a bitstream.
#[derive(Debug, Clone)]
pub struct SbacEstimator {
    ctx: SbacCtx,
    cnt: SbacCounter,
    max_num_merge_cand: usize,
    bit_depth_luma: usize,
    bit_depth_chroma: usize,
    chroma_sampling: ChromaSampling,
}

impl SbacEstimator {
    pub fn new(cfg: &EncoderConfig) -> Self {
        SbacEstimator {
            ctx: SbacCtx::default(),
            cnt: SbacCounter::default(),
            max_num_merge_cand: cfg.max_num_merge_cand,
            bit_depth_luma: cfg.bit_depth_luma,
            bit_depth_chroma: cfg.bit_depth_chroma,
            chroma_sampling: cfg.chroma_sampling,
        }
    }

    /* reset the contexts at the start of a slice */
    pub fn reset(&mut self) {
        self.ctx = SbacCtx::default();
        self.cnt = SbacCounter::default();
    }

    /* fractional bits in 1/32768 bit units */
    pub fn frac_bits(&self) -> u64 {
        self.cnt.frac_bits
    }

    fn encode_mvd(&mut self, mvd: Mv) {
        for &v in [mvd.x, mvd.y].iter() {
            let abs = (v as i32).unsigned_abs();
            self.cnt.encode_bin(&mut self.ctx.mvd[0], (abs > 0) as u32);
            if abs > 0 {
                self.cnt.encode_bin(&mut self.ctx.mvd[1], (abs > 1) as u32);
                if abs > 1 {
                    self.cnt.write_exp_golomb_ep(abs - 2, 1);
                }
                self.cnt.encode_bin_ep();
            }
        }
    }
}

impl EntropyCoder for SbacEstimator {
    type State = SbacCtx;

    fn reset_bits(&mut self) {
        self.cnt = SbacCounter::default();
    }

    fn num_written_bits(&self) -> u64 {
        self.cnt.frac_bits >> FRAC_BITS_SHIFT
    }

    fn num_bins_coded(&self) -> u64 {
        self.cnt.bins
    }

    fn encode_split_flag(&mut self, cu: &CuData, split: bool) {
        let idx = cu.depth.min(NUM_CTX_SPLIT_CU_FLAG - 1);
        self.cnt
            .encode_bin(&mut self.ctx.split_cu_flag[idx], split as u32);
    }

    fn encode_skip_flag(&mut self, cu: &CuData) {
        self.cnt.encode_bin(&mut self.ctx.skip_flag[0], cu.skip as u32);
    }

    fn encode_pred_mode(&mut self, cu: &CuData) {
        if cu.skip {
            return;
        }
        self.cnt
            .encode_bin(&mut self.ctx.pred_mode[0], cu.is_intra() as u32);
    }

    fn encode_part_size(&mut self, cu: &CuData) {
        if cu.skip {
            return;
        }
        if cu.is_intra() {
            let bin = (cu.part_size == PartSize::SIZE_2Nx2N) as u32;
            self.cnt.encode_bin(&mut self.ctx.part_size[0], bin);
            return;
        }
        /* symmetric shapes in truncated unary, one more bin to pick the asymmetric one */
        let sym = match cu.part_size {
            PartSize::SIZE_2Nx2N => 0,
            PartSize::SIZE_2NxN | PartSize::SIZE_2NxnU | PartSize::SIZE_2NxnD => 1,
            PartSize::SIZE_Nx2N | PartSize::SIZE_nLx2N | PartSize::SIZE_nRx2N => 2,
            PartSize::SIZE_NxN => 3,
        };
        self.cnt
            .write_truncate_unary_sym(&mut self.ctx.part_size, sym, NUM_CTX_PART_SIZE as u32);
        if cu.part_size.is_amp() {
            self.cnt.encode_bin_ep();
        }
    }

    fn encode_merge_index(&mut self, cu: &CuData) {
        if self.max_num_merge_cand <= 1 {
            return;
        }
        let idx = cu.pu[0].merge_idx as u32;
        let max = self.max_num_merge_cand as u32;
        self.cnt.encode_bin(&mut self.ctx.merge_idx[0], (idx > 0) as u32);
        if idx > 0 {
            /* bypass truncated unary for the remaining bins */
            let rest = idx.min(max - 1) - 1;
            let num = if idx == max - 1 { rest } else { rest + 1 };
            self.cnt.encode_bins_ep(num);
        }
    }

    fn encode_ipcm_info(&mut self, cu: &CuData) {
        /* pcm flag and byte alignment */
        self.cnt.write_raw(if cu.ipcm { 8 } else { 0 });
        if !cu.ipcm {
            return;
        }
        let size = cu.size;
        let raw = raw_bits(
            size,
            size,
            self.chroma_sampling,
            self.bit_depth_luma,
            self.bit_depth_chroma,
        );
        self.cnt.write_raw(raw);
    }

    fn encode_pred_info(&mut self, cu: &CuData) {
        if cu.is_intra() {
            let num = if cu.part_size == PartSize::SIZE_NxN { 4 } else { 1 };
            for _ in 0..num {
                self.cnt
                    .encode_bin(&mut self.ctx.intra_dir[0], (cu.intra_dir[0] < 3) as u32);
                self.cnt.encode_bins_ep(if cu.intra_dir[0] < 3 { 2 } else { 5 });
            }
            self.cnt
                .encode_bin(&mut self.ctx.chroma_dir[0], (cu.intra_dir[1] != 4) as u32);
            if cu.intra_dir[1] != 4 {
                self.cnt.encode_bins_ep(2);
            }
            return;
        }
        for part in 0..cu.part_size.num_parts() {
            let pu = cu.pu[part];
            self.cnt.encode_bin(&mut self.ctx.merge_flag[0], pu.merge as u32);
            if pu.merge {
                let mut one = *cu;
                one.pu[0] = pu;
                self.encode_merge_index(&one);
                continue;
            }
            let dir_idx = cu.depth.min(NUM_CTX_INTER_DIR - 1);
            self.cnt.encode_bin(
                &mut self.ctx.inter_dir[dir_idx],
                (pu.inter_dir == PRED_BI) as u32,
            );
            if pu.inter_dir != PRED_BI {
                self.cnt.encode_bin(
                    &mut self.ctx.inter_dir[NUM_CTX_INTER_DIR - 1],
                    (pu.inter_dir == PRED_L1) as u32,
                );
            }
            for lidx in 0..REFP_NUM {
                if pu.inter_dir & (1 << lidx) == 0 {
                    continue;
                }
                let refi = pu.mv_field[lidx].ref_idx.max(0) as u32;
                self.cnt
                    .write_truncate_unary_sym(&mut self.ctx.ref_idx, refi, refi + 2);
                self.encode_mvd(pu.mvd[lidx]);
                self.cnt
                    .encode_bin(&mut self.ctx.mvp_idx[0], pu.mvp_idx[lidx] as u32);
            }
        }
    }

    fn encode_coeff(&mut self, cu: &CuData, coeff: &[Vec<TCoeff>; N_C]) {
        if cu.ipcm {
            return;
        }
        if cu.is_inter() && !(cu.part_size == PartSize::SIZE_2Nx2N && cu.is_merge()) {
            self.cnt
                .encode_bin(&mut self.ctx.qt_root_cbf[0], cu.root_cbf() as u32);
            if !cu.root_cbf() {
                return;
            }
        }
        let num_comp = self.chroma_sampling.num_components();
        for c in 0..num_comp {
            let cbf_idx = if c == Y_C { cu.depth.min(1) } else { 2 + cu.depth.min(2) };
            self.cnt.encode_bin(&mut self.ctx.qt_cbf[cbf_idx], cu.cbf[c] as u32);
        }
        for c in 0..num_comp {
            if !cu.cbf[c] {
                continue;
            }
            let coef = &coeff[c];
            let last = match coef.iter().rposition(|&v| v != 0) {
                Some(last) => last,
                None => continue,
            };
            /* position of the last coefficient */
            self.cnt
                .write_exp_golomb_ep(last as u32, 0);
            for (pos, &v) in coef[..=last].iter().enumerate() {
                let sig_idx = pos.min(NUM_CTX_SIG_FLAG / 2 - 1) + if c == Y_C { 0 } else { NUM_CTX_SIG_FLAG / 2 };
                if pos != last {
                    self.cnt.encode_bin(&mut self.ctx.sig_flag[sig_idx], (v != 0) as u32);
                }
                if v == 0 {
                    continue;
                }
                let abs = v.unsigned_abs();
                let gt1_idx = (abs.min(4) as usize - 1) + if c == Y_C { 0 } else { NUM_CTX_GT1_FLAG / 2 };
                self.cnt.encode_bin(&mut self.ctx.gt1_flag[gt1_idx], (abs > 1) as u32);
                if abs > 1 {
                    self.cnt.write_exp_golomb_ep(abs - 2, 0);
                }
                /* sign */
                self.cnt.encode_bin_ep();
            }
        }
    }

    fn encode_qp(&mut self, cu: &CuData) {
        let dqp = cu.qp - cu.ref_qp;
        let abs = dqp.unsigned_abs();
        let prefix = abs.min(5);
        for i in 0..prefix.min(4) + 1 {
            let bin = (i < prefix) as u32;
            let idx = (i as usize).min(NUM_CTX_DELTA_QP - 1);
            self.cnt.encode_bin(&mut self.ctx.delta_qp[idx], bin);
            if bin == 0 {
                break;
            }
        }
        if abs >= 5 {
            self.cnt.write_exp_golomb_ep(abs - 5, 0);
        }
        if abs > 0 {
            self.cnt.encode_bin_ep();
        }
    }

    fn encode_cu_transquant_bypass_flag(&mut self, cu: &CuData) {
        self.cnt.encode_bin(
            &mut self.ctx.transquant_bypass[0],
            cu.transquant_bypass as u32,
        );
    }

    fn save(&self) -> SbacCtx {
        self.ctx
    }

    fn restore(&mut self, state: &SbacCtx) {
        self.ctx = *state;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inter_cu() -> (CuData, [Vec<TCoeff>; N_C]) {
        let mut cu = CuData {
            size: 16,
            depth: 2,
            qp: 30,
            ref_qp: 27,
            ..Default::default()
        };
        cu.pu[0].inter_dir = PRED_L0;
        cu.pu[0].mv_field[REFP_0].ref_idx = 0;
        cu.pu[0].mvd[REFP_0] = Mv::new(3, -1);
        cu.cbf[Y_C] = true;
        let mut coeff = [vec![0; 256], vec![0; 64], vec![0; 64]];
        coeff[Y_C][0] = 7;
        coeff[Y_C][3] = -1;
        (cu, coeff)
    }

    fn code_cu<E: EntropyCoder>(coder: &mut E, cu: &CuData, coeff: &[Vec<TCoeff>; N_C]) -> u64 {
        coder.reset_bits();
        coder.encode_skip_flag(cu);
        coder.encode_pred_mode(cu);
        coder.encode_part_size(cu);
        coder.encode_pred_info(cu);
        coder.encode_coeff(cu, coeff);
        coder.encode_qp(cu);
        coder.num_written_bits()
    }

    #[test]
    fn entropy_table_bounds() {
        /* a probability of one half costs about one bit */
        let half = biari_no_bits(0, PROB_INIT);
        assert!(half > 32700 && half <= 32768);
        assert_eq!(biari_no_bits(1, PROB_INIT), half);
        assert!(entropy_bits[1023] < 64);
        /* probability 1/4 costs two bits */
        let quarter = entropy_bits[256];
        assert!(quarter > 65400 && quarter <= 2 << FRAC_BITS_SHIFT);
    }

    #[test]
    fn contexts_adapt() {
        let mut cnt = SbacCounter::default();
        let mut model = PROB_INIT;
        cnt.encode_bin(&mut model, 0);
        let first = cnt.frac_bits;
        for _ in 0..20 {
            cnt.encode_bin(&mut model, 0);
        }
        let before = cnt.frac_bits;
        cnt.encode_bin(&mut model, 0);
        assert!(cnt.frac_bits - before < first);
        assert_eq!(cnt.bins, 22);
    }

    #[test]
    fn checkpoint_reproduces_bits() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let (cu, coeff) = inter_cu();
        let mut cps = Checkpoints::new(4, &coder.save());

        code_cu(&mut coder, &cu, &coeff);
        cps.store(2, CiIdx::CI_CURR_BEST, &coder);
        let bits = code_cu(&mut coder, &cu, &coeff);
        cps.store(2, CiIdx::CI_TEMP_BEST, &coder);

        cps.load(2, CiIdx::CI_CURR_BEST, &mut coder);
        assert_eq!(code_cu(&mut coder, &cu, &coeff), bits);
        assert_eq!(&coder.save(), cps.get(2, CiIdx::CI_TEMP_BEST));
    }

    #[test]
    fn checkpoint_copy() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let mut cps = Checkpoints::new(2, &coder.save());
        let (cu, coeff) = inter_cu();
        code_cu(&mut coder, &cu, &coeff);
        cps.store(1, CiIdx::CI_TEMP_BEST, &coder);
        assert!(cps.get(1, CiIdx::CI_NEXT_BEST) != cps.get(1, CiIdx::CI_TEMP_BEST));
        cps.copy((1, CiIdx::CI_TEMP_BEST), (1, CiIdx::CI_NEXT_BEST));
        assert_eq!(cps.get(1, CiIdx::CI_NEXT_BEST), cps.get(1, CiIdx::CI_TEMP_BEST));
        assert_eq!(cps.get(0, CiIdx::CI_NEXT_BEST), &SbacCtx::default());
    }

    #[test]
    fn ipcm_costs_raw_samples() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let cu = CuData {
            size: 8,
            ipcm: true,
            pred_mode: PredMode::MODE_INTRA,
            ..Default::default()
        };
        coder.reset_bits();
        coder.encode_ipcm_info(&cu);
        assert_eq!(coder.num_written_bits(), 8 + 8 * 8 * 8 + 2 * 16 * 8);
    }

    #[test]
    fn zero_delta_qp_is_cheap() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let mut cu = CuData {
            qp: 30,
            ref_qp: 30,
            ..Default::default()
        };
        coder.reset_bits();
        coder.encode_qp(&cu);
        let zero = coder.frac_bits();
        coder.reset();
        cu.qp = 40;
        coder.encode_qp(&cu);
        assert!(coder.frac_bits() > zero);
        assert_eq!(coder.num_bins_coded(), 5 + 5 + 1);
    }
}
