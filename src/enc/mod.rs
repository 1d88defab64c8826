pub(crate) mod amp;
pub(crate) mod aq;
pub(crate) mod arl;
pub(crate) mod cu;
pub(crate) mod mode;
pub(crate) mod pinter;
pub(crate) mod pintra;
pub(crate) mod qp;
pub(crate) mod sbac;
pub(crate) mod yuv;


use log::*;

use super::api::*;
use super::def::*;
use super::tracer::*;

use arl::ArlStats;
use cu::*;
use qp::{QpDerivation, QpInputs};
use sbac::*;
use yuv::CuYuv;

/*****************************************************************************
 * slice level parameters
 *****************************************************************************/
#[derive(Debug, Clone, Default)]
pub struct SliceInfo {
    pub slice_type: SliceType,
    pub qp: i32,
    pub poc: i32,
    /* number of active references per list */
    pub num_ref_idx: [usize; REFP_NUM],
    /* bits already written to the current slice / slice segment */
    pub slice_bits: u64,
    pub slice_segment_bits: u64,
    pub slice_start_ctu_addr: usize,
    pub segment_start_ctu_addr: usize,
    pub use_chroma_qp_adj: bool,
}

/*****************************************************************************
 * rate-distortion cost
 *****************************************************************************/
pub trait RdCost {
    fn calc_rd_cost(&self, bits: u64, dist: u64) -> f64;
    fn update_lambda(&mut self, qp: i32);
}

// J = D + lambda * R with lambda = factor * 2^((qp - 12) / 3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaRdCost {
    pub factor: f64,
    pub lambda: f64,
}

impl LambdaRdCost {
    pub fn new(factor: f64, qp: i32) -> Self {
        let mut rd = LambdaRdCost {
            factor,
            lambda: 0.0,
        };
        rd.update_lambda(qp);
        rd
    }
}

impl RdCost for LambdaRdCost {
    #[inline]
    fn calc_rd_cost(&self, bits: u64, dist: u64) -> f64 {
        dist as f64 + self.lambda * bits as f64
    }

    fn update_lambda(&mut self, qp: i32) {
        self.lambda = self.factor * 2f64.powf((qp - 12) as f64 / 3.0);
    }
}

/*****************************************************************************
 * prediction search
 *****************************************************************************/
// Working buffers of the candidate under test.
pub struct CuBufs<'a> {
    pub orig: &'a CuYuv,
    pub pred: &'a mut CuYuv,
    pub resi: &'a mut CuYuv<resi>,
    pub resi_best: &'a mut CuYuv<resi>,
    pub reco: &'a mut CuYuv,
}

// Motion search, residual coding and intra search of one candidate.
//
// The coder passed in is loaded with the entropy state preceding the CU.
// Evaluators that code syntax leave `bits`, `bins`, `dist`, the cbfs and the
// coefficients of the candidate set; the search engine computes the cost.
pub trait PredSearch<E: EntropyCoder> {
    fn merge_candidates(&mut self, cu: &CuData, pic: &EncPicture, list: &mut MergeCandList);

    fn motion_compensation(&mut self, cu: &CuData, pic: &EncPicture, pred: &mut CuYuv);

    /* false when no admissible motion was found for the shape */
    fn pred_inter_search(
        &mut self,
        cu: &mut CodingUnit,
        bufs: CuBufs,
        pic: &EncPicture,
        coder: &mut E,
        merge_only: bool,
    ) -> bool;

    /* residual coding of an inter candidate whose prediction is in `bufs.pred` */
    fn encode_res_and_calc_rd_inter(
        &mut self,
        cu: &mut CodingUnit,
        bufs: CuBufs,
        pic: &EncPicture,
        coder: &mut E,
        skip_residual: bool,
    );

    fn est_intra_pred_luma_qt(
        &mut self,
        cu: &mut CodingUnit,
        bufs: CuBufs,
        pic: &EncPicture,
        coder: &mut E,
    );

    fn est_intra_pred_chroma_qt(
        &mut self,
        cu: &mut CodingUnit,
        bufs: CuBufs,
        pic: &EncPicture,
        coder: &mut E,
    );

    /* raw samples: reconstruction equals the original, distortion is zero */
    fn ipcm_search(&mut self, cu: &mut CodingUnit, bufs: CuBufs, pic: &EncPicture);
}

/*****************************************************************************
 * per depth working set
 *****************************************************************************/
#[derive(Debug, Clone)]
pub(crate) struct DepthSlot {
    pub(crate) best: CodingUnit,
    pub(crate) temp: CodingUnit,
    pub(crate) orig: CuYuv,
    pub(crate) pred_best: CuYuv,
    pub(crate) pred_temp: CuYuv,
    pub(crate) resi_best: CuYuv<resi>,
    pub(crate) resi_temp: CuYuv<resi>,
    pub(crate) reco_best: CuYuv,
    pub(crate) reco_temp: CuYuv,
}

impl DepthSlot {
    fn new(size: usize, depth: usize, cs: ChromaSampling) -> Self {
        DepthSlot {
            best: CodingUnit::new(size, depth, cs),
            temp: CodingUnit::new(size, depth, cs),
            orig: CuYuv::new(size, cs),
            pred_best: CuYuv::new(size, cs),
            pred_temp: CuYuv::new(size, cs),
            resi_best: CuYuv::new(size, cs),
            resi_temp: CuYuv::new(size, cs),
            reco_best: CuYuv::new(size, cs),
            reco_temp: CuYuv::new(size, cs),
        }
    }

    /* candidate under test with its buffers */
    pub(crate) fn temp_bufs(&mut self) -> (&mut CodingUnit, CuBufs) {
        (
            &mut self.temp,
            CuBufs {
                orig: &self.orig,
                pred: &mut self.pred_temp,
                resi: &mut self.resi_temp,
                resi_best: &mut self.resi_best,
                reco: &mut self.reco_temp,
            },
        )
    }

    /* the candidate under test becomes the best one */
    pub(crate) fn swap_best(&mut self) {
        std::mem::swap(&mut self.best, &mut self.temp);
        std::mem::swap(&mut self.pred_best, &mut self.pred_temp);
        std::mem::swap(&mut self.reco_best, &mut self.reco_temp);
    }
}

/*****************************************************************************
 * CTU level interface
 *****************************************************************************/
// Collaborators borrowed for the search of one CTU.
pub struct CtuEnv<'a, E, P, R> {
    pub pic: &'a mut EncPicture,
    pub slice: &'a SliceInfo,
    pub pred: &'a mut P,
    pub coder: &'a mut E,
    pub rd: &'a mut R,
    pub inputs: QpInputs<'a>,
}

// Decisions of one CTU.
#[derive(Debug, Clone)]
pub struct CtuDecision {
    pub ctu_addr: usize,
    /* leaf CUs in z-order */
    pub leaves: Vec<CuData>,
    pub cost: f64,
    pub bits: u64,
    pub dist: u64,
}

// Recursive quadtree mode decision.
//
// An encoder owns its per-depth candidates, buffers and entropy checkpoints;
// concurrent CTU workers each own one.
pub struct CuEncoder<E: EntropyCoder> {
    pub(crate) cfg: EncoderConfig,
    pub(crate) slots: Vec<DepthSlot>,
    pub(crate) cps: Option<Checkpoints<E::State>>,
    pub(crate) qpd: QpDerivation,
    pub(crate) arl: ArlStats,
    pub(crate) ctu_addr: usize,
    /* chroma QP adjustment index of the CU being searched */
    pub(crate) chroma_qp_adj: u8,
    /* QP of the last coded CU, predictor of the next delta QP */
    last_qp: i32,
    slice_key: Option<(i32, usize)>,
    pub(crate) tracer: Option<Tracer>,
}

impl<E: EntropyCoder> CuEncoder<E> {
    pub fn new(cfg: &EncoderConfig) -> Result<Self> {
        cfg.validate()?;

        let slots = (0..=cfg.max_cu_depth)
            .map(|d| DepthSlot::new(cfg.max_cu_size >> d, d, cfg.chroma_sampling))
            .collect();

        Ok(CuEncoder {
            cfg: cfg.clone(),
            slots,
            cps: None,
            qpd: QpDerivation::new(cfg),
            arl: ArlStats::default(),
            ctu_addr: 0,
            chroma_qp_adj: 0,
            last_qp: 0,
            slice_key: None,
            tracer: None,
        })
    }

    pub fn set_tracer(&mut self, tracer: Option<Tracer>) {
        self.tracer = tracer;
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }

    /* adaptive rounding statistics accumulated over the coded CTUs */
    pub fn arl_stats(&self) -> &ArlStats {
        &self.arl
    }

    pub fn reset_arl_stats(&mut self) {
        self.arl.reset();
    }

    fn check_geometry(&self, pic: &EncPicture, ctu_addr: usize) -> Result<()> {
        let min_cu = self.cfg.min_cu_size();
        if pic.ctu_size != self.cfg.max_cu_size {
            return Err(EncError::InvalidArgument(format!(
                "CTU size {} does not match the encoder CTU size {}",
                pic.ctu_size, self.cfg.max_cu_size
            )));
        }
        if pic.chroma_sampling != self.cfg.chroma_sampling {
            return Err(EncError::InvalidArgument(
                "chroma sampling does not match the encoder".into(),
            ));
        }
        if pic.width % min_cu != 0 || pic.height % min_cu != 0 {
            return Err(EncError::InvalidArgument(format!(
                "picture size {}x{} is not a multiple of the minimum CU size {}",
                pic.width, pic.height, min_cu
            )));
        }
        if ctu_addr >= pic.num_ctus() {
            return Err(EncError::InvalidArgument(format!(
                "CTU address {} out of picture ({} CTUs)",
                ctu_addr,
                pic.num_ctus()
            )));
        }
        Ok(())
    }

    /* search the coding tree of one CTU and write its reconstruction to the picture */
    pub fn compress_ctu<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        ctu_addr: usize,
    ) -> Result<CtuDecision> {
        self.check_geometry(env.pic, ctu_addr)?;

        let slice_key = (env.slice.poc, env.slice.slice_start_ctu_addr);
        if ctu_addr == env.slice.slice_start_ctu_addr || self.slice_key != Some(slice_key) {
            self.last_qp = env.slice.qp;
            self.slice_key = Some(slice_key);
        }
        self.ctu_addr = ctu_addr;

        TRACE_CTU(&mut self.tracer, env.slice.poc, ctu_addr);

        match self.cps.as_mut() {
            Some(cps) => cps.store(0, CiIdx::CI_CURR_BEST, &*env.coder),
            None => self.cps = Some(Checkpoints::new(self.slots.len(), &env.coder.save())),
        }

        let (x, y) = env.pic.ctu_pos(ctu_addr);
        let (qp, ref_qp) = (env.slice.qp, self.last_qp);
        self.slots[0].best.init_ctu(x, y, qp, ref_qp);
        self.slots[0].temp.init_ctu(x, y, qp, ref_qp);

        self.compress_cu(env, 0, None)?;

        if let Some(cps) = self.cps.as_ref() {
            cps.load(0, CiIdx::CI_NEXT_BEST, env.coder);
        }

        let best = &self.slots[0].best;
        if self.cfg.use_adapt_qp_select && env.slice.slice_type != SliceType::I_SLICE {
            self.arl.collect(best);
        }

        let leaves = best.decisions().to_vec();
        if let Some(last) = leaves.last() {
            self.last_qp = last.qp;
        }
        debug!(
            "poc {} ctu {}: {} CUs, bits {}, dist {}, cost {:.2}",
            env.slice.poc,
            ctu_addr,
            leaves.len(),
            best.bits,
            best.dist,
            best.cost
        );

        Ok(CtuDecision {
            ctu_addr,
            leaves,
            cost: best.cost,
            bits: best.bits,
            dist: best.dist,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lambda_follows_qp() {
        let mut rd = LambdaRdCost::new(1.0, 12);
        assert_eq!(rd.lambda, 1.0);
        assert_eq!(rd.calc_rd_cost(10, 5), 15.0);
        rd.update_lambda(18);
        assert_eq!(rd.lambda, 4.0);
    }

    #[test]
    fn slots_per_depth() {
        let cfg = EncoderConfig {
            max_cu_size: 32,
            max_cu_depth: 2,
            ..Default::default()
        };
        let enc: CuEncoder<SbacEstimator> = CuEncoder::new(&cfg).unwrap();
        let sizes: Vec<usize> = enc.slots.iter().map(|s| s.best.size()).collect();
        assert_eq!(sizes, vec![32, 16, 8]);
        assert_eq!(enc.slots[2].reco_temp.width[U_C], 4);
    }

    #[test]
    fn swap_exchanges_candidates() {
        let mut slot = DepthSlot::new(8, 0, ChromaSampling::Cs420);
        slot.temp.cost = 3.0;
        slot.reco_temp.planes[Y_C][0] = 9;
        slot.swap_best();
        assert_eq!(slot.best.cost, 3.0);
        assert_eq!(slot.temp.cost, MAX_COST);
        assert_eq!(slot.reco_best.planes[Y_C][0], 9);
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = EncoderConfig {
            max_num_merge_cand: 0,
            ..Default::default()
        };
        assert!(CuEncoder::<SbacEstimator>::new(&cfg).is_err());
    }
}
