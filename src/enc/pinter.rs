use super::cu::*;
use super::mode::*;
use super::sbac::*;
use super::*;
use crate::api::*;
use crate::def::*;

/* code the syntax of an inter candidate and set its bit counts */
pub fn code_inter_cu<E: EntropyCoder>(coder: &mut E, cu: &mut CodingUnit, code_bypass_flag: bool) {
    let d = &mut cu.data;
    d.skip = d.is_merge() && d.part_size == PartSize::SIZE_2Nx2N && !d.root_cbf();

    coder.reset_bits();
    if code_bypass_flag {
        coder.encode_cu_transquant_bypass_flag(&cu.data);
    }
    coder.encode_skip_flag(&cu.data);
    if cu.data.skip {
        coder.encode_merge_index(&cu.data);
    } else {
        coder.encode_pred_mode(&cu.data);
        coder.encode_part_size(&cu.data);
        coder.encode_pred_info(&cu.data);
        coder.encode_coeff(&cu.data, &cu.coeff);
    }
    cu.bits = coder.num_written_bits();
    cu.bins = coder.num_bins_coded();
}

impl<E: EntropyCoder> CuEncoder<E> {
    /* one merge candidate, coded with or without residual */
    fn test_merge_cand<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        cand: &MergeCand,
        merge_idx: usize,
        skip_residual: bool,
    ) -> bool {
        let slot = &mut self.slots[depth];
        let d = &mut slot.temp.data;
        let lossless = d.transquant_bypass;
        d.pred_mode = PredMode::MODE_INTER;
        d.chroma_qp_adj = if lossless { 0 } else { self.chroma_qp_adj };
        d.part_size = PartSize::SIZE_2Nx2N;
        d.pu[0] = PuMotion {
            merge: true,
            merge_idx: merge_idx as u8,
            inter_dir: cand.inter_dir,
            mv_field: cand.mv_field,
            ..Default::default()
        };

        env.pred
            .motion_compensation(&slot.temp.data, &*env.pic, &mut slot.pred_temp);
        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let (cu, bufs) = slot.temp_bufs();
        env.pred
            .encode_res_and_calc_rd_inter(cu, bufs, &*env.pic, env.coder, skip_residual);
        store_ci(&mut self.cps, depth, CiIdx::CI_TEMP_BEST, &*env.coder);

        let temp = &mut slot.temp;
        let has_residual = temp.data.root_cbf();
        temp.cost = env.rd.calc_rd_cost(temp.bits, temp.dist);
        check_dqp(&self.cfg, depth, temp, env.coder, &*env.rd);
        has_residual
    }

    /* 2Nx2N merge candidates: a residual pass then a skip pass */
    pub(crate) fn check_rd_cost_merge_2nx2n<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        early_skip: &mut bool,
    ) {
        if self.cfg.fast_delta_qp {
            return;
        }

        let (qp, lossless) = {
            let temp = &mut self.slots[depth].temp;
            temp.data.part_size = PartSize::SIZE_2Nx2N;
            (temp.data.qp, temp.data.transquant_bypass)
        };
        let mut list = MergeCandList::default();
        env.pred
            .merge_candidates(&self.slots[depth].temp.data, &*env.pic, &mut list);
        let num_cands = list.num.min(self.cfg.max_num_merge_cand);

        /* candidates which coded no residual when allowed one */
        let mut no_residual = [false; MRG_MAX_NUM_CANDS];
        let mut best_is_skip = false;
        let passes = if lossless { 1 } else { 2 };

        for pass in 0..passes {
            for idx in 0..num_cands {
                if (pass == 1 && no_residual[idx]) || (best_is_skip && pass == 0) {
                    continue;
                }
                let has_residual = self.test_merge_cand(env, depth, &list.cands[idx], idx, pass != 0);
                if pass == 0 && !has_residual {
                    no_residual[idx] = true;
                }
                self.check_best_mode(depth);
                self.slots[depth].temp.init_est_data(qp, lossless);

                if self.cfg.use_fast_decision_for_merge && !best_is_skip {
                    best_is_skip = !self.slots[depth].best.data.root_cbf();
                }
            }

            if pass == 0 && self.cfg.use_early_skip_detection {
                let best = &self.slots[depth].best.data;
                if !best.root_cbf() {
                    if best.is_merge() {
                        *early_skip = true;
                    } else if self.cfg.me_search_method != MeSearchMethod::MESEARCH_SELECTIVE {
                        let abs_mvd: i32 = (0..REFP_NUM)
                            .filter(|&l| env.slice.num_ref_idx[l] > 0)
                            .map(|l| best.pu[0].mvd[l].abs_sum())
                            .sum();
                        if abs_mvd == 0 {
                            *early_skip = true;
                        }
                    }
                }
            }
        }
    }

    /* inter shape with motion search, or with merge candidates only */
    pub(crate) fn check_rd_cost_inter<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        part: PartSize,
        merge_only: bool,
    ) {
        let slot = &mut self.slots[depth];
        if self.cfg.fast_delta_qp
            && (part != PartSize::SIZE_2Nx2N
                || slot.temp.size() > self.cfg.fast_delta_qp_cu_max_size())
        {
            return;
        }

        let d = &mut slot.temp.data;
        d.part_size = part;
        d.pred_mode = PredMode::MODE_INTER;
        d.chroma_qp_adj = if d.transquant_bypass { 0 } else { self.chroma_qp_adj };

        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let (cu, bufs) = slot.temp_bufs();
        if !env.pred
            .pred_inter_search(cu, bufs, &*env.pic, env.coder, merge_only)
        {
            return;
        }

        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let (cu, bufs) = slot.temp_bufs();
        env.pred
            .encode_res_and_calc_rd_inter(cu, bufs, &*env.pic, env.coder, false);
        store_ci(&mut self.cps, depth, CiIdx::CI_TEMP_BEST, &*env.coder);

        let temp = &mut slot.temp;
        temp.cost = env.rd.calc_rd_cost(temp.bits, temp.dist);
        check_dqp(&self.cfg, depth, temp, env.coder, &*env.rd);

        self.check_best_mode(depth);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn merge_cu(cbf: bool) -> CodingUnit {
        let mut cu = CodingUnit::new(16, 1, ChromaSampling::Cs420);
        cu.data.pu[0].merge = true;
        cu.data.pu[0].merge_idx = 2;
        cu.data.pu[0].inter_dir = PRED_L0;
        cu.data.cbf[Y_C] = cbf;
        if cbf {
            cu.coeff[Y_C][0] = 3;
        }
        cu
    }

    #[test]
    fn merge_without_residual_is_skip() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let mut skip = merge_cu(false);
        code_inter_cu(&mut coder, &mut skip, false);
        assert!(skip.data.skip);

        let mut coder = SbacEstimator::new(&cfg);
        let mut coded = merge_cu(true);
        code_inter_cu(&mut coder, &mut coded, false);
        assert!(!coded.data.skip);
        assert!(coded.bits > skip.bits);
        assert!(coded.bins > skip.bins);
    }

    #[test]
    fn bypass_flag_costs_bits() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let mut a = merge_cu(false);
        code_inter_cu(&mut coder, &mut a, false);
        let mut coder = SbacEstimator::new(&cfg);
        let mut b = merge_cu(false);
        code_inter_cu(&mut coder, &mut b, true);
        assert_eq!(b.bins, a.bins + 1);
    }

    #[test]
    fn asymmetric_merge_is_not_skip() {
        let cfg = EncoderConfig::default();
        let mut coder = SbacEstimator::new(&cfg);
        let mut cu = merge_cu(false);
        cu.data.part_size = PartSize::SIZE_2NxnU;
        cu.data.pu[1] = cu.data.pu[0];
        code_inter_cu(&mut coder, &mut cu, false);
        assert!(!cu.data.skip);
    }
}
