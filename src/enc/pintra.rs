use super::cu::*;
use super::mode::*;
use super::sbac::*;
use super::yuv::CuYuv;
use super::*;
use crate::api::*;
use crate::def::*;
use crate::util::*;

/* keep the original samples of a lossless CU */
pub(crate) fn fill_pcm_buffer(cu: &mut CodingUnit, orig: &CuYuv) {
    for c in 0..orig.num_comp() {
        let n = cu.pcm_sample[c].len();
        cu.pcm_sample[c].copy_from_slice(&orig.planes[c][..n]);
    }
}

impl<E: EntropyCoder> CuEncoder<E> {
    pub(crate) fn check_rd_cost_intra<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        part: PartSize,
    ) {
        let slot = &mut self.slots[depth];
        if self.cfg.fast_delta_qp && slot.temp.size() > self.cfg.fast_delta_qp_cu_max_size() {
            return;
        }

        let d = &mut slot.temp.data;
        d.skip = false;
        d.part_size = part;
        d.pred_mode = PredMode::MODE_INTRA;
        d.chroma_qp_adj = if d.transquant_bypass { 0 } else { self.chroma_qp_adj };
        let (x, y) = (d.x, d.y);

        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let (cu, bufs) = slot.temp_bufs();
        env.pred
            .est_intra_pred_luma_qt(cu, bufs, &*env.pic, env.coder);
        /* chroma prediction reads the luma reconstruction of this CU */
        slot.reco_temp
            .copy_component_to_frame(Y_C, &mut env.pic.reco, x, y);
        if self.cfg.chroma_sampling != ChromaSampling::Cs400 {
            let (cu, bufs) = slot.temp_bufs();
            env.pred
                .est_intra_pred_chroma_qt(cu, bufs, &*env.pic, env.coder);
        }

        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let coder = &mut *env.coder;
        let temp = &mut slot.temp;
        coder.reset_bits();
        if self.cfg.transquant_bypass_enabled {
            coder.encode_cu_transquant_bypass_flag(&temp.data);
        }
        coder.encode_skip_flag(&temp.data);
        coder.encode_pred_mode(&temp.data);
        coder.encode_part_size(&temp.data);
        coder.encode_pred_info(&temp.data);
        coder.encode_ipcm_info(&temp.data);
        coder.encode_coeff(&temp.data, &temp.coeff);
        store_ci(&mut self.cps, depth, CiIdx::CI_TEMP_BEST, &*coder);

        temp.bits = coder.num_written_bits();
        temp.bins = coder.num_bins_coded();
        temp.cost = env.rd.calc_rd_cost(temp.bits, temp.dist);
        check_dqp(&self.cfg, depth, temp, coder, &*env.rd);

        self.check_best_mode(depth);
    }

    pub(crate) fn check_intra_pcm<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
    ) {
        let slot = &mut self.slots[depth];
        if self.cfg.fast_delta_qp {
            let pcm = &self.cfg.pcm;
            let max_pcm_size = CLIP3(1 << pcm.log2_min_size, 1 << pcm.log2_max_size, 32);
            if slot.temp.size() > max_pcm_size {
                return;
            }
        }

        let d = &mut slot.temp.data;
        d.skip = false;
        d.ipcm = true;
        d.part_size = PartSize::SIZE_2Nx2N;
        d.pred_mode = PredMode::MODE_INTRA;
        d.chroma_qp_adj = if d.transquant_bypass { 0 } else { self.chroma_qp_adj };

        let (cu, bufs) = slot.temp_bufs();
        env.pred.ipcm_search(cu, bufs, &*env.pic);

        load_ci(&self.cps, depth, CiIdx::CI_CURR_BEST, env.coder);
        let coder = &mut *env.coder;
        let temp = &mut slot.temp;
        coder.reset_bits();
        if self.cfg.transquant_bypass_enabled {
            coder.encode_cu_transquant_bypass_flag(&temp.data);
        }
        coder.encode_skip_flag(&temp.data);
        coder.encode_pred_mode(&temp.data);
        coder.encode_part_size(&temp.data);
        coder.encode_ipcm_info(&temp.data);
        store_ci(&mut self.cps, depth, CiIdx::CI_TEMP_BEST, &*coder);

        temp.bits = coder.num_written_bits();
        temp.bins = coder.num_bins_coded();
        temp.cost = env.rd.calc_rd_cost(temp.bits, temp.dist);
        check_dqp(&self.cfg, depth, temp, coder, &*env.rd);

        self.check_best_mode(depth);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pcm_buffer_holds_original() {
        let mut orig: CuYuv = CuYuv::new(8, ChromaSampling::Cs420);
        for (i, v) in orig.planes[Y_C].iter_mut().enumerate() {
            *v = i as pel;
        }
        for v in orig.planes[V_C].iter_mut() {
            *v = 77;
        }
        let mut cu = CodingUnit::new(8, 3, ChromaSampling::Cs420);
        fill_pcm_buffer(&mut cu, &orig);
        assert_eq!(cu.pcm_sample[Y_C][63], 63);
        assert_eq!(cu.pcm_sample[V_C].len(), 16);
        assert!(cu.pcm_sample[V_C].iter().all(|&v| v == 77));
        assert!(cu.pcm_sample[U_C].iter().all(|&v| v == 0));
    }
}
