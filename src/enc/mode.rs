use log::*;

use super::amp::*;
use super::cu::*;
use super::pintra::fill_pcm_buffer;
use super::qp::*;
use super::sbac::*;
use super::*;
use crate::api::*;
use crate::def::*;
use crate::tracer::*;
use crate::util::*;

/*****************************************************************************
 * entropy checkpoints of the encoder
 *****************************************************************************/
#[inline]
pub(crate) fn load_ci<E: EntropyCoder>(
    cps: &Option<Checkpoints<E::State>>,
    depth: usize,
    ci: CiIdx,
    coder: &mut E,
) {
    if let Some(cps) = cps {
        cps.load(depth, ci, coder);
    }
}

#[inline]
pub(crate) fn store_ci<E: EntropyCoder>(
    cps: &mut Option<Checkpoints<E::State>>,
    depth: usize,
    ci: CiIdx,
    coder: &E,
) {
    if let Some(cps) = cps {
        cps.store(depth, ci, coder);
    }
}

/* delta QP bits of a candidate coded at a delta QP depth */
pub(crate) fn check_dqp<E: EntropyCoder, R: RdCost>(
    cfg: &EncoderConfig,
    depth: usize,
    cu: &mut CodingUnit,
    coder: &mut E,
    rd: &R,
) {
    if !cfg.use_dqp || depth > cfg.max_cu_dqp_depth {
        return;
    }
    if cu.data.root_cbf() {
        coder.reset_bits();
        coder.encode_qp(&cu.data);
        cu.bits += coder.num_written_bits();
        cu.bins += coder.num_bins_coded();
        cu.cost = rd.calc_rd_cost(cu.bits, cu.dist);
    } else {
        let ref_qp = cu.data.ref_qp;
        cu.set_qp_sub_parts(ref_qp);
    }
}

/* state of the shape tests of one CU */
#[derive(Debug, Clone, Copy)]
struct ShapeGate {
    /* cleared by the cbf fast mode once a shape wins without residual */
    do_not_block_pu: bool,
    early_skip: bool,
}

impl<E: EntropyCoder> CuEncoder<E> {
    /* keep the candidate under test if it beats the best one of its depth */
    pub(crate) fn check_best_mode(&mut self, depth: usize) {
        let slot = &mut self.slots[depth];
        let t = &slot.temp;
        if t.split {
            TRACE_SPLIT(&mut self.tracer, t.data.x, t.data.y, t.size(), t.cost);
        } else {
            TRACE_CU(
                &mut self.tracer,
                t.data.x,
                t.data.y,
                t.size(),
                t.data.part_size,
                t.data.pred_mode,
                t.data.qp,
                t.cost,
            );
        }
        trace!(
            "cu ({}, {}) {}x{} {} {} qp {} bits {} cost {:.2}",
            t.data.x,
            t.data.y,
            t.size(),
            t.size(),
            if t.split { "split".to_string() } else { t.data.pred_mode.to_string() },
            t.data.part_size,
            t.data.qp,
            t.bits,
            t.cost
        );

        if slot.temp.cost < slot.best.cost {
            slot.swap_best();
            if let Some(cps) = self.cps.as_mut() {
                cps.copy(
                    (depth, CiIdx::CI_TEMP_BEST),
                    (depth, CiIdx::CI_NEXT_BEST),
                );
            }
        }
    }

    fn chroma_qp_adj_idx(&self, slice: &SliceInfo, x: usize, y: usize) -> u8 {
        if !slice.use_chroma_qp_adj {
            return 0;
        }
        let adj = &self.cfg.chroma_qp_adj;
        let lg = CONV_LOG2(self.cfg.min_cu_size()) as usize
            + self
                .cfg
                .max_cu_depth
                .saturating_sub(adj.diff_cu_chroma_qp_offset_depth);
        (((x >> lg) + (y >> lg)) % (adj.list_len + 1)) as u8
    }

    /* coding this CU would overflow the byte budget of its slice or slice segment */
    fn exceeds_byte_budget(&self, slice: &SliceInfo, bits: u64) -> bool {
        let ctu = self.ctu_addr;
        let end_of_slice = self.cfg.slice_mode == SliceConstraint::FIXED_NUMBER_OF_BYTES
            && slice.slice_bits + bits > (self.cfg.slice_argument as u64) << 3
            && ctu != slice.slice_start_ctu_addr
            && ctu != slice.segment_start_ctu_addr;
        let end_of_segment = self.cfg.slice_segment_mode
            == SliceConstraint::FIXED_NUMBER_OF_BYTES
            && slice.slice_segment_bits + bits > (self.cfg.slice_segment_argument as u64) << 3
            && ctu != slice.segment_start_ctu_addr;
        end_of_slice || end_of_segment
    }

    /* inter shape test followed by the cbf fast mode update */
    fn test_inter_shape<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        part: PartSize,
        merge_only: bool,
        (qp, lossless): (i32, bool),
        gate: &mut ShapeGate,
        update_gate: bool,
    ) {
        if !gate.do_not_block_pu {
            return;
        }
        self.check_rd_cost_inter(env, depth, part, merge_only);
        self.slots[depth].temp.init_est_data(qp, lossless);

        let best = &self.slots[depth].best.data;
        if update_gate && self.cfg.use_cbf_fast_mode && best.part_size == part {
            gate.do_not_block_pu = best.root_cbf();
        }
    }

    /* merge and 2Nx2N inter */
    fn test_inter_2nx2n<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        (qp, lossless): (i32, bool),
        gate: &mut ShapeGate,
    ) {
        if self.cfg.use_early_skip_detection {
            self.check_rd_cost_inter(env, depth, PartSize::SIZE_2Nx2N, false);
            self.slots[depth].temp.init_est_data(qp, lossless);
        }

        self.check_rd_cost_merge_2nx2n(env, depth, &mut gate.early_skip);
        self.slots[depth].temp.init_est_data(qp, lossless);

        if !self.cfg.use_early_skip_detection {
            self.check_rd_cost_inter(env, depth, PartSize::SIZE_2Nx2N, false);
            self.slots[depth].temp.init_est_data(qp, lossless);
            if self.cfg.use_cbf_fast_mode {
                gate.do_not_block_pu = self.slots[depth].best.data.root_cbf();
            }
        }
    }

    /* symmetric and asymmetric shapes */
    fn test_inter_shapes<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        iter: (i32, bool),
        gate: &mut ShapeGate,
        parent_part: Option<PartSize>,
    ) {
        let max_depth = self.cfg.max_cu_depth;
        let size = self.slots[depth].temp.size();

        if size != 8 && depth == max_depth {
            self.test_inter_shape(env, depth, PartSize::SIZE_NxN, false, iter, gate, false);
        }
        self.test_inter_shape(env, depth, PartSize::SIZE_Nx2N, false, iter, gate, true);
        self.test_inter_shape(env, depth, PartSize::SIZE_2NxN, false, iter, gate, true);

        if !self.cfg.use_amp || depth >= max_depth {
            return;
        }
        let modes = {
            let best = &self.slots[depth].best;
            derive_test_mode_amp(
                best.data.part_size,
                best.data.is_merge(),
                best.is_skipped(),
                parent_part,
                size,
            )
        };

        if modes.hor || modes.merge_hor {
            let merge_only = !modes.hor;
            self.test_inter_shape(env, depth, PartSize::SIZE_2NxnU, merge_only, iter, gate, true);
            self.test_inter_shape(env, depth, PartSize::SIZE_2NxnD, merge_only, iter, gate, true);
        }
        if modes.ver || modes.merge_ver {
            let merge_only = !modes.ver;
            self.test_inter_shape(env, depth, PartSize::SIZE_nLx2N, merge_only, iter, gate, true);
            self.test_inter_shape(env, depth, PartSize::SIZE_nRx2N, merge_only, iter, gate, false);
        }
    }

    /* intra shapes and PCM */
    fn test_intra_shapes<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        (qp, lossless): (i32, bool),
    ) {
        let size = self.slots[depth].temp.size();
        let num_comp = self.cfg.chroma_sampling.num_components();
        let is_i_slice = env.slice.slice_type == SliceType::I_SLICE;

        let best_has_cbf = {
            let best = &self.slots[depth].best.data;
            best.cbf[Y_C]
                || (best.cbf[U_C] && num_comp > U_C)
                || (best.cbf[V_C] && num_comp > V_C)
        };
        if is_i_slice || (!self.cfg.disable_intra_pus_in_inter_slices && best_has_cbf) {
            self.check_rd_cost_intra(env, depth, PartSize::SIZE_2Nx2N);
            self.slots[depth].temp.init_est_data(qp, lossless);
            if depth == self.cfg.max_cu_depth && size > 1 << self.cfg.quadtree_tu_log2_min_size {
                self.check_rd_cost_intra(env, depth, PartSize::SIZE_NxN);
                self.slots[depth].temp.init_est_data(qp, lossless);
            }
        }

        if self.cfg.pcm.allows(size) {
            let raw = raw_bits(
                size,
                size,
                self.cfg.chroma_sampling,
                self.cfg.bit_depth_luma,
                self.cfg.bit_depth_chroma,
            );
            let best = &self.slots[depth].best;
            if best.bits > raw || best.cost > env.rd.calc_rd_cost(raw, 0) {
                self.check_intra_pcm(env, depth);
                self.slots[depth].temp.init_est_data(qp, lossless);
            }
        }
    }

    /* split flag of the undivided winner */
    fn finalize_undivided<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
    ) {
        let slot = &mut self.slots[depth];
        if slot.best.cost == MAX_COST {
            return;
        }
        load_ci(&self.cps, depth, CiIdx::CI_NEXT_BEST, env.coder);
        env.coder.reset_bits();
        if depth < self.cfg.max_cu_depth {
            env.coder.encode_split_flag(&slot.best.data, false);
        }
        slot.best.bits += env.coder.num_written_bits();
        slot.best.bins += env.coder.num_bins_coded();
        slot.best.cost = env.rd.calc_rd_cost(slot.best.bits, slot.best.dist);
        store_ci(&mut self.cps, depth, CiIdx::CI_NEXT_BEST, &*env.coder);
    }

    /* search the CU held by the candidates of `depth` */
    pub(crate) fn compress_cu<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        parent_part: Option<PartSize>,
    ) -> Result<()> {
        let max_depth = self.cfg.max_cu_depth;
        let slice = env.slice;
        let (x, y, size) = {
            let d = &self.slots[depth].best.data;
            (d.x, d.y, d.size)
        };
        let boundary = x + size > env.pic.width || y + size > env.pic.height;

        self.slots[depth].orig.copy_from_frame(&env.pic.orig, x, y);

        let inherited = self.slots[depth].temp.data.qp;
        let range = {
            let blk = QpBlock {
                pic: &*env.pic,
                slice,
                x,
                y,
                size,
                depth,
                ctu_addr: self.ctu_addr,
            };
            self.qpd.derive(&blk, &env.inputs, inherited)?
        };

        let mut gate = ShapeGate {
            do_not_block_pu: true,
            early_skip: false,
        };

        if !boundary {
            self.chroma_qp_adj = self.chroma_qp_adj_idx(slice, x, y);
            for iter in range.iter() {
                let (qp, lossless) = iter;
                if self.qpd.updates_lambda(depth) {
                    env.rd.update_lambda(qp);
                }
                self.slots[depth].temp.init_est_data(qp, lossless);
                if slice.slice_type != SliceType::I_SLICE {
                    self.test_inter_2nx2n(env, depth, iter, &mut gate);
                }
            }

            if !gate.early_skip {
                for iter in range.iter() {
                    let (qp, lossless) = iter;
                    self.slots[depth].temp.init_est_data(qp, lossless);
                    if slice.slice_type != SliceType::I_SLICE {
                        self.test_inter_shapes(env, depth, iter, &mut gate, parent_part);
                    }
                    self.test_intra_shapes(env, depth, iter);
                }
            }

            self.finalize_undivided(env, depth);
        }

        {
            let slot = &mut self.slots[depth];
            if slot.best.cost != MAX_COST && slot.best.data.is_lossless() && !slot.best.data.ipcm {
                fill_pcm_buffer(&mut slot.best, &slot.orig);
            }
        }

        let split_range = {
            let blk = QpBlock {
                pic: &*env.pic,
                slice,
                x,
                y,
                size,
                depth,
                ctu_addr: self.ctu_addr,
            };
            self.qpd.split_range(&blk, &env.inputs, range.base, inherited)?
        };

        let sub_branch = {
            let best = &self.slots[depth].best;
            boundary
                || !(self.cfg.use_early_cu && best.cost != MAX_COST && best.is_skipped())
        };
        if sub_branch
            && depth < max_depth
            && (!self.cfg.fast_delta_qp || size > self.cfg.fast_delta_qp_cu_max_size() || boundary)
        {
            for (qp, _) in split_range.iter() {
                self.slots[depth].temp.init_est_data(qp, false);
                self.compress_split(env, depth, qp, boundary)?;
                self.check_best_mode(depth);
            }
        }

        if !boundary {
            let best = &self.slots[depth].best;
            if best.cost == MAX_COST {
                error!(
                    "no mode selected for the {}x{} CU at ({}, {}) of CTU {}",
                    size, size, x, y, self.ctu_addr
                );
                panic!("mode decision finished without a selected mode");
            }
        }

        let over_budget = {
            let best = &self.slots[depth].best;
            best.cost != MAX_COST && self.exceeds_byte_budget(slice, best.bits)
        };
        if over_budget {
            debug!(
                "ctu {}: {}x{} CU at ({}, {}) exceeds the slice byte budget",
                self.ctu_addr, size, size, x, y
            );
            self.slots[depth].best.cost = MAX_COST;
        }

        let slot = &self.slots[depth];
        slot.reco_best.copy_to_frame(&mut env.pic.reco, x, y);
        slot.pred_best.copy_to_frame(&mut env.pic.pred, x, y);
        Ok(())
    }

    /* four sub-CUs as one candidate in `temp` */
    fn compress_split<P: PredSearch<E>, R: RdCost>(
        &mut self,
        env: &mut CtuEnv<E, P, R>,
        depth: usize,
        qp: i32,
        boundary: bool,
    ) -> Result<()> {
        let sums = self.qpd.sums_split_cost();
        let mut split_total = 0.0;

        for idx in 0..SPLIT_MAX_PART_COUNT {
            let inside = {
                let (head, tail) = self.slots.split_at_mut(depth + 1);
                let parent = &head[depth].temp.data;
                let child = &mut tail[0];
                child.best.init_sub_cu(parent, idx, qp);
                child.temp.init_sub_cu(parent, idx, qp);
                child.best.data.x < env.pic.width && child.best.data.y < env.pic.height
            };
            if !inside {
                continue;
            }

            if let Some(cps) = self.cps.as_mut() {
                let from = if idx == 0 {
                    (depth, CiIdx::CI_CURR_BEST)
                } else {
                    (depth + 1, CiIdx::CI_NEXT_BEST)
                };
                cps.copy(from, (depth + 1, CiIdx::CI_CURR_BEST));
            }

            let hint = {
                let best = &self.slots[depth].best;
                if best.cost != MAX_COST && best.data.is_inter() {
                    Some(best.data.part_size)
                } else {
                    None
                }
            };
            self.compress_cu(env, depth + 1, hint)?;

            let (head, tail) = self.slots.split_at_mut(depth + 1);
            let parent = &mut head[depth];
            let child = &tail[0];
            parent.temp.copy_part_from(&child.best, idx);
            child.reco_best.copy_to_part(&mut parent.reco_temp, idx);
            child.pred_best.copy_to_part(&mut parent.pred_temp, idx);
            if sums {
                split_total += child.best.cost;
            }
        }

        load_ci(&self.cps, depth + 1, CiIdx::CI_NEXT_BEST, env.coder);

        let temp = &mut self.slots[depth].temp;
        if !boundary {
            env.coder.reset_bits();
            env.coder.encode_split_flag(&temp.data, true);
            let split_bits = env.coder.num_written_bits();
            if sums {
                split_total += env.rd.calc_rd_cost(split_bits, 0);
            }
            temp.bits += split_bits;
            temp.bins += env.coder.num_bins_coded();
        }
        temp.cost = if sums && !boundary {
            split_total
        } else {
            env.rd.calc_rd_cost(temp.bits, temp.dist)
        };

        if depth == self.cfg.max_cu_dqp_depth && self.cfg.use_dqp {
            let ref_qp = temp.data.ref_qp;
            if temp.has_residual() {
                env.coder.reset_bits();
                /* the delta QP is signalled with the first leaf carrying residual */
                let first = temp
                    .decisions()
                    .iter()
                    .find(|cu| cu.root_cbf())
                    .copied()
                    .unwrap_or(temp.data);
                env.coder.encode_qp(&first);
                temp.bits += env.coder.num_written_bits();
                temp.bins += env.coder.num_bins_coded();
                temp.cost = env.rd.calc_rd_cost(temp.bits, temp.dist);
                let found = temp.set_qp_sub_cus(ref_qp);
                assert!(found, "split candidate with residual has no coded leaf");
            } else {
                temp.set_qp_sub_parts(ref_qp);
            }
        }

        store_ci(&mut self.cps, depth, CiIdx::CI_TEMP_BEST, &*env.coder);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encoder(cfg: EncoderConfig) -> CuEncoder<SbacEstimator> {
        CuEncoder::new(&cfg).unwrap()
    }

    #[test]
    fn chroma_qp_adj_follows_position() {
        let enc = encoder(EncoderConfig {
            chroma_qp_adj: ChromaQpAdjConfig {
                list_len: 2,
                diff_cu_chroma_qp_offset_depth: 1,
            },
            ..Default::default()
        });
        let slice = SliceInfo {
            use_chroma_qp_adj: true,
            ..Default::default()
        };
        /* granularity of 3 + (3 - 1) = 5 bits */
        assert_eq!(enc.chroma_qp_adj_idx(&slice, 0, 0), 0);
        assert_eq!(enc.chroma_qp_adj_idx(&slice, 32, 0), 1);
        assert_eq!(enc.chroma_qp_adj_idx(&slice, 32, 32), 2);
        assert_eq!(enc.chroma_qp_adj_idx(&slice, 64, 32), 0);
        let off = SliceInfo::default();
        assert_eq!(enc.chroma_qp_adj_idx(&off, 32, 0), 0);
    }

    #[test]
    fn byte_budget_spares_first_ctu() {
        let mut enc = encoder(EncoderConfig {
            slice_mode: SliceConstraint::FIXED_NUMBER_OF_BYTES,
            slice_argument: 100,
            ..Default::default()
        });
        let slice = SliceInfo {
            slice_bits: 700,
            slice_start_ctu_addr: 4,
            segment_start_ctu_addr: 4,
            ..Default::default()
        };
        enc.ctu_addr = 4;
        assert!(!enc.exceeds_byte_budget(&slice, 200));
        enc.ctu_addr = 5;
        assert!(enc.exceeds_byte_budget(&slice, 200));
        assert!(!enc.exceeds_byte_budget(&slice, 100));
    }

    #[test]
    fn segment_budget() {
        let mut enc = encoder(EncoderConfig {
            slice_segment_mode: SliceConstraint::FIXED_NUMBER_OF_BYTES,
            slice_segment_argument: 10,
            ..Default::default()
        });
        let slice = SliceInfo {
            slice_segment_bits: 60,
            segment_start_ctu_addr: 2,
            ..Default::default()
        };
        enc.ctu_addr = 3;
        assert!(enc.exceeds_byte_budget(&slice, 30));
        enc.ctu_addr = 2;
        assert!(!enc.exceeds_byte_budget(&slice, 30));
    }

    #[test]
    fn dqp_bits_only_with_residual() {
        let cfg = EncoderConfig {
            use_dqp: true,
            max_cu_dqp_depth: 1,
            ..Default::default()
        };
        let rd = LambdaRdCost::new(1.0, 12);
        let mut coder = SbacEstimator::new(&cfg);

        let mut cu = CodingUnit::new(16, 1, cfg.chroma_sampling);
        cu.data.qp = 30;
        cu.data.ref_qp = 26;
        cu.bits = 10;
        check_dqp(&cfg, 1, &mut cu, &mut coder, &rd);
        assert_eq!(cu.bits, 10);
        assert_eq!(cu.data.qp, 26);

        cu.data.qp = 30;
        cu.data.cbf[Y_C] = true;
        check_dqp(&cfg, 1, &mut cu, &mut coder, &rd);
        assert!(cu.bits > 10);
        assert_eq!(cu.cost, rd.calc_rd_cost(cu.bits, cu.dist));
        assert_eq!(cu.data.qp, 30);

        /* below the delta QP depth nothing is signalled */
        let bits = cu.bits;
        check_dqp(&cfg, 2, &mut cu, &mut coder, &rd);
        assert_eq!(cu.bits, bits);
    }

    #[test]
    fn cheaper_candidate_wins() {
        let mut enc = encoder(EncoderConfig {
            max_cu_size: 16,
            max_cu_depth: 1,
            ..Default::default()
        });
        enc.slots[0].temp.cost = 10.0;
        enc.check_best_mode(0);
        assert_eq!(enc.slots[0].best.cost, 10.0);
        enc.slots[0].temp.cost = 10.0;
        enc.check_best_mode(0);
        /* ties keep the earlier candidate */
        assert_eq!(enc.slots[0].temp.cost, 10.0);
        assert_eq!(enc.slots[0].best.cost, 10.0);
        enc.slots[0].temp.cost = 4.0;
        enc.check_best_mode(0);
        assert_eq!(enc.slots[0].best.cost, 4.0);
    }
}
