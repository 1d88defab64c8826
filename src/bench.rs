// Reference prediction search driving the mode decision in tests and
// benchmarks: zero-motion inter prediction from a reference frame, DC intra
// prediction and a uniform scalar quantizer standing in for the transform.

use crate::api::*;
use crate::def::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCounters {
    pub merge_lists: usize,
    pub inter_searches: usize,
    pub intra_searches: usize,
    pub pcm_searches: usize,
    /* shapes passed to the motion search */
    pub inter_shapes: [usize; 8],
}

/* one call of the motion search */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterCall {
    pub size: usize,
    pub part_size: PartSize,
    pub merge_only: bool,
}

#[derive(Debug, Clone)]
pub struct SimplePredSearch {
    pub reference: Frame<pel>,
    pub num_merge_cands: usize,
    pub bit_depth: usize,
    pub counters: SearchCounters,
    pub inter_calls: Vec<InterCall>,
}

/* quantizer step doubling every 6 QP */
pub fn qstep(qp: i32, lossless: bool) -> i32 {
    if lossless {
        1
    } else {
        1 << ((qp.max(4) - 4) / 6)
    }
}

impl SimplePredSearch {
    pub fn new(reference: Frame<pel>, num_merge_cands: usize, bit_depth: usize) -> Self {
        SimplePredSearch {
            reference,
            num_merge_cands: num_merge_cands.max(1),
            bit_depth,
            counters: SearchCounters::default(),
            inter_calls: Vec::new(),
        }
    }

    fn predict_from_reference(&self, cu: &CuData, mv: Mv, pred: &mut CuYuv) {
        for c in 0..pred.num_comp() {
            let plane = &self.reference.planes[c];
            let (xdec, ydec) = (plane.cfg.xdec, plane.cfg.ydec);
            let (w, h) = (pred.width[c], pred.height[c]);
            let max_x = plane.cfg.width as isize - 1;
            let max_y = plane.cfg.height as isize - 1;
            for j in 0..h {
                for i in 0..w {
                    let x = ((cu.x >> xdec) + i) as isize + (mv.x as isize >> xdec);
                    let y = ((cu.y >> ydec) + j) as isize + (mv.y as isize >> ydec);
                    let x = x.max(0).min(max_x) as usize;
                    let y = y.max(0).min(max_y) as usize;
                    pred.planes[c][j * w + i] = plane.p(x, y);
                }
            }
        }
    }

    /* quantize orig - pred of one component; returns the distortion */
    fn code_component(&self, cu: &mut CodingUnit, bufs: &mut CuBufs, c: usize, skip_residual: bool) -> u64 {
        let step = qstep(cu.data.qp, cu.data.transquant_bypass);
        let max = (1i32 << self.bit_depth) - 1;
        let mut dist = 0;
        let mut cbf = false;
        for (k, (&o, &p)) in bufs.orig.planes[c]
            .iter()
            .zip(bufs.pred.planes[c].iter())
            .enumerate()
        {
            let diff = o as i32 - p as i32;
            let level = if skip_residual { 0 } else { diff / step };
            cbf |= level != 0;
            let rec = (p as i32 + level * step).max(0).min(max);
            cu.coeff[c][k] = level;
            if c == Y_C {
                cu.arl_coeff_y[k] = (diff << ARL_C_PRECISION) / step;
            }
            bufs.resi.planes[c][k] = (o as i32 - rec) as resi;
            bufs.reco.planes[c][k] = rec as pel;
            let e = (o as i32 - rec) as i64;
            dist += (e * e) as u64;
        }
        cu.data.cbf[c] = cbf;
        dist
    }

    fn dc_predict(orig: &[pel], pred: &mut [pel]) {
        let n = orig.len().max(1) as u64;
        let dc = (orig.iter().map(|&v| v as u64).sum::<u64>() + n / 2) / n;
        for v in pred.iter_mut() {
            *v = dc as pel;
        }
    }
}

impl<E: EntropyCoder> PredSearch<E> for SimplePredSearch {
    fn merge_candidates(&mut self, _cu: &CuData, _pic: &EncPicture, list: &mut MergeCandList) {
        self.counters.merge_lists += 1;
        list.num = self.num_merge_cands.min(MRG_MAX_NUM_CANDS);
        for (idx, cand) in list.cands[..list.num].iter_mut().enumerate() {
            cand.inter_dir = PRED_L0;
            cand.mv_field[REFP_0] = MvField {
                mv: Mv::new(4 * idx as i16, 0),
                ref_idx: 0,
            };
            cand.mv_field[REFP_1] = MvField::default();
        }
    }

    fn motion_compensation(&mut self, cu: &CuData, _pic: &EncPicture, pred: &mut CuYuv) {
        self.predict_from_reference(cu, cu.pu[0].mv_field[REFP_0].mv, pred);
    }

    fn pred_inter_search(
        &mut self,
        cu: &mut CodingUnit,
        bufs: CuBufs,
        _pic: &EncPicture,
        _coder: &mut E,
        merge_only: bool,
    ) -> bool {
        self.counters.inter_searches += 1;
        self.counters.inter_shapes[cu.data.part_size as usize] += 1;
        self.inter_calls.push(InterCall {
            size: cu.data.size,
            part_size: cu.data.part_size,
            merge_only,
        });
        for pu in cu.data.pu[..cu.data.part_size.num_parts()].iter_mut() {
            *pu = PuMotion {
                merge: merge_only,
                inter_dir: PRED_L0,
                mv_field: [
                    MvField {
                        mv: Mv::default(),
                        ref_idx: 0,
                    },
                    MvField::default(),
                ],
                ..Default::default()
            };
        }
        self.predict_from_reference(&cu.data, Mv::default(), bufs.pred);
        true
    }

    fn encode_res_and_calc_rd_inter(
        &mut self,
        cu: &mut CodingUnit,
        mut bufs: CuBufs,
        _pic: &EncPicture,
        coder: &mut E,
        skip_residual: bool,
    ) {
        let mut dist = 0;
        for c in 0..bufs.orig.num_comp() {
            dist += self.code_component(cu, &mut bufs, c, skip_residual);
        }
        cu.dist = dist;
        code_inter_cu(coder, cu, false);
    }

    fn est_intra_pred_luma_qt(
        &mut self,
        cu: &mut CodingUnit,
        mut bufs: CuBufs,
        _pic: &EncPicture,
        _coder: &mut E,
    ) {
        self.counters.intra_searches += 1;
        Self::dc_predict(&bufs.orig.planes[Y_C], &mut bufs.pred.planes[Y_C]);
        cu.data.intra_dir[0] = 1;
        cu.dist = self.code_component(cu, &mut bufs, Y_C, false);
    }

    fn est_intra_pred_chroma_qt(
        &mut self,
        cu: &mut CodingUnit,
        mut bufs: CuBufs,
        _pic: &EncPicture,
        _coder: &mut E,
    ) {
        cu.data.intra_dir[1] = 4;
        for c in U_C..=V_C {
            Self::dc_predict(&bufs.orig.planes[c], &mut bufs.pred.planes[c]);
            cu.dist += self.code_component(cu, &mut bufs, c, false);
        }
    }

    fn ipcm_search(&mut self, cu: &mut CodingUnit, bufs: CuBufs, _pic: &EncPicture) {
        self.counters.pcm_searches += 1;
        for c in 0..bufs.orig.num_comp() {
            bufs.pred.planes[c].copy_from_slice(&bufs.orig.planes[c]);
            bufs.reco.planes[c].copy_from_slice(&bufs.orig.planes[c]);
            cu.pcm_sample[c].copy_from_slice(&bufs.orig.planes[c]);
            for v in cu.coeff[c].iter_mut() {
                *v = 0;
            }
            cu.data.cbf[c] = false;
        }
        cu.dist = 0;
    }
}

/* picture whose original samples are drawn from `sample` in raster order */
pub fn picture_from_fn<F: FnMut() -> pel>(
    width: usize,
    height: usize,
    cfg: &EncoderConfig,
    mut sample: F,
) -> EncPicture {
    let mut pic = EncPicture::new(width, height, cfg.chroma_sampling, cfg.max_cu_size, 0);
    for plane in pic.orig.planes.iter_mut() {
        for v in plane.data.iter_mut() {
            *v = sample();
        }
    }
    pic
}
