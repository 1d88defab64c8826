use crate::api::*;
use crate::def::*;

// Activity of the adaptation units of one AQ depth.
#[derive(Debug, Clone, Default)]
pub struct AqLayer {
    pub unit_size: usize,
    pub stride: usize,
    pub rows: usize,
    pub activity: Vec<f64>,
    pub avg_activity: f64,
}

impl AqLayer {
    fn analyze(luma: &Plane<pel>, unit_size: usize) -> Self {
        let (w, h) = (luma.cfg.width, luma.cfg.height);
        let stride = (w + unit_size - 1) / unit_size;
        let rows = (h + unit_size - 1) / unit_size;
        let mut activity = Vec::with_capacity(stride * rows);

        for y in (0..h).step_by(unit_size) {
            for x in (0..w).step_by(unit_size) {
                let cw = unit_size.min(w - x);
                let ch = unit_size.min(h - y);
                activity.push(1.0 + min_quadrant_variance(luma, x, y, cw, ch));
            }
        }
        let avg_activity = if activity.is_empty() {
            1.0
        } else {
            activity.iter().sum::<f64>() / activity.len() as f64
        };
        AqLayer {
            unit_size,
            stride,
            rows,
            activity,
            avg_activity,
        }
    }

    /* activity of the unit covering luma sample (x, y) */
    pub fn activity_at(&self, x: usize, y: usize) -> f64 {
        let ux = (x / self.unit_size).min(self.stride - 1);
        let uy = (y / self.unit_size).min(self.rows - 1);
        self.activity[uy * self.stride + ux]
    }
}

fn min_quadrant_variance(luma: &Plane<pel>, x0: usize, y0: usize, w: usize, h: usize) -> f64 {
    let mut sum = [0u64; 4];
    let mut sum_sq = [0u64; 4];
    let mut cnt = [0u64; 4];
    let (hw, hh) = (w >> 1, h >> 1);

    for y in 0..h {
        let row = &luma.row(y0 + y)[x0..x0 + w];
        for (x, &v) in row.iter().enumerate() {
            let q = (y >= hh) as usize * 2 + (x >= hw) as usize;
            let v = v as u64;
            sum[q] += v;
            sum_sq[q] += v * v;
            cnt[q] += 1;
        }
    }

    let mut min_var = f64::MAX;
    for q in 0..4 {
        if cnt[q] == 0 {
            continue;
        }
        let n = cnt[q] as f64;
        let avg = sum[q] as f64 / n;
        min_var = min_var.min(sum_sq[q] as f64 / n - avg * avg);
    }
    if min_var == f64::MAX {
        0.0
    } else {
        min_var
    }
}

// Luma activity of a picture at every AQ depth.
#[derive(Debug, Clone, Default)]
pub struct AqPicture {
    pub layers: Vec<AqLayer>,
}

impl AqPicture {
    pub fn analyze(pic: &EncPicture, max_aq_depth: usize) -> Self {
        let luma = &pic.orig.planes[Y_C];
        AqPicture {
            layers: (0..max_aq_depth.max(1))
                .map(|d| AqLayer::analyze(luma, (pic.ctu_size >> d).max(1)))
                .collect(),
        }
    }

    /* QP offset of the CU at (x, y) for the given depth */
    pub fn qp_offset(&self, x: usize, y: usize, depth: usize, qp_adaptation_range: i32) -> i32 {
        let layer = &self.layers[depth.min(self.layers.len() - 1)];
        let max_q_scale = 2f64.powf(qp_adaptation_range as f64 / 6.0);
        let avg = layer.avg_activity;
        let act = layer.activity_at(x, y);
        let norm = (max_q_scale * act + avg) / (act + max_q_scale * avg);
        (norm.log2() * 6.0 + 0.49999).floor() as i32
    }
}
