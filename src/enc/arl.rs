use super::cu::*;
use crate::def::*;
use crate::util::*;

// Adaptive rounding statistics: companion values of the quantized luma
// coefficients bucketed by quantized magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArlStats {
    pub sum: [i64; LEVEL_RANGE + 1],
    pub count: [u64; LEVEL_RANGE + 1],
}

impl Default for ArlStats {
    fn default() -> Self {
        ArlStats {
            sum: [0; LEVEL_RANGE + 1],
            count: [0; LEVEL_RANGE + 1],
        }
    }
}

impl ArlStats {
    pub fn reset(&mut self) {
        *self = ArlStats::default();
    }

    fn add(&mut self, q: TCoeff, arl: TCoeff) {
        let u = q.unsigned_abs() as usize;
        if u == 0 {
            return;
        }
        let arl = arl.abs() as i64;
        if u < LEVEL_RANGE {
            self.sum[u] += arl;
            self.count[u] += 1;
        } else {
            self.sum[LEVEL_RANGE] += arl - ((u as i64) << ARL_C_PRECISION);
            self.count[LEVEL_RANGE] += 1;
        }
    }

    /* accumulate the inter leaves of a coded CTU carrying luma residual */
    pub fn collect(&mut self, ctu: &CodingUnit) {
        let (x0, y0) = (ctu.data.x, ctu.data.y);
        for leaf in ctu.decisions() {
            if !leaf.is_inter() || !leaf.cbf[Y_C] {
                continue;
            }
            let start = if ctu.split {
                zorder_offset(leaf.x - x0, leaf.y - y0)
            } else {
                0
            };
            let end = start + leaf.size * leaf.size;
            for (&q, &arl) in ctu.coeff[Y_C][start..end]
                .iter()
                .zip(ctu.arl_coeff_y[start..end].iter())
            {
                self.add(q, arl);
            }
        }
    }

    /* mean companion value of a magnitude bucket */
    pub fn mean(&self, level: usize) -> Option<f64> {
        if self.count[level] == 0 {
            None
        } else {
            Some(self.sum[level] as f64 / self.count[level] as f64)
        }
    }
}
