use crate::api::*;
use crate::def::*;
use crate::util::*;

/*****************************************************************************
 * CU sized sample buffers
 *****************************************************************************/
#[derive(Debug, Clone)]
pub struct CuYuv<T: Copy + Default = pel> {
    pub planes: [Vec<T>; N_C],
    pub width: [usize; N_C],
    pub height: [usize; N_C],
    pub chroma_sampling: ChromaSampling,
}

impl<T: Copy + Default> CuYuv<T> {
    pub fn new(size: usize, chroma_sampling: ChromaSampling) -> Self {
        let (xdec, ydec) = chroma_sampling.decimation();
        let (cw, ch) = if chroma_sampling == ChromaSampling::Cs400 {
            (0, 0)
        } else {
            (size >> xdec, size >> ydec)
        };
        CuYuv {
            planes: [
                vec![T::default(); size * size],
                vec![T::default(); cw * ch],
                vec![T::default(); cw * ch],
            ],
            width: [size, cw, cw],
            height: [size, ch, ch],
            chroma_sampling,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.width[Y_C]
    }

    #[inline]
    pub fn num_comp(&self) -> usize {
        self.chroma_sampling.num_components()
    }

    #[inline]
    pub fn stride(&self, c: usize) -> usize {
        self.width[c]
    }

    pub fn clear(&mut self) {
        for p in self.planes.iter_mut() {
            for v in p.iter_mut() {
                *v = T::default();
            }
        }
    }

    /* copy this buffer into quadrant `part_idx` of a buffer twice its size */
    pub fn copy_to_part(&self, dst: &mut CuYuv<T>, part_idx: usize) {
        debug_assert_eq!(dst.size(), self.size() << 1);
        for c in 0..self.num_comp() {
            let w = self.width[c];
            let h = self.height[c];
            let x = (part_idx & 1) * w;
            let y = (part_idx >> 1) * h;
            let s_dst = dst.stride(c);
            block_copy(
                &self.planes[c],
                w,
                &mut dst.planes[c][y * s_dst + x..],
                s_dst,
                w,
                h,
            );
        }
    }
}

impl CuYuv<pel> {
    /* load the samples of the CU at luma (x, y); samples outside the frame are left untouched */
    pub fn copy_from_frame(&mut self, frame: &Frame<pel>, x: usize, y: usize) {
        for c in 0..self.num_comp() {
            let plane = &frame.planes[c];
            let (px, py) = (x >> plane.cfg.xdec, y >> plane.cfg.ydec);
            if px >= plane.cfg.width || py >= plane.cfg.height {
                continue;
            }
            let w = self.width[c].min(plane.cfg.width - px);
            let h = self.height[c].min(plane.cfg.height - py);
            let s = self.stride(c);
            block_copy(
                &plane.data[py * plane.cfg.stride + px..],
                plane.cfg.stride,
                &mut self.planes[c],
                s,
                w,
                h,
            );
        }
    }

    /* write the CU at luma (x, y) to the frame, clipped to the frame */
    pub fn copy_to_frame(&self, frame: &mut Frame<pel>, x: usize, y: usize) {
        for c in 0..self.num_comp() {
            self.copy_component_to_frame(c, frame, x, y);
        }
    }

    pub fn copy_component_to_frame(&self, c: usize, frame: &mut Frame<pel>, x: usize, y: usize) {
        let plane = &mut frame.planes[c];
        let (px, py) = (x >> plane.cfg.xdec, y >> plane.cfg.ydec);
        if px >= plane.cfg.width || py >= plane.cfg.height {
            return;
        }
        let w = self.width[c].min(plane.cfg.width - px);
        let h = self.height[c].min(plane.cfg.height - py);
        let stride = plane.cfg.stride;
        block_copy(
            &self.planes[c],
            self.stride(c),
            &mut plane.data[py * stride + px..],
            stride,
            w,
            h,
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn copy_quadrant() {
        let mut child: CuYuv<pel> = CuYuv::new(8, ChromaSampling::Cs420);
        for v in child.planes[Y_C].iter_mut() {
            *v = 3;
        }
        for v in child.planes[U_C].iter_mut() {
            *v = 5;
        }
        let mut parent: CuYuv<pel> = CuYuv::new(16, ChromaSampling::Cs420);
        child.copy_to_part(&mut parent, 3);
        assert_eq!(parent.planes[Y_C][8 * 16 + 8], 3);
        assert_eq!(parent.planes[Y_C][7 * 16 + 7], 0);
        assert_eq!(parent.planes[U_C][4 * 8 + 4], 5);
        assert_eq!(parent.planes[U_C][0], 0);
    }

    #[test]
    fn frame_round_trip_clips() {
        let mut frame: Frame<pel> = Frame::new(12, 12, ChromaSampling::Cs400);
        for (i, v) in frame.planes[Y_C].data.iter_mut().enumerate() {
            *v = i as pel;
        }
        let mut yuv: CuYuv<pel> = CuYuv::new(8, ChromaSampling::Cs400);
        yuv.copy_from_frame(&frame, 8, 8);
        assert_eq!(yuv.planes[Y_C][0], 8 * 12 + 8);
        assert_eq!(yuv.planes[Y_C][4], 0);

        let mut out: Frame<pel> = Frame::new(12, 12, ChromaSampling::Cs400);
        yuv.copy_to_frame(&mut out, 8, 8);
        assert_eq!(out.planes[Y_C].p(11, 11), frame.planes[Y_C].p(11, 11));
        assert_eq!(out.planes[Y_C].p(7, 7), 0);
    }
}
