use super::*;
use crate::def::*;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaneConfig {
    pub stride: usize,
    pub width: usize,
    pub height: usize,
    pub xdec: usize,
    pub ydec: usize,
}

// One component of a picture, stored row by row without padding.
#[derive(Debug, Clone, Default)]
pub struct Plane<T: Copy + Default> {
    pub data: Vec<T>,
    pub cfg: PlaneConfig,
}

impl<T: Copy + Default> Plane<T> {
    pub fn new(width: usize, height: usize, xdec: usize, ydec: usize) -> Self {
        Plane {
            data: vec![T::default(); width * height],
            cfg: PlaneConfig {
                stride: width,
                width,
                height,
                xdec,
                ydec,
            },
        }
    }

    #[inline]
    pub fn p(&self, x: usize, y: usize) -> T {
        self.data[y * self.cfg.stride + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.cfg.stride;
        &self.data[start..start + self.cfg.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.cfg.stride;
        let width = self.cfg.width;
        &mut self.data[start..start + width]
    }

    pub fn fill(&mut self, v: T) {
        for d in self.data.iter_mut() {
            *d = v;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Frame<T: Copy + Default> {
    pub planes: [Plane<T>; N_C],
    pub chroma_sampling: ChromaSampling,
}

impl<T: Copy + Default> Frame<T> {
    pub fn new(width: usize, height: usize, chroma_sampling: ChromaSampling) -> Self {
        let (xdec, ydec) = chroma_sampling.decimation();
        let (cw, ch) = if chroma_sampling == ChromaSampling::Cs400 {
            (0, 0)
        } else {
            ((width + xdec) >> xdec, (height + ydec) >> ydec)
        };
        Frame {
            planes: [
                Plane::new(width, height, 0, 0),
                Plane::new(cw, ch, xdec, ydec),
                Plane::new(cw, ch, xdec, ydec),
            ],
            chroma_sampling,
        }
    }
}

// Picture being encoded: original samples plus the reconstruction and
// prediction written back by the mode decision.
#[derive(Debug, Clone)]
pub struct EncPicture {
    pub orig: Frame<pel>,
    pub reco: Frame<pel>,
    pub pred: Frame<pel>,
    pub poc: i32,
    pub width: usize,
    pub height: usize,
    pub chroma_sampling: ChromaSampling,
    pub ctu_size: usize,
}

impl EncPicture {
    pub fn new(
        width: usize,
        height: usize,
        chroma_sampling: ChromaSampling,
        ctu_size: usize,
        poc: i32,
    ) -> Self {
        EncPicture {
            orig: Frame::new(width, height, chroma_sampling),
            reco: Frame::new(width, height, chroma_sampling),
            pred: Frame::new(width, height, chroma_sampling),
            poc,
            width,
            height,
            chroma_sampling,
            ctu_size,
        }
    }

    pub fn width_in_ctus(&self) -> usize {
        (self.width + self.ctu_size - 1) / self.ctu_size
    }

    pub fn height_in_ctus(&self) -> usize {
        (self.height + self.ctu_size - 1) / self.ctu_size
    }

    pub fn num_ctus(&self) -> usize {
        self.width_in_ctus() * self.height_in_ctus()
    }

    /* raster address of the CTU containing the luma sample (x, y) */
    pub fn ctu_rs_addr(&self, x: usize, y: usize) -> usize {
        (y / self.ctu_size) * self.width_in_ctus() + x / self.ctu_size
    }

    /* luma position of the top-left sample of a CTU */
    pub fn ctu_pos(&self, ctu_addr: usize) -> (usize, usize) {
        let w = self.width_in_ctus();
        ((ctu_addr % w) * self.ctu_size, (ctu_addr / w) * self.ctu_size)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_420_planes() {
        let f: Frame<pel> = Frame::new(33, 17, ChromaSampling::Cs420);
        assert_eq!(f.planes[0].cfg.width, 33);
        assert_eq!(f.planes[1].cfg.width, 17);
        assert_eq!(f.planes[1].cfg.height, 9);
        assert_eq!(f.planes[2].cfg.xdec, 1);
    }

    #[test]
    fn ctu_addressing() {
        let pic = EncPicture::new(130, 70, ChromaSampling::Cs420, 64, 0);
        assert_eq!(pic.width_in_ctus(), 3);
        assert_eq!(pic.height_in_ctus(), 2);
        assert_eq!(pic.ctu_rs_addr(129, 65), 5);
        assert_eq!(pic.ctu_pos(4), (64, 64));
    }

    #[test]
    fn plane_rows() {
        let mut p: Plane<pel> = Plane::new(4, 2, 0, 0);
        p.row_mut(1)[2] = 7;
        assert_eq!(p.p(2, 1), 7);
        assert_eq!(p.row(0), &[0, 0, 0, 0]);
    }
}
