use std::fmt::Debug;

use log::*;

use super::aq::AqPicture;
use super::SliceInfo;
use crate::api::*;
use crate::def::*;
use crate::util::*;

/*****************************************************************************
 * collaborators
 *****************************************************************************/
pub trait RateControl {
    /* QP chosen by rate control for the current CTU */
    fn rc_qp(&self) -> i32;
}

/* block importance map: per picture, per CTU QP offsets */
pub trait AdaptQpMap {
    fn qp_offset(&self, poc: i32, ctu_addr: usize) -> Option<i32>;
}

/* 8-bit grey image marking foreground pixels */
pub trait MaskImage {
    fn dimensions(&self) -> (usize, usize);
    fn sample(&self, x: usize, y: usize) -> u8;
}

impl<T: AsRef<[u8]>> MaskImage for (usize, usize, T) {
    fn dimensions(&self) -> (usize, usize) {
        (self.0, self.1)
    }

    fn sample(&self, x: usize, y: usize) -> u8 {
        /* samples missing from a short buffer read as background */
        self.2.as_ref().get(y * self.0 + x).copied().unwrap_or(0)
    }
}

/* CU whose QP is derived */
#[derive(Clone, Copy)]
pub struct QpBlock<'a> {
    pub pic: &'a EncPicture,
    pub slice: &'a SliceInfo,
    pub x: usize,
    pub y: usize,
    pub size: usize,
    pub depth: usize,
    pub ctu_addr: usize,
}

#[derive(Clone, Copy, Default)]
pub struct QpInputs<'a> {
    pub rc: Option<&'a dyn RateControl>,
    pub qp_map: Option<&'a dyn AdaptQpMap>,
    pub mask: Option<&'a dyn MaskImage>,
    pub aq: Option<&'a AqPicture>,
}

/*****************************************************************************
 * QP range of a CU
 *****************************************************************************/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QpRange {
    pub min: i32,
    pub max: i32,
    /* lowest lossy QP, used to code the lossless iteration */
    pub lowest: i32,
    /* the first iteration codes the CU with transquant bypass */
    pub lossless_first: bool,
    /* QP before any policy offset */
    pub base: i32,
}

impl QpRange {
    fn single(qp: i32, base: i32) -> Self {
        QpRange {
            min: qp,
            max: qp,
            lowest: qp,
            lossless_first: false,
            base,
        }
    }

    /* (qp, lossless) of every iteration */
    pub fn iter(&self) -> impl Iterator<Item = (i32, bool)> {
        let QpRange {
            min,
            max,
            lowest,
            lossless_first,
            ..
        } = *self;
        (min..=max).map(move |qp| {
            if lossless_first && qp == min {
                (lowest, true)
            } else {
                (qp, false)
            }
        })
    }

    pub fn len(&self) -> usize {
        (self.max - self.min + 1).max(0) as usize
    }
}

/*****************************************************************************
 * adaptive QP policies
 *****************************************************************************/
pub trait QpPolicy: Debug {
    fn name(&self) -> &'static str;

    /* QP of the CU before the mode-search range is applied */
    fn base_qp(&self, blk: &QpBlock, _inputs: &QpInputs) -> Result<i32> {
        Ok(blk.slice.qp)
    }

    /* re-evaluate the offsets kept for the CU and its descendants */
    fn refresh(&mut self, _blk: &QpBlock, _inputs: &QpInputs, _base: i32) -> Result<()> {
        Ok(())
    }

    /* mode-search range, None keeps the base (or inherited) QP */
    fn range(&self, _base: i32, _clip: &dyn Fn(i32) -> i32) -> Option<(i32, i32)> {
        None
    }

    /* QP forced on the split candidate */
    fn split_qp(&self, _base: i32, _clip: &dyn Fn(i32) -> i32) -> Option<i32> {
        None
    }

    /* offset added to the split candidate QP at the delta QP depth */
    fn split_offset(&self) -> i32 {
        0
    }

    /* the lambda follows the tested QP */
    fn updates_lambda(&self) -> bool {
        false
    }
}

// Block importance map offsets, tested within +-max_delta_qp.
#[derive(Debug, Default)]
pub struct BimPolicy {
    max_delta_qp: i32,
    offset: i32,
}

impl QpPolicy for BimPolicy {
    fn name(&self) -> &'static str {
        "bim"
    }

    fn refresh(&mut self, blk: &QpBlock, inputs: &QpInputs, _base: i32) -> Result<()> {
        let map = inputs
            .qp_map
            .ok_or_else(|| EncError::InvalidArgument("block importance map is missing".into()))?;
        self.offset = map.qp_offset(blk.pic.poc, blk.ctu_addr).unwrap_or(0);
        Ok(())
    }

    fn range(&self, base: i32, clip: &dyn Fn(i32) -> i32) -> Option<(i32, i32)> {
        Some((
            clip(base - self.max_delta_qp + self.offset),
            clip(base + self.max_delta_qp + self.offset),
        ))
    }

    fn split_offset(&self) -> i32 {
        self.offset
    }

    fn updates_lambda(&self) -> bool {
        true
    }
}

// Delta QP looked up from the luma level of the block.
#[derive(Debug)]
pub struct LumaLevelPolicy {
    mode: LumaLevelToDqpMode,
    max_method_weight: f64,
    lut: Box<[i32]>,
    offset: i32,
}

impl LumaLevelPolicy {
    pub fn new(mapping: &LumaLevelToDeltaQpMapping) -> Self {
        LumaLevelPolicy {
            mode: mapping.mode,
            max_method_weight: mapping.max_method_weight,
            lut: expand_luma_level_lut(&mapping.mapping),
            offset: 0,
        }
    }

    fn luma_level(&self, blk: &QpBlock) -> f64 {
        let luma = &blk.pic.orig.planes[Y_C];
        let w = blk.size.min(luma.cfg.width.saturating_sub(blk.x));
        let h = blk.size.min(luma.cfg.height.saturating_sub(blk.y));
        if w == 0 || h == 0 {
            return 0.0;
        }
        let rows = (blk.y..blk.y + h).map(|y| &luma.row(y)[blk.x..blk.x + w]);
        if self.mode == LumaLevelToDqpMode::LUMALVL_TO_DQP_AVG_METHOD {
            let sum: u64 = rows.flat_map(|r| r.iter()).map(|&v| v as u64).sum();
            sum as f64 / (w * h) as f64
        } else {
            let max = rows.flat_map(|r| r.iter()).copied().max().unwrap_or(0);
            max as f64 * self.max_method_weight
        }
    }
}

/* dense table of the sparse (luma threshold, delta QP) mapping */
pub fn expand_luma_level_lut(mapping: &[(i32, i32)]) -> Box<[i32]> {
    let mut lut = vec![0; LUMA_LEVEL_TO_DQP_LUT_MAXSIZE].into_boxed_slice();
    let mut last = 0;
    let mut next = 0;
    for (idx, v) in lut.iter_mut().enumerate() {
        while next < mapping.len() && idx as i32 >= mapping[next].0 {
            last = mapping[next].1;
            next += 1;
        }
        *v = last;
    }
    lut
}

impl QpPolicy for LumaLevelPolicy {
    fn name(&self) -> &'static str {
        "luma level"
    }

    fn refresh(&mut self, blk: &QpBlock, _inputs: &QpInputs, _base: i32) -> Result<()> {
        let level = self.luma_level(blk);
        let idx = CLIP3(0, LUMA_LEVEL_TO_DQP_LUT_MAXSIZE as i32 - 1, (level + 0.5) as i32);
        self.offset = self.lut[idx as usize];
        Ok(())
    }

    fn range(&self, base: i32, clip: &dyn Fn(i32) -> i32) -> Option<(i32, i32)> {
        let qp = clip(base - self.offset);
        Some((qp, qp))
    }

    fn split_qp(&self, base: i32, clip: &dyn Fn(i32) -> i32) -> Option<i32> {
        Some(clip(base - self.offset))
    }

    fn updates_lambda(&self) -> bool {
        true
    }
}

/* inverse Gram matrix of the basis 1, x, y, xy, x^2, y^2 over a 64x64 block */
const SMOOTH_INVB: [[f64; 6]; 6] = [
    [0.001 * 0.244140625000000, 0.0, 0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        0.001 * 0.013204564833946,
        0.001 * 0.002080251479290,
        -0.001 * 0.000066039729501,
        -0.001 * 0.000165220364313,
        0.0,
    ],
    [
        0.0,
        0.001 * 0.002080251479290,
        0.001 * 0.013204564833946,
        -0.001 * 0.000066039729501,
        0.0,
        -0.001 * 0.000165220364313,
    ],
    [
        0.0,
        -0.001 * 0.000066039729501,
        -0.001 * 0.000066039729501,
        0.001 * 0.000002096499349,
        0.0,
        0.0,
    ],
    [0.0, -0.001 * 0.000165220364313, 0.0, 0.0, 0.001 * 0.000002622545465, 0.0],
    [0.0, 0.0, -0.001 * 0.000165220364313, 0.0, 0.0, 0.001 * 0.000002622545465],
];

/* centering of the non-constant basis terms */
const SMOOTH_BOFFSET: [f64; 5] = [-31.5, -31.5, -992.25, -1333.5, -1333.5];

#[inline]
fn smooth_basis(x: f64, y: f64) -> [f64; 6] {
    [
        1.0,
        x + SMOOTH_BOFFSET[0],
        y + SMOOTH_BOFFSET[1],
        x * y + SMOOTH_BOFFSET[2],
        x * x + SMOOTH_BOFFSET[3],
        y * y + SMOOTH_BOFFSET[4],
    ]
}

// Lower QP for 64x64 blocks well described by a second order surface.
#[derive(Debug)]
pub struct SmoothQpPolicy {
    cfg: SmoothQpReduction,
    offset: i32,
}

impl SmoothQpPolicy {
    pub fn new(cfg: SmoothQpReduction) -> Self {
        SmoothQpPolicy { cfg, offset: 0 }
    }

    fn frame_selected(&self, slice: &SliceInfo) -> bool {
        match self.cfg.periodicity {
            0 => slice.slice_type == SliceType::I_SLICE,
            1 => true,
            n => slice.poc.rem_euclid(n as i32) == 0,
        }
    }

    /* QP offset of the block, 0 if it is not smooth */
    pub fn smooth_offset(&self, luma: &Plane<pel>, x0: usize, y0: usize, size: usize, base: i32) -> i32 {
        if size != SMOOTH_QP_BLOCK_SIZE
            || x0 + size > luma.cfg.width
            || y0 + size > luma.cfg.height
        {
            return 0;
        }

        let mut b = [0f64; 6];
        for y in 0..size {
            for (x, &v) in luma.row(y0 + y)[x0..x0 + size].iter().enumerate() {
                let basis = smooth_basis(x as f64, y as f64);
                for k in 0..6 {
                    b[k] += v as f64 * basis[k];
                }
            }
        }
        let mut r = [0f64; 6];
        for (k, rk) in r.iter_mut().enumerate() {
            *rk = (0..6).map(|j| SMOOTH_INVB[k][j] * b[j]).sum();
        }

        let mut diff = 0f64;
        for y in 0..size {
            for (x, &v) in luma.row(y0 + y)[x0..x0 + size].iter().enumerate() {
                let basis = smooth_basis(x as f64, y as f64);
                let model: f64 = (0..6).map(|k| r[k] * basis[k]).sum();
                diff += (v as i32 - model as i32).abs() as f64;
            }
        }

        let thr = self.cfg.threshold * (size * size) as f64;
        if diff < thr {
            let qp = (self.cfg.model_scale * base as f64 + self.cfg.model_offset) as i32;
            self.cfg.limit.max(qp.min(0))
        } else {
            0
        }
    }
}

impl QpPolicy for SmoothQpPolicy {
    fn name(&self) -> &'static str {
        "smooth"
    }

    fn refresh(&mut self, blk: &QpBlock, _inputs: &QpInputs, base: i32) -> Result<()> {
        self.offset = if self.frame_selected(blk.slice) {
            self.smooth_offset(&blk.pic.orig.planes[Y_C], blk.x, blk.y, blk.size, base)
        } else {
            0
        };
        Ok(())
    }

    fn range(&self, base: i32, clip: &dyn Fn(i32) -> i32) -> Option<(i32, i32)> {
        let qp = clip(base + self.offset);
        Some((qp, qp))
    }

    fn updates_lambda(&self) -> bool {
        true
    }
}

// Offset from the luma activity of the block relative to the picture.
#[derive(Debug)]
pub struct ActivityAqPolicy {
    range: i32,
}

impl QpPolicy for ActivityAqPolicy {
    fn name(&self) -> &'static str {
        "activity"
    }

    fn base_qp(&self, blk: &QpBlock, inputs: &QpInputs) -> Result<i32> {
        let aq = inputs
            .aq
            .ok_or_else(|| EncError::InvalidArgument("picture activity is missing".into()))?;
        Ok(blk.slice.qp + aq.qp_offset(blk.x, blk.y, blk.depth, self.range))
    }
}

// Foreground QP wherever the mask marks a pixel under the block.
#[derive(Debug)]
pub struct MaskPolicy {
    fg_qp: i32,
}

impl MaskPolicy {
    pub fn is_foreground(mask: &dyn MaskImage, x0: usize, y0: usize, size: usize) -> bool {
        let (w, h) = mask.dimensions();
        let x1 = (x0 + size).min(w);
        let y1 = (y0 + size).min(h);
        (y0..y1).any(|y| (x0..x1).any(|x| mask.sample(x, y) > MASK_FG_THRESHOLD))
    }
}

impl QpPolicy for MaskPolicy {
    fn name(&self) -> &'static str {
        "mask"
    }

    fn base_qp(&self, blk: &QpBlock, inputs: &QpInputs) -> Result<i32> {
        let mask = inputs
            .mask
            .ok_or_else(|| EncError::InvalidArgument("foreground mask is missing".into()))?;
        Ok(if Self::is_foreground(mask, blk.x, blk.y, blk.size) {
            self.fg_qp
        } else {
            blk.slice.qp
        })
    }
}

/*****************************************************************************
 * QP derivation
 *****************************************************************************/
#[derive(Debug)]
pub struct QpDerivation {
    policy: Option<Box<dyn QpPolicy>>,
    use_rate_ctrl: bool,
    max_cu_dqp_depth: usize,
    qp_bd_offset: i32,
    transquant_bypass: bool,
    transquant_bypass_force: bool,
}

impl QpDerivation {
    pub fn new(cfg: &EncoderConfig) -> Self {
        let policy: Option<Box<dyn QpPolicy>> = if cfg.use_rate_ctrl {
            None
        } else if cfg.use_bim {
            Some(Box::new(BimPolicy {
                max_delta_qp: cfg.max_delta_qp,
                offset: 0,
            }))
        } else if cfg.luma_level_to_dqp.is_enabled() {
            Some(Box::new(LumaLevelPolicy::new(&cfg.luma_level_to_dqp)))
        } else if cfg.smooth_qp.enable {
            Some(Box::new(SmoothQpPolicy::new(cfg.smooth_qp)))
        } else if cfg.use_adaptive_qp {
            Some(Box::new(ActivityAqPolicy {
                range: cfg.qp_adaptation_range,
            }))
        } else if let Some(fg_qp) = cfg.mask_fg_qp {
            Some(Box::new(MaskPolicy { fg_qp }))
        } else {
            None
        };
        if let Some(p) = &policy {
            debug!("QP adaptation policy: {}", p.name());
        }

        QpDerivation {
            policy,
            use_rate_ctrl: cfg.use_rate_ctrl,
            max_cu_dqp_depth: cfg.max_cu_dqp_depth,
            qp_bd_offset: cfg.qp_bd_offset_luma(),
            transquant_bypass: cfg.transquant_bypass_enabled,
            transquant_bypass_force: cfg.cu_transquant_bypass_force,
        }
    }

    pub fn policy_name(&self) -> Option<&'static str> {
        self.policy.as_ref().map(|p| p.name())
    }

    /* the RD lambda follows the tested QP at this depth */
    pub fn updates_lambda(&self, depth: usize) -> bool {
        depth <= self.max_cu_dqp_depth && self.policy.as_ref().map_or(false, |p| p.updates_lambda())
    }

    /* split candidates sum the costs of their sub-CUs */
    pub fn sums_split_cost(&self) -> bool {
        self.max_cu_dqp_depth >= 1 && self.policy.as_ref().map_or(false, |p| p.updates_lambda())
    }

    #[inline]
    pub fn clip(&self, qp: i32) -> i32 {
        CLIP3(-self.qp_bd_offset, MAX_QP, qp)
    }

    fn rc_qp(&self, inputs: &QpInputs) -> Result<Option<i32>> {
        if !self.use_rate_ctrl {
            return Ok(None);
        }
        inputs
            .rc
            .map(|rc| Some(rc.rc_qp()))
            .ok_or_else(|| EncError::InvalidArgument("rate control is missing".into()))
    }

    pub fn base_qp(&self, blk: &QpBlock, inputs: &QpInputs) -> Result<i32> {
        let qp = match &self.policy {
            Some(p) => p.base_qp(blk, inputs)?,
            None => blk.slice.qp,
        };
        Ok(self.clip(qp))
    }

    /* QPs tested by the modes of the CU; `inherited` is the QP given to the CU by its parent */
    pub fn derive(&mut self, blk: &QpBlock, inputs: &QpInputs, inherited: i32) -> Result<QpRange> {
        let base = self.base_qp(blk, inputs)?;
        let qp = if blk.depth <= self.max_cu_dqp_depth {
            base
        } else {
            inherited
        };
        let mut range = QpRange::single(qp, base);

        let bd = self.qp_bd_offset;
        let clip = move |qp: i32| CLIP3(-bd, MAX_QP, qp);
        if let Some(policy) = self.policy.as_mut() {
            if blk.depth <= self.max_cu_dqp_depth {
                policy.refresh(blk, inputs, base)?;
            }
            if let Some((min, max)) = policy.range(base, &clip) {
                range.min = min;
                range.max = max;
            }
        }
        if let Some(qp) = self.rc_qp(inputs)? {
            range.min = qp;
            range.max = qp;
        }

        range.lowest = range.min;
        if self.transquant_bypass {
            range.lossless_first = true;
            range.min -= 1;
            if self.transquant_bypass_force {
                range.max = range.min;
            }
        }
        Ok(range)
    }

    /* QPs tested by the split candidate of the CU */
    pub fn split_range(&self, blk: &QpBlock, inputs: &QpInputs, base: i32, inherited: i32) -> Result<QpRange> {
        let qp = if blk.depth == self.max_cu_dqp_depth {
            base + self.policy.as_ref().map_or(0, |p| p.split_offset())
        } else if blk.depth < self.max_cu_dqp_depth {
            base
        } else {
            inherited
        };
        let mut range = QpRange::single(qp, base);

        let bd = self.qp_bd_offset;
        let clip = move |qp: i32| CLIP3(-bd, MAX_QP, qp);
        if let Some(qp) = self.policy.as_ref().and_then(|p| p.split_qp(base, &clip)) {
            range.min = qp;
            range.max = qp;
        }
        if let Some(qp) = self.rc_qp(inputs)? {
            range.min = qp;
            range.max = qp;
        }
        if self.transquant_bypass_force {
            range.max = range.min;
        }
        range.lowest = range.min;
        Ok(range)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct FixedRc(i32);

    impl RateControl for FixedRc {
        fn rc_qp(&self) -> i32 {
            self.0
        }
    }

    impl AdaptQpMap for HashMap<(i32, usize), i32> {
        fn qp_offset(&self, poc: i32, ctu_addr: usize) -> Option<i32> {
            self.get(&(poc, ctu_addr)).copied()
        }
    }

    fn slice(qp: i32) -> SliceInfo {
        SliceInfo {
            slice_type: SliceType::B_SLICE,
            qp,
            ..Default::default()
        }
    }

    fn block<'a>(pic: &'a EncPicture, slice: &'a SliceInfo, size: usize, depth: usize) -> QpBlock<'a> {
        QpBlock {
            pic,
            slice,
            x: 0,
            y: 0,
            size,
            depth,
            ctu_addr: 0,
        }
    }

    fn flat_picture(v: pel) -> EncPicture {
        let mut pic = EncPicture::new(64, 64, ChromaSampling::Cs400, 64, 0);
        pic.orig.planes[Y_C].fill(v);
        pic
    }

    #[test]
    fn no_policy_collapses_to_slice_qp() {
        let cfg = EncoderConfig::default();
        let mut qpd = QpDerivation::new(&cfg);
        let pic = flat_picture(0);
        let s = slice(32);
        for depth in 0..=3 {
            let blk = block(&pic, &s, 64 >> depth, depth);
            let range = qpd.derive(&blk, &QpInputs::default(), 32).unwrap();
            assert_eq!((range.min, range.max), (32, 32));
            assert_eq!(range.iter().collect::<Vec<_>>(), vec![(32, false)]);
        }
        assert!(!qpd.updates_lambda(0));
    }

    #[test]
    fn deeper_cus_inherit() {
        let cfg = EncoderConfig {
            use_dqp: true,
            max_cu_dqp_depth: 1,
            ..Default::default()
        };
        let mut qpd = QpDerivation::new(&cfg);
        let pic = flat_picture(0);
        let s = slice(30);
        let range = qpd.derive(&block(&pic, &s, 16, 2), &QpInputs::default(), 27).unwrap();
        assert_eq!(range.min, 27);
        let split = qpd.split_range(&block(&pic, &s, 16, 2), &QpInputs::default(), 30, 27).unwrap();
        assert_eq!(split.min, 27);
        let split = qpd.split_range(&block(&pic, &s, 64, 0), &QpInputs::default(), 30, 27).unwrap();
        assert_eq!(split.min, 30);
    }

    #[test]
    fn bypass_adds_lossless_iteration() {
        let mut cfg = EncoderConfig {
            transquant_bypass_enabled: true,
            ..Default::default()
        };
        let pic = flat_picture(0);
        let s = slice(30);
        let blk = block(&pic, &s, 64, 0);

        let mut qpd = QpDerivation::new(&cfg);
        let range = qpd.derive(&blk, &QpInputs::default(), 30).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![(30, true), (30, false)]);

        cfg.cu_transquant_bypass_force = true;
        let mut qpd = QpDerivation::new(&cfg);
        let range = qpd.derive(&blk, &QpInputs::default(), 30).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![(30, true)]);
    }

    #[test]
    fn rate_control_wins() {
        let cfg = EncoderConfig {
            use_rate_ctrl: true,
            use_bim: true,
            max_delta_qp: 3,
            ..Default::default()
        };
        let mut qpd = QpDerivation::new(&cfg);
        assert_eq!(qpd.policy_name(), None);
        let pic = flat_picture(0);
        let s = slice(30);
        let blk = block(&pic, &s, 64, 0);
        let rc = FixedRc(41);
        let inputs = QpInputs {
            rc: Some(&rc),
            ..Default::default()
        };
        let range = qpd.derive(&blk, &inputs, 30).unwrap();
        assert_eq!((range.min, range.max), (41, 41));
        assert!(qpd.derive(&blk, &QpInputs::default(), 30).is_err());
    }

    #[test]
    fn bim_widens_range() {
        let cfg = EncoderConfig {
            use_dqp: true,
            use_bim: true,
            max_delta_qp: 2,
            ..Default::default()
        };
        let mut qpd = QpDerivation::new(&cfg);
        let pic = flat_picture(0);
        let s = slice(30);
        let blk = block(&pic, &s, 64, 0);
        let mut map = HashMap::new();
        map.insert((0, 0), -3);
        let inputs = QpInputs {
            qp_map: Some(&map),
            ..Default::default()
        };
        let range = qpd.derive(&blk, &inputs, 30).unwrap();
        assert_eq!((range.min, range.max), (25, 29));
        assert_eq!(range.len(), 5);
        let split = qpd.split_range(&blk, &inputs, range.base, 30).unwrap();
        assert_eq!((split.min, split.max), (27, 27));

        /* unknown POC */
        let pic1 = EncPicture::new(64, 64, ChromaSampling::Cs400, 64, 5);
        let range = qpd.derive(&block(&pic1, &s, 64, 0), &inputs, 30).unwrap();
        assert_eq!((range.min, range.max), (28, 32));
        assert!(qpd.updates_lambda(0));
    }

    #[test]
    fn luma_lut_expansion() {
        let lut = expand_luma_level_lut(&[(0, 3), (301, 2), (367, 1), (434, 0), (501, -1), (567, -2)]);
        assert_eq!(lut.len(), LUMA_LEVEL_TO_DQP_LUT_MAXSIZE);
        assert_eq!(lut[0], 3);
        assert_eq!(lut[300], 3);
        assert_eq!(lut[301], 2);
        assert_eq!(lut[500], 0);
        assert_eq!(lut[1023], -2);
        assert_eq!(&expand_luma_level_lut(&[])[..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn luma_level_offset() {
        let cfg = EncoderConfig {
            luma_level_to_dqp: LumaLevelToDeltaQpMapping {
                mode: LumaLevelToDqpMode::LUMALVL_TO_DQP_AVG_METHOD,
                max_method_weight: 1.0,
                mapping: vec![(0, 3), (100, -2)],
            },
            ..Default::default()
        };
        let mut qpd = QpDerivation::new(&cfg);
        let s = slice(30);
        let dark = flat_picture(20);
        let range = qpd.derive(&block(&dark, &s, 64, 0), &QpInputs::default(), 30).unwrap();
        assert_eq!(range.min, 27);
        let bright = flat_picture(200);
        let range = qpd.derive(&block(&bright, &s, 64, 0), &QpInputs::default(), 30).unwrap();
        assert_eq!(range.min, 32);
        let split = qpd.split_range(&block(&bright, &s, 64, 0), &QpInputs::default(), 30, 30).unwrap();
        assert_eq!(split.min, 32);
    }

    #[test]
    fn smooth_vs_textured() {
        let cfg = SmoothQpReduction {
            enable: true,
            ..Default::default()
        };
        let policy = SmoothQpPolicy::new(cfg);

        /* a gradient is fitted exactly */
        let mut pic = flat_picture(0);
        for y in 0..64 {
            for x in 0..64 {
                pic.orig.planes[Y_C].row_mut(y)[x] = (50 + x + y) as pel;
            }
        }
        let luma = &pic.orig.planes[Y_C];
        /* scale -1, offset 27: 27 - 32 = -5 */
        assert_eq!(policy.smooth_offset(luma, 0, 0, 64, 32), -5);
        /* clamped to the limit */
        assert_eq!(policy.smooth_offset(luma, 0, 0, 64, 51), -16);
        /* never positive */
        assert_eq!(policy.smooth_offset(luma, 0, 0, 64, 20), 0);
        /* only 64x64 blocks */
        assert_eq!(policy.smooth_offset(luma, 0, 0, 32, 32), 0);

        let mut rng = 0x1234_5678u32;
        for y in 0..64 {
            for x in 0..64 {
                rng ^= rng << 13;
                rng ^= rng >> 17;
                rng ^= rng << 5;
                pic.orig.planes[Y_C].row_mut(y)[x] = (rng % 256) as pel;
            }
        }
        assert_eq!(policy.smooth_offset(&pic.orig.planes[Y_C], 0, 0, 64, 32), 0);
    }

    #[test]
    fn smooth_periodicity() {
        let mut policy = SmoothQpPolicy::new(SmoothQpReduction {
            enable: true,
            periodicity: 0,
            ..Default::default()
        });
        let mut s = slice(30);
        assert!(!policy.frame_selected(&s));
        s.slice_type = SliceType::I_SLICE;
        assert!(policy.frame_selected(&s));
        policy.cfg.periodicity = 4;
        s.slice_type = SliceType::B_SLICE;
        s.poc = 8;
        assert!(policy.frame_selected(&s));
        s.poc = 6;
        assert!(!policy.frame_selected(&s));
    }

    #[test]
    fn mask_selects_foreground_qp() {
        let cfg = EncoderConfig {
            mask_fg_qp: Some(22),
            ..Default::default()
        };
        let mut qpd = QpDerivation::new(&cfg);
        let mut data = vec![0u8; 32 * 32];
        data[20 * 32 + 20] = 200;
        let mask = (32usize, 32usize, data);
        let inputs = QpInputs {
            mask: Some(&mask),
            ..Default::default()
        };
        let pic = flat_picture(0);
        let s = slice(37);
        let mut blk = block(&pic, &s, 16, 1);
        assert_eq!(qpd.derive(&blk, &inputs, 37).unwrap().min, 37);
        blk.x = 16;
        blk.y = 16;
        assert_eq!(qpd.derive(&blk, &inputs, 37).unwrap().min, 22);
        /* outside the mask */
        blk.x = 48;
        assert_eq!(qpd.derive(&blk, &inputs, 37).unwrap().min, 37);
        assert_eq!(s.qp, 37);
        assert!(qpd.derive(&blk, &QpInputs::default(), 37).is_err());
    }

    #[test]
    fn activity_aq_precedes_mask() {
        let both = EncoderConfig {
            use_adaptive_qp: true,
            mask_fg_qp: Some(20),
            ..Default::default()
        };
        assert_eq!(QpDerivation::new(&both).policy_name(), Some("activity"));
        let mask_only = EncoderConfig {
            mask_fg_qp: Some(20),
            ..Default::default()
        };
        assert_eq!(QpDerivation::new(&mask_only).policy_name(), Some("mask"));
        let smooth = EncoderConfig {
            smooth_qp: SmoothQpReduction {
                enable: true,
                ..Default::default()
            },
            use_adaptive_qp: true,
            mask_fg_qp: Some(20),
            ..Default::default()
        };
        assert_eq!(QpDerivation::new(&smooth).policy_name(), Some("smooth"));
    }

    #[test]
    fn short_mask_reads_background() {
        let mask = (16usize, 16usize, vec![255u8; 16 * 4]);
        assert_eq!(mask.sample(3, 2), 255);
        assert_eq!(mask.sample(3, 12), 0);
        assert!(!MaskPolicy::is_foreground(&mask, 0, 8, 8));
        assert!(MaskPolicy::is_foreground(&mask, 0, 0, 8));
    }
}
