use log::*;

use crate::api::*;
use crate::def::*;
use crate::util::CLIP3;

// Sparse (luma level, delta QP) mapping driving the luma-level QP policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LumaLevelToDeltaQpMapping {
    pub mode: LumaLevelToDqpMode,
    // Weight applied to the maximum luma value in the max method.
    pub max_method_weight: f64,
    // Ascending luma thresholds, each with the delta QP applied from that level on.
    pub mapping: Vec<(i32, i32)>,
}

impl LumaLevelToDeltaQpMapping {
    pub fn is_enabled(&self) -> bool {
        self.mode != LumaLevelToDqpMode::LUMALVL_TO_DQP_DISABLED
    }
}

// QP reduction for smooth 64x64 blocks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothQpReduction {
    pub enable: bool,
    // Mean absolute model error per sample below which a block is smooth.
    pub threshold: f64,
    pub model_scale: f64,
    pub model_offset: f64,
    // Lowest (most negative) offset applied.
    pub limit: i32,
    // 0: intra slices only, 1: every frame, n: frames whose POC is a multiple of n.
    pub periodicity: u32,
}

impl Default for SmoothQpReduction {
    fn default() -> Self {
        SmoothQpReduction {
            enable: false,
            threshold: 3.0,
            model_scale: -1.0,
            model_offset: 27.0,
            limit: -16,
            periodicity: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PcmConfig {
    pub enable: bool,
    pub log2_min_size: usize,
    pub log2_max_size: usize,
}

impl Default for PcmConfig {
    fn default() -> Self {
        PcmConfig {
            enable: false,
            log2_min_size: MIN_PCM_LOG2,
            log2_max_size: MAX_PCM_LOG2,
        }
    }
}

impl PcmConfig {
    /* whether a CU of the given width may be coded as PCM */
    pub fn allows(&self, width: usize) -> bool {
        self.enable && width <= (1 << self.log2_max_size) && width >= (1 << self.log2_min_size)
    }
}

// Chroma QP adjustment signalled per CU (range extension).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChromaQpAdjConfig {
    pub list_len: usize,
    pub diff_cu_chroma_qp_offset_depth: usize,
}

// Encoder settings which impact the mode decision.
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    // output size
    // Width of the frames in pixels.
    pub width: usize,
    // Height of the frames in pixels.
    pub height: usize,
    pub bit_depth_luma: usize,
    pub bit_depth_chroma: usize,
    // Chroma subsampling.
    pub chroma_sampling: ChromaSampling,

    // coding structure
    pub max_cu_size: usize,
    // log2 difference between the largest and the smallest CU size
    pub max_cu_depth: usize,
    pub quadtree_tu_log2_min_size: usize,
    pub use_amp: bool,
    pub max_num_merge_cand: usize,
    pub pcm: PcmConfig,
    pub transquant_bypass_enabled: bool,
    pub cu_transquant_bypass_force: bool,
    pub chroma_qp_adj: ChromaQpAdjConfig,

    // delta QP signalling
    pub use_dqp: bool,
    pub max_cu_dqp_depth: usize,
    pub max_delta_qp: i32,

    // slice termination
    pub slice_mode: SliceConstraint,
    pub slice_argument: usize,
    pub slice_segment_mode: SliceConstraint,
    pub slice_segment_argument: usize,

    // speed-ups
    pub use_early_cu: bool,
    pub use_early_skip_detection: bool,
    pub use_cbf_fast_mode: bool,
    pub use_fast_decision_for_merge: bool,
    pub fast_delta_qp: bool,
    pub disable_intra_pus_in_inter_slices: bool,
    pub me_search_method: MeSearchMethod,

    // QP adaptation
    pub use_rate_ctrl: bool,
    pub use_bim: bool,
    pub luma_level_to_dqp: LumaLevelToDeltaQpMapping,
    pub smooth_qp: SmoothQpReduction,
    pub use_adaptive_qp: bool,
    pub qp_adaptation_range: i32,
    pub max_aq_depth: usize,
    // QP of the blocks marked as foreground by the external mask image
    pub mask_fg_qp: Option<i32>,
    // collect adaptive rounding statistics
    pub use_adapt_qp_select: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            width: 0,
            height: 0,
            bit_depth_luma: 8,
            bit_depth_chroma: 8,
            chroma_sampling: ChromaSampling::Cs420,
            max_cu_size: MAX_CU_SIZE,
            max_cu_depth: MAX_CU_LOG2 - MIN_CU_LOG2,
            quadtree_tu_log2_min_size: MIN_TU_LOG2,
            use_amp: true,
            max_num_merge_cand: MRG_MAX_NUM_CANDS,
            pcm: PcmConfig::default(),
            transquant_bypass_enabled: false,
            cu_transquant_bypass_force: false,
            chroma_qp_adj: ChromaQpAdjConfig::default(),
            use_dqp: false,
            max_cu_dqp_depth: 0,
            max_delta_qp: 0,
            slice_mode: SliceConstraint::NO_SLICES,
            slice_argument: 0,
            slice_segment_mode: SliceConstraint::NO_SLICES,
            slice_segment_argument: 0,
            use_early_cu: false,
            use_early_skip_detection: false,
            use_cbf_fast_mode: false,
            use_fast_decision_for_merge: true,
            fast_delta_qp: false,
            disable_intra_pus_in_inter_slices: false,
            me_search_method: MeSearchMethod::MESEARCH_DIAMOND,
            use_rate_ctrl: false,
            use_bim: false,
            luma_level_to_dqp: LumaLevelToDeltaQpMapping::default(),
            smooth_qp: SmoothQpReduction::default(),
            use_adaptive_qp: false,
            qp_adaptation_range: 6,
            max_aq_depth: 1,
            mask_fg_qp: None,
            use_adapt_qp_select: false,
        }
    }
}

impl EncoderConfig {
    pub fn qp_bd_offset_luma(&self) -> i32 {
        QP_BD_OFFSET(self.bit_depth_luma)
    }

    /* smallest CU size */
    pub fn min_cu_size(&self) -> usize {
        self.max_cu_size >> self.max_cu_depth
    }

    /* CUs at or below this size are only tested undivided 2Nx2N in fast delta QP mode */
    pub fn fast_delta_qp_cu_max_size(&self) -> usize {
        CLIP3(self.min_cu_size(), self.max_cu_size, 32)
    }

    pub fn width_in_ctus(&self) -> usize {
        (self.width + self.max_cu_size - 1) / self.max_cu_size
    }

    pub fn height_in_ctus(&self) -> usize {
        (self.height + self.max_cu_size - 1) / self.max_cu_size
    }

    pub fn validate(&self) -> Result<()> {
        fn check(condition: bool, msg: &str) -> Result<()> {
            if condition {
                Err(EncError::InvalidConfig(msg.to_owned()))
            } else {
                Ok(())
            }
        }

        check(
            self.bit_depth_luma < 8 || self.bit_depth_luma > 16,
            "luma bit depth must be in the range 8..=16",
        )?;
        check(
            self.bit_depth_chroma < 8 || self.bit_depth_chroma > 16,
            "chroma bit depth must be in the range 8..=16",
        )?;
        check(
            !self.max_cu_size.is_power_of_two() || self.max_cu_size < 8 || self.max_cu_size > 64,
            "CTU size must be a power of two in the range 8..=64",
        )?;
        check(
            self.max_cu_size >> self.max_cu_depth < MIN_CU_SIZE,
            "CU depth exceeds the minimum CU size of 8",
        )?;
        check(
            self.max_cu_dqp_depth > self.max_cu_depth,
            "delta QP depth exceeds the CU depth",
        )?;
        check(
            self.quadtree_tu_log2_min_size < MIN_TU_LOG2
                || self.quadtree_tu_log2_min_size > MAX_TU_LOG2,
            "minimum TU size must be in the range 4..=32",
        )?;
        check(
            self.max_num_merge_cand < 1 || self.max_num_merge_cand > MRG_MAX_NUM_CANDS,
            "number of merge candidates must be in the range 1..=5",
        )?;
        if self.pcm.enable {
            check(
                self.pcm.log2_min_size < MIN_PCM_LOG2 || self.pcm.log2_min_size > MAX_PCM_LOG2,
                "PCM minimum log2 size must be in the range 3..=5",
            )?;
            check(
                self.pcm.log2_max_size < MIN_PCM_LOG2 || self.pcm.log2_max_size > MAX_PCM_LOG2,
                "PCM maximum log2 size must be in the range 3..=5",
            )?;
            check(
                self.pcm.log2_min_size > self.pcm.log2_max_size,
                "PCM minimum size exceeds the maximum size",
            )?;
        }
        check(
            self.max_delta_qp < 0 || self.max_delta_qp > MAX_DELTA_QP,
            "max delta QP must be in the range 0..=7",
        )?;
        check(
            self.cu_transquant_bypass_force && !self.transquant_bypass_enabled,
            "forcing transquant bypass requires transquant bypass to be enabled",
        )?;
        if self.use_adaptive_qp {
            check(
                self.qp_adaptation_range <= 0,
                "QP adaptation range must be positive",
            )?;
            check(self.max_aq_depth == 0, "AQ depth must be at least 1")?;
        }
        if let Some(qp) = self.mask_fg_qp {
            check(
                qp < -self.qp_bd_offset_luma() || qp > MAX_QP,
                "foreground QP is out of range",
            )?;
        }
        if self.luma_level_to_dqp.mode == LumaLevelToDqpMode::LUMALVL_TO_DQP_MAX_METHOD {
            check(
                self.luma_level_to_dqp.max_method_weight <= 0.0,
                "luma level max method weight must be positive",
            )?;
        }
        if self.smooth_qp.enable {
            check(
                self.smooth_qp.limit > 0,
                "smooth QP reduction limit must not be positive",
            )?;
        }
        check(
            self.slice_mode == SliceConstraint::FIXED_NUMBER_OF_BYTES && self.slice_argument < 1,
            "slice byte budget must be at least 1",
        )?;
        check(
            self.slice_segment_mode == SliceConstraint::FIXED_NUMBER_OF_BYTES
                && self.slice_segment_argument < 1,
            "slice segment byte budget must be at least 1",
        )?;

        if self.use_rate_ctrl && (self.use_bim || self.luma_level_to_dqp.is_enabled()) {
            warn!("rate control overrides the configured QP adaptation");
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_valid() {
        let cfg = EncoderConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.min_cu_size(), 8);
        assert_eq!(cfg.fast_delta_qp_cu_max_size(), 32);
    }

    #[test]
    fn fast_delta_qp_size_follows_small_ctus() {
        let cfg = EncoderConfig {
            max_cu_size: 16,
            max_cu_depth: 1,
            ..Default::default()
        };
        assert_eq!(cfg.fast_delta_qp_cu_max_size(), 16);
    }

    #[test]
    fn rejects_merge_candidates() {
        let cfg = EncoderConfig {
            max_num_merge_cand: 6,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EncError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_pcm_range() {
        let mut cfg = EncoderConfig::default();
        cfg.pcm = PcmConfig {
            enable: true,
            log2_min_size: 5,
            log2_max_size: 4,
        };
        assert!(cfg.validate().is_err());
        cfg.pcm.log2_max_size = 6;
        assert!(cfg.validate().is_err());
        cfg.pcm.log2_min_size = 3;
        cfg.pcm.log2_max_size = 5;
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_bypass_force_without_bypass() {
        let cfg = EncoderConfig {
            cu_transquant_bypass_force: true,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inconsistent_depth() {
        let cfg = EncoderConfig {
            max_cu_size: 32,
            max_cu_depth: 3,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_byte_budget() {
        let cfg = EncoderConfig {
            slice_mode: SliceConstraint::FIXED_NUMBER_OF_BYTES,
            slice_argument: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn pcm_size_window() {
        let pcm = PcmConfig {
            enable: true,
            log2_min_size: 3,
            log2_max_size: 5,
        };
        assert!(pcm.allows(8));
        assert!(pcm.allows(16));
        assert!(pcm.allows(32));
        assert!(!pcm.allows(64));
        assert!(!pcm.allows(128));
    }
}
