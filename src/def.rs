/*****************************************************************************
 * types
 *****************************************************************************/
#[allow(non_camel_case_types)]
pub type pel = u16;

/* signed sample difference (residual) */
#[allow(non_camel_case_types)]
pub type resi = i16;

/* quantized transform coefficient */
pub type TCoeff = i32;

pub const Y_C: usize = 0; /* Y luma */
pub const U_C: usize = 1; /* Cb Chroma */
pub const V_C: usize = 2; /* Cr Chroma */
pub const N_C: usize = 3; /* number of color component */

pub const REFP_0: usize = 0;
pub const REFP_1: usize = 1;
pub const REFP_NUM: usize = 2;

/*****************************************************************************
 * reference index
 *****************************************************************************/
pub const REFI_INVALID: i8 = -1;

#[inline]
pub fn REFI_IS_VALID(refi: i8) -> bool {
    refi >= 0
}

/* inter prediction direction */
pub const PRED_L0: u8 = 1;
pub const PRED_L1: u8 = 2;
pub const PRED_BI: u8 = 3;

/*****************************************************************************
 * CU geometry
 *****************************************************************************/
pub const MAX_CU_LOG2: usize = 6; // baseline: 64x64
pub const MIN_CU_LOG2: usize = 3;
pub const MAX_CU_SIZE: usize = 1 << MAX_CU_LOG2;
pub const MIN_CU_SIZE: usize = 1 << MIN_CU_LOG2;
pub const MAX_CU_DIM: usize = 1 << (MAX_CU_LOG2 + MAX_CU_LOG2);
/* number of CU depth levels of a 64x64 CTU down to 8x8 */
pub const MAX_CU_DEPTH: usize = MAX_CU_LOG2 - MIN_CU_LOG2 + 1;

/* smallest partition unit used to lay out per-CU arrays in z-order */
pub const MIN_PU_LOG2: usize = 2;
pub const MIN_PU_DIM: usize = 1 << (MIN_PU_LOG2 + MIN_PU_LOG2);

pub const MIN_TU_LOG2: usize = 2;
pub const MAX_TU_LOG2: usize = 5;

/*****************************************************************************
 * QP
 *****************************************************************************/
pub const MAX_QP: i32 = 51;
pub const MIN_QP: i32 = 0;
pub const MAX_DELTA_QP: i32 = 7;

/* 8-bit luma maps to QP'=QP; each extra bit adds 6 to the lower bound */
#[inline]
pub fn QP_BD_OFFSET(bit_depth: usize) -> i32 {
    6 * (bit_depth as i32 - 8)
}

pub const LUMA_LEVEL_TO_DQP_LUT_MAXSIZE: usize = 1024;

/* smooth QP reduction operates on 64x64 luma blocks only */
pub const SMOOTH_QP_BLOCK_SIZE: usize = 64;

/*****************************************************************************
 * mode decision
 *****************************************************************************/
pub const MAX_COST: f64 = 1.7e+308;
pub const MRG_MAX_NUM_CANDS: usize = 5;

/* PCM sample sizes are signalled in log2 units */
pub const MIN_PCM_LOG2: usize = 3;
pub const MAX_PCM_LOG2: usize = 5;

/*****************************************************************************
 * adaptive rounding (ARL) statistics
 *****************************************************************************/
pub const LEVEL_RANGE: usize = 30;
pub const ARL_C_PRECISION: usize = 7;

/* mask sample value above which a pixel is considered foreground */
pub const MASK_FG_THRESHOLD: u8 = 128;

/*****************************************************************************
 * SBAC structure
 *****************************************************************************/
#[allow(non_camel_case_types)]
pub type SBAC_CTX_MODEL = u16;

/* 1/2 of initialization with mps = 0 */
pub const PROB_INIT: SBAC_CTX_MODEL = 512;

/* context models of the syntax elements estimated during mode decision */
pub const NUM_CTX_SPLIT_CU_FLAG: usize = 3;
pub const NUM_CTX_SKIP_FLAG: usize = 3;
pub const NUM_CTX_PRED_MODE: usize = 1;
pub const NUM_CTX_PART_SIZE: usize = 4;
pub const NUM_CTX_MERGE_FLAG: usize = 1;
pub const NUM_CTX_MERGE_IDX: usize = 1;
pub const NUM_CTX_INTER_DIR: usize = 5;
pub const NUM_CTX_REF_IDX: usize = 2;
pub const NUM_CTX_MVD: usize = 2;
pub const NUM_CTX_MVP_IDX: usize = 1;
pub const NUM_CTX_INTRA_PRED_MODE: usize = 1;
pub const NUM_CTX_CHROMA_PRED_MODE: usize = 2;
pub const NUM_CTX_TRANSQUANT_BYPASS: usize = 1;
pub const NUM_CTX_QT_ROOT_CBF: usize = 1;
pub const NUM_CTX_QT_CBF: usize = 5;
pub const NUM_CTX_DELTA_QP: usize = 3;
pub const NUM_CTX_SIG_FLAG: usize = 16;
pub const NUM_CTX_GT1_FLAG: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SbacCtx {
    pub split_cu_flag: [SBAC_CTX_MODEL; NUM_CTX_SPLIT_CU_FLAG],
    pub skip_flag: [SBAC_CTX_MODEL; NUM_CTX_SKIP_FLAG],
    pub pred_mode: [SBAC_CTX_MODEL; NUM_CTX_PRED_MODE],
    pub part_size: [SBAC_CTX_MODEL; NUM_CTX_PART_SIZE],
    pub merge_flag: [SBAC_CTX_MODEL; NUM_CTX_MERGE_FLAG],
    pub merge_idx: [SBAC_CTX_MODEL; NUM_CTX_MERGE_IDX],
    pub inter_dir: [SBAC_CTX_MODEL; NUM_CTX_INTER_DIR],
    pub ref_idx: [SBAC_CTX_MODEL; NUM_CTX_REF_IDX],
    pub mvd: [SBAC_CTX_MODEL; NUM_CTX_MVD],
    pub mvp_idx: [SBAC_CTX_MODEL; NUM_CTX_MVP_IDX],
    pub intra_dir: [SBAC_CTX_MODEL; NUM_CTX_INTRA_PRED_MODE],
    pub chroma_dir: [SBAC_CTX_MODEL; NUM_CTX_CHROMA_PRED_MODE],
    pub transquant_bypass: [SBAC_CTX_MODEL; NUM_CTX_TRANSQUANT_BYPASS],
    pub qt_root_cbf: [SBAC_CTX_MODEL; NUM_CTX_QT_ROOT_CBF],
    pub qt_cbf: [SBAC_CTX_MODEL; NUM_CTX_QT_CBF],
    pub delta_qp: [SBAC_CTX_MODEL; NUM_CTX_DELTA_QP],
    pub sig_flag: [SBAC_CTX_MODEL; NUM_CTX_SIG_FLAG],
    pub gt1_flag: [SBAC_CTX_MODEL; NUM_CTX_GT1_FLAG],
}

impl Default for SbacCtx {
    fn default() -> Self {
        SbacCtx {
            split_cu_flag: [PROB_INIT; NUM_CTX_SPLIT_CU_FLAG],
            skip_flag: [PROB_INIT; NUM_CTX_SKIP_FLAG],
            pred_mode: [PROB_INIT; NUM_CTX_PRED_MODE],
            part_size: [PROB_INIT; NUM_CTX_PART_SIZE],
            merge_flag: [PROB_INIT; NUM_CTX_MERGE_FLAG],
            merge_idx: [PROB_INIT; NUM_CTX_MERGE_IDX],
            inter_dir: [PROB_INIT; NUM_CTX_INTER_DIR],
            ref_idx: [PROB_INIT; NUM_CTX_REF_IDX],
            mvd: [PROB_INIT; NUM_CTX_MVD],
            mvp_idx: [PROB_INIT; NUM_CTX_MVP_IDX],
            intra_dir: [PROB_INIT; NUM_CTX_INTRA_PRED_MODE],
            chroma_dir: [PROB_INIT; NUM_CTX_CHROMA_PRED_MODE],
            transquant_bypass: [PROB_INIT; NUM_CTX_TRANSQUANT_BYPASS],
            qt_root_cbf: [PROB_INIT; NUM_CTX_QT_ROOT_CBF],
            qt_cbf: [PROB_INIT; NUM_CTX_QT_CBF],
            delta_qp: [PROB_INIT; NUM_CTX_DELTA_QP],
            sig_flag: [PROB_INIT; NUM_CTX_SIG_FLAG],
            gt1_flag: [PROB_INIT; NUM_CTX_GT1_FLAG],
        }
    }
}
