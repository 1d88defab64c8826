use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive as _;
use thiserror::Error;

pub mod config;
pub mod frame;

pub use config::encoder::*;
pub use frame::*;

pub use crate::enc::amp::{derive_test_mode_amp, AmpTestModes};
pub use crate::enc::aq::{AqLayer, AqPicture};
pub use crate::enc::arl::ArlStats;
pub use crate::enc::cu::{
    CodingUnit, CuData, MergeCand, MergeCandList, Mv, MvField, PuMotion, MAX_NUM_PU,
};
pub use crate::enc::pinter::code_inter_cu;
pub use crate::enc::qp::{
    AdaptQpMap, MaskImage, QpBlock, QpDerivation, QpInputs, QpPolicy, QpRange, RateControl,
};
pub use crate::enc::sbac::{CiIdx, Checkpoints, EntropyCoder, SbacEstimator};
pub use crate::enc::yuv::CuYuv;
pub use crate::enc::{
    CtuDecision, CtuEnv, CuBufs, CuEncoder, LambdaRdCost, PredSearch, RdCost, SliceInfo,
};
pub use crate::tracer::Tracer;

/*****************************************************************************
 * return values and error code
 *****************************************************************************/
pub type Result<T> = std::result::Result<T, EncError>;

#[derive(Debug, Error, PartialEq)]
pub enum EncError {
    /* a configuration parameter is out of its admissible range */
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /* picture or CTU geometry does not match the encoder instance */
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/*****************************************************************************
 * slice and coding enums
 *****************************************************************************/
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum SliceType {
    B_SLICE = 0,
    P_SLICE = 1,
    I_SLICE = 2,
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::SliceType::*;
        match self {
            B_SLICE => write!(f, "B"),
            P_SLICE => write!(f, "P"),
            I_SLICE => write!(f, "I"),
        }
    }
}

impl Default for SliceType {
    fn default() -> Self {
        SliceType::I_SLICE
    }
}

/* slice / slice-segment termination constraint */
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum SliceConstraint {
    NO_SLICES = 0,
    FIXED_NUMBER_OF_CTU = 1,
    FIXED_NUMBER_OF_BYTES = 2,
    FIXED_NUMBER_OF_TILES = 3,
}

impl Default for SliceConstraint {
    fn default() -> Self {
        SliceConstraint::NO_SLICES
    }
}

/* prediction unit shape of a coding unit */
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum PartSize {
    SIZE_2Nx2N = 0,
    SIZE_2NxN = 1,
    SIZE_Nx2N = 2,
    SIZE_NxN = 3,
    SIZE_2NxnU = 4,
    SIZE_2NxnD = 5,
    SIZE_nLx2N = 6,
    SIZE_nRx2N = 7,
}

impl PartSize {
    pub fn is_amp(self) -> bool {
        self >= PartSize::SIZE_2NxnU
    }

    /* asymmetric shapes splitting the CU with a horizontal edge */
    pub fn is_amp_hor(self) -> bool {
        self == PartSize::SIZE_2NxnU || self == PartSize::SIZE_2NxnD
    }

    pub fn is_amp_ver(self) -> bool {
        self == PartSize::SIZE_nLx2N || self == PartSize::SIZE_nRx2N
    }

    pub fn num_parts(self) -> usize {
        match self {
            PartSize::SIZE_2Nx2N => 1,
            PartSize::SIZE_NxN => 4,
            _ => 2,
        }
    }
}

impl Default for PartSize {
    fn default() -> Self {
        PartSize::SIZE_2Nx2N
    }
}

impl fmt::Display for PartSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::PartSize::*;
        let s = match self {
            SIZE_2Nx2N => "2Nx2N",
            SIZE_2NxN => "2NxN",
            SIZE_Nx2N => "Nx2N",
            SIZE_NxN => "NxN",
            SIZE_2NxnU => "2NxnU",
            SIZE_2NxnD => "2NxnD",
            SIZE_nLx2N => "nLx2N",
            SIZE_nRx2N => "nRx2N",
        };
        write!(f, "{}", s)
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum PredMode {
    MODE_INTER = 0,
    MODE_INTRA = 1,
}

impl fmt::Display for PredMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredMode::MODE_INTER => write!(f, "Inter"),
            PredMode::MODE_INTRA => write!(f, "Intra"),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum MeSearchMethod {
    MESEARCH_FULL = 0,
    MESEARCH_DIAMOND = 1,
    MESEARCH_SELECTIVE = 2,
    MESEARCH_DIAMOND_ENHANCED = 3,
}

impl Default for MeSearchMethod {
    fn default() -> Self {
        MeSearchMethod::MESEARCH_DIAMOND
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Clone, Copy)]
pub enum LumaLevelToDqpMode {
    LUMALVL_TO_DQP_DISABLED = 0,
    LUMALVL_TO_DQP_AVG_METHOD = 1,
    LUMALVL_TO_DQP_MAX_METHOD = 2,
}

impl Default for LumaLevelToDqpMode {
    fn default() -> Self {
        LumaLevelToDqpMode::LUMALVL_TO_DQP_DISABLED
    }
}

#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive)]
#[repr(C)]
pub enum ChromaSampling {
    Cs400,
    Cs420,
    Cs422,
    Cs444,
}

impl Default for ChromaSampling {
    fn default() -> Self {
        ChromaSampling::Cs420
    }
}

impl From<u8> for ChromaSampling {
    fn from(val: u8) -> Self {
        ChromaSampling::from_u8(val).unwrap_or(ChromaSampling::Cs444)
    }
}

impl ChromaSampling {
    // Provides the decimation shift in the horizontal and vertical axes.
    pub fn decimation(self) -> (usize, usize) {
        use self::ChromaSampling::*;
        match self {
            Cs420 => (1, 1),
            Cs422 => (1, 0),
            Cs444 => (0, 0),
            Cs400 => (1, 1),
        }
    }

    pub fn num_components(self) -> usize {
        if self == ChromaSampling::Cs400 {
            1
        } else {
            3
        }
    }
}

/* number of bits needed to code a block of raw samples (PCM / no prediction) */
pub fn raw_bits(
    width: usize,
    height: usize,
    chroma_sampling: ChromaSampling,
    bit_depth_luma: usize,
    bit_depth_chroma: usize,
) -> u64 {
    let luma = (width * height * bit_depth_luma) as u64;
    if chroma_sampling == ChromaSampling::Cs400 {
        return luma;
    }
    let (xdec, ydec) = chroma_sampling.decimation();
    let chroma = ((width >> xdec) * (height >> ydec) * bit_depth_chroma) as u64;
    luma + 2 * chroma
}

#[cfg(test)]
mod test {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn part_size_from_primitive() {
        assert_eq!(PartSize::from_u8(5), Some(PartSize::SIZE_2NxnD));
        assert_eq!(PartSize::from_u8(8), None);
        assert!(PartSize::SIZE_nLx2N.is_amp_ver());
        assert!(!PartSize::SIZE_2NxN.is_amp());
    }

    #[test]
    fn chroma_sampling_from_idc() {
        assert_eq!(ChromaSampling::from(0u8), ChromaSampling::Cs400);
        assert_eq!(ChromaSampling::from(2u8), ChromaSampling::Cs422);
        assert_eq!(ChromaSampling::from(7u8), ChromaSampling::Cs444);
    }

    #[test]
    fn raw_bits_420() {
        // 16x16 luma + two 8x8 chroma at 8 bits
        assert_eq!(raw_bits(16, 16, ChromaSampling::Cs420, 8, 8), 16 * 16 * 8 + 2 * 64 * 8);
        assert_eq!(raw_bits(8, 8, ChromaSampling::Cs400, 10, 10), 640);
    }
}
