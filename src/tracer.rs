use std::fmt::Display;
#[cfg(feature = "trace")]
use std::fs::File;
use std::io::Write;

use crate::api::{PartSize, PredMode};

/* trace sink and line counter */
pub type Tracer = (Box<dyn Write>, isize);

////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(feature = "trace")]
pub fn OPEN_TRACE(path: &str) -> Option<Tracer> {
    if let Ok(fp) = File::create(path) {
        Some((Box::new(fp), 0))
    } else {
        None
    }
}

pub(crate) fn TRACE_COUNTER(tracer: &mut Option<Tracer>) {
    if let Some((writer, counter)) = tracer {
        let _ = writer.write_fmt(format_args!("{} \t", *counter));
        *counter += 1;
    }
}

pub(crate) fn TRACE_COUNTER_RESET(tracer: &mut Option<Tracer>) {
    if let Some((_, counter)) = tracer {
        *counter = 0;
    }
}

pub(crate) fn TRACE<T: Display>(tracer: &mut Option<Tracer>, name: T) {
    if let Some((writer, _)) = tracer {
        let _ = writer.write_fmt(format_args!("{}", name));
    }
}

pub(crate) fn TRACE_CTU(tracer: &mut Option<Tracer>, poc: i32, ctu_addr: usize) {
    TRACE_COUNTER_RESET(tracer);
    TRACE(tracer, "ctu poc ");
    TRACE(tracer, poc);
    TRACE(tracer, " addr ");
    TRACE(tracer, ctu_addr);
    TRACE(tracer, " \n");
}

/* one line per tested candidate: geometry, shape, mode, qp and cost */
pub(crate) fn TRACE_CU(
    tracer: &mut Option<Tracer>,
    x: usize,
    y: usize,
    size: usize,
    part_size: PartSize,
    pred_mode: PredMode,
    qp: i32,
    cost: f64,
) {
    if tracer.is_none() {
        return;
    }
    TRACE_COUNTER(tracer);
    TRACE(tracer, "cu (");
    TRACE(tracer, x);
    TRACE(tracer, ", ");
    TRACE(tracer, y);
    TRACE(tracer, ") size ");
    TRACE(tracer, size);
    TRACE(tracer, " ");
    TRACE(tracer, pred_mode);
    TRACE(tracer, " ");
    TRACE(tracer, part_size);
    TRACE(tracer, " qp ");
    TRACE(tracer, qp);
    TRACE(tracer, " cost ");
    TRACE(tracer, format!("{:.2}", cost));
    TRACE(tracer, " \n");
}

pub(crate) fn TRACE_SPLIT(tracer: &mut Option<Tracer>, x: usize, y: usize, size: usize, cost: f64) {
    if tracer.is_none() {
        return;
    }
    TRACE_COUNTER(tracer);
    TRACE(tracer, "split (");
    TRACE(tracer, x);
    TRACE(tracer, ", ");
    TRACE(tracer, y);
    TRACE(tracer, ") size ");
    TRACE(tracer, size);
    TRACE(tracer, " cost ");
    TRACE(tracer, format!("{:.2}", cost));
    TRACE(tracer, " \n");
}
