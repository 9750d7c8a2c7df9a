use ephys_common::metrics::{
    detector_kind::{self, DetectorKind},
    failures::{self, FailureKind},
    names::{
        CANDIDATES, EVENTS_DETECTED, FAILURES, REJECTED_CANDIDATES, SWEEPS_PROCESSED,
        WINDOWS_DROPPED,
    },
    rejections::{self, RejectionKind},
};
use ::metrics::counter;

pub(crate) fn record_sweep(kind: DetectorKind) {
    counter!(SWEEPS_PROCESSED, &[detector_kind::get_label(kind)]).increment(1);
}

pub(crate) fn record_candidates(kind: DetectorKind, count: usize) {
    counter!(CANDIDATES, &[detector_kind::get_label(kind)]).increment(count as u64);
}

pub(crate) fn record_rejection(kind: DetectorKind, reason: RejectionKind) {
    counter!(
        REJECTED_CANDIDATES,
        &[detector_kind::get_label(kind), rejections::get_label(reason)]
    )
    .increment(1);
}

pub(crate) fn record_events(kind: DetectorKind, count: usize) {
    counter!(EVENTS_DETECTED, &[detector_kind::get_label(kind)]).increment(count as u64);
}

pub(crate) fn record_dropped_window(kind: DetectorKind) {
    counter!(WINDOWS_DROPPED, &[detector_kind::get_label(kind)]).increment(1);
}

pub(crate) fn record_failure(kind: FailureKind) {
    counter!(FAILURES, &[failures::get_label(kind)]).increment(1);
}
