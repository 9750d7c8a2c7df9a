use metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "ephys_event_detection_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for every counter in [names].
pub fn describe_detection_metrics() {
    describe_counter!(names::SWEEPS_PROCESSED, "Sweeps run through a detector");
    describe_counter!(names::CANDIDATES, "Candidate events found by detector kind");
    describe_counter!(
        names::REJECTED_CANDIDATES,
        "Candidate events rejected, by detector kind and reason"
    );
    describe_counter!(names::EVENTS_DETECTED, "Events accepted, by detector kind");
    describe_counter!(
        names::WINDOWS_DROPPED,
        "Events whose extraction window exceeded the series"
    );
    describe_counter!(names::FAILURES, "Failures by kind");
}

pub mod names {
    pub const SWEEPS_PROCESSED: &str = "ephys_event_detection_sweeps_processed";
    pub const CANDIDATES: &str = "ephys_event_detection_candidates";
    pub const REJECTED_CANDIDATES: &str = "ephys_event_detection_rejected_candidates";
    pub const EVENTS_DETECTED: &str = "ephys_event_detection_events_detected";
    pub const WINDOWS_DROPPED: &str = "ephys_event_detection_windows_dropped";
    pub const FAILURES: &str = "ephys_event_detection_failures";
}

pub mod detector_kind {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum DetectorKind {
        ActionPotential,
        SlidingTemplate,
    }

    // Label building function
    pub fn get_label(detector_kind: DetectorKind) -> (&'static str, &'static str) {
        (
            "detector_kind",
            match detector_kind {
                DetectorKind::ActionPotential => "action_potential",
                DetectorKind::SlidingTemplate => "sliding_template",
            },
        )
    }
}

pub mod rejections {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum RejectionKind {
        SubThreshold,
        ShortFastRise,
        InterEventInterval,
    }

    // Label building function
    pub fn get_label(rejection_kind: RejectionKind) -> (&'static str, &'static str) {
        (
            "rejection_kind",
            match rejection_kind {
                RejectionKind::SubThreshold => "sub_threshold",
                RejectionKind::ShortFastRise => "short_fast_rise",
                RejectionKind::InterEventInterval => "inter_event_interval",
            },
        )
    }
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        InvalidSweep,
        DetectionFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::InvalidSweep => "invalid_sweep",
                FailureKind::DetectionFailed => "detection_failed",
            },
        )
    }
}
