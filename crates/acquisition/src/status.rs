//! Status reports emitted by the acquisition loop

use contracts::{StatusKind, StatusReport};

/// Short link name used in logs and metric labels
pub fn link_label(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::EcuLink => "ecu",
        StatusKind::WidebandLink => "wideband",
        StatusKind::DemoMode => "demo",
        StatusKind::Logger => "logger",
    }
}

/// Heartbeat for a monitored hardware link
pub fn link_report(kind: StatusKind, ok: bool) -> StatusReport {
    let description = match (kind, ok) {
        (StatusKind::EcuLink, true) => "Cosworth ECU connected okay.",
        (StatusKind::EcuLink, false) => "Cosworth ECU connection error.",
        (StatusKind::WidebandLink, true) => "AEM Wideband AFR connected okay.",
        (StatusKind::WidebandLink, false) => "AEM Wideband AFR connection error.",
        (_, true) => "Connected okay.",
        (_, false) => "Connection error.",
    };
    StatusReport::new(kind, ok, description)
}

/// Confirmation after demo mode was toggled
pub fn demo_report(enabled: bool) -> StatusReport {
    let description = if enabled {
        "Demo mode is enabled."
    } else {
        "Demo mode is disabled."
    };
    StatusReport::new(StatusKind::DemoMode, enabled, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_descriptions() {
        assert_eq!(
            link_report(StatusKind::EcuLink, false).description,
            "Cosworth ECU connection error."
        );
        let ok = link_report(StatusKind::WidebandLink, true);
        assert!(ok.ok);
        assert_eq!(ok.description, "AEM Wideband AFR connected okay.");
    }

    #[test]
    fn test_demo_report() {
        let report = demo_report(false);
        assert_eq!(report.kind, StatusKind::DemoMode);
        assert!(!report.ok);
        assert_eq!(report.description, "Demo mode is disabled.");
    }
}
