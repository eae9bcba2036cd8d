// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for capture problems.
//
// Every technical error and every quality-gate issue is mapped to plain
// language with a concrete next step for the person holding the camera.

use crate::error::TerminError;
use crate::types::QualityIssue;

/// Severity of a problem from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying the same thing again.
    Transient,
    /// The user has to take a new photo or change something.
    ActionRequired,
    /// Retrying will not help; the setup is broken.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether repeating the same request can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `TerminError` into a `HumanError`.
pub fn humanize_error(err: &TerminError) -> HumanError {
    match err {
        TerminError::ImageDecode(detail) => HumanError {
            message: "We couldn't read this picture.".into(),
            suggestion: format!("Take a new photo or pick a PNG or JPEG file. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        TerminError::Enhancement(detail) => HumanError {
            message: "The photo could not be cleaned up.".into(),
            suggestion: format!("We will try to read the original photo instead. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        TerminError::Recognition(detail) => HumanError {
            message: "The text on the schedule could not be read.".into(),
            suggestion: format!("Please try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        TerminError::RecognitionTimeout(after) => HumanError {
            message: "Reading the schedule took too long.".into(),
            suggestion: format!(
                "Try again with a smaller or closer photo. (Gave up after {} seconds.)",
                after.as_secs()
            ),
            retriable: true,
            severity: Severity::Transient,
        },

        TerminError::Config(detail) => HumanError {
            message: "The settings file has a mistake.".into(),
            suggestion: format!("Fix the settings file and start again. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        TerminError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file could not be found.".into(),
                suggestion: "Check the file name and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "A file could not be opened.".into(),
                suggestion: "Check that you are allowed to read the file.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "Something went wrong while reading a file.".into(),
                suggestion: format!("Please try again. ({io_err})"),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        TerminError::Serialization(detail) => HumanError {
            message: "The result could not be written out.".into(),
            suggestion: format!("Please report this problem. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Retake instructions for a quality-gate issue.
pub fn describe_issue(issue: QualityIssue) -> HumanError {
    let suggestion = match issue {
        QualityIssue::Unsharp => "Hold the camera still and tap the schedule to focus.",
        QualityIssue::TooDark => "Move to a brighter spot or switch on the flash.",
        QualityIssue::TooBright => "Avoid direct light or reflections on the paper.",
        QualityIssue::LowContrast => "Lay the schedule flat on a plain surface in even light.",
        QualityIssue::MotionBlur => "Rest your elbows on the table while taking the photo.",
    };
    HumanError {
        message: issue.message().into(),
        suggestion: suggestion.into(),
        retriable: true,
        severity: Severity::ActionRequired,
    }
}
