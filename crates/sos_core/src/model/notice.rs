//! User-facing dispatch notice.
//!
//! Turns an aggregate `DispatchResult` into the message the interface shows
//! after dispatch: which channels were reached, or a fallback instruction to
//! call the emergency number directly when nothing got through.

use crate::model::outcome::{ChannelDescriptor, ChannelKind, DispatchResult};
use serde::Serialize;

/// Rendered dispatch outcome for the interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchNotice {
    /// At least one channel succeeded.
    HelpNotified {
        notified: Vec<ChannelDescriptor>,
        failed: Vec<ChannelDescriptor>,
    },
    /// Every channel failed; the user must call directly.
    AllFailed { fallback_number: String },
}

impl DispatchNotice {
    pub fn from_result(result: &DispatchResult, fallback_number: &str) -> Self {
        if result.succeeded() {
            Self::HelpNotified {
                notified: result.succeeded_channels().into_iter().cloned().collect(),
                failed: result.failed_channels().into_iter().cloned().collect(),
            }
        } else {
            Self::AllFailed {
                fallback_number: fallback_number.to_string(),
            }
        }
    }

    pub fn help_notified(&self) -> bool {
        matches!(self, Self::HelpNotified { .. })
    }

    /// Plain-language message. Never contains raw contact identifiers except
    /// the public emergency number itself.
    pub fn message(&self) -> String {
        match self {
            Self::HelpNotified { notified, failed } => {
                let mut message = format!(
                    "Help has been notified via {}.",
                    join_labels(notified, failed)
                );
                if !failed.is_empty() {
                    message.push_str(&format!(
                        " Could not reach {}.",
                        join_labels(failed, notified)
                    ));
                }
                message
            }
            Self::AllFailed { fallback_number } => format!(
                "All notification attempts failed. Call {fallback_number} directly."
            ),
        }
    }
}

/// Labels each kind present in `channels`. A kind that also appears in
/// `others` is counted, e.g. "emergency contact (1 of 2)".
fn join_labels(channels: &[ChannelDescriptor], others: &[ChannelDescriptor]) -> String {
    let count = |list: &[ChannelDescriptor], kind: ChannelKind| {
        list.iter().filter(|channel| channel.kind == kind).count()
    };
    let mut labels: Vec<String> = Vec::new();
    for kind in [
        ChannelKind::EmergencyServices,
        ChannelKind::Contact,
        ChannelKind::Clinician,
    ] {
        let here = count(channels, kind);
        if here == 0 {
            continue;
        }
        let elsewhere = count(others, kind);
        if elsewhere == 0 {
            labels.push(kind.label().to_string());
        } else {
            labels.push(format!("{} ({here} of {})", kind.label(), here + elsewhere));
        }
    }
    labels.join(", ")
}
