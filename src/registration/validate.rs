//! Step validator: may the user leave the current step?
//!
//! Pure and synchronous. Each step reports at most one rejection; the
//! first failing rule wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::draft::{RegistrationDraft, RoleSection};
use super::role::RoleSet;

/// Why a step cannot be left yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("Please select at least one role")]
    NoRoleSelected,

    #[error("Please fill in all required fields")]
    MissingIdentityFields,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Business details are required for vendor role")]
    MissingMerchantDetails,

    #[error("Vehicle details are required for delivery role")]
    MissingDeliveryDetails,

    #[error("Opening and closing hours are required")]
    MissingBusinessHours,
}

/// Check the answers needed to leave `step_index`.
pub fn validate(
    step_index: usize,
    draft: &RegistrationDraft,
    roles: &RoleSet,
) -> Result<(), Rejection> {
    match step_index {
        0 => {
            if roles.is_empty() {
                return Err(Rejection::NoRoleSelected);
            }
        }
        1 => {
            let identity = &draft.identity;
            let required = [
                &identity.first_name,
                &identity.last_name,
                &identity.email,
                &identity.phone,
                &identity.password,
            ];
            if required.iter().any(|v| is_blank(v)) {
                return Err(Rejection::MissingIdentityFields);
            }
            if identity.password != identity.confirm_password {
                return Err(Rejection::PasswordMismatch);
            }
        }
        2 => {
            for section in draft.sections(roles).roles {
                match section {
                    RoleSection::Merchant(m) => {
                        if [&m.business_name, &m.business_category, &m.business_address]
                            .iter()
                            .any(|v| is_blank(v))
                        {
                            return Err(Rejection::MissingMerchantDetails);
                        }
                    }
                    RoleSection::DeliveryAgent(d) => {
                        if is_blank(&d.vehicle_type) || is_blank(&d.license_number) {
                            return Err(Rejection::MissingDeliveryDetails);
                        }
                    }
                }
            }
        }
        3 => {
            let business = &draft.business;
            if is_blank(&business.opening_hours) || is_blank(&business.closing_hours) {
                return Err(Rejection::MissingBusinessHours);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Check every step up to and including `last_step`.
///
/// Reports the first step that cannot be left, with its rejection. Used
/// before submitting, since a role toggled late adds requirements to steps
/// already passed.
pub fn validate_through(
    last_step: usize,
    draft: &RegistrationDraft,
    roles: &RoleSet,
) -> Result<(), (usize, Rejection)> {
    (0..=last_step).try_for_each(|step| validate(step, draft, roles).map_err(|r| (step, r)))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ── Advisory checks ─────────────────────────────────────────────────

/// Minimum password length the service is believed to want.
pub const ADVISED_PASSWORD_LENGTH: usize = 8;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static HOURS_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}(:\d{2})?$").expect("valid hours regex"));

/// A non-blocking hint about an answer that looks off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    ShortPassword,
    EmailLooksInvalid,
    HoursLookInvalid,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortPassword => write!(
                f,
                "Password should be at least {ADVISED_PASSWORD_LENGTH} characters"
            ),
            Self::EmailLooksInvalid => write!(f, "Email address looks invalid"),
            Self::HoursLookInvalid => write!(f, "Hours should look like HH:MM"),
        }
    }
}

/// Hints for answers that pass validation but look suspicious. Empty
/// fields are left to [`validate`].
pub fn advisories(draft: &RegistrationDraft, roles: &RoleSet) -> Vec<Advisory> {
    let mut notes = Vec::new();
    let identity = &draft.identity;

    if !identity.password.is_empty() && identity.password.chars().count() < ADVISED_PASSWORD_LENGTH
    {
        notes.push(Advisory::ShortPassword);
    }
    if !is_blank(&identity.email) && !EMAIL_SHAPE.is_match(identity.email.trim()) {
        notes.push(Advisory::EmailLooksInvalid);
    }
    if let Some(business) = draft.sections(roles).business {
        let bad_hours = [&business.opening_hours, &business.closing_hours]
            .iter()
            .any(|h| !is_blank(h) && !HOURS_SHAPE.is_match(h.trim()));
        if bad_hours {
            notes.push(Advisory::HoursLookInvalid);
        }
    }
    notes
}
