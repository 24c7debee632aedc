//! Payload composer: builds the registration request body.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::draft::{BusinessVerificationFields, RegistrationDraft, RoleSection};
use super::role::RoleSet;

/// Flat key/value request body sent to the account service.
pub type RequestBody = Map<String, Value>;

static BARE_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("valid hours regex"));

/// Build the request body for `roles` from `draft`.
///
/// Only sections belonging to selected roles are emitted; stale answers
/// for deselected roles never leave the draft.
pub fn compose(draft: &RegistrationDraft, roles: &RoleSet) -> RequestBody {
    let sections = draft.sections(roles);
    let mut body = RequestBody::new();

    let identity = sections.identity;
    put(&mut body, "first_name", identity.first_name.trim());
    put(&mut body, "last_name", identity.last_name.trim());
    put(&mut body, "email", identity.email.trim());
    put(&mut body, "phone", identity.phone.trim());
    put(&mut body, "password", &identity.password);
    put(&mut body, "confirm_password", &identity.confirm_password);
    body.insert(
        "roles".to_string(),
        Value::Array(roles.iter().map(|r| Value::from(r.as_str())).collect()),
    );

    if let Some(business) = sections.business {
        put_business(&mut body, business);
    }

    for section in sections.roles {
        match section {
            RoleSection::Merchant(m) => {
                put(&mut body, "business_name", m.business_name.trim());
                put(&mut body, "business_category", m.business_category.trim());
                put(&mut body, "business_address", m.business_address.trim());
                put(&mut body, "business_description", m.business_description.trim());
                put(&mut body, "logo", &m.logo);
            }
            RoleSection::DeliveryAgent(d) => {
                put(&mut body, "vehicle_type", d.vehicle_type.trim());
                put(&mut body, "license_number", d.license_number.trim());
                put(&mut body, "vehicle_registration", d.vehicle_registration.trim());
                put(&mut body, "service_area", d.service_area.trim());
            }
        }
    }

    body
}

fn put_business(body: &mut RequestBody, business: &BusinessVerificationFields) {
    put(body, "opening_hours", &with_seconds(&business.opening_hours));
    put(body, "closing_hours", &with_seconds(&business.closing_hours));
    put(body, "tax_id", business.tax_id.trim());
    put(body, "website", business.website.trim());
    put(body, "cover_photo", &business.cover_photo);
}

fn put(body: &mut RequestBody, key: &str, value: &str) {
    body.insert(key.to_string(), Value::from(value));
}

/// `"08:00"` → `"08:00:00"`. Empty stays empty; anything else passes
/// through untouched.
pub fn with_seconds(hours: &str) -> String {
    let hours = hours.trim();
    if BARE_HOURS.is_match(hours) {
        format!("{hours}:00")
    } else {
        hours.to_string()
    }
}
