//! Registration draft: every answer collected so far.
//!
//! The draft keeps answers for every role regardless of which roles are
//! currently selected, so toggling a role off and on again does not lose
//! input. Consumers that care about role relevance go through
//! [`RegistrationDraft::sections`], which only yields sections for selected
//! roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::role::{Role, RoleSet};

/// Identity answers, required for every role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

/// Answers only relevant to merchants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantFields {
    pub business_name: String,
    pub business_category: String,
    pub business_address: String,
    pub business_description: String,
    /// Image host URL, never required.
    pub logo: String,
}

/// Answers only relevant to delivery agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryAgentFields {
    pub vehicle_type: String,
    pub license_number: String,
    pub vehicle_registration: String,
    pub service_area: String,
}

/// Business-verification answers shared by every non-customer role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessVerificationFields {
    pub opening_hours: String,
    pub closing_hours: String,
    pub tax_id: String,
    pub website: String,
    pub cover_photo: String,
}

/// The full set of answers for one registration attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationDraft {
    pub identity: IdentityFields,
    pub merchant: MerchantFields,
    pub delivery_agent: DeliveryAgentFields,
    pub business: BusinessVerificationFields,
}

/// A role-gated slice of the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSection<'a> {
    Merchant(&'a MerchantFields),
    DeliveryAgent(&'a DeliveryAgentFields),
}

/// The draft as seen through a role set: only what the selected roles need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSections<'a> {
    pub identity: &'a IdentityFields,
    pub roles: Vec<RoleSection<'a>>,
    pub business: Option<&'a BusinessVerificationFields>,
}

impl RegistrationDraft {
    /// Project the draft through `roles`.
    ///
    /// Customers contribute no section of their own. Business verification
    /// is present whenever any non-customer role is selected.
    pub fn sections(&self, roles: &RoleSet) -> ActiveSections<'_> {
        let sections = roles
            .iter()
            .filter_map(|role| match role {
                Role::Customer => None,
                Role::Merchant => Some(RoleSection::Merchant(&self.merchant)),
                Role::DeliveryAgent => Some(RoleSection::DeliveryAgent(&self.delivery_agent)),
            })
            .collect();

        ActiveSections {
            identity: &self.identity,
            roles: sections,
            business: roles.needs_business_details().then_some(&self.business),
        }
    }

    /// Set one field by name.
    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();
    }

    /// Read one field by name.
    pub fn get(&self, field: DraftField) -> &str {
        use DraftField::*;
        match field {
            FirstName => &self.identity.first_name,
            LastName => &self.identity.last_name,
            Email => &self.identity.email,
            Phone => &self.identity.phone,
            Password => &self.identity.password,
            ConfirmPassword => &self.identity.confirm_password,
            BusinessName => &self.merchant.business_name,
            BusinessCategory => &self.merchant.business_category,
            BusinessAddress => &self.merchant.business_address,
            BusinessDescription => &self.merchant.business_description,
            Logo => &self.merchant.logo,
            VehicleType => &self.delivery_agent.vehicle_type,
            LicenseNumber => &self.delivery_agent.license_number,
            VehicleRegistration => &self.delivery_agent.vehicle_registration,
            ServiceArea => &self.delivery_agent.service_area,
            OpeningHours => &self.business.opening_hours,
            ClosingHours => &self.business.closing_hours,
            TaxId => &self.business.tax_id,
            Website => &self.business.website,
            CoverPhoto => &self.business.cover_photo,
        }
    }

    fn slot_mut(&mut self, field: DraftField) -> &mut String {
        use DraftField::*;
        match field {
            FirstName => &mut self.identity.first_name,
            LastName => &mut self.identity.last_name,
            Email => &mut self.identity.email,
            Phone => &mut self.identity.phone,
            Password => &mut self.identity.password,
            ConfirmPassword => &mut self.identity.confirm_password,
            BusinessName => &mut self.merchant.business_name,
            BusinessCategory => &mut self.merchant.business_category,
            BusinessAddress => &mut self.merchant.business_address,
            BusinessDescription => &mut self.merchant.business_description,
            Logo => &mut self.merchant.logo,
            VehicleType => &mut self.delivery_agent.vehicle_type,
            LicenseNumber => &mut self.delivery_agent.license_number,
            VehicleRegistration => &mut self.delivery_agent.vehicle_registration,
            ServiceArea => &mut self.delivery_agent.service_area,
            OpeningHours => &mut self.business.opening_hours,
            ClosingHours => &mut self.business.closing_hours,
            TaxId => &mut self.business.tax_id,
            Website => &mut self.business.website,
            CoverPhoto => &mut self.business.cover_photo,
        }
    }

    /// Copy of the draft with password fields blanked, for status views.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.identity.password.clear();
        copy.identity.confirm_password.clear();
        copy
    }
}

/// Addressable draft fields. Serialized names match the request body keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    FirstName,
    LastName,
    Email,
    Phone,
    Password,
    ConfirmPassword,
    BusinessName,
    BusinessCategory,
    BusinessAddress,
    BusinessDescription,
    Logo,
    VehicleType,
    LicenseNumber,
    VehicleRegistration,
    ServiceArea,
    OpeningHours,
    ClosingHours,
    TaxId,
    Website,
    CoverPhoto,
}

impl FromStr for DraftField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("Unknown field: {s}"))
    }
}
