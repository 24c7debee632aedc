//! Registration workflow: role-conditional, multi-step signup.
//!
//! A new user picks one or more roles (customer, merchant, delivery agent),
//! fills in the steps those roles require, and the collected answers are
//! submitted as a single request to the account-creation service. The
//! manager owns one attempt end to end; the other modules are the pure
//! pieces it drives.

pub mod compose;
pub mod draft;
pub mod failure;
pub mod image;
pub mod manager;
pub mod role;
pub mod routes;
pub mod step;
pub mod submit;
pub mod validate;

pub use compose::{RequestBody, compose};
pub use draft::{DraftField, RegistrationDraft};
pub use failure::{ServiceFailure, normalize};
pub use image::{HttpImageHost, ImageCategory, ImageHost};
pub use manager::{
    AdvanceOutcome, RegistrationManager, RegistrationStatus, RetreatOutcome, SubmissionState,
};
pub use role::{Role, RoleSet};
pub use routes::{RegistrationRouteState, registration_routes};
pub use step::{Direction, Step, WorkflowPosition};
pub use submit::{AccountService, HttpAccountService, Landing, SubmissionResult};
pub use validate::{Rejection, validate};
