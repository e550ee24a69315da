//! Course enrollment form with email one-time-code verification.
//!
//! The [`RegistrationForm`] controller owns the form state and talks to the
//! remote service only through [`EnrollmentBackend`].

pub mod backend;
pub mod config;
pub mod console;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod event;
pub mod validation;
pub mod view;

pub use backend::{
    BackendError, EnrollmentBackend, LookupField, NewRegistration, Profile, Registration,
    Session, SupabaseBackend, UniqueField,
};
pub use controller::{FormSettings, RegistrationForm, Stage};
pub use error::{AuthFailure, FormError, FormResult};
pub use event::FormEvent;
pub use view::{FormView, SuccessView, Toast, ToastKind};
