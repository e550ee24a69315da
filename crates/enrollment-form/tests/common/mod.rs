//! Common test utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use enrollment_form::{
    BackendError, EnrollmentBackend, FormEvent, FormSettings, LookupField, NewRegistration,
    Profile, Registration, RegistrationForm, Session, UniqueField,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// In-memory stand-in for the remote service.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub records: Vec<Registration>,
    pub codes_requested: Vec<(String, Option<Profile>)>,
    pub verify_calls: usize,
    pub inserts: Vec<NewRegistration>,
    pub session: Option<Session>,
    /// Code accepted by `verify_code`
    pub valid_code: String,
    /// Fail every insert with this violation, as if another writer got there first
    pub reject_insert_on: Option<UniqueField>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                valid_code: "12345678".into(),
                ..FakeState::default()
            }),
        })
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}

#[async_trait]
impl EnrollmentBackend for FakeBackend {
    async fn exists(&self, field: LookupField, value: &str) -> Result<bool, BackendError> {
        Ok(self.with_state(|s| {
            s.records.iter().any(|r| match field {
                LookupField::Email => r.email == value,
                LookupField::FullName => r.full_name.eq_ignore_ascii_case(value),
            })
        }))
    }

    async fn request_code(&self, email: &str, profile: Option<Profile>) -> Result<(), BackendError> {
        self.with_state(|s| s.codes_requested.push((email.to_string(), profile)));
        Ok(())
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<Session, BackendError> {
        self.with_state(|s| {
            s.verify_calls += 1;
            if code != s.valid_code {
                return Err(BackendError::InvalidCode);
            }
            let session = Session {
                access_token: format!("token-{}", s.verify_calls),
                email: Some(email.to_string()),
            };
            s.session = Some(session.clone());
            Ok(session)
        })
    }

    async fn get_record(&self, email: &str) -> Result<Option<Registration>, BackendError> {
        Ok(self.with_state(|s| s.records.iter().find(|r| r.email == email).cloned()))
    }

    async fn insert_record(&self, fields: NewRegistration) -> Result<Registration, BackendError> {
        self.with_state(|s| {
            s.inserts.push(fields.clone());

            if let Some(field) = s.reject_insert_on {
                return Err(BackendError::UniqueViolation(Some(field)));
            }
            if s.records.iter().any(|r| r.email == fields.email) {
                return Err(BackendError::UniqueViolation(Some(UniqueField::Email)));
            }

            let record = Registration {
                full_name: fields.full_name,
                email: fields.email,
                created_at: Utc::now(),
            };
            s.records.push(record.clone());
            Ok(record)
        })
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.with_state(|s| s.session.clone()))
    }
}

/// Build a form for one simulated page load.
pub fn page_load(backend: Arc<FakeBackend>) -> (RegistrationForm, UnboundedReceiver<FormEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RegistrationForm::new(backend, FormSettings::default(), tx), rx)
}

/// Fill in and submit the identity fields.
pub async fn submit_identity(
    form: &mut RegistrationForm,
    full_name: &str,
    email: &str,
) -> enrollment_form::FormResult<()> {
    form.handle(FormEvent::NameEdited(full_name.into())).await?;
    form.handle(FormEvent::EmailEdited(email.into())).await?;
    form.handle(FormEvent::Submit).await
}
