//! Registration form controller.
//!
//! Drives the form through collecting identity, awaiting a code and verified.
//! Every remote failure leaves the stage unchanged and clears the busy flag.

use crate::backend::{
    EnrollmentBackend, LookupField, NewRegistration, Profile, Registration, UniqueField,
};
use crate::config::Config;
use crate::countdown::{Countdown, TickOutcome};
use crate::error::{AuthFailure, FormError, FormResult};
use crate::event::FormEvent;
use crate::validation::{sanitize_otp, validate, Field, FieldErrors, FormInput};
use crate::view::{FormView, HelpLink, SuccessView, ToastKind, VERIFY_LABEL};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

const CODE_LEN: usize = 8;
const HELP_PROMPT: &str = "Having trouble registering?";

/// Form behaviour that varies per deployment.
#[derive(Debug, Clone)]
pub struct FormSettings {
    /// Short course name used in messages
    pub course_name: String,
    /// Course title on the success view
    pub course_title: String,
    pub countdown_secs: u32,
    pub toast_duration: Duration,
    pub help_url: Option<String>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            course_name: "CCNA".into(),
            course_title: "CCNA Certification".into(),
            countdown_secs: 60,
            toast_duration: Duration::from_secs(4),
            help_url: None,
        }
    }
}

impl From<&Config> for FormSettings {
    fn from(config: &Config) -> Self {
        Self {
            course_name: config.course.name.clone(),
            course_title: config.course.title.clone(),
            countdown_secs: u32::try_from(config.form.countdown.as_secs()).unwrap_or(u32::MAX),
            toast_duration: config.form.toast_duration,
            help_url: config.support.help_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectingIdentity,
    AwaitingCode,
    Verified,
}

/// How a verified user ended up enrolled.
enum Enrollment {
    Existing(Registration),
    Created(Registration),
}

/// Controller for one page load.
pub struct RegistrationForm {
    backend: Arc<dyn EnrollmentBackend>,
    settings: FormSettings,
    events: UnboundedSender<FormEvent>,
    stage: Stage,
    is_loading: bool,
    countdown: Countdown,
    view: FormView,
    next_toast_id: u64,
}

impl RegistrationForm {
    /// Create a controller. Timer and toast events are delivered on `events`.
    pub fn new(
        backend: Arc<dyn EnrollmentBackend>,
        settings: FormSettings,
        events: UnboundedSender<FormEvent>,
    ) -> Self {
        let countdown = Countdown::new(settings.countdown_secs);

        Self {
            backend,
            settings,
            events,
            stage: Stage::CollectingIdentity,
            is_loading: false,
            countdown,
            view: FormView::default(),
            next_toast_id: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn view(&self) -> &FormView {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// The view to draw while `event` waits on the backend, or `None` when
    /// handling it makes no remote call.
    pub fn busy_view(&self, event: &FormEvent) -> Option<FormView> {
        if self.is_loading {
            return None;
        }

        let remote = match (self.stage, event) {
            (Stage::CollectingIdentity, FormEvent::Submit) => {
                validate(&self.raw_input(), false).is_valid()
            }
            (Stage::AwaitingCode, FormEvent::Submit) => {
                validate(&self.raw_input(), true).is_valid()
            }
            (Stage::AwaitingCode, FormEvent::CodeEdited(text)) => {
                sanitize_otp(text).len() == CODE_LEN
            }
            _ => false,
        };

        remote.then(|| {
            let mut view = self.view.clone();
            view.busy = true;
            view.submit_enabled = false;
            view
        })
    }

    /// Apply one event. Errors have already been shown on the view when returned.
    pub async fn handle(&mut self, event: FormEvent) -> FormResult<()> {
        match event {
            FormEvent::NameEdited(text) => {
                self.edit_identity(Field::FullName, text);
                Ok(())
            }
            FormEvent::EmailEdited(text) => {
                self.edit_identity(Field::Email, text);
                Ok(())
            }
            FormEvent::CodeEdited(text) => self.edit_code(&text).await,
            FormEvent::Submit => self.submit().await,
            FormEvent::Resend => self.resend().await,
            FormEvent::Tick { generation } => {
                self.on_tick(generation);
                Ok(())
            }
            FormEvent::ToastExpired { id } => {
                self.view.dismiss_toast(id);
                Ok(())
            }
        }
    }

    /// Show the stored registration if an earlier session is still around.
    ///
    /// Failures are logged only; the form stays usable.
    pub async fn restore_session(&mut self) {
        match self.find_session_registration().await {
            Ok(Some(record)) => {
                info!("Restored session for {}", record.email);
                self.show_success(record);
                self.toast("Welcome back!", ToastKind::Success);
            }
            Ok(None) => debug!("No previous session"),
            Err(e) => error!("Session check error: {}", e),
        }
    }

    async fn find_session_registration(&self) -> FormResult<Option<Registration>> {
        let Some(session) = self.backend.current_session().await? else {
            return Ok(None);
        };
        if !session.is_usable() {
            return Ok(None);
        }
        let Some(email) = session.email else {
            return Ok(None);
        };

        Ok(self.backend.get_record(&email).await?)
    }

    fn edit_identity(&mut self, field: Field, text: String) {
        if self.view.identity_locked || self.stage == Stage::Verified {
            return;
        }

        match field {
            Field::FullName => self.view.full_name = text,
            Field::Email => self.view.email = text,
            Field::Code => return,
        }
        self.view.errors.clear(field);
    }

    async fn edit_code(&mut self, text: &str) -> FormResult<()> {
        if self.stage != Stage::AwaitingCode {
            return Ok(());
        }

        self.view.code = sanitize_otp(text);
        self.view.errors.clear(Field::Code);

        if self.view.code.len() == CODE_LEN && !self.is_loading {
            debug!("Complete code entered, verifying");
            return self.verify().await;
        }

        Ok(())
    }

    async fn submit(&mut self) -> FormResult<()> {
        if self.is_loading {
            return Ok(());
        }

        match self.stage {
            Stage::CollectingIdentity => self.send_code().await,
            Stage::AwaitingCode => self.verify().await,
            Stage::Verified => Ok(()),
        }
    }

    async fn send_code(&mut self) -> FormResult<()> {
        let input = self.validate_form()?;

        self.set_loading(true);
        let result = self.request_first_code(&input).await;
        self.set_loading(false);

        match &result {
            Ok(()) => {
                self.reveal_code_field();
                self.toast("Verification code sent to your email!", ToastKind::Success);
            }
            Err(FormError::Duplicate(Some(field))) => self.report_enrolled(*field),
            Err(e) => self.report(e),
        }

        result
    }

    /// Advisory duplicate checks, then the code request.
    async fn request_first_code(&self, input: &FormInput) -> FormResult<()> {
        info!("Checking if already registered...");

        if self.backend.exists(LookupField::Email, &input.email).await? {
            return Err(FormError::Duplicate(Some(UniqueField::Email)));
        }

        if self.backend.exists(LookupField::FullName, &input.full_name).await? {
            return Err(FormError::Duplicate(Some(UniqueField::FullName)));
        }

        info!("Sending code to {}", input.email);
        let profile = Profile {
            full_name: input.full_name.clone(),
        };
        self.backend.request_code(&input.email, Some(profile)).await?;

        Ok(())
    }

    async fn resend(&mut self) -> FormResult<()> {
        if self.stage != Stage::AwaitingCode || !self.view.resend_enabled {
            return Ok(());
        }

        self.view.resend_enabled = false;
        let email = self.view.email.trim().to_lowercase();

        match self.backend.request_code(&email, None).await {
            Ok(()) => {
                self.view.code.clear();
                self.start_countdown();
                self.toast("New code sent!", ToastKind::Success);
                Ok(())
            }
            Err(e) => {
                let e = FormError::from(e);
                warn!("Resend error: {}", e);
                self.report(&e);
                self.view.resend_enabled = true;
                Err(e)
            }
        }
    }

    async fn verify(&mut self) -> FormResult<()> {
        let input = self.validate_form()?;

        self.set_loading(true);
        let result = self.verify_and_enroll(&input).await;
        self.set_loading(false);

        match result {
            Ok(Enrollment::Existing(record)) => {
                self.show_success(record);
                let message = format!(
                    "You are already enrolled in the {} course!",
                    self.settings.course_name
                );
                self.toast(message, ToastKind::Success);
                Ok(())
            }
            Ok(Enrollment::Created(record)) => {
                info!("Registered {}", record.email);
                self.show_success(record);
                let message = format!(
                    "{} course registration successful!",
                    self.settings.course_name
                );
                self.toast(message, ToastKind::Success);
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    async fn verify_and_enroll(&self, input: &FormInput) -> FormResult<Enrollment> {
        let session = self.backend.verify_code(&input.email, &input.code).await?;
        if !session.is_usable() {
            return Err(FormError::Auth(AuthFailure::MissingSession));
        }

        if let Some(existing) = self.backend.get_record(&input.email).await? {
            return Ok(Enrollment::Existing(existing));
        }

        // A uniqueness failure here is authoritative; the earlier checks are hints
        let created = self
            .backend
            .insert_record(NewRegistration {
                full_name: input.full_name.clone(),
                email: input.email.clone(),
            })
            .await?;

        Ok(Enrollment::Created(created))
    }

    /// Sanitize the fields in place and annotate every invalid one.
    fn raw_input(&self) -> FormInput {
        FormInput {
            full_name: self.view.full_name.clone(),
            email: self.view.email.clone(),
            code: self.view.code.clone(),
        }
    }

    fn validate_form(&mut self) -> FormResult<FormInput> {
        let code_sent = self.stage == Stage::AwaitingCode;
        let validation = validate(&self.raw_input(), code_sent);

        self.view.errors = FieldErrors::default();
        self.view.full_name = validation.input.full_name.clone();
        self.view.email = validation.input.email.clone();
        if code_sent {
            self.view.code = validation.input.code.clone();
        }

        if validation.is_valid() {
            Ok(validation.input)
        } else {
            debug!("Validation failed: {}", validation.errors);
            self.view.errors = validation.errors.clone();
            Err(FormError::Validation(validation.errors))
        }
    }

    fn reveal_code_field(&mut self) {
        self.stage = Stage::AwaitingCode;
        self.view.code_section_visible = true;
        self.view.identity_locked = true;
        self.view.submit_label = VERIFY_LABEL.into();
        self.start_countdown();
    }

    fn start_countdown(&mut self) {
        self.countdown.start(&self.events);
        self.view.countdown = self.countdown.seconds_left();
        self.view.code_expired = false;
        self.view.resend_enabled = false;
    }

    fn on_tick(&mut self, generation: u64) {
        match self.countdown.tick(generation) {
            TickOutcome::Stale => {}
            TickOutcome::Running(seconds_left) => self.view.countdown = seconds_left,
            TickOutcome::Expired => {
                self.view.countdown = 0;
                self.view.code_expired = true;
                self.view.resend_enabled = true;
            }
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
        self.view.busy = loading;
        self.view.submit_enabled = !loading;
    }

    fn show_success(&mut self, record: Registration) {
        self.stage = Stage::Verified;
        self.countdown.cancel();
        self.view.success = Some(SuccessView::new(&self.settings.course_title, &record));
    }

    /// Toast for a remote failure. Validation errors stay inline.
    fn report(&mut self, e: &FormError) {
        if let FormError::Validation(_) = e {
            return;
        }

        error!("Form action failed: {}", e);
        let message = e.user_message(&self.settings.course_name);
        self.toast(message, ToastKind::Error);
    }

    /// Pre-check hit: toast, inline error and the support link.
    fn report_enrolled(&mut self, field: UniqueField) {
        let (message, field, inline) = match field {
            UniqueField::Email => (
                format!(
                    "This email is already enrolled in the {} course!",
                    self.settings.course_name
                ),
                Field::Email,
                "This email is already registered",
            ),
            UniqueField::FullName => (
                "This name is already registered for the course!".to_string(),
                Field::FullName,
                "This name is already registered",
            ),
        };

        self.toast(message, ToastKind::Error);
        self.view.errors.set(field, inline);

        if let Some(url) = &self.settings.help_url {
            self.view.help_link = Some(HelpLink {
                prompt: HELP_PROMPT.into(),
                url: url.clone(),
            });
        }
    }

    /// Show a toast and schedule its dismissal.
    fn toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.next_toast_id += 1;
        let id = self.next_toast_id;
        self.view.show_toast(id, message, kind);

        let events = self.events.clone();
        let delay = self.settings.toast_duration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(FormEvent::ToastExpired { id });
        });
    }
}
