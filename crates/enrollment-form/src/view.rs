//! Presentation model for the enrollment form.
//!
//! The controller mutates a [`FormView`]; hosts render it however they like.

use crate::backend::Registration;
use crate::validation::{Field, FieldErrors};
use chrono::{DateTime, Local, Utc};

pub const SEND_CODE_LABEL: &str = "Send Code";
pub const VERIFY_LABEL: &str = "Verify & Register";

const EMPTY_TOAST: &str = "Something happened";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

/// Support link offered after a duplicate enrollment was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpLink {
    pub prompt: String,
    pub url: String,
}

/// One labelled row of the success view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

/// Enrollment confirmation shown once the user is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessView {
    pub rows: Vec<DetailRow>,
}

impl SuccessView {
    pub fn new(course_title: &str, record: &Registration) -> Self {
        let row = |label: &str, value: String| DetailRow {
            label: label.into(),
            value,
        };

        Self {
            rows: vec![
                row("Course", course_title.to_string()),
                row("Student Name", record.full_name.clone()),
                row("Email", record.email.clone()),
                row("Enrolled", enrolled_date(&record.created_at)),
            ],
        }
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }

    /// Detail rows as markup. Every value is escaped.
    pub fn render_html(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                format!(
                    "<div class=\"detail-row\">\n    <span class=\"detail-label\">{}</span>\n    <span class=\"detail-value\">{}</span>\n</div>",
                    escape_html(&row.label),
                    escape_html(&row.value)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the host needs to draw the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub full_name: String,
    pub email: String,
    pub code: String,
    /// Identity fields are read-only once a code was sent
    pub identity_locked: bool,
    pub errors: FieldErrors,
    pub code_section_visible: bool,
    pub submit_label: String,
    pub submit_enabled: bool,
    pub busy: bool,
    pub countdown: u32,
    pub code_expired: bool,
    pub resend_enabled: bool,
    pub toast: Option<Toast>,
    pub help_link: Option<HelpLink>,
    pub success: Option<SuccessView>,
}

impl Default for FormView {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            code: String::new(),
            identity_locked: false,
            errors: FieldErrors::default(),
            code_section_visible: false,
            submit_label: SEND_CODE_LABEL.into(),
            submit_enabled: true,
            busy: false,
            countdown: 0,
            code_expired: false,
            resend_enabled: false,
            toast: None,
            help_link: None,
            success: None,
        }
    }
}

impl FormView {
    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    /// Show a toast, replacing the current one.
    pub(crate) fn show_toast(&mut self, id: u64, message: impl Into<String>, kind: ToastKind) {
        let message = message.into();
        self.toast = Some(Toast {
            id,
            message: if message.is_empty() {
                EMPTY_TOAST.into()
            } else {
                message
            },
            kind,
        });
    }

    /// Hide the toast if it is still the one identified by `id`.
    pub(crate) fn dismiss_toast(&mut self, id: u64) {
        if self.toast.as_ref().is_some_and(|toast| toast.id == id) {
            self.toast = None;
        }
    }
}

/// Escape text for insertion into markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            '`' => escaped.push_str("&#x60;"),
            '=' => escaped.push_str("&#x3D;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Enrollment date in the viewer's local time zone, e.g. `10/19/2026`.
pub fn enrolled_date(created_at: &DateTime<Utc>) -> String {
    created_at
        .with_timezone(&Local)
        .format("%-m/%-d/%Y")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(full_name: &str, email: &str) -> Registration {
        Registration {
            full_name: full_name.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'`=/&"#),
            "&lt;a href&#x3D;&quot;x&quot;&gt;&#x27;&#x60;&#x3D;&#x2F;&amp;"
        );
        assert_eq!(escape_html("Jane Doe"), "Jane Doe");
    }

    #[test]
    fn test_success_view_rows() {
        let view = SuccessView::new("CCNA Certification", &record("Jane Doe", "jane@example.com"));

        assert_eq!(view.value("Course"), Some("CCNA Certification"));
        assert_eq!(view.value("Student Name"), Some("Jane Doe"));
        assert_eq!(view.value("Email"), Some("jane@example.com"));
        assert_eq!(
            view.value("Enrolled"),
            Some(Local::now().format("%-m/%-d/%Y").to_string().as_str())
        );
    }

    #[test]
    fn test_render_html_escapes_user_values() {
        let view = SuccessView::new(
            "CCNA Certification",
            &record("<script>alert(1)</script>", "x\"@example.com"),
        );
        let html = view.render_html();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;&#x2F;script&gt;"));
        assert!(html.contains("x&quot;@example.com"));
        assert_eq!(html.matches("class=\"detail-row\"").count(), 4);
    }

    #[test]
    fn test_enrolled_date_format() {
        let noon = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        let expected = noon.with_timezone(&Local).format("%-m/%-d/%Y").to_string();

        assert_eq!(enrolled_date(&noon), expected);
        assert!(expected.ends_with("/2026"));
    }

    #[test]
    fn test_toast_lifecycle() {
        let mut view = FormView::default();

        view.show_toast(1, "", ToastKind::Error);
        assert_eq!(view.toast.as_ref().map(|t| t.message.as_str()), Some("Something happened"));

        view.show_toast(2, "New code sent!", ToastKind::Success);
        view.dismiss_toast(1);
        assert!(view.toast.is_some(), "stale dismissal must not hide a newer toast");

        view.dismiss_toast(2);
        assert!(view.toast.is_none());
    }

    #[test]
    fn test_default_view() {
        let view = FormView::default();

        assert_eq!(view.submit_label, SEND_CODE_LABEL);
        assert!(!view.code_section_visible);
        assert!(!view.resend_enabled);
        assert!(view.success.is_none());
    }
}
