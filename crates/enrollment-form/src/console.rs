//! Text front end for the form: parses typed commands and draws the view.

use crate::event::FormEvent;
use crate::view::{FormView, ToastKind};

pub const HELP_TEXT: &str = "Commands:
  name <full name>   set the full name
  email <address>    set the email address
  code <digits>      enter the verification code
  submit             send the code, or verify it once sent
  resend             request a new code after the countdown
  help               show this help";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(FormEvent),
    Help,
}

/// Parse one line, e.g. `name Jane Doe` or `submit`.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (trimmed, ""),
    };

    let event = match keyword.to_ascii_lowercase().as_str() {
        "name" => FormEvent::NameEdited(rest.to_string()),
        "email" => FormEvent::EmailEdited(rest.to_string()),
        "code" => FormEvent::CodeEdited(rest.to_string()),
        "submit" => FormEvent::Submit,
        "resend" => FormEvent::Resend,
        "help" | "?" => return Some(Command::Help),
        _ => return None,
    };

    Some(Command::Event(event))
}

/// Draw the view as plain text.
pub fn render(view: &FormView) -> String {
    let mut lines = vec![];

    if let Some(toast) = &view.toast {
        let marker = match toast.kind {
            ToastKind::Success => "✓",
            ToastKind::Error => "✗",
        };
        lines.push(format!("{} {}", marker, toast.message));
        lines.push(String::new());
    }

    if let Some(success) = &view.success {
        lines.push("**Registration complete**".into());
        for row in &success.rows {
            lines.push(format!("- {}: {}", row.label, row.value));
        }
        return lines.join("\n");
    }

    let lock = if view.identity_locked { " (locked)" } else { "" };
    lines.push(format!("Full name: {}{}", view.full_name, lock));
    push_error(&mut lines, view.errors.full_name.as_deref());
    lines.push(format!("Email: {}{}", view.email, lock));
    push_error(&mut lines, view.errors.email.as_deref());

    if view.code_section_visible {
        lines.push(format!("Code: {}", view.code));
        push_error(&mut lines, view.errors.code.as_deref());

        if view.code_expired {
            lines.push("Code expired".into());
        } else {
            lines.push(format!("Code expires in {}s", view.countdown));
        }
        if view.resend_enabled {
            lines.push("Type `resend` for a new code".into());
        }
    }

    let button = if view.busy {
        "[ ... ]".to_string()
    } else {
        format!("[ {} ]", view.submit_label)
    };
    lines.push(button);

    if let Some(help) = &view.help_link {
        lines.push(format!("{} {}", help.prompt, help.url));
    }

    lines.join("\n")
}

fn push_error(lines: &mut Vec<String>, error: Option<&str>) {
    if let Some(message) = error {
        lines.push(format!("  ! {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Field;
    use crate::view::{DetailRow, SuccessView};

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("name   Jane Doe  "),
            Some(Command::Event(FormEvent::NameEdited("Jane Doe".into())))
        );
        assert_eq!(
            parse_command("EMAIL jane@example.com"),
            Some(Command::Event(FormEvent::EmailEdited("jane@example.com".into())))
        );
        assert_eq!(
            parse_command("code 1234 5678"),
            Some(Command::Event(FormEvent::CodeEdited("1234 5678".into())))
        );
        assert_eq!(parse_command("submit"), Some(Command::Event(FormEvent::Submit)));
        assert_eq!(parse_command(" resend "), Some(Command::Event(FormEvent::Resend)));
        assert_eq!(parse_command("help"), Some(Command::Help));
        assert_eq!(parse_command("name"), Some(Command::Event(FormEvent::NameEdited(String::new()))));
        assert_eq!(parse_command("launch"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_render_collecting_identity() {
        let mut view = FormView::default();
        view.full_name = "Jane Doe".into();
        view.errors.set(Field::Email, "Email is required");

        let text = render(&view);

        assert!(text.contains("Full name: Jane Doe"));
        assert!(text.contains("  ! Email is required"));
        assert!(text.contains("[ Send Code ]"));
        assert!(!text.contains("Code expires"));
    }

    #[test]
    fn test_render_awaiting_code() {
        let mut view = FormView::default();
        view.identity_locked = true;
        view.code_section_visible = true;
        view.countdown = 42;
        view.busy = true;

        let text = render(&view);

        assert!(text.contains("(locked)"));
        assert!(text.contains("Code expires in 42s"));
        assert!(text.contains("[ ... ]"));
    }

    #[test]
    fn test_render_success() {
        let mut view = FormView::default();
        view.success = Some(SuccessView {
            rows: vec![DetailRow {
                label: "Student Name".into(),
                value: "Jane Doe".into(),
            }],
        });

        let text = render(&view);

        assert!(text.contains("Registration complete"));
        assert!(text.contains("- Student Name: Jane Doe"));
        assert!(!text.contains("Send Code"));
    }
}
