//! Rendered notification emails for import job outcomes.

use crate::services::email_sender::EmailMessage;

pub struct ImportCompletedEmail {
    pub to: String,
    pub status_url: String,
}

impl ImportCompletedEmail {
    pub fn render(&self) -> EmailMessage {
        let text = format!(
            "Your employee import has finished successfully.\n\n\
             You can review the imported roster here: {}\n\n\
             Rows that could not be imported were skipped; the rest of the \
             file was processed normally.",
            self.status_url
        );
        let html = format!(
            "<p>Your employee import has finished successfully.</p>\
             <p>You can review the imported roster <a href=\"{}\">here</a>.</p>\
             <p>Rows that could not be imported were skipped; the rest of the \
             file was processed normally.</p>",
            self.status_url
        );
        EmailMessage {
            to: self.to.clone(),
            subject: "Employee import completed".to_string(),
            html,
            text,
        }
    }
}

pub struct ImportFailedEmail {
    pub to: String,
    pub error: String,
}

impl ImportFailedEmail {
    pub fn render(&self) -> EmailMessage {
        let text = format!(
            "Your employee import could not be processed.\n\n\
             Reason: {}\n\n\
             Please check the file and try again.",
            self.error
        );
        let html = format!(
            "<p>Your employee import could not be processed.</p>\
             <p><strong>Reason:</strong> {}</p>\
             <p>Please check the file and try again.</p>",
            self.error
        );
        EmailMessage {
            to: self.to.clone(),
            subject: "Employee import failed".to_string(),
            html,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_email_links_to_status_page() {
        let message = ImportCompletedEmail {
            to: "ana@example.com".to_string(),
            status_url: "https://app.rosterline.io/imports/abc".to_string(),
        }
        .render();

        assert_eq!(message.subject, "Employee import completed");
        assert!(message.text.contains("https://app.rosterline.io/imports/abc"));
        assert!(message.html.contains("href=\"https://app.rosterline.io/imports/abc\""));
    }

    #[test]
    fn failed_email_carries_the_error() {
        let message = ImportFailedEmail {
            to: "ana@example.com".to_string(),
            error: "required column 'cpf' is missing from the header".to_string(),
        }
        .render();

        assert_eq!(message.subject, "Employee import failed");
        assert!(message.text.contains("required column 'cpf'"));
    }
}
