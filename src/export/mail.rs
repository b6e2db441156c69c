use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

pub trait MailSender: Send + Sync {
    fn send(&self, mail: &Mail) -> Result<()>;
}

/// Writes each mail as a text message into an outbox directory, to be picked up
/// by whatever relay is deployed next to it.
pub struct OutboxMailSender {
    outbox_dir: PathBuf,
    from: String,
}

impl OutboxMailSender {
    pub fn new<P: AsRef<Path>>(outbox_dir: P, from: &str) -> Result<Self> {
        let outbox_dir = outbox_dir.as_ref().to_path_buf();
        fs::create_dir_all(&outbox_dir)
            .with_context(|| format!("Failed to create outbox {:?}", outbox_dir))?;
        Ok(OutboxMailSender {
            outbox_dir,
            from: from.to_string(),
        })
    }

    fn render(&self, mail: &Mail, boundary: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", mail.to));
        out.push_str(&format!("Subject: {}\r\n", mail.subject));
        out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            boundary
        ));

        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        out.push_str(&mail.text);
        out.push_str("\r\n");

        for attachment in &mail.attachments {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str(&format!("Content-Type: {}\r\n", attachment.content_type));
            out.push_str(&format!(
                "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
                attachment.filename
            ));
            out.push_str(&attachment.content);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{}--\r\n", boundary));
        out
    }
}

impl MailSender for OutboxMailSender {
    fn send(&self, mail: &Mail) -> Result<()> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let content = self.render(mail, &format!("boundary-{}", id));

        // Readers only ever see complete files.
        let tmp_path = self.outbox_dir.join(format!(".{}.tmp", id));
        let final_path = self.outbox_dir.join(format!("{}.eml", id));
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("Failed to move mail into {:?}", final_path))?;

        info!("Queued mail to {} at {:?}", mail.to, final_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_mail_with_attachment_into_outbox() {
        let dir = TempDir::new().unwrap();
        let sender = OutboxMailSender::new(dir.path().join("outbox"), "exports@music.local").unwrap();

        sender
            .send(&Mail {
                to: "fan@example.com".to_string(),
                subject: "Your playlist".to_string(),
                text: "See attachment".to_string(),
                attachments: vec![Attachment {
                    filename: "playlists.json".to_string(),
                    content_type: "application/json".to_string(),
                    content: "{\"playlist\":{}}".to_string(),
                }],
            })
            .unwrap();

        let files: Vec<_> = fs::read_dir(dir.path().join("outbox"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().unwrap(), "eml");

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("To: fan@example.com"));
        assert!(content.contains("From: exports@music.local"));
        assert!(content.contains("filename=\"playlists.json\""));
        assert!(content.contains("{\"playlist\":{}}"));
    }
}
