// src/notify/email.rs
// SMTP delivery for grant notifications. One message per subscriber; the
// recipient mailbox is parsed at send time because subscribers are dynamic.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{GrantDigest, NotificationSender};

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr =
            std::env::var("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        Ok(Self { mailer, from })
    }

    fn render_body(org_name: &str, grants: &[GrantDigest]) -> String {
        let mut body = format!(
            "Hi {org_name},\n\nWe found {} new grant(s) matching your stated preferences:\n\n",
            grants.len()
        );
        for grant in grants {
            body.push_str(&format!("* {} ({})\n", grant.name, grant.agency_name));
            if let Some(amount) = grant.max_funding {
                body.push_str(&format!("  Max funding: ${amount}\n"));
            }
            if let Some(intent) = &grant.strategic_intent {
                body.push_str(&format!("  {intent}\n"));
            }
            body.push_str(&format!("  {}\n\n", grant.original_url));
        }
        body.push_str("Apply before the deadlines close.\n");
        body
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(&self, email: &str, org_name: &str, grants: &[GrantDigest]) -> Result<()> {
        let to: Mailbox = email
            .parse()
            .with_context(|| format!("invalid subscriber address {email}"))?;
        let subject = format!("{} new grant(s) match your criteria", grants.len());
        let body = Self::render_body(org_name, grants);

        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
