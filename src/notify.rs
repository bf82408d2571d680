use crate::config::Config;
use crate::models::Listing;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Notification seam: anything able to deliver a new-listings digest
#[async_trait]
pub trait DigestSender: Send + Sync {
    /// Send one digest covering all newly found listings
    async fn send_digest(&self, listings: &[Listing]) -> Result<()>;
}

/// SMTP digest mailer
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl Mailer {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .context("Failed to build SMTP transport")?
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .build();

        let from = config
            .email_from
            .parse()
            .with_context(|| format!("Invalid sender address `{}`", config.email_from))?;
        let to = config
            .email_to
            .parse()
            .with_context(|| format!("Invalid recipient address `{}`", config.email_to))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl DigestSender for Mailer {
    async fn send_digest(&self, listings: &[Listing]) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(digest_subject(listings.len()))
            .header(ContentType::TEXT_HTML)
            .body(render_digest(listings))
            .context("Failed to build digest email")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send digest email")?;

        info!(count = listings.len(), to = %self.to, "Digest email sent");
        Ok(())
    }
}

pub fn digest_subject(count: usize) -> String {
    format!("{} depto/s encontrado/s", count)
}

/// One anchor+price block per listing, in input order, inside a single div
pub fn render_digest(listings: &[Listing]) -> String {
    let items: String = listings
        .iter()
        .map(|l| {
            format!(
                r#"<a href="{}">{}</a><br/><div>{}</div>"#,
                l.link, l.title, l.price
            )
        })
        .collect();

    format!("<div>{}</div>", items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, title: &str, link: &str, price: &str) -> Listing {
        Listing {
            id: id.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn subject_reflects_exact_count() {
        assert_eq!(digest_subject(2), "2 depto/s encontrado/s");
        assert_eq!(digest_subject(1), "1 depto/s encontrado/s");
    }

    #[test]
    fn digest_concatenates_anchor_price_blocks_in_order() {
        let listings = vec![
            listing("1", "T1", "a", "$100"),
            listing("2", "T2", "b", "$200"),
        ];

        assert_eq!(
            render_digest(&listings),
            r#"<div><a href="a">T1</a><br/><div>$100</div><a href="b">T2</a><br/><div>$200</div></div>"#
        );
    }

    #[test]
    fn empty_digest_is_a_bare_container() {
        assert_eq!(render_digest(&[]), "<div></div>");
    }
}
