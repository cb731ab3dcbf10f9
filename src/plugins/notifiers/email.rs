use async_trait::async_trait;
use futures::future::join_all;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::plugins::traits::{NotificationReport, NotifierPlugin, StockAlert};
use crate::utils::error::{AppError, Result};

/// Sends one message per recipient over SMTP.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from_address = config
            .from_address
            .as_deref()
            .ok_or_else(|| AppError::Notification("SMTP from_address is not configured".into()))?;
        let from: Mailbox = format!("{} <{}>", config.from_name, from_address)
            .parse()
            .map_err(|e| AppError::Notification(format!("invalid sender address: {}", e)))?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Notification(format!("SMTP relay {}: {}", config.host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            recipients: config.recipients.clone(),
        })
    }

    fn build_message(&self, recipient: &str, alert: &StockAlert) -> std::result::Result<Message, String> {
        let to: Mailbox = recipient.parse().map_err(|e| format!("invalid address: {}", e))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format_subject(alert))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(format_text_body(alert)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format_html_body(alert)),
                    ),
            )
            .map_err(|e| e.to_string())
    }

    async fn send_to(&self, recipient: &str, alert: &StockAlert) -> NotificationReport {
        let message = match self.build_message(recipient, alert) {
            Ok(message) => message,
            Err(e) => return NotificationReport::failed_for(recipient, e),
        };

        match self.transport.send(message).await {
            Ok(_) => {
                tracing::debug!("Stock alert for '{}' mailed to {}", alert.name, recipient);
                NotificationReport::delivered_to(recipient)
            }
            Err(e) => NotificationReport::failed_for(recipient, e),
        }
    }
}

pub fn format_subject(alert: &StockAlert) -> String {
    format!("🟢 In Stock: {} - {}", alert.name, alert.formatted_price())
}

pub fn format_text_body(alert: &StockAlert) -> String {
    let mut text = String::new();

    text.push_str("🔔 RESTOCK ALERT\n\n");
    text.push_str(&format!("Product: {}\n", alert.name));
    text.push_str(&format!("Family: {}\n", alert.product_family));
    text.push_str(&format!("Retailer: {}\n", alert.retailer));
    text.push_str(&format!("Price: {}\n", alert.formatted_price()));
    text.push_str(&format!("Checked: {}\n\n", alert.formatted_time()));
    text.push_str(&format!("Buy now: {}\n", alert.url));

    text
}

pub fn format_html_body(alert: &StockAlert) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .header {{ background: #e8f5e8; border-left: 4px solid #4CAF50; padding: 15px; }}
        .product {{ font-size: 18px; font-weight: bold; }}
        .button {{ display: inline-block; padding: 8px 15px; margin-top: 15px; background: #007cba; color: white; text-decoration: none; border-radius: 3px; }}
    </style>
</head>
<body>
    <div class="header">
        <div class="product">{name}</div>
        <strong>Retailer:</strong> {retailer}<br>
        <strong>Price:</strong> {price}<br>
        <strong>Checked:</strong> {time}
    </div>
    <a href="{url}" class="button">Buy now</a>
</body>
</html>
"#,
        name = alert.name,
        retailer = alert.retailer,
        price = alert.formatted_price(),
        time = alert.formatted_time(),
        url = alert.url,
    )
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    fn description(&self) -> &str {
        "Mails every configured recipient when a watched item can be bought"
    }

    async fn notify(&self, alert: &StockAlert) -> NotificationReport {
        let sends = self.recipients.iter().map(|r| self.send_to(r, alert));

        let mut report = NotificationReport::default();
        for outcome in join_all(sends).await {
            report.merge(outcome);
        }
        report
    }
}
