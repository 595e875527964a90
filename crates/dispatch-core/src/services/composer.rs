//! Message composition: sender identity, rendered content, final markup

use dispatch_types::{Recipient, Template};
use rand::Rng;

use super::tags::render_tags;
use super::variation::{apply_variations_with, first_variation};
use crate::campaign::Campaign;
use crate::types::{DeliverySettings, OutboundMessage};

/// Resolved From identity for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub domain: String,
    pub address: String,
}

impl Sender {
    /// `Name <local@domain>`, or the bare address without a name
    pub fn mailbox(&self) -> String {
        if self.name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.name, self.address)
        }
    }
}

/// Pick the sender for the recipient at `index` (global position in the list)
pub fn resolve_sender<R: Rng + ?Sized>(
    campaign: &Campaign,
    settings: &DeliverySettings,
    index: usize,
    rng: &mut R,
) -> Sender {
    let name = if campaign.rotate_sender_name {
        apply_variations_with(&campaign.sender_name, rng)
    } else {
        first_variation(&campaign.sender_name)
    };

    let domains: Vec<&str> = campaign
        .domains
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();

    let domain = if campaign.rotate_domains && !domains.is_empty() {
        domains[index % domains.len()].to_string()
    } else {
        domains
            .first()
            .map(|d| d.to_string())
            .unwrap_or_else(|| settings.default_domain.clone())
    };

    Sender {
        name: name.trim().to_string(),
        address: format!("{}@{}", settings.from_local_part, domain),
        domain,
    }
}

/// Variation then tag substitution; the subject varies only when asked to
pub fn render_draft<R: Rng + ?Sized>(campaign: &Campaign, recipient: &Recipient, rng: &mut R) -> Template {
    let subject = if campaign.vary_subject {
        apply_variations_with(&campaign.template.subject, rng)
    } else {
        first_variation(&campaign.template.subject)
    };
    let content = apply_variations_with(&campaign.template.content, rng);

    Template {
        subject: render_tags(&subject, recipient),
        content: render_tags(&content, recipient),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn text_to_html(text: &str) -> String {
    escape_html(text).replace("\r\n", "\n").replace('\n', "<br>")
}

/// Wrap the draft into a deliverable message and append the signature.
///
/// Plain-text drafts are escaped and line-broken into HTML and also sent
/// as the text alternative. HTML drafts are passed through.
pub fn build_message(
    sender: &Sender,
    recipient: &Recipient,
    draft: Template,
    use_html: bool,
    signature: Option<&str>,
) -> OutboundMessage {
    let signature = signature.map(str::trim).filter(|s| !s.is_empty());

    let (html, text) = if use_html {
        let html = match signature {
            Some(sig) => format!("{}<br><br>{}", draft.content, sig),
            None => draft.content,
        };
        (html, None)
    } else {
        let text = match signature {
            Some(sig) => format!("{}\n\n{}", draft.content, sig),
            None => draft.content,
        };
        (text_to_html(&text), Some(text))
    };

    OutboundMessage {
        from: sender.mailbox(),
        to: recipient.email.clone(),
        subject: draft.subject,
        html: Some(html),
        text,
    }
}
