//! Placeholder substitution for recipient fields

use dispatch_types::Recipient;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::constants::TAG_PATTERN;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TAG_PATTERN).expect("tag pattern is a valid regex"));

fn first_name(recipient: &Recipient) -> String {
    recipient
        .name
        .as_deref()
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}

/// Value for a known tag, `None` for tags we do not recognise
fn tag_value(tag: &str, recipient: &Recipient) -> Option<String> {
    match tag.to_ascii_lowercase().as_str() {
        "name" => Some(recipient.name.clone().unwrap_or_default()),
        "first_name" | "firstname" => Some(first_name(recipient)),
        "email" => Some(recipient.email.clone()),
        "company" => Some(recipient.company.clone().unwrap_or_default()),
        "title" => Some(recipient.title.clone().unwrap_or_default()),
        _ => None,
    }
}

/// Substitute `{{tag}}` placeholders; unknown tags are kept as written
pub fn render_tags(text: &str, recipient: &Recipient) -> String {
    TAG_RE
        .replace_all(text, |caps: &Captures| {
            tag_value(&caps[1], recipient).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Recipient {
        Recipient::new("ana@acme.io")
            .with_name("Ana María López")
            .with_company("Acme")
    }

    #[test]
    fn test_known_tags() {
        let out = render_tags("Hi {{first_name}} ({{ name }}) at {{company}} <{{email}}>", &ana());
        assert_eq!(out, "Hi Ana (Ana María López) at Acme <ana@acme.io>");
    }

    #[test]
    fn test_missing_values_render_empty() {
        let out = render_tags("[{{title}}][{{company}}]", &Recipient::new("x@y.io"));
        assert_eq!(out, "[][]");
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        assert_eq!(render_tags("{{coupon}} for {{name}}", &ana()), "{{coupon}} for Ana María López");
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        assert_eq!(render_tags("{{First_Name}}", &ana()), "Ana");
    }
}
