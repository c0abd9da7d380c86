//! Reading values out of a stored transport header block

use tracing::debug;

/// Parsed header block, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeaders {
    entries: Vec<(String, String)>,
}

impl RawHeaders {
    /// Parse a header block. Anything unparseable yields an empty set.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim_start();
        if text.is_empty() {
            return Self::default();
        }

        // The block may lack the blank line that ends a header section.
        let mut block = text.replace("\r\n", "\n").replace('\n', "\r\n");
        if !block.ends_with("\r\n\r\n") {
            block.push_str(if block.ends_with("\r\n") { "\r\n" } else { "\r\n\r\n" });
        }

        match mailparse::parse_headers(block.as_bytes()) {
            Ok((headers, _)) => {
                let entries = headers
                    .iter()
                    .map(|h| (h.get_key(), h.get_value().trim().to_string()))
                    .collect();
                debug!("Parsed {} raw headers", headers.len());
                Self { entries }
            }
            Err(e) => {
                debug!("Ignoring unparseable header block: {e}");
                Self::default()
            }
        }
    }

    /// First non-empty value for `name`, case-insensitive
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_empty())
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_get() {
        let headers = RawHeaders::parse(
            "Received: from mx\r\n\tby host\r\nReply-To: Support <help@example.com>\r\nSubject: Hi\r\n",
        );
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("reply-to"), Some("Support <help@example.com>"));
        assert_eq!(headers.get("SUBJECT"), Some("Hi"));
        assert!(headers.get("Cc").is_none());
    }

    #[test]
    fn test_lf_only_block() {
        let headers = RawHeaders::parse("From: a@b.com\nDate: Thu, 01 Dec 2016 11:44:10 -0500");
        assert_eq!(headers.get("Date"), Some("Thu, 01 Dec 2016 11:44:10 -0500"));
    }

    #[test]
    fn test_encoded_word_is_decoded() {
        let headers = RawHeaders::parse("Subject: =?utf-8?q?Caf=C3=A9?=\r\n\r\n");
        assert_eq!(headers.get("Subject"), Some("Café"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let headers = RawHeaders::parse("Reply-To:\r\nReply-To: second@example.com\r\n");
        assert_eq!(headers.get("Reply-To"), Some("second@example.com"));
        assert!(RawHeaders::parse("").is_empty());
    }
}
