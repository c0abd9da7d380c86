use mailparse::{DispositionType, MailHeaderMap, parse_mail};
use msg_convert::*;

fn sample() -> NormalizedEmail {
    NormalizedEmail {
        file_name: "invoice.msg".into(),
        subject: "Invoice 42".into(),
        from_name: "Billing".into(),
        from_email: "billing@example.com".into(),
        to: vec!["Alice <alice@example.com>".into()],
        date_raw: "Thu, 01 Dec 2016 11:44:10 -0500".into(),
        body_text: "Please find the invoice attached.".into(),
        ..NormalizedEmail::default()
    }
}

#[test]
fn test_single_attachment_round_trips() {
    let data: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let mut email = sample();
    email.attachments = vec![Attachment::new("invoice.pdf", data.clone())];

    let bytes = build_message(&email);
    let parsed = parse_mail(&bytes).unwrap();

    assert_eq!(parsed.ctype.mimetype, "multipart/mixed");
    let attachments: Vec<_> = parsed
        .subparts
        .iter()
        .filter(|p| p.get_content_disposition().disposition == DispositionType::Attachment)
        .collect();
    assert_eq!(attachments.len(), 1);

    let part = attachments[0];
    assert_eq!(part.ctype.mimetype, "application/octet-stream");
    assert_eq!(
        part.get_content_disposition().params.get("filename").map(String::as_str),
        Some("invoice.pdf")
    );
    assert_eq!(part.get_body_raw().unwrap().len(), data.len());
    assert_eq!(part.get_body_raw().unwrap(), data);

    let text = &parsed.subparts[0];
    assert_eq!(text.ctype.mimetype, "text/plain");
    assert_eq!(
        text.get_body().unwrap().trim_end(),
        "Please find the invoice attached."
    );
}

#[test]
fn test_basic_headers() {
    let bytes = build_message(&sample());
    let parsed = parse_mail(&bytes).unwrap();

    assert_eq!(parsed.headers.get_first_value("Subject").unwrap(), "Invoice 42");
    assert_eq!(
        parsed.headers.get_first_value("From").unwrap(),
        "Billing <billing@example.com>"
    );
    assert_eq!(
        parsed.headers.get_first_value("To").unwrap(),
        "Alice <alice@example.com>"
    );
    assert_eq!(
        parsed.headers.get_first_value("Date").unwrap(),
        "Thu, 1 Dec 2016 11:44:10 -0500"
    );
    assert!(parsed.headers.get_first_value("Cc").is_none());
    assert!(parsed.headers.get_first_value("Reply-To").is_none());
    assert_eq!(parsed.ctype.mimetype, "text/plain");
}

#[test]
fn test_empty_message_still_has_required_headers() {
    let bytes = build_message(&NormalizedEmail::default());
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.contains("Subject: \r\n"));
    assert!(text.contains("From: \r\n"));
    assert!(text.contains("To: \r\n"));
    assert!(!text.contains("Date:"));
}

#[test]
fn test_cc_and_reply_to() {
    let mut email = sample();
    email.cc = vec!["Doe, John <john@example.com>".into()];
    email.raw_headers = "Message-ID: <1@x>\r\nReply-To: Desk <desk@example.com>\r\n".into();

    let bytes = build_message(&email);
    let parsed = parse_mail(&bytes).unwrap();

    assert_eq!(
        parsed.headers.get_first_value("Cc").unwrap(),
        "\"Doe, John\" <john@example.com>"
    );
    assert_eq!(
        parsed.headers.get_first_value("Reply-To").unwrap(),
        "Desk <desk@example.com>"
    );
}

#[test]
fn test_unparseable_date_is_kept() {
    let mut email = sample();
    email.date_raw = "12/01/2016 03:15:00 PM".into();

    let parsed_bytes = build_message(&email);
    let parsed = parse_mail(&parsed_bytes).unwrap();
    assert_eq!(
        parsed.headers.get_first_value("Date").unwrap(),
        "12/01/2016 03:15:00 PM"
    );
}

#[test]
fn test_non_ascii_content() {
    let mut email = sample();
    email.subject = "Réunion à 10h".into();
    email.from_name = "Zoë".into();
    email.body_text = "Grüße\nbis bald".into();

    let bytes = build_message(&email);
    let parsed = parse_mail(&bytes).unwrap();

    assert_eq!(
        parsed.headers.get_first_value("Subject").unwrap(),
        "Réunion à 10h"
    );
    assert_eq!(
        parsed.headers.get_first_value("From").unwrap(),
        "Zoë <billing@example.com>"
    );
    assert_eq!(
        parsed.get_body().unwrap().replace("\r\n", "\n").trim_end(),
        "Grüße\nbis bald"
    );
}

#[test]
fn test_multi_address_recipient_entry() {
    let mut email = sample();
    email.to = vec!["Alice <alice@x.com>; Bob <bob@x.com>".into()];

    let bytes = build_message(&email);
    let parsed = parse_mail(&bytes).unwrap();
    let to = parsed.headers.get_first_value("To").unwrap();
    assert_eq!(to, "Alice <alice@x.com>, Bob <bob@x.com>");

    let addrs: Vec<_> = mailparse::addrparse(&to)
        .unwrap()
        .iter()
        .filter_map(|addr| match addr {
            mailparse::MailAddr::Single(info) => Some(info.addr.clone()),
            mailparse::MailAddr::Group(_) => None,
        })
        .collect();
    assert_eq!(addrs, vec!["alice@x.com", "bob@x.com"]);
}

#[test]
fn test_attachment_parts_in_order() {
    let mut email = sample();
    email.attachments = vec![
        Attachment::new("a.txt", b"first".to_vec()),
        Attachment::new("b.pdf", b"second".to_vec()),
    ];

    let bytes = build_message(&email);
    let parsed = parse_mail(&bytes).unwrap();
    let names: Vec<_> = parsed
        .subparts
        .iter()
        .filter_map(|p| p.get_content_disposition().params.get("filename").cloned())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.pdf"]);
    assert_eq!(parsed.subparts[2].get_body_raw().unwrap(), b"second");
}

#[test]
fn test_write_eml_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.eml");

    write_eml(&sample(), &path).unwrap();
    let parsed_bytes = std::fs::read(&path).unwrap();
    let parsed = parse_mail(&parsed_bytes).unwrap();
    assert_eq!(parsed.headers.get_first_value("Subject").unwrap(), "Invoice 42");
}

#[test]
fn test_write_eml_unwritable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir/out.eml");

    let err = write_eml(&sample(), &path).unwrap_err();
    assert!(matches!(err, ConvertError::Io { .. }));
}
