#![allow(dead_code)]

use msg_convert::{ConvertError, HtmlRenderer, MemoryMessage, MessageOpener, MessageSource, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Opens `.msg` fixtures that are really JSON-serialized [`MemoryMessage`]s
pub struct JsonOpener;

impl MessageOpener for JsonOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn MessageSource>> {
        let bytes = fs::read(path).map_err(|e| ConvertError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let msg: MemoryMessage = serde_json::from_slice(&bytes).map_err(|e| ConvertError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(msg))
    }
}

/// Write `msg` as a fixture at `dir/name`
pub fn write_fixture(dir: &Path, name: &str, msg: &MemoryMessage) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(msg).unwrap()).unwrap();
    path
}

pub fn simple_message(subject: &str) -> MemoryMessage {
    MemoryMessage {
        subject: Some(subject.to_string()),
        sender_name: Some("Alice".into()),
        sender_email: Some("alice@example.com".into()),
        to: Some("Bob <bob@example.com>".into()),
        date: Some("Thu, 01 Dec 2016 11:44:10 -0500".into()),
        body: Some(format!("Body of {subject}")),
        ..MemoryMessage::default()
    }
}

/// Renderer that writes the HTML it receives instead of a PDF
#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: RefCell<Vec<(String, PathBuf)>>,
}

impl HtmlRenderer for RecordingRenderer {
    fn render(&self, html: &str, base_dir: &Path, output: &Path) -> Result<()> {
        fs::write(output, html).map_err(|e| ConvertError::io(output, e))?;
        self.calls
            .borrow_mut()
            .push((html.to_string(), base_dir.to_path_buf()));
        Ok(())
    }
}

/// Renderer standing in for an engine that crashes
pub struct FailingRenderer;

impl HtmlRenderer for FailingRenderer {
    fn render(&self, _html: &str, _base_dir: &Path, _output: &Path) -> Result<()> {
        Err(ConvertError::Render {
            program: "fake".into(),
            details: "exit status: 1".into(),
        })
    }
}
