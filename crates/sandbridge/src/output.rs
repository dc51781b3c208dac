use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sandbridge_endpoint::{ContentReady, ReleaseRecord, ScrollEvent};
use sandbridge_frame::MessageKind;
use sandbridge_wire as wire;
use serde::Serialize;

use crate::values::values_to_json;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    code: u32,
    payload_size: usize,
    payload: serde_json::Value,
    peer: &'a str,
    timestamp: String,
}

pub fn print_message(kind: MessageKind, payload: &[u8], peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: kind.name(),
                code: kind.code(),
                payload_size: payload.len(),
                payload: payload_json(kind, payload),
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    kind.name().to_string(),
                    payload.len().to_string(),
                    peer.to_string(),
                    payload_json(kind, payload).to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} ({}) size={} peer={} payload={}",
                kind.name(),
                kind.code(),
                payload.len(),
                peer,
                payload_json(kind, payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Decode a payload into JSON for display, following the kind's payload
/// family: fixed records for the bridge/gesture kinds, value sequences
/// for everything else. Undecodable bytes degrade to a size note rather
/// than failing the print.
fn payload_json(kind: MessageKind, payload: &[u8]) -> serde_json::Value {
    match kind {
        MessageKind::Release => ReleaseRecord::decode(payload)
            .map(|record| serde_json::json!({ "ref": record.0 }))
            .unwrap_or_else(|_| binary_note(payload)),
        MessageKind::ContentReady => ContentReady::decode(payload)
            .map(|record| serde_json::json!({ "context": record.0 }))
            .unwrap_or_else(|_| binary_note(payload)),
        MessageKind::ScrollEvent => ScrollEvent::decode(payload)
            .map(|event| serde_json::json!({ "dx": event.dx, "dy": event.dy }))
            .unwrap_or_else(|_| binary_note(payload)),
        _ => wire::decode(payload)
            .map(|values| values_to_json(&values))
            .unwrap_or_else(|_| binary_note(payload)),
    }
}

fn binary_note(payload: &[u8]) -> serde_json::Value {
    serde_json::Value::String(format!("<binary {} bytes>", payload.len()))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
