#![allow(dead_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use image::{DynamicImage, RgbImage};
use sheetscan_grid::TextFragment;
use tiny_http::{Response, Server};

/// Local stand-in for a chat-completions endpoint. Every request gets the
/// same status and body; request bodies are forwarded to `requests`.
pub struct MockChat {
    pub url: String,
    requests: Receiver<String>,
}

impl MockChat {
    pub fn next_request(&self) -> Option<String> {
        self.requests.recv_timeout(Duration::from_secs(5)).ok()
    }
}

pub fn spawn_chat_server(status: u16, body: String) -> MockChat {
    spawn_delayed_chat_server(Duration::ZERO, status, body)
}

/// Like [`spawn_chat_server`], but waits `delay` before answering each request.
pub fn spawn_delayed_chat_server(delay: Duration, status: u16, body: String) -> MockChat {
    let server = Server::http("127.0.0.1:0").expect("mock server should bind");
    let port = server
        .server_addr()
        .to_ip()
        .expect("mock server listens on tcp")
        .port();
    let (sender, requests) = mpsc::channel();

    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut received = String::new();
            let _ = request.as_reader().read_to_string(&mut received);
            let _ = sender.send(received);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            let response = Response::from_string(body.clone()).with_status_code(status);
            let _ = request.respond(response);
        }
    });

    MockChat {
        url: format!("http://127.0.0.1:{port}/v1/chat/completions"),
        requests,
    }
}

pub fn chat_reply(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}}
        ]
    })
    .to_string()
}

pub fn write_image(dir: &Path) -> PathBuf {
    let path = dir.join("table.png");
    DynamicImage::ImageRgb8(RgbImage::new(16, 16))
        .save(&path)
        .expect("image should be written");
    path
}

/// Writes one fragment per cell, rows 40 pixels apart, as a fragments file.
pub fn write_fragments(dir: &Path, rows: &[&[&str]]) -> PathBuf {
    let mut fragments = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        for (column_index, text) in row.iter().enumerate() {
            let x = 10.0 + column_index as f64 * 100.0;
            let y = 10.0 + row_index as f64 * 40.0;
            fragments.push(TextFragment::from_rect(x, y, 80.0, 16.0, *text));
        }
    }

    let path = dir.join("fragments.json");
    let json = serde_json::to_string(&fragments).expect("fragments should serialize");
    std::fs::write(&path, json).expect("fragments should be written");
    path
}

pub fn read_zip_entry(path: &Path, name: &str) -> Result<String, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(name)?;
    let mut body = String::new();
    entry.read_to_string(&mut body)?;
    Ok(body)
}
