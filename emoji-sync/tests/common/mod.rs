#![allow(dead_code)]

//! A tiny HTTP/1.1 server standing in for the Discord REST API.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const GUILD_ID: &str = "111";
pub const TOKEN: &str = "good-token";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub audit_reason: Option<String>,
    pub body: String,
}

#[derive(Clone)]
pub struct FakeDiscord {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeDiscord {
    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts the server with a guild holding `listing`.
pub async fn start(listing: Value) -> FakeDiscord {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = FakeDiscord {
        addr: listener.local_addr().unwrap(),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let requests = Arc::clone(&server.requests);
    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let requests = Arc::clone(&requests);
            let listing = listing.clone();
            tokio::spawn(async move {
                let _ = handle(sock, requests, listing).await;
            });
        }
    });
    server
}

pub fn emoji(name: &str, id: &str, managed: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "roles": [],
        "require_colons": true,
        "managed": managed,
        "animated": false,
        "available": true
    })
}

async fn handle(
    mut sock: TcpStream,
    requests: Arc<Mutex<Vec<Recorded>>>,
    listing: Value,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut start = lines.next().unwrap_or_default().split_whitespace();
    let method = start.next().unwrap_or_default().to_string();
    let path = start.next().unwrap_or_default().to_string();
    let mut content_length = 0;
    let mut auth = None;
    let mut audit_reason = None;
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            let v = v.trim().to_string();
            match k.to_ascii_lowercase().as_str() {
                "content-length" => content_length = v.parse().unwrap_or(0),
                "authorization" => auth = Some(v),
                "x-audit-log-reason" => audit_reason = Some(v),
                _ => {}
            }
        }
    }
    while buf.len() < header_end + content_length {
        let n = sock.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        audit_reason,
        body: body.clone(),
    });

    let emojis = format!("/api/guilds/{GUILD_ID}/emojis");
    let expected_auth = format!("Bot {TOKEN}");
    let (status, payload) = if auth.as_deref() != Some(expected_auth.as_str()) {
        ("401 Unauthorized", Some(json!({"message": "401: Unauthorized", "code": 0})))
    } else if method == "GET" && path == "/api/users/@me" {
        ("200 OK", Some(json!({"id": "42", "username": "emoji-bot", "bot": true})))
    } else if method == "GET" && path == emojis {
        ("200 OK", Some(listing))
    } else if method == "POST" && path == emojis {
        let req: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let name = req["name"].as_str().unwrap_or_default();
        ("201 Created", Some(emoji(name, "900", false)))
    } else if method == "PATCH" && path.starts_with(&format!("{emojis}/")) {
        let req: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let name = req["name"].as_str().unwrap_or_default();
        let id = path.rsplit('/').next().unwrap_or_default();
        ("200 OK", Some(emoji(name, id, false)))
    } else if method == "DELETE" && path.starts_with(&format!("{emojis}/")) {
        ("204 No Content", None)
    } else {
        ("404 Not Found", Some(json!({"message": "Unknown route"})))
    };

    let body = payload.map(|p| p.to_string()).unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    sock.write_all(response.as_bytes()).await?;
    sock.shutdown().await
}
