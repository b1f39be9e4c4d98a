use log::debug;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub instance_id: Option<u64>,
    pub body: String,
}

/// Sends one `GET` and reads until the server closes the connection.
pub async fn get(host: &str, port: u16, path: &str) -> Result<HttpResponse> {
    let mut stream = TcpStream::connect((host, port)).await?;
    debug!("connected to {host}:{port} for {path}");
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: {host}:{port}\r\nUser-Agent: request_spammer\r\nAccept: */*\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    parse_response(&raw)
}

pub fn parse_response(raw: &[u8]) -> Result<HttpResponse> {
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .ok_or_else(|| Error::MalformedResponse("no end of headers".to_string()))?;
    let head = std::str::from_utf8(&raw[..split])
        .map_err(|_| Error::MalformedResponse("headers are not utf-8".to_string()))?;
    let mut body = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = match status_line.split_whitespace().collect::<Vec<_>>().as_slice() {
        [version, code, ..] if version.starts_with("HTTP/") => code
            .parse::<u16>()
            .map_err(|_| Error::MalformedResponse(format!("bad status code in {status_line:?}")))?,
        _ => {
            return Err(Error::MalformedResponse(format!(
                "bad status line {status_line:?}"
            )))
        }
    };

    let mut instance_id = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            let length = value
                .parse::<usize>()
                .map_err(|_| Error::MalformedResponse(format!("bad content length {value:?}")))?;
            if length > body.len() {
                return Err(Error::MalformedResponse(format!(
                    "expected {length} body bytes, got {}",
                    body.len()
                )));
            }
            body = &body[..length];
        } else if name.eq_ignore_ascii_case("x-instance-id") {
            instance_id = value.parse().ok();
        }
    }

    Ok(HttpResponse {
        status,
        instance_id,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_server_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=UTF-8\r\nContent-Length: 10\r\nX-Instance-Id: 3\r\nConnection: close\r\n\r\nJJJJJJJJJJ";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.instance_id, Some(3));
        assert_eq!(response.body, "JJJJJJJJJJ");
    }

    #[test]
    fn body_without_length_runs_to_the_end() {
        let response = parse_response(b"HTTP/1.0 500 Oops\r\n\r\nboom").unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.instance_id, None);
        assert_eq!(response.body, "boom");
    }

    #[test]
    fn rejects_truncated_or_garbled_responses() {
        assert!(parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").is_err());
        assert!(parse_response(b"HTTP/1.1 200 OK\r\n").is_err());
        assert!(parse_response(b"SPDY nope\r\n\r\n").is_err());
    }
}
