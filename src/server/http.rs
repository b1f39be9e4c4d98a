use std::io::BufRead;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
}

impl Request {
    /// Reads the request line and headers, stopping at the blank line.
    ///
    /// Bodies are never read; none of the endpoints take one.
    pub fn read_from(mut reader: impl BufRead) -> Result<Request> {
        let Some(request_line) = read_line(&mut reader)? else {
            return Err(Error::MalformedRequest(
                "connection closed before a request line arrived".to_string(),
            ));
        };
        while let Some(header) = read_line(&mut reader)? {
            if header.is_empty() {
                break;
            }
        }
        let request_line = String::from_utf8(request_line).map_err(|_| {
            Error::MalformedRequest("request line is not valid UTF-8".to_string())
        })?;
        Request::parse_request_line(&request_line)
    }

    pub fn parse_request_line(line: &str) -> Result<Request> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version), None) if version.starts_with("HTTP/") => {
                Ok(Request {
                    method: method.to_string(),
                    target: target.to_string(),
                })
            }
            _ => Err(Error::MalformedRequest(format!("bad request line {line:?}"))),
        }
    }
}

/// One line without its `\n` or `\r\n`, or `None` at end of stream.
fn read_line(reader: &mut impl BufRead) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: String,
    /// Sent back as `X-Instance-Id` so clients can see which controller answered.
    pub instance_id: Option<u64>,
}

impl Response {
    pub fn new(status: Status, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            instance_id: None,
        }
    }

    pub fn with_instance(mut self, instance_id: u64) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(Status::Ok, body)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut extra_headers = String::new();
        if self.status == Status::MethodNotAllowed {
            extra_headers.push_str("Allow: GET\r\n");
        }
        if let Some(instance_id) = self.instance_id {
            extra_headers.push_str(&format!("X-Instance-Id: {instance_id}\r\n"));
        }
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=UTF-8\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
            self.status.code(),
            self.status.reason(),
            self.body.len(),
            extra_headers,
            self.body,
        )
        .into_bytes()
    }
}
