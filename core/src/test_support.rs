use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

pub(crate) fn write_wav_fixture(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).expect("create wav fixture");
    for sample in samples {
        writer.write_sample(*sample).expect("write wav sample");
    }
    writer.finalize().expect("finalize wav fixture");
}

/// Answers exactly one HTTP request with a canned response and hands the raw
/// request text back to the test.
pub(crate) struct FakeHttpServer {
    pub url: String,
    handle: JoinHandle<String>,
}

impl FakeHttpServer {
    pub fn respond(status: u16, content_type: &str, body: &str) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral port");
        let address = listener.local_addr().expect("local addr available");
        let content_type = content_type.to_string();
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                reason_phrase(status),
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("response written");
            request
        });

        Self {
            url: format!("http://{address}"),
            handle,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::respond(status, "application/json", body)
    }

    /// Joins the server thread and returns the captured request.
    pub fn request(self) -> String {
        self.handle.join().expect("http server thread joined")
    }
}

/// Splits a captured request into its header block and body.
pub(crate) fn request_body(request: &str) -> &str {
    request
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or_default()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn read_request(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut buffer = [0_u8; 4096];
    loop {
        let read = stream.read(&mut buffer).expect("read request");
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..read]);

        if let Some(header_end) = find_header_end(&data) {
            let headers = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|window| window == b"\r\n\r\n")
}
