//! Synchronous transport to the admin daemon.
//!
//! The reply notation is self-delimiting, so framing needs no suffix or
//! buffer-size heuristics: bytes accumulate until `decode_prefix` yields one
//! complete top-level value.
//!
//! Authenticated calls follow the daemon's challenge/response scheme: fetch a
//! cookie, hash the password with it, then replace the hash with a digest of
//! the request's own final serialization.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use meshmap_wire::{decode_prefix, encode, DumpPage, RawTableRow, Value, WireError};

const DEFAULT_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 11234;
const RECV_TIMEOUT: Duration = Duration::from_secs(10);
const DUMP_FUNCTION: &str = "NodeStore_dumpTable";

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub password: String,
}

fn default_addr() -> String {
    DEFAULT_ADDR.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Credentials {
    /// Merge CLI flags over the credentials file. A password flag alone is
    /// enough; otherwise the file (explicit path or `~/.meshmapadmin`) must
    /// supply one.
    pub fn resolve(
        addr: Option<&str>,
        port: Option<u16>,
        password: Option<&str>,
        config: Option<&Path>,
    ) -> Result<Credentials> {
        let mut credentials = if let Some(password) = password {
            Credentials {
                addr: default_addr(),
                port: DEFAULT_PORT,
                password: password.to_string(),
            }
        } else {
            let path = match config {
                Some(path) => path.to_path_buf(),
                None => default_config_path()?,
            };
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading credentials file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing credentials file {}", path.display()))?
        };
        if let Some(addr) = addr {
            credentials.addr = addr.to_string();
        }
        if let Some(port) = port {
            credentials.port = port;
        }
        Ok(credentials)
    }
}

fn default_config_path() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME is not set; pass --config or --password")?;
    Ok(PathBuf::from(home).join(".meshmapadmin"))
}

pub struct AdminSession {
    stream: TcpStream,
    password: String,
}

impl AdminSession {
    pub fn connect(credentials: &Credentials) -> Result<AdminSession> {
        let stream = TcpStream::connect((credentials.addr.as_str(), credentials.port))
            .with_context(|| {
                format!(
                    "connecting to admin daemon at {}:{}",
                    credentials.addr, credentials.port
                )
            })?;
        stream
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("setting socket read timeout")?;
        Ok(AdminSession {
            stream,
            password: credentials.password.to_string(),
        })
    }

    /// Fetch every page of the routing table and merge the rows.
    pub fn dump_all_pages(&mut self) -> Result<Vec<RawTableRow>> {
        let mut rows = Vec::new();
        let mut page: i64 = 0;
        loop {
            let dump = self.dump_table_page(page)?;
            tracing::debug!(page, rows = dump.rows.len(), "decoded table page");
            rows.extend(dump.rows);
            if !dump.more {
                break;
            }
            page += 1;
        }
        Ok(rows)
    }

    fn dump_table_page(&mut self, page: i64) -> Result<DumpPage> {
        let mut args = BTreeMap::new();
        args.insert(b"page".to_vec(), Value::Int(page));
        let reply = self.call_authed(DUMP_FUNCTION, Value::Dict(args))?;
        Ok(DumpPage::from_value(&reply)?)
    }

    fn cookie(&mut self) -> Result<String> {
        let mut request = BTreeMap::new();
        request.insert(b"q".to_vec(), Value::Bytes(b"cookie".to_vec()));
        let reply = self.roundtrip(&Value::Dict(request))?;
        reply
            .get(b"cookie")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cookie reply is missing the `cookie` key"))
    }

    fn call_authed(&mut self, function: &str, args: Value) -> Result<Value> {
        let cookie = self.cookie()?;
        let request = authed_request(&self.password, &cookie, function, args);
        self.roundtrip(&request)
    }

    fn roundtrip(&mut self, request: &Value) -> Result<Value> {
        self.stream
            .write_all(&encode(request))
            .context("sending admin request")?;

        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if !buffer.is_empty() {
                match decode_prefix(&buffer) {
                    Ok((value, used)) => {
                        if used != buffer.len() {
                            tracing::debug!(
                                extra = buffer.len() - used,
                                "bytes past the reply's structural end"
                            );
                        }
                        return Ok(value);
                    }
                    // A prefix of a valid value: keep reading.
                    Err(WireError::UnexpectedEof { .. }) => {}
                    Err(err) => return Err(err).context("malformed admin reply"),
                }
            }
            let n = self.stream.read(&mut chunk).context("reading admin reply")?;
            if n == 0 {
                bail!("connection closed before a complete reply");
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Build the daemon's authed request envelope.
///
/// The hash field is written twice: first `sha256(password + cookie)`, then,
/// with the request fully serialized around that placeholder, the digest of
/// the serialization itself.
fn authed_request(password: &str, cookie: &str, function: &str, args: Value) -> Value {
    let mut request = BTreeMap::new();
    request.insert(b"q".to_vec(), Value::Bytes(b"auth".to_vec()));
    request.insert(b"aq".to_vec(), Value::Bytes(function.as_bytes().to_vec()));
    request.insert(b"args".to_vec(), args);
    request.insert(
        b"cookie".to_vec(),
        Value::Bytes(cookie.as_bytes().to_vec()),
    );

    let first = sha256_hex(&[password.as_bytes(), cookie.as_bytes()]);
    request.insert(b"hash".to_vec(), Value::Bytes(first.into_bytes()));

    let mut request = Value::Dict(request);
    let serialized = encode(&request);
    let sealed = sha256_hex(&[&serialized]);
    if let Value::Dict(map) = &mut request {
        map.insert(b"hash".to_vec(), Value::Bytes(sealed.into_bytes()));
    }
    request
}

fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authed_request_hash_seals_its_own_serialization() {
        let mut args = BTreeMap::new();
        args.insert(b"page".to_vec(), Value::Int(0));
        let request = authed_request("hunter2", "12345", "NodeStore_dumpTable", Value::Dict(args));

        let sealed = request
            .get(b"hash")
            .and_then(Value::as_str)
            .expect("hash field")
            .to_string();
        assert_eq!(sealed.len(), 64);

        // Reconstruct the placeholder form and check the seal.
        let mut placeholder = request.clone();
        let first = sha256_hex(&[b"hunter2", b"12345"]);
        if let Value::Dict(map) = &mut placeholder {
            map.insert(b"hash".to_vec(), Value::Bytes(first.into_bytes()));
        }
        assert_eq!(sealed, sha256_hex(&[&encode(&placeholder)]));
    }

    #[test]
    fn credentials_flags_override_the_defaults() {
        let credentials =
            Credentials::resolve(Some("10.0.0.1"), Some(4242), Some("pw"), None).expect("flags");
        assert_eq!(credentials.addr, "10.0.0.1");
        assert_eq!(credentials.port, 4242);
        assert_eq!(credentials.password, "pw");
    }
}
