//! Minimal implicit-TLS FTP server for exercising the transfer client
//! and the upload pipeline without a printer.
//!
//! Implements just the commands the relay issues (USER/PASS, PBSZ,
//! PROT, TYPE, PASV, STOR, RETR, QUIT) and mimics the firmware quirk
//! the client must handle: the PASV reply advertises a bogus host
//! (203.0.113.9), so a client that honors it can never connect.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use rustls::{ServerConfig, ServerConnection, StreamOwned};

type TlsStream = StreamOwned<ServerConnection, TcpStream>;
type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

pub struct MockFtps {
    addr: SocketAddr,
    files: Files,
}

impl MockFtps {
    /// Starts the server on an ephemeral port with a fresh self-signed
    /// certificate.
    pub fn start() -> Self {
        let config = crate::mock_tls::server_config();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let files: Files = Arc::new(Mutex::new(HashMap::new()));

        {
            let config = config.clone();
            let files = files.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    let config = config.clone();
                    let files = files.clone();
                    thread::spawn(move || {
                        let _ = session(stream, config, files);
                    });
                }
            });
        }

        Self { addr, files }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the stored content of `path`, if any.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

fn session(tcp: TcpStream, config: Arc<ServerConfig>, files: Files) -> std::io::Result<()> {
    let conn = ServerConnection::new(config.clone()).expect("server connection");
    let mut ctrl = BufReader::new(StreamOwned::new(conn, tcp));
    reply(&mut ctrl, "220 mock ftps ready")?;

    let mut data_listener: Option<TcpListener> = None;

    loop {
        let mut line = String::new();
        if ctrl.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

        match cmd.to_ascii_uppercase().as_str() {
            "USER" => reply(&mut ctrl, "331 send password")?,
            "PASS" => reply(&mut ctrl, "230 logged in")?,
            "PBSZ" => reply(&mut ctrl, "200 PBSZ=0")?,
            "PROT" => reply(&mut ctrl, "200 protection level set")?,
            "TYPE" => reply(&mut ctrl, "200 type set")?,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0")?;
                let port = listener.local_addr()?.port();
                data_listener = Some(listener);
                // Bogus host on purpose; only the port is real.
                reply(
                    &mut ctrl,
                    &format!(
                        "227 Entering Passive Mode (203,0,113,9,{},{})",
                        port >> 8,
                        port & 0xff
                    ),
                )?;
            }
            "STOR" => match data_listener.take() {
                Some(listener) => {
                    reply(&mut ctrl, "150 ok to send data")?;
                    let mut data = accept_data(&listener, &config)?;
                    let mut content = Vec::new();
                    data.read_to_end(&mut content)?;
                    files.lock().unwrap().insert(arg.to_string(), content);
                    reply(&mut ctrl, "226 transfer complete")?;
                }
                None => reply(&mut ctrl, "425 use PASV first")?,
            },
            "RETR" => {
                let content = files.lock().unwrap().get(arg).cloned();
                match (content, data_listener.take()) {
                    (Some(content), Some(listener)) => {
                        reply(&mut ctrl, "150 opening data connection")?;
                        let mut data = accept_data(&listener, &config)?;
                        data.write_all(&content)?;
                        data.conn.send_close_notify();
                        data.flush()?;
                        drop(data);
                        reply(&mut ctrl, "226 transfer complete")?;
                    }
                    (None, _) => reply(&mut ctrl, "550 no such file")?,
                    (_, None) => reply(&mut ctrl, "425 use PASV first")?,
                }
            }
            "QUIT" => {
                reply(&mut ctrl, "221 goodbye")?;
                return Ok(());
            }
            _ => reply(&mut ctrl, "502 command not implemented")?,
        }
    }
}

fn accept_data(listener: &TcpListener, config: &Arc<ServerConfig>) -> std::io::Result<TlsStream> {
    let (tcp, _) = listener.accept()?;
    let conn = ServerConnection::new(config.clone()).expect("server connection");
    Ok(StreamOwned::new(conn, tcp))
}

fn reply(ctrl: &mut BufReader<TlsStream>, line: &str) -> std::io::Result<()> {
    let stream = ctrl.get_mut();
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\r\n")?;
    stream.flush()
}
