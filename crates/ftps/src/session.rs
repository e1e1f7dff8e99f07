//! The FTPS session itself.

use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};

use crate::TransferError;
use crate::reply::{self, Reply};

type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// One authenticated session with a printer's FTPS server.
///
/// The control connection is TLS-wrapped from the first byte (implicit
/// TLS), and every data channel is wrapped with the same client config
/// so it resumes the control channel's TLS session. The session sends
/// a best-effort `QUIT` on drop, so it is cleaned up on error paths as
/// well as on [`quit`](Self::quit).
pub struct FtpsSession {
    host: String,
    timeout: Duration,
    tls: Arc<ClientConfig>,
    ctrl: BufReader<TlsStream>,
    closed: bool,
}

impl FtpsSession {
    /// Connects to `host:port` and reads the server greeting.
    ///
    /// `timeout` bounds the TCP connect and is installed as the read
    /// and write timeout of every socket the session opens.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransferError> {
        let tls = pandaprint_tls::client_config();
        let tcp = dial(host, port, timeout)?;
        let ctrl = BufReader::new(wrap(&tls, host, tcp)?);

        let mut session = Self {
            host: host.to_string(),
            timeout,
            tls,
            ctrl,
            closed: false,
        };

        let greeting = reply::read_reply(&mut session.ctrl)?;
        if greeting.code != 220 {
            session.closed = true;
            return Err(rejected("connect", greeting));
        }
        tracing::debug!(host, port, "ftps control connection established");
        Ok(session)
    }

    /// Logs in with the given credentials.
    pub fn login(&mut self, user: &str, password: &str) -> Result<(), TransferError> {
        let reply = self.expect(&format!("USER {user}"), &[230, 331])?;
        if reply.code == 331 {
            let reply = self.command(&format!("PASS {password}"))?;
            if !reply.is_completion() {
                // Command redacted so the pre-shared key never lands in
                // an error message.
                return Err(rejected("PASS", reply));
            }
        }
        Ok(())
    }

    /// Switches the data channel to private (encrypted) mode.
    pub fn enable_private_data(&mut self) -> Result<(), TransferError> {
        self.expect("PBSZ 0", &[200])?;
        self.expect("PROT P", &[200])?;
        Ok(())
    }

    /// Stores `content` at `remote_path`, overwriting any existing file.
    pub fn store(&mut self, remote_path: &str, content: &[u8]) -> Result<(), TransferError> {
        self.expect("TYPE I", &[200])?;
        let mut data = self.open_data_channel()?;

        let cmd = format!("STOR {remote_path}");
        let reply = self.command(&cmd)?;
        if !reply.is_preliminary() {
            return Err(rejected(&cmd, reply));
        }

        data.write_all(content)?;
        data.conn.send_close_notify();
        data.flush()?;
        drop(data);

        let reply = reply::read_reply(&mut self.ctrl)?;
        if !reply.is_completion() {
            return Err(rejected(&cmd, reply));
        }
        tracing::debug!(remote_path, bytes = content.len(), "stored file");
        Ok(())
    }

    /// Retrieves the file at `remote_path`.
    pub fn retrieve(&mut self, remote_path: &str) -> Result<Vec<u8>, TransferError> {
        self.expect("TYPE I", &[200])?;
        let mut data = self.open_data_channel()?;

        let cmd = format!("RETR {remote_path}");
        let reply = self.command(&cmd)?;
        if !reply.is_preliminary() {
            return Err(rejected(&cmd, reply));
        }

        let mut content = Vec::new();
        match data.read_to_end(&mut content) {
            Ok(_) => {}
            // A server that closes without close_notify has still
            // delivered the full payload.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {}
            Err(e) => return Err(e.into()),
        }
        drop(data);

        let reply = reply::read_reply(&mut self.ctrl)?;
        if !reply.is_completion() {
            return Err(rejected(&cmd, reply));
        }
        Ok(content)
    }

    /// Ends the session cleanly.
    pub fn quit(mut self) -> Result<(), TransferError> {
        self.expect("QUIT", &[221])?;
        self.closed = true;
        Ok(())
    }

    /// Opens a passive-mode data channel.
    ///
    /// The host in the PASV reply is ignored; the control-connection
    /// host is always dialed. Only the advertised port is honored.
    fn open_data_channel(&mut self) -> Result<TlsStream, TransferError> {
        let reply = self.expect("PASV", &[227])?;
        let port = reply::parse_pasv_port(&reply.text)
            .ok_or_else(|| TransferError::MalformedReply(reply.text.clone()))?;
        let tcp = dial(&self.host, port, self.timeout)?;
        wrap(&self.tls, &self.host, tcp)
    }

    /// Sends one command and reads the reply.
    fn command(&mut self, cmd: &str) -> Result<Reply, TransferError> {
        // First token only; PASS carries the pre-shared key.
        tracing::trace!(command = cmd.split(' ').next().unwrap_or(cmd), "ftps command");
        let stream = self.ctrl.get_mut();
        stream.write_all(cmd.as_bytes())?;
        stream.write_all(b"\r\n")?;
        stream.flush()?;
        reply::read_reply(&mut self.ctrl)
    }

    /// Sends `cmd` and requires one of the `ok` reply codes.
    fn expect(&mut self, cmd: &str, ok: &[u16]) -> Result<Reply, TransferError> {
        let reply = self.command(cmd)?;
        if ok.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(rejected(cmd, reply))
        }
    }
}

impl Drop for FtpsSession {
    fn drop(&mut self) {
        if !self.closed {
            let stream = self.ctrl.get_mut();
            let _ = stream.write_all(b"QUIT\r\n");
            let _ = stream.flush();
            stream.conn.send_close_notify();
            let _ = stream.flush();
        }
    }
}

fn rejected(command: &str, reply: Reply) -> TransferError {
    TransferError::Rejected {
        command: command.to_string(),
        code: reply.code,
        message: reply.text,
    }
}

fn dial(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, TransferError> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| TransferError::Resolve(host.to_string()))?;
    let tcp = TcpStream::connect_timeout(&addr, timeout)?;
    tcp.set_read_timeout(Some(timeout))?;
    tcp.set_write_timeout(Some(timeout))?;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

/// Wraps a socket in TLS using the shared client config.
fn wrap(tls: &Arc<ClientConfig>, host: &str, tcp: TcpStream) -> Result<TlsStream, TransferError> {
    let name = ServerName::try_from(host.to_string())?;
    let conn = ClientConnection::new(tls.clone(), name)?;
    Ok(StreamOwned::new(conn, tcp))
}
