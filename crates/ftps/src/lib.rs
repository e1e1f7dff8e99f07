//! Implicit-TLS FTP client for printer file transfer.
//!
//! Bambu printers run an FTPS server on port 990 that is TLS from the
//! first byte (no `AUTH TLS` upgrade) and has two quirks the client
//! must work around:
//!
//! - the address in the `PASV` reply is sometimes stale, so the data
//!   channel always dials the control-connection host and only honors
//!   the advertised port;
//! - the data channel must resume the control channel's TLS session so
//!   the server can associate it with the authenticated session. Both
//!   channels are wrapped with the same shared [`rustls::ClientConfig`],
//!   whose client session cache provides the resumption.
//!
//! The client is synchronous; callers on the async side run it under
//! `spawn_blocking`.

mod reply;
mod session;

pub use reply::Reply;
pub use session::FtpsSession;

/// Errors produced by the transfer client.
///
/// A server rejection carries the protocol reply verbatim; connect and
/// login failures are fatal for the current upload and are never
/// retried here.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("invalid server name: {0}")]
    ServerName(#[from] rustls::pki_types::InvalidDnsNameError),

    #[error("cannot resolve {0}")]
    Resolve(String),

    #[error("malformed server reply: {0:?}")]
    MalformedReply(String),

    #[error("server rejected {command}: {code} {message}")]
    Rejected {
        command: String,
        code: u16,
        message: String,
    },
}
