//! FTP control-channel reply parsing.

use std::io::BufRead;

use crate::TransferError;

/// A parsed control-channel reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    /// 1xx: the transfer is about to start.
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx: the command completed.
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: the server wants the next command of a sequence.
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

/// Reads one reply, following RFC 959 multiline framing: a reply
/// starting `nnn-` runs until a line starting `nnn ` (space).
pub(crate) fn read_reply(reader: &mut impl BufRead) -> Result<Reply, TransferError> {
    let first = read_line(reader)?;
    if first.len() < 4 {
        return Err(TransferError::MalformedReply(first));
    }
    let code: u16 = first[..3]
        .parse()
        .map_err(|_| TransferError::MalformedReply(first.clone()))?;

    let mut text = first[4..].to_string();
    if first.as_bytes()[3] == b'-' {
        let terminator = format!("{code} ");
        loop {
            let line = read_line(reader)?;
            let done = line.starts_with(&terminator);
            // Strip the terminator once; the rest of the line is
            // server text and stays verbatim.
            let rest = line.strip_prefix(&terminator).unwrap_or(line.as_str());
            text.push('\n');
            text.push_str(rest);
            if done {
                break;
            }
        }
    }

    Ok(Reply { code, text })
}

fn read_line(reader: &mut impl BufRead) -> Result<String, TransferError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(TransferError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "control connection closed",
        )));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Extracts the data port from a `227 Entering Passive Mode
/// (h1,h2,h3,h4,p1,p2)` reply.
///
/// The host fields are deliberately ignored: printer firmware has been
/// seen advertising a stale address there, so the caller always dials
/// the control-connection host instead.
pub(crate) fn parse_pasv_port(text: &str) -> Option<u16> {
    let start = text.find('(')?;
    let end = text[start..].find(')')? + start;
    let fields: Vec<&str> = text[start + 1..end].split(',').collect();
    if fields.len() != 6 {
        return None;
    }
    // Each port field is one octet; anything larger is not a valid
    // PASV reply.
    let high: u8 = fields[4].trim().parse().ok()?;
    let low: u8 = fields[5].trim().parse().ok()?;
    Some(u16::from(high) * 256 + u16::from(low))
}
