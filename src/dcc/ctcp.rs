//! DCC's wire sub-grammar as carried inside a CTCP `DCC` payload (spec.md
//! §4.5/§6: "All DCC messages travel in CTCP payloads within PRIVMSG").
//!
//! The original client parses this straight out of `incoming_message` on
//! `dcc_send_connection`/`dcc_connection` (`dcc_send_connection.hpp`); here
//! it is split into free functions so the engine's inbound-message handling
//! can call them without owning a `DccSend`/`DccChat` yet.

use std::net::Ipv4Addr;

use ircproto::ctcp::{self, Ctcp};

use super::{decode_dcc_address, encode_dcc_address};

/// A parsed `DCC ...` CTCP body, before any connection object exists for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DccOffer {
    Chat { address: Ipv4Addr, port: u16 },
    Send { name: String, address: Ipv4Addr, port: u16, size: u64 },
    Resume { name: String, port: u16, offset: u64 },
    Accept { name: String, port: u16, offset: u64 },
}

/// Builds the `\x01DCC CHAT chat <addr> <port>\x01` CTCP body sent when
/// offering a chat listener.
pub fn encode_chat(address: Ipv4Addr, port: u16) -> String {
    Ctcp::encode("DCC", Some(&format!("CHAT chat {} {}", encode_dcc_address(address), port)))
}

/// Builds the `\x01DCC SEND <name> <addr> <port> <size>\x01` CTCP body sent
/// when offering an upload.
pub fn encode_send(name: &str, address: Ipv4Addr, port: u16, size: u64) -> String {
    Ctcp::encode("DCC", Some(&format!("SEND {name} {} {port} {size}", encode_dcc_address(address))))
}

/// Builds the `\x01DCC RESUME <name> <port> <offset>\x01` CTCP body a
/// downloader sends to ask the uploader to continue a partial file
/// (spec.md §8 scenario E).
pub fn encode_resume(name: &str, port: u16, offset: u64) -> String {
    Ctcp::encode("DCC", Some(&format!("RESUME {name} {port} {offset}")))
}

/// Builds the `\x01DCC ACCEPT <name> <port> <offset>\x01` reply an uploader
/// sends once it agrees to a `RESUME` request.
pub fn encode_accept(name: &str, port: u16, offset: u64) -> String {
    Ctcp::encode("DCC", Some(&format!("ACCEPT {name} {port} {offset}")))
}

/// Parses a CTCP body into a [`DccOffer`], returning `None` for anything
/// that isn't a recognized `DCC` sub-command (spec.md §7: "ctcp-malformed
/// (dropped silently)").
pub fn parse(body: &str) -> Option<DccOffer> {
    let ctcp = ctcp::decode(body)?;
    if ctcp.command != "DCC" {
        return None;
    }
    let args = ctcp.args?;
    let mut parts = args.split_whitespace();
    match parts.next()? {
        "CHAT" => {
            parts.next()?; // the literal "chat" protocol token
            let address = parse_address(parts.next()?)?;
            let port = parts.next()?.parse().ok()?;
            Some(DccOffer::Chat { address, port })
        }
        "SEND" => {
            let name = parts.next()?.to_owned();
            let address = parse_address(parts.next()?)?;
            let port = parts.next()?.parse().ok()?;
            let size = parts.next()?.parse().ok()?;
            Some(DccOffer::Send { name, address, port, size })
        }
        "RESUME" => {
            let name = parts.next()?.to_owned();
            let port = parts.next()?.parse().ok()?;
            let offset = parts.next()?.parse().ok()?;
            Some(DccOffer::Resume { name, port, offset })
        }
        "ACCEPT" => {
            let name = parts.next()?.to_owned();
            let port = parts.next()?.parse().ok()?;
            let offset = parts.next()?.parse().ok()?;
            Some(DccOffer::Accept { name, port, offset })
        }
        _ => None,
    }
}

fn parse_address(token: &str) -> Option<Ipv4Addr> {
    Some(decode_dcc_address(token.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_offer_round_trips() {
        let addr: Ipv4Addr = "192.168.1.10".parse().unwrap();
        let wire = encode_send("foo.bin", addr, 1234, 1000);
        assert_eq!(parse(&wire), Some(DccOffer::Send { name: "foo.bin".into(), address: addr, port: 1234, size: 1000 }));
    }

    #[test]
    fn resume_and_accept_round_trip() {
        let wire = encode_resume("foo.bin", 1234, 400);
        assert_eq!(parse(&wire), Some(DccOffer::Resume { name: "foo.bin".into(), port: 1234, offset: 400 }));
        let wire = encode_accept("foo.bin", 1234, 400);
        assert_eq!(parse(&wire), Some(DccOffer::Accept { name: "foo.bin".into(), port: 1234, offset: 400 }));
    }

    #[test]
    fn chat_offer_round_trips() {
        let addr: Ipv4Addr = "10.0.0.1".parse().unwrap();
        let wire = encode_chat(addr, 5000);
        assert_eq!(parse(&wire), Some(DccOffer::Chat { address: addr, port: 5000 }));
    }

    #[test]
    fn non_dcc_ctcp_is_not_parsed() {
        assert_eq!(parse("\x01VERSION\x01"), None);
        assert_eq!(parse("plain text"), None);
    }
}
