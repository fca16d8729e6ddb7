//! DNS collector: resolves a nickname's address by chaining a WHOIS lookup
//! (for its hostname) into a DNS resolution (spec.md §4.4: "given a
//! nickname, it first performs WHOIS to obtain host name, then resolves the
//! host and returns the address line").

use std::net::IpAddr;

use crate::collectors::whois::WhoisCollector;

/// The two-step state of one `/DNS <nick>` request.
pub enum DnsCollector {
    AwaitingWhois(WhoisCollector),
    Resolved { nickname: String, hostname: String, address: Option<IpAddr> },
}

impl DnsCollector {
    pub fn new(nickname: String) -> DnsCollector {
        DnsCollector::AwaitingWhois(WhoisCollector::new(nickname))
    }

    /// Feeds a WHOIS numeric while in the `AwaitingWhois` stage. Returns the
    /// hostname to resolve once the underlying WHOIS completes.
    pub fn feed_whois(&mut self, response: ircproto::Response, params: &[String]) -> Option<String> {
        if let DnsCollector::AwaitingWhois(whois) = self {
            if whois.feed(response, params) {
                let hostname = whois.info.hostname.clone();
                let nickname = whois.nickname.clone();
                *self = DnsCollector::Resolved { nickname, hostname: hostname.clone(), address: None };
                return Some(hostname);
            }
        }
        None
    }

    /// Records the resolved address once the caller's resolver finishes.
    pub fn set_address(&mut self, address: IpAddr) {
        if let DnsCollector::Resolved { address: slot, .. } = self {
            *slot = Some(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_whois_into_resolution() {
        let mut dns = DnsCollector::new("bob".into());
        let hostname = dns.feed_whois(
            ircproto::Response::RPL_WHOISUSER,
            &["bob".into(), "b".into(), "host.example.com".into(), "Bob".into()],
        );
        assert_eq!(hostname, None);
        let hostname = dns.feed_whois(ircproto::Response::RPL_ENDOFWHOIS, &[]);
        assert_eq!(hostname, Some("host.example.com".to_string()));
        dns.set_address("127.0.0.1".parse().unwrap());
        match dns {
            DnsCollector::Resolved { address, .. } => assert_eq!(address, Some("127.0.0.1".parse().unwrap())),
            _ => panic!("expected resolved"),
        }
    }
}
