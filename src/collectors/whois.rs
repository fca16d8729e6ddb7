//! WHOIS collector: accumulates the numeric burst a `WHOIS <nick>` triggers
//! until `RPL_ENDOFWHOIS` (spec.md §4.4).

use ircproto::Response;

/// Everything a WHOIS reply can tell us about one nickname.
#[derive(Clone, Debug, Default)]
pub struct WhoisInfo {
    pub nickname: String,
    pub username: String,
    pub hostname: String,
    pub realname: String,
    pub server: String,
    pub server_info: String,
    pub is_operator: bool,
    pub idle_seconds: Option<u64>,
    pub channels: Vec<String>,
    pub away_message: Option<String>,
}

/// Accumulates one in-flight WHOIS request for a nickname until
/// `RPL_ENDOFWHOIS` closes it out.
#[derive(Clone, Debug)]
pub struct WhoisCollector {
    pub nickname: String,
    pub info: WhoisInfo,
    pub done: bool,
}

impl WhoisCollector {
    pub fn new(nickname: String) -> WhoisCollector {
        WhoisCollector {
            info: WhoisInfo {
                nickname: nickname.clone(),
                ..WhoisInfo::default()
            },
            nickname,
            done: false,
        }
    }

    /// Feeds one numeric reply's parameters (not including the leading
    /// target-nick param addressed to us). Returns `true` once
    /// `RPL_ENDOFWHOIS` has been consumed and `self.info` is final.
    pub fn feed(&mut self, response: Response, params: &[String]) -> bool {
        match response {
            Response::RPL_WHOISUSER => {
                if params.len() >= 4 {
                    self.info.username = params[1].clone();
                    self.info.hostname = params[2].clone();
                    self.info.realname = params[3].clone();
                }
            }
            Response::RPL_WHOISSERVER => {
                if params.len() >= 2 {
                    self.info.server = params[0].clone();
                    self.info.server_info = params[1].clone();
                }
            }
            Response::RPL_WHOISOPERATOR => self.info.is_operator = true,
            Response::RPL_WHOISIDLE => {
                if let Some(secs) = params.first().and_then(|s| s.parse().ok()) {
                    self.info.idle_seconds = Some(secs);
                }
            }
            Response::RPL_WHOISCHANNELS => {
                if let Some(list) = params.first() {
                    self.info.channels = list.split_whitespace().map(String::from).collect();
                }
            }
            Response::RPL_AWAY => {
                if let Some(msg) = params.first() {
                    self.info.away_message = Some(msg.clone());
                }
            }
            Response::RPL_ENDOFWHOIS => self.done = true,
            _ => {}
        }
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_the_whois_numeric_burst() {
        let mut collector = WhoisCollector::new("bob".into());
        assert!(!collector.feed(Response::RPL_WHOISUSER, &["bob".into(), "b".into(), "h".into(), "Bob".into()]));
        assert!(!collector.feed(Response::RPL_WHOISSERVER, &["irc.example.net".into(), "a server".into()]));
        assert!(!collector.feed(Response::RPL_WHOISIDLE, &["42".into()]));
        assert!(collector.feed(Response::RPL_ENDOFWHOIS, &[]));
        assert_eq!(collector.info.hostname, "h");
        assert_eq!(collector.info.idle_seconds, Some(42));
        assert!(collector.done);
    }
}
