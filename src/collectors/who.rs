//! WHO collector: per-channel-join batching with a net-split heuristic
//! (spec.md §4.4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ircproto::Response;

/// One row of a `RPL_WHOREPLY`.
#[derive(Clone, Debug)]
pub struct WhoEntry {
    pub channel: String,
    pub username: String,
    pub hostname: String,
    pub server: String,
    pub nickname: String,
    pub flags: String,
    pub hopcount: u32,
    pub realname: String,
}

/// Batches per-user `WHO <nick>` requests queued right after a channel join,
/// debounced by a timer; once more than `netsplit_threshold` requests pile up
/// for the same channel, the whole batch collapses into one channel-wide
/// `WHO <channel>` (spec.md §4.4: "K ~= 'possible net split' heuristic").
pub struct WhoCollector {
    debounce: Duration,
    netsplit_threshold: usize,
    pending: HashMap<String, PendingBatch>,
}

struct PendingBatch {
    nicknames: Vec<String>,
    due: Instant,
}

/// What the caller should actually send once a batch's debounce window
/// elapses or it is forced by the net-split heuristic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WhoRequest {
    PerNick(Vec<String>),
    WholeChannel,
}

impl WhoCollector {
    pub fn new(debounce: Duration, netsplit_threshold: usize) -> WhoCollector {
        WhoCollector {
            debounce,
            netsplit_threshold,
            pending: HashMap::new(),
        }
    }

    /// Queues one nickname's WHO request for a channel. Returns
    /// `Some(WhoRequest::WholeChannel)` immediately if this push crossed the
    /// net-split threshold (the caller should send the collapsed request now
    /// and drop the pending batch); otherwise returns `None` and the batch
    /// keeps accumulating until [`Self::due`] reports it ready.
    pub fn queue(&mut self, channel: &str, nickname: String, now: Instant) -> Option<WhoRequest> {
        let due = now + self.debounce;
        let batch = self.pending.entry(channel.to_owned()).or_insert_with(|| PendingBatch {
            nicknames: Vec::new(),
            due,
        });
        batch.nicknames.push(nickname);
        if batch.nicknames.len() > self.netsplit_threshold {
            self.pending.remove(channel);
            return Some(WhoRequest::WholeChannel);
        }
        None
    }

    /// Drains every batch whose debounce window has elapsed, returning the
    /// per-nick request each should issue.
    pub fn due(&mut self, now: Instant) -> Vec<(String, WhoRequest)> {
        let ready: Vec<String> = self.pending.iter().filter(|(_, b)| b.due <= now).map(|(c, _)| c.clone()).collect();
        ready
            .into_iter()
            .filter_map(|channel| self.pending.remove(&channel).map(|b| (channel, WhoRequest::PerNick(b.nicknames))))
            .collect()
    }
}

/// Parses one `RPL_WHOREPLY` row.
pub fn parse_who_reply(params: &[String]) -> Option<WhoEntry> {
    if params.len() < 7 {
        return None;
    }
    let (hopcount, realname) = params[6].split_once(' ').unwrap_or(("0", ""));
    Some(WhoEntry {
        channel: params[0].clone(),
        username: params[1].clone(),
        hostname: params[2].clone(),
        server: params[3].clone(),
        nickname: params[4].clone(),
        flags: params[5].clone(),
        hopcount: hopcount.parse().unwrap_or(0),
        realname: realname.to_owned(),
    })
}

/// The numeric that terminates a channel's WHO burst.
pub const END_OF_WHO: Response = Response::RPL_ENDOFWHO;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_to_whole_channel_past_netsplit_threshold() {
        let mut collector = WhoCollector::new(Duration::from_secs(5), 2);
        let now = Instant::now();
        assert_eq!(collector.queue("#rust", "a".into(), now), None);
        assert_eq!(collector.queue("#rust", "b".into(), now), None);
        assert_eq!(collector.queue("#rust", "c".into(), now), Some(WhoRequest::WholeChannel));
    }

    #[test]
    fn per_nick_batch_fires_after_debounce() {
        let mut collector = WhoCollector::new(Duration::from_secs(5), 10);
        let now = Instant::now();
        collector.queue("#rust", "a".into(), now);
        assert!(collector.due(now).is_empty());
        let ready = collector.due(now + Duration::from_secs(6));
        assert_eq!(ready, vec![("#rust".to_string(), WhoRequest::PerNick(vec!["a".to_string()]))]);
    }

    #[test]
    fn parses_who_reply_row() {
        let entry = parse_who_reply(&[
            "#rust".into(),
            "bob".into(),
            "host".into(),
            "irc.example.net".into(),
            "Bob".into(),
            "H".into(),
            "3 Bobby".into(),
        ])
        .unwrap();
        assert_eq!(entry.hopcount, 3);
        assert_eq!(entry.realname, "Bobby");
    }
}
