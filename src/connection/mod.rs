//! The per-server connection: registration handshake, ISUPPORT tables,
//! and inbound message routing (spec.md §3 "Connection", §4.2, §4.3).

pub mod io;
pub mod manager;
pub mod reconnect;
pub mod transport;

use std::collections::HashMap;

use ircproto::{CaseMapping, ChannelExt, Command, Message, MessageKind, PrefixTable, Response};

use crate::config::{Identity, Server};
use crate::id::{BufferId, ConnectionId};
use crate::observer::ObserverList;

pub use manager::{ConnectionManager, ManagerObserver};
pub use reconnect::ReconnectPlan;

/// The connection lifecycle states spec.md §4.2 names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    Resolving,
    Connecting,
    Registering,
    Registered,
    Quitting,
    Disconnected,
    Retrying,
    GivenUp,
}

/// The destination a routed inbound message resolves to (spec.md §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteTarget {
    Server,
    Notice,
    Channel(String),
    User(String),
    /// NICK/QUIT broadcast to every buffer containing the affected user;
    /// the connection itself fans this out rather than naming one buffer.
    Broadcast,
}

/// Per-connection lifecycle and notification events a manager observer
/// reacts to (spec.md §3: "emits created/destroyed and
/// registered/quitting/disconnected/giveup").
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    Registered,
    Quitting,
    Disconnected,
    GivenUp,
    IsupportChanged,
}

/// A connection to one IRC server: registration state, ISUPPORT-derived
/// tables, and the buffer maps inbound traffic routes into.
pub struct Connection {
    pub id: ConnectionId,
    pub server: Server,
    pub identity: Identity,
    pub password: Option<String>,
    pub nickname: String,
    alternates_tried: usize,
    pub state: State,
    pub casemapping: CaseMapping,
    pub chantypes: String,
    pub prefixes: PrefixTable,
    pub server_buffer: BufferId,
    pub notice_buffer: Option<BufferId>,
    pub channel_buffers: HashMap<String, BufferId>,
    pub user_buffers: HashMap<String, BufferId>,
    pub reconnect_plan: ReconnectPlan,
    pub observers: ObserverList<Box<dyn FnMut(&ConnectionEvent) + Send>>,
    /// Whether inbound `PING`/`PONG` traffic is pushed into the server
    /// buffer, toggled by `/SHOWPINGS`/`/HIDEPINGS` (spec.md §4.3).
    pub show_pings: bool,
    /// Whether `RPL_WELCOME` triggers the auto-join watcher, toggled by
    /// `/AUTOJOIN [off]` (spec.md §4.3/§4.7).
    pub auto_join: bool,
    /// Whether a dropped connection is retried automatically at all,
    /// toggled by `/AUTOREJOIN on|off` (spec.md §4.3). Unlike
    /// `reconnect_plan`'s give-up threshold, this is an all-or-nothing gate
    /// the user sets ahead of time.
    pub auto_rejoin: bool,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        server: Server,
        identity: Identity,
        password: Option<String>,
        server_buffer: BufferId,
        reconnect_plan: ReconnectPlan,
    ) -> Connection {
        Connection {
            id,
            nickname: identity.nickname.clone(),
            server,
            identity,
            password,
            alternates_tried: 0,
            state: State::Init,
            casemapping: CaseMapping::default(),
            chantypes: ircproto::chan::DEFAULT_CHANTYPES.to_owned(),
            prefixes: PrefixTable::default(),
            server_buffer,
            notice_buffer: None,
            channel_buffers: HashMap::new(),
            user_buffers: HashMap::new(),
            reconnect_plan,
            observers: ObserverList::new(),
            show_pings: false,
            auto_join: true,
            auto_rejoin: true,
        }
    }

    /// The PASS/NICK/USER sequence sent immediately once the socket is
    /// established (spec.md §4.2: "on established, sends optional PASS then
    /// NICK then USER").
    pub fn registration_messages(&self) -> Vec<Message> {
        let mut out = Vec::new();
        if let Some(password) = &self.password {
            out.push(Message::from_command(None, Command::Pass(password.clone())));
        }
        out.push(Message::from_command(None, Command::Nick(self.nickname.clone())));
        out.push(Message::from_command(
            None,
            Command::User(
                self.identity.username.clone(),
                if self.identity.invisible { "8".into() } else { "0".into() },
                self.identity.realname.clone(),
            ),
        ));
        out
    }

    /// Consults identity alternates in order on a nickname collision
    /// (spec.md §4.2). Returns the next nickname to try, or `None` once
    /// every alternate has been exhausted.
    pub fn next_alternate_nickname(&mut self) -> Option<String> {
        let candidates: Vec<&str> = self.identity.nickname_candidates().collect();
        self.alternates_tried += 1;
        candidates.get(self.alternates_tried).map(|s| s.to_string())
    }

    /// Handles a numeric reply relevant to the registration/ISUPPORT phase.
    /// Returns `true` if the casemapping changed and channel/user buffer
    /// maps must be re-keyed by the caller (spec.md §4.2: "If casemapping
    /// changes, re-key channel/user-buffer maps").
    pub fn handle_numeric(&mut self, response: Response, params: &[String]) -> bool {
        match response {
            Response::RPL_WELCOME => {
                if let Some(nick) = params.first() {
                    self.nickname = nick.clone();
                }
                self.state = State::Registered;
                self.reconnect_plan.reset();
                false
            }
            Response::RPL_ISUPPORT => {
                // Layout: <nick> <TOKEN>... :are supported by this server
                let tokens = if params.len() > 2 { &params[1..params.len() - 1] } else { &[] };
                self.apply_isupport(tokens)
            }
            _ => false,
        }
    }

    /// Parses the `PREFIX=`, `CHANTYPES=`, and `CASEMAPPING=` tokens out of
    /// an `RPL_ISUPPORT` parameter list; ignores every other token per
    /// spec.md §6 ("others ignored").
    pub fn apply_isupport(&mut self, tokens: &[String]) -> bool {
        let mut casemapping_changed = false;
        for token in tokens {
            if let Some(value) = token.strip_prefix("PREFIX=") {
                if let Some(table) = PrefixTable::parse(value) {
                    self.prefixes = table;
                }
            } else if let Some(value) = token.strip_prefix("CHANTYPES=") {
                self.chantypes = value.to_owned();
            } else if let Some(value) = token.strip_prefix("CASEMAPPING=") {
                let new_mapping = CaseMapping::parse(value);
                if new_mapping != self.casemapping {
                    self.casemapping = new_mapping;
                    casemapping_changed = true;
                }
            }
        }
        casemapping_changed
    }

    /// Determines which buffer an inbound message should be routed to
    /// (spec.md §4.3). This does not create or look up buffers itself: the
    /// manager uses the returned target to find-or-create the right buffer.
    pub fn route(&self, message: &Message) -> RouteTarget {
        match &message.kind {
            MessageKind::Known(Command::Privmsg(target, _)) | MessageKind::Known(Command::Notice(target, _)) => {
                self.route_message_target(target, message)
            }
            MessageKind::Known(Command::Join(chans, _))
            | MessageKind::Known(Command::Part(chans, _))
            | MessageKind::Known(Command::Topic(chans, _)) => RouteTarget::Channel(chans.clone()),
            MessageKind::Known(Command::Kick(chan, ..)) => RouteTarget::Channel(chan.clone()),
            MessageKind::Known(Command::Mode(target, ..)) => {
                if target.is_channel_name(&self.chantypes) {
                    RouteTarget::Channel(target.clone())
                } else {
                    RouteTarget::Server
                }
            }
            MessageKind::Known(Command::Nick(_)) | MessageKind::Known(Command::Quit(_)) => RouteTarget::Broadcast,
            MessageKind::Numeric(_) | MessageKind::UnknownNumeric(_) => self.route_numeric(message),
            _ => RouteTarget::Server,
        }
    }

    /// Routes a `PRIVMSG`/`NOTICE` by its wire target: channel traffic goes
    /// to the named channel buffer; traffic addressed to our own nickname is
    /// a private message, routed by the *sender's* nickname rather than the
    /// target (spec.md §4.3: "if addressed to our nick from a user, route to
    /// a USER buffer"); anything else falls through to the server buffer.
    fn route_message_target(&self, target: &str, message: &Message) -> RouteTarget {
        if target.is_channel_name(&self.chantypes) {
            RouteTarget::Channel(target.to_owned())
        } else if self.casemapping.eq(target, &self.nickname) {
            match message.prefix.as_ref().and_then(|p| p.nickname()) {
                Some(sender) => RouteTarget::User(sender.to_owned()),
                None => RouteTarget::Server,
            }
        } else {
            RouteTarget::Server
        }
    }

    fn route_numeric(&self, message: &Message) -> RouteTarget {
        match message.numeric_target() {
            Some(target) if target.is_channel_name(&self.chantypes) => RouteTarget::Channel(target.to_owned()),
            _ => RouteTarget::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{BufferId, ConnectionId};

    fn connection() -> Connection {
        let identity = Identity {
            nickname: "alice".into(),
            alternates: vec!["alice_".into(), "alicey".into()],
            realname: "Alice".into(),
            username: "alice".into(),
            invisible: false,
        };
        let server = Server {
            network: "Net".into(),
            name: "irc.example.net".into(),
            address: "irc.example.net".into(),
            ports: vec![(6667, 6667)],
            password: None,
            tls: false,
        };
        Connection::new(
            ConnectionId(1),
            server.clone(),
            identity,
            None,
            BufferId(1),
            ReconnectPlan::new(vec![server]),
        )
    }

    #[test]
    fn registration_sequence_skips_pass_when_absent() {
        let conn = connection();
        let messages: Vec<String> = conn.registration_messages().iter().map(|m| m.to_wire().unwrap()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("NICK alice"));
        assert!(messages[1].starts_with("USER alice 0 * :Alice"));
    }

    #[test]
    fn nickname_collision_walks_alternates_then_exhausts() {
        let mut conn = connection();
        assert_eq!(conn.next_alternate_nickname(), Some("alice_".into()));
        assert_eq!(conn.next_alternate_nickname(), Some("alicey".into()));
        assert_eq!(conn.next_alternate_nickname(), None);
    }

    #[test]
    fn welcome_sets_registered_and_canonical_nickname() {
        let mut conn = connection();
        conn.state = State::Registering;
        conn.handle_numeric(Response::RPL_WELCOME, &["alice_".into()]);
        assert_eq!(conn.state, State::Registered);
        assert_eq!(conn.nickname, "alice_");
    }

    #[test]
    fn isupport_updates_prefix_chantypes_and_flags_casemapping_change() {
        let mut conn = connection();
        let changed = conn.apply_isupport(&[
            "PREFIX=(qaohv)~&@%+".into(),
            "CHANTYPES=#&".into(),
            "CASEMAPPING=ascii".into(),
        ]);
        assert!(changed);
        assert_eq!(conn.prefixes.rank('q'), Some(0));
        assert_eq!(conn.casemapping, CaseMapping::Ascii);
    }

    #[test]
    fn routes_channel_targeted_privmsg_to_channel() {
        let conn = connection();
        let msg = Message::from_command(None, Command::Privmsg("#rust".into(), "hi".into()));
        assert_eq!(conn.route(&msg), RouteTarget::Channel("#rust".into()));
    }

    #[test]
    fn routes_private_message_by_sender_nickname_not_target() {
        let conn = connection();
        let mut msg = Message::from_command(None, Command::Privmsg("alice".into(), "hi".into()));
        msg.prefix = Some(ircproto::Prefix::parse("bob!b@h"));
        assert_eq!(conn.route(&msg), RouteTarget::User("bob".into()));
    }

    #[test]
    fn routes_nick_and_quit_as_broadcast() {
        let conn = connection();
        let nick = Message::from_command(None, Command::Nick("bob2".into()));
        assert_eq!(conn.route(&nick), RouteTarget::Broadcast);
    }
}
