//! The engine: the single object an embedding host drives end to end, owning
//! every live connection's transport alongside the [`Model`] (spec.md §2's
//! dataflow, registration through routed inbound traffic, reconnect, and DCC
//! offer detection).
//!
//! Grounded on the teacher's `IrcReactor` (`client::reactor`), which owns a
//! `tokio_core::reactor::Core` plus a list of per-client futures and drains
//! them with `future::join_all`; this keeps the same "one object owns every
//! live connection's I/O" shape, but polls one ready event at a time rather
//! than a fixed `join_all`, since connections here are added and removed at
//! runtime instead of registered once up front.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use ircproto::{ctcp, mask_matches, CaseMapping, ChannelExt, Command, Message, MessageKind, Prefix, Response, User};

use crate::buffer::{ChannelBuffer, Entry, Direction, NoticeBuffer, ServerBuffer, UserBuffer};
use crate::commands::{self, ParsedInput};
use crate::config::{Identity, IgnoreEntry, IgnoreKinds, Server, TransportConfig};
use crate::connection::io::{self, Socket};
use crate::connection::transport::Transport;
use crate::connection::{Connection, ConnectionEvent, ReconnectPlan, RouteTarget, State};
use crate::dcc::ctcp::{self as dcc_ctcp, DccOffer};
use crate::dcc::{DccChat, DccSend, SendType};
use crate::error::Result;
use crate::id::{BufferId, ConnectionId};
use crate::macros::{self, ExpansionContext};
use crate::model::{AnyBuffer, Model};
use crate::watchers::ignore::IgnoreEventKind;
use crate::watchers::automode::AutoModeAction;
use crate::watchers::{AutoJoinWatcher, AutoModeWatcher, ContactWatcher, IgnoreWatcher};

/// How often an idle `tick()` wakes up to check for due `/DELAY`/`/TIMER`
/// commands even with no inbound traffic on any connection.
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A DCC offer detected in an inbound `PRIVMSG`, queued for the embedding
/// host to accept or decline (spec.md §4.5: "the GUI/CLI boundary decides
/// whether to accept an incoming transfer").
#[derive(Clone, Debug)]
pub struct PendingDccOffer {
    pub connection_id: ConnectionId,
    pub from: User,
    pub offer: DccOffer,
}

/// Owns every live transport alongside the [`Model`], and drives the
/// connect/route/reconnect lifecycle spec.md §4.2/§4.3 describe.
pub struct Engine {
    pub model: Model,
    transports: HashMap<ConnectionId, Transport<Socket>>,
    transport_config: TransportConfig,
    reconnect_delay: Duration,
    pub pending_dcc_offers: Vec<PendingDccOffer>,
}

impl Engine {
    pub fn new(transport_config: TransportConfig) -> Engine {
        Engine {
            model: Model::new(transport_config.message_deque_capacity),
            transports: HashMap::new(),
            transport_config,
            reconnect_delay: Duration::from_secs(15),
            pending_dcc_offers: Vec::new(),
        }
    }

    /// Registers a new connection and dials it (spec.md §4.2: "`connect()`
    /// resolves the server's address, picks a port from the configured port
    /// set... and on established, sends optional PASS then NICK then USER").
    pub async fn connect(&mut self, server: Server, identity: Identity, password: Option<String>) -> Result<ConnectionId> {
        let connection_id = self.model.connections.next_connection_id();
        let server_buffer_id = self.model.next_buffer_id();
        let reconnect_plan = ReconnectPlan::new(vec![server.clone()]);

        let connection = Connection::new(connection_id, server.clone(), identity, password, server_buffer_id, reconnect_plan);
        let server_buffer = ServerBuffer::new(server_buffer_id, connection_id, server.address.clone(), self.model.buffer_capacity);

        self.model.insert_buffer(AnyBuffer::Server(server_buffer));
        self.model.connections.insert(connection);
        self.dial(connection_id, &server).await?;
        Ok(connection_id)
    }

    /// User-initiated reconnect (spec.md §4.2: "a manual connect bypasses
    /// retry counting"), e.g. after `GivenUp` or an explicit `/SERVER`
    /// command. Marks the plan's next attempt manual, then dials the next
    /// server in its ring.
    pub async fn reconnect_now(&mut self, connection_id: ConnectionId) -> Result<()> {
        let server = match self.model.connections.get_mut(connection_id) {
            Some(connection) => {
                connection.reconnect_plan.mark_manual();
                match connection.reconnect_plan.next() {
                    Some((server, _)) => server,
                    None => return Ok(()),
                }
            }
            None => return Ok(()),
        };
        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.state = State::Connecting;
        }
        self.dial(connection_id, &server).await
    }

    /// Dials `server`, sends the registration sequence over the freshly
    /// opened transport, and stores the transport for polling.
    async fn dial(&mut self, connection_id: ConnectionId, server: &Server) -> Result<()> {
        log::info!("connecting to {} ({})", server.address, server.network);
        let socket = io::connect(server).await?;
        let mut transport = Transport::new(socket, &self.transport_config);

        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.state = State::Registering;
            for message in connection.registration_messages() {
                transport.send_priority(message).await?;
            }
        }
        log::debug!("connection {connection_id:?} sent registration sequence");
        self.transports.insert(connection_id, transport);
        Ok(())
    }

    /// Waits for the next inbound message (or disconnect) across every live
    /// connection and routes it. Returns `false` once no connection remains,
    /// the signal for an embedding host's run loop to stop.
    pub async fn tick(&mut self) -> bool {
        if self.transports.is_empty() {
            return false;
        }
        enum TickEvent {
            Message(ConnectionId, Result<Option<Message>>),
            Idle,
        }
        let event = {
            let mut pending: FuturesUnordered<_> = self
                .transports
                .iter_mut()
                .map(|(id, transport)| {
                    let id = *id;
                    async move { (id, transport.recv().await) }
                })
                .collect();
            tokio::select! {
                Some((id, result)) = pending.next() => TickEvent::Message(id, result),
                _ = tokio::time::sleep(COMMAND_POLL_INTERVAL) => TickEvent::Idle,
            }
        };
        match event {
            TickEvent::Message(connection_id, Ok(Some(message))) => self.handle_inbound(connection_id, message).await,
            TickEvent::Message(connection_id, Ok(None)) => self.handle_disconnect(connection_id).await,
            TickEvent::Message(connection_id, Err(error)) => {
                log::warn!("connection {connection_id:?} transport error: {error}");
                self.handle_disconnect(connection_id).await;
            }
            TickEvent::Idle => self.dispatch_due_commands().await,
        }
        true
    }

    /// Resubmits every buffer's due `/DELAY`/`/TIMER` commands (spec.md
    /// §4.3), polled once per idle tick.
    async fn dispatch_due_commands(&mut self) {
        for (connection_id, buffer_id, line) in self.model.due_commands() {
            if let Err(error) = self.submit_input(connection_id, buffer_id, &line).await {
                log::warn!("delayed command on {buffer_id:?} failed: {error}");
            }
        }
    }

    /// Sends a message over a live connection's transport, applying the
    /// ordinary flood-control bucket.
    pub async fn send(&mut self, connection_id: ConnectionId, message: Message) -> Result<()> {
        match self.transports.get_mut(&connection_id) {
            Some(transport) => transport.send(message).await,
            None => Err(crate::error::Error::ChannelClosed),
        }
    }

    async fn handle_inbound(&mut self, connection_id: ConnectionId, message: Message) {
        if !self.model.connections.filter_message(connection_id, &message) {
            return;
        }
        if self.is_ignored(connection_id, &message) {
            return;
        }
        if matches!(message.kind, MessageKind::Known(Command::Ping(..)) | MessageKind::Known(Command::Pong(..))) {
            let show_pings = self.model.connections.get(connection_id).map(|c| c.show_pings).unwrap_or(false);
            if !show_pings {
                return;
            }
        }

        let route = match self.model.connections.get(connection_id) {
            Some(connection) => connection.route(&message),
            None => return,
        };

        if self.handle_registration(connection_id, &message).await {
            return;
        }
        self.handle_membership(connection_id, &message).await;
        self.handle_dcc_offer(connection_id, &message);

        let buffer_id = self.find_or_create_buffer(connection_id, &route);
        if let Some(buffer_id) = buffer_id {
            self.push_entry(buffer_id, message, Direction::Incoming);
        }
    }

    /// Whether `message` is from a user an `/IGNORE` entry matches for its
    /// event kind (spec.md §4.7); only `PRIVMSG`/`NOTICE`/CTCP/`INVITE`
    /// traffic is eligible, membership changes always go through.
    fn is_ignored(&self, connection_id: ConnectionId, message: &Message) -> bool {
        let (server_key, casemapping) = match self.model.connections.get(connection_id) {
            Some(connection) => (connection.server.name.clone(), connection.casemapping),
            None => return false,
        };
        let kind = match &message.kind {
            MessageKind::Known(Command::Privmsg(_, body)) => {
                if ctcp::is_ctcp(body) {
                    IgnoreEventKind::Ctcp
                } else {
                    IgnoreEventKind::Privmsg
                }
            }
            MessageKind::Known(Command::Notice(..)) => IgnoreEventKind::Notice,
            MessageKind::Known(Command::Invite(..)) => IgnoreEventKind::Invite,
            _ => return false,
        };
        let nick = match sender_nickname(message) {
            Some(nick) => nick,
            None => return false,
        };
        let user = User::new(nick, "", "", casemapping);
        IgnoreWatcher::is_ignored(&self.model.persisted.ignores, &server_key, &user, kind, casemapping)
    }

    /// Handles the numeric replies that drive registration (spec.md §4.2):
    /// `RPL_WELCOME`/`RPL_ISUPPORT`, and `ERR_NICKNAMEINUSE` walking the
    /// identity's alternates before giving up. Returns `true` if the message
    /// was fully consumed here and should not also be routed to a buffer.
    async fn handle_registration(&mut self, connection_id: ConnectionId, message: &Message) -> bool {
        let response = match &message.kind {
            MessageKind::Numeric(r) => *r,
            _ => return false,
        };

        match response {
            Response::RPL_WELCOME | Response::RPL_ISUPPORT => {
                let casemapping_changed = match self.model.connections.get_mut(connection_id) {
                    Some(connection) => connection.handle_numeric(response, &message.params),
                    None => return false,
                };
                if casemapping_changed {
                    self.rekey_buffers_for_casemapping(connection_id);
                }
                if response == Response::RPL_WELCOME {
                    log::info!("connection {connection_id:?} registered");
                    self.model.connections.broadcast_event(connection_id, ConnectionEvent::Registered);
                    self.auto_join_channels(connection_id).await;
                }
                false
            }
            Response::ERR_NICKNAMEINUSE => {
                let next_nick = match self.model.connections.get_mut(connection_id) {
                    Some(connection) => connection.next_alternate_nickname(),
                    None => return true,
                };
                match next_nick {
                    Some(nick) => {
                        if let Some(connection) = self.model.connections.get_mut(connection_id) {
                            connection.nickname = nick.clone();
                        }
                        let retry = Message::from_command(None, Command::Nick(nick));
                        if let Some(transport) = self.transports.get_mut(&connection_id) {
                            let _ = transport.send_priority(retry);
                        }
                    }
                    None => {
                        log::warn!("connection {connection_id:?} exhausted every alternate nickname");
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Re-keys every channel/user buffer's casemapping after `RPL_ISUPPORT`
    /// changes it mid-registration (spec.md §4.2: "If casemapping changes,
    /// re-key channel/user-buffer maps").
    fn rekey_buffers_for_casemapping(&mut self, connection_id: ConnectionId) {
        let casemapping = match self.model.connections.get(connection_id) {
            Some(connection) => connection.casemapping,
            None => return,
        };
        for buffer_id in self.channel_buffer_ids(connection_id) {
            if let Some(AnyBuffer::Channel(channel)) = self.model.buffer_mut(buffer_id) {
                channel.casemapping = casemapping;
            }
        }
    }

    /// Joins every channel the auto-join watcher names for this connection's
    /// (network, nickname) pair, unless `/AUTOJOIN off` disabled it
    /// (spec.md §4.7).
    async fn auto_join_channels(&mut self, connection_id: ConnectionId) {
        let (network, nickname) = match self.model.connections.get(connection_id) {
            Some(connection) if connection.auto_join => (connection.server.network.clone(), connection.nickname.clone()),
            _ => return,
        };
        let channels = AutoJoinWatcher::channels_for(&self.model.persisted.auto_joins, &network, &nickname);
        for channel in channels {
            let message = Message::from_command(None, Command::Join(channel, None));
            if let Err(error) = self.send(connection_id, message).await {
                log::warn!("connection {connection_id:?} auto-join failed: {error}");
            }
        }
    }

    /// Wires `JOIN`/`PART`/`KICK`/`NICK`/`QUIT`/`MODE` and `RPL_NAMREPLY`/
    /// `RPL_ENDOFNAMES` into the channel buffer's membership state (spec.md
    /// §4.3).
    async fn handle_membership(&mut self, connection_id: ConnectionId, message: &Message) {
        let prefixes = match self.model.connections.get(connection_id) {
            Some(connection) => connection.prefixes.clone(),
            None => return,
        };
        let casemapping = match self.model.connections.get(connection_id) {
            Some(connection) => connection.casemapping,
            None => return,
        };

        match &message.kind {
            MessageKind::Known(Command::Join(channel, _)) => {
                let nick = sender_nickname(message);
                let is_our = is_our_nick(&connection_id, &self.model, nick);
                if let Some(buffer_id) = self.ensure_channel_buffer(connection_id, channel, casemapping) {
                    if let Some(AnyBuffer::Channel(chan)) = self.model.buffer_mut(buffer_id) {
                        if is_our {
                            chan.begin_join();
                        } else if let Some(nick) = nick {
                            chan.insert_member(crate::buffer::channel::Member::new(User::new(nick, "", "", casemapping)));
                        }
                    }
                }
                if !is_our {
                    if let Some(nick) = nick {
                        self.auto_mode_on_join(connection_id, channel, nick, casemapping).await;
                    }
                }
            }
            MessageKind::Known(Command::Part(channel, _)) => {
                if let Some(nick) = sender_nickname(message) {
                    if let Some(chan) = self.channel_buffer_mut(connection_id, channel) {
                        chan.remove_member(&casemapping.fold(nick));
                    }
                }
            }
            MessageKind::Known(Command::Kick(channel, user, _)) => {
                if let Some(chan) = self.channel_buffer_mut(connection_id, channel) {
                    chan.remove_member(&casemapping.fold(user));
                }
            }
            MessageKind::Known(Command::Quit(_)) => {
                if let Some(nick) = sender_nickname(message) {
                    let key = casemapping.fold(nick);
                    for buffer_id in self.channel_buffer_ids(connection_id) {
                        if let Some(AnyBuffer::Channel(chan)) = self.model.buffer_mut(buffer_id) {
                            chan.remove_member(&key);
                        }
                    }
                }
            }
            MessageKind::Known(Command::Nick(new_nick)) => {
                if let Some(old_nick) = sender_nickname(message) {
                    let old_key = casemapping.fold(old_nick);
                    let new_user = User::new(new_nick, "", "", casemapping);
                    for buffer_id in self.channel_buffer_ids(connection_id) {
                        if let Some(AnyBuffer::Channel(chan)) = self.model.buffer_mut(buffer_id) {
                            chan.rename_member(&old_key, new_user.clone());
                        }
                    }
                    self.rename_user_buffer(connection_id, &old_key, new_user);
                    ContactWatcher::follow_rename(&mut self.model.persisted.contacts, old_nick, new_nick, casemapping);
                }
            }
            MessageKind::Known(Command::Mode(target, modes, args)) => {
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                if let Ok(changes) = ircproto::Mode::parse_channel(modes, &arg_refs, &prefixes) {
                    if let Some(chan) = self.channel_buffer_mut(connection_id, target) {
                        for change in changes {
                            apply_channel_mode_change(chan, change);
                        }
                    }
                }
            }
            MessageKind::Numeric(Response::RPL_NAMREPLY) => {
                if let (Some(channel), Some(names)) = (message.params.get(2), message.params.get(3)) {
                    if let Some(chan) = self.channel_buffer_mut(connection_id, channel) {
                        if !chan.updating_names {
                            chan.begin_names_update();
                        }
                        for token in names.split_whitespace() {
                            chan.accumulate_name(token, &prefixes);
                        }
                    }
                }
            }
            MessageKind::Numeric(Response::RPL_ENDOFNAMES) => {
                if let Some(channel) = message.params.get(1) {
                    if let Some(chan) = self.channel_buffer_mut(connection_id, channel) {
                        chan.finish_names_update();
                    }
                }
            }
            _ => {}
        }
    }

    /// Applies the matching auto-mode entry (op/voice/ban-kick) to a user
    /// who just joined, provided we hold operator status in `channel`
    /// ourselves (spec.md §4.7; the watcher only matches entries, the
    /// engine checks privilege before acting).
    async fn auto_mode_on_join(&mut self, connection_id: ConnectionId, channel: &str, nick: &str, casemapping: CaseMapping) {
        let (our_nick, server_key) = match self.model.connections.get(connection_id) {
            Some(connection) => (connection.nickname.clone(), connection.server.name.clone()),
            None => return,
        };
        let we_are_op = self
            .channel_buffer_mut(connection_id, channel)
            .and_then(|chan| chan.member(&our_nick).map(|member| member.modes.contains(&'o')))
            .unwrap_or(false);
        if !we_are_op {
            return;
        }
        let user = User::new(nick, "", "", casemapping);
        let action = AutoModeWatcher::action_for(&self.model.persisted.auto_modes, &server_key, &user, channel, casemapping);
        let message = match action {
            Some(AutoModeAction::Op(target)) => Some(Message::from_command(None, Command::Mode(channel.to_owned(), "+o".into(), vec![target]))),
            Some(AutoModeAction::Voice(target)) => Some(Message::from_command(None, Command::Mode(channel.to_owned(), "+v".into(), vec![target]))),
            Some(AutoModeAction::BanKick(mask, reason)) => {
                let ban = Message::from_command(None, Command::Mode(channel.to_owned(), "+b".into(), vec![mask]));
                if let Err(error) = self.send(connection_id, ban).await {
                    log::warn!("connection {connection_id:?} auto-mode ban failed: {error}");
                }
                Some(Message::from_command(None, Command::Kick(channel.to_owned(), nick.to_owned(), Some(reason))))
            }
            None => None,
        };
        if let Some(message) = message {
            if let Err(error) = self.send(connection_id, message).await {
                log::warn!("connection {connection_id:?} auto-mode action failed: {error}");
            }
        }
    }

    /// Bridges an inbound CTCP `DCC` body into a queued [`PendingDccOffer`]
    /// (spec.md §4.5/§6), built from a parsed [`DccOffer`] rather than
    /// automatically opening a transfer: the embedding host decides whether
    /// to accept.
    fn handle_dcc_offer(&mut self, connection_id: ConnectionId, message: &Message) {
        if !message.is_ctcp() {
            return;
        }
        let body = match message.content() {
            Some(body) => body,
            None => return,
        };
        let offer = match dcc_ctcp::parse(body) {
            Some(offer) => offer,
            None => return,
        };
        let casemapping = self.model.connections.get(connection_id).map(|c| c.casemapping).unwrap_or_default();
        let from = match message.prefix.as_ref().and_then(Prefix::nickname) {
            Some(nick) => User::new(nick, "", "", casemapping),
            None => return,
        };
        log::info!("connection {connection_id:?} received dcc offer from {}: {offer:?}", from.nickname());
        self.pending_dcc_offers.push(PendingDccOffer { connection_id, from, offer });
    }

    /// Accepts a queued DCC offer, constructing the matching [`DccSend`]/
    /// [`DccChat`] entry in the model (spec.md §4.5 "download-file dialog").
    /// `file_path` names where a `SEND` offer's bytes should land; ignored
    /// for `CHAT`/`RESUME`/`ACCEPT`.
    pub fn accept_dcc_offer(&mut self, index: usize, file_path: String) -> Option<crate::id::DccId> {
        if index >= self.pending_dcc_offers.len() {
            return None;
        }
        let pending = self.pending_dcc_offers.remove(index);
        let local = self
            .model
            .connections
            .get(pending.connection_id)
            .map(|c| User::new(&c.nickname, "", "", c.casemapping))?;

        match pending.offer {
            DccOffer::Send { name, size, .. } => {
                let id = self.model.next_dcc_id();
                let dcc = DccSend::new(id, SendType::Download, name, local, pending.from, file_path, size);
                self.model.dcc_sends.insert(id, dcc);
                Some(id)
            }
            DccOffer::Chat { .. } => {
                let id = self.model.next_dcc_id();
                let name = pending.from.nickname().to_owned();
                let dcc = DccChat::new(id, name, local, pending.from, self.transport_config.message_deque_capacity);
                self.model.dcc_chats.insert(id, dcc);
                Some(id)
            }
            DccOffer::Resume { .. } | DccOffer::Accept { .. } => None,
        }
    }

    async fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        self.transports.remove(&connection_id);
        let next = match self.model.connections.get_mut(connection_id) {
            Some(connection) => {
                connection.state = State::Disconnected;
                connection.reconnect_plan.next()
            }
            None => return,
        };
        log::warn!("connection {connection_id:?} disconnected");
        self.model.connections.broadcast_event(connection_id, ConnectionEvent::Disconnected);

        let (server, wrapped) = match next {
            Some(pair) => pair,
            None => return,
        };

        let given_up = self
            .model
            .connections
            .get(connection_id)
            .map(|c| c.reconnect_plan.has_given_up())
            .unwrap_or(false);
        if given_up {
            if let Some(connection) = self.model.connections.get_mut(connection_id) {
                connection.state = State::GivenUp;
            }
            log::warn!("connection {connection_id:?} gave up reconnecting after repeated cycles");
            self.model.connections.broadcast_event(connection_id, ConnectionEvent::GivenUp);
            return;
        }

        if wrapped {
            tokio::time::sleep(self.reconnect_delay).await;
        }
        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.state = State::Connecting;
        }
        if let Err(error) = self.dial(connection_id, &server).await {
            log::warn!("reconnect attempt for {connection_id:?} failed: {error}");
        }
    }

    fn channel_buffer_mut(&mut self, connection_id: ConnectionId, name: &str) -> Option<&mut ChannelBuffer> {
        let buffer_id = self.find_channel_id(connection_id, name)?;
        match self.model.buffer_mut(buffer_id) {
            Some(AnyBuffer::Channel(chan)) => Some(chan),
            _ => None,
        }
    }

    fn find_channel_id(&self, connection_id: ConnectionId, name: &str) -> Option<BufferId> {
        self.model.find_channel(connection_id, name).map(|chan| chan.buffer.id)
    }

    /// Every channel buffer id open on a connection, for fan-out handling of
    /// connection-wide events (`NICK`/`QUIT` affect every channel a user is
    /// seen in, not just one named in the message).
    fn channel_buffer_ids(&self, connection_id: ConnectionId) -> Vec<BufferId> {
        match self.model.connections.get(connection_id) {
            Some(connection) => connection.channel_buffers.values().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Follows a user (query) buffer's peer through a `NICK` change in place
    /// (spec.md §4.3), re-keying the connection's lookup map to match.
    fn rename_user_buffer(&mut self, connection_id: ConnectionId, old_key: &str, new_user: User) {
        let buffer_id = match self.model.connections.get_mut(connection_id) {
            Some(connection) => match connection.user_buffers.remove(old_key) {
                Some(id) => {
                    connection.user_buffers.insert(new_user.key(), id);
                    id
                }
                None => return,
            },
            None => return,
        };
        if let Some(AnyBuffer::User(user_buffer)) = self.model.buffer_mut(buffer_id) {
            user_buffer.rename(new_user);
        }
    }

    fn ensure_channel_buffer(&mut self, connection_id: ConnectionId, name: &str, casemapping: CaseMapping) -> Option<BufferId> {
        if let Some(id) = self.find_channel_id(connection_id, name) {
            return Some(id);
        }
        let id = self.model.next_buffer_id();
        let chan = ChannelBuffer::new(id, connection_id, name.to_owned(), casemapping, self.model.buffer_capacity);
        self.model.insert_buffer(AnyBuffer::Channel(chan));
        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.channel_buffers.insert(name.to_owned(), id);
        }
        Some(id)
    }

    /// Finds (or lazily creates) the buffer a [`RouteTarget`] names.
    fn find_or_create_buffer(&mut self, connection_id: ConnectionId, route: &RouteTarget) -> Option<BufferId> {
        match route {
            RouteTarget::Server => self.model.connections.get(connection_id).map(|c| c.server_buffer),
            RouteTarget::Notice => self.ensure_notice_buffer(connection_id),
            RouteTarget::Channel(name) => {
                let casemapping = self.model.connections.get(connection_id)?.casemapping;
                self.ensure_channel_buffer(connection_id, name, casemapping)
            }
            RouteTarget::User(nick) => self.ensure_user_buffer(connection_id, nick),
            RouteTarget::Broadcast => self.model.connections.get(connection_id).map(|c| c.server_buffer),
        }
    }

    fn ensure_notice_buffer(&mut self, connection_id: ConnectionId) -> Option<BufferId> {
        if let Some(id) = self.model.connections.get(connection_id)?.notice_buffer {
            return Some(id);
        }
        let id = self.model.next_buffer_id();
        let notice = NoticeBuffer::new(id, connection_id, self.model.buffer_capacity);
        self.model.insert_buffer(AnyBuffer::Notice(notice));
        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.notice_buffer = Some(id);
        }
        Some(id)
    }

    fn ensure_user_buffer(&mut self, connection_id: ConnectionId, nick: &str) -> Option<BufferId> {
        let connection = self.model.connections.get(connection_id)?;
        let casemapping = connection.casemapping;
        let key = casemapping.fold(nick);
        if let Some(&id) = connection.user_buffers.get(&key) {
            return Some(id);
        }
        let id = self.model.next_buffer_id();
        let peer = User::new(nick, "", "", casemapping);
        let user_buffer = UserBuffer::new(id, connection_id, peer, self.model.buffer_capacity);
        self.model.insert_buffer(AnyBuffer::User(user_buffer));
        if let Some(connection) = self.model.connections.get_mut(connection_id) {
            connection.user_buffers.insert(key, id);
        }
        Some(id)
    }

    /// The name a line of input typed into `buffer_id` should address: a
    /// channel buffer's own name, or a user buffer's peer nickname. Server
    /// and notice buffers have no implicit send target.
    fn buffer_target(&self, buffer_id: BufferId) -> Option<String> {
        match self.model.buffer(buffer_id)? {
            AnyBuffer::Channel(chan) => Some(chan.buffer.display_name.clone()),
            AnyBuffer::User(user) => Some(user.peer.nickname().to_owned()),
            AnyBuffer::Server(_) | AnyBuffer::Notice(_) => None,
        }
    }

    /// Submits one line of buffer input (spec.md §4.3): a leading `/name`
    /// is looked up in the macro set before falling through to
    /// [`commands::parse`], so a user-defined macro shadows a built-in
    /// command of the same name.
    pub async fn submit_input(&mut self, connection_id: ConnectionId, buffer_id: BufferId, line: &str) -> Result<()> {
        self.submit_input_at_depth(connection_id, buffer_id, line, 0).await
    }

    fn submit_input_at_depth<'a>(
        &'a mut self,
        connection_id: ConnectionId,
        buffer_id: BufferId,
        line: &'a str,
        depth: usize,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
        Box::pin(self.submit_input_at_depth_inner(connection_id, buffer_id, line, depth))
    }

    async fn submit_input_at_depth_inner(&mut self, connection_id: ConnectionId, buffer_id: BufferId, line: &str, depth: usize) -> Result<()> {
        if let Some(name) = line.strip_prefix('/').and_then(|rest| rest.split_whitespace().next()) {
            let macro_name = format!("/{name}");
            if let Some(macro_def) = self.model.macros.get(&macro_name).cloned() {
                let remainder = line.splitn(2, char::is_whitespace).nth(1).unwrap_or("").to_owned();
                let mut params = vec![remainder];
                params.extend(line.split_whitespace().skip(1).map(str::to_owned));

                let current_buffer = self.buffer_target(buffer_id).unwrap_or_default();
                let casemapping = self.model.connections.get(connection_id).map(|c| c.casemapping).unwrap_or_default();
                let members: Vec<User> = match self.model.buffer(buffer_id) {
                    Some(AnyBuffer::Channel(chan)) => chan.members.values().map(|m| m.user.clone()).collect(),
                    _ => Vec::new(),
                };
                let resolve_user = move |nick: &str| members.iter().find(|u| casemapping.eq(u.nickname(), nick)).cloned();
                let resolve_ip = |_: &str| None;
                let context = ExpansionContext {
                    params,
                    current_buffer: current_buffer.as_str(),
                    resolve_user: &resolve_user,
                    resolve_ip: &resolve_ip,
                };
                return match macros::expand_macro(&macro_def, &context, depth) {
                    Ok(lines) => {
                        for expanded in lines {
                            self.submit_input_at_depth(connection_id, buffer_id, &expanded, depth + 1).await?;
                        }
                        Ok(())
                    }
                    Err(error) => {
                        self.push_local_notice(buffer_id, format!("macro {macro_name} failed: {error:?}"));
                        Ok(())
                    }
                };
            }
        }
        let parsed = commands::parse(line);
        self.execute_parsed(connection_id, buffer_id, parsed).await
    }

    /// Runs one already-classified input command (spec.md §4.3).
    async fn execute_parsed(&mut self, connection_id: ConnectionId, buffer_id: BufferId, parsed: ParsedInput) -> Result<()> {
        match parsed {
            ParsedInput::Text(text) => {
                if let Some(target) = self.buffer_target(buffer_id) {
                    self.send_text(connection_id, &target, &text).await?;
                }
            }
            ParsedInput::Me(text) => {
                if let Some(target) = self.buffer_target(buffer_id) {
                    self.send_ctcp(connection_id, &target, "ACTION", Some(&text)).await?;
                }
            }
            ParsedInput::Msg(target, text) => {
                self.send_text(connection_id, &target, &text).await?;
            }
            ParsedInput::Open(target) | ParsedInput::Query(target) => {
                self.ensure_target_buffer(connection_id, &target);
            }
            ParsedInput::Leave(target) => {
                let channel = target.or_else(|| self.buffer_target(buffer_id));
                if let Some(channel) = channel {
                    let message = Message::from_command(None, Command::Part(channel, None));
                    self.send(connection_id, message).await?;
                }
            }
            ParsedInput::Raw(line) => {
                let message = Message::parse(&line)?;
                self.send(connection_id, message).await?;
            }
            ParsedInput::Ignore(nick) => self.set_ignore(connection_id, buffer_id, &nick, true),
            ParsedInput::Unignore(nick) => self.set_ignore(connection_id, buffer_id, &nick, false),
            ParsedInput::CtcpQuery(target, verb) => self.send_ctcp(connection_id, &target, &verb, None).await?,
            ParsedInput::Ctcp(target, rest) => {
                let (command, args) = split_ctcp_command(&rest);
                self.send_ctcp(connection_id, &target, &command, args.as_deref()).await?;
            }
            ParsedInput::Chat(nick) => self.open_dcc_chat(connection_id, &nick),
            ParsedInput::Dns(_) | ParsedInput::Server(_) => {
                self.push_local_notice(buffer_id, "not supported by this embedding".to_owned());
            }
            ParsedInput::ShowPings(on) => {
                if let Some(connection) = self.model.connections.get_mut(connection_id) {
                    connection.show_pings = on;
                }
            }
            ParsedInput::AutoJoin(on) => {
                if let Some(connection) = self.model.connections.get_mut(connection_id) {
                    connection.auto_join = on;
                }
            }
            ParsedInput::AutoRejoinSet(on) => {
                if let Some(connection) = self.model.connections.get_mut(connection_id) {
                    connection.auto_rejoin = on;
                }
            }
            ParsedInput::AutoRejoinQuery => {
                let on = self.model.connections.get(connection_id).map(|c| c.auto_rejoin).unwrap_or(true);
                self.push_local_notice(buffer_id, format!("autorejoin is {}", if on { "on" } else { "off" }));
            }
            ParsedInput::All(text) => {
                for channel_buffer_id in self.channel_buffer_ids(connection_id) {
                    if let Some(target) = self.buffer_target(channel_buffer_id) {
                        self.send_text(connection_id, &target, &text).await?;
                    }
                }
            }
            ParsedInput::Clear => {
                if let Some(buffer) = self.model.buffer_mut(buffer_id) {
                    buffer.base_mut().clear();
                }
            }
            ParsedInput::Hide => {
                if let Some(buffer) = self.model.buffer_mut(buffer_id) {
                    buffer.base_mut().hidden = true;
                }
            }
            ParsedInput::Show => {
                if let Some(buffer) = self.model.buffer_mut(buffer_id) {
                    buffer.base_mut().hidden = false;
                }
            }
            ParsedInput::Delay(delay, command) => {
                if let Some(buffer) = self.model.buffer_mut(buffer_id) {
                    buffer.base_mut().delay_command(command, delay);
                }
            }
            ParsedInput::Echo(text) => self.push_local_notice(buffer_id, text),
            ParsedInput::Xyzzy => self.push_local_notice(buffer_id, "Nothing happens.".to_owned()),
            ParsedInput::FindUser(pattern) => {
                let found = self.find_users(connection_id, &pattern);
                let text = if found.is_empty() { "no matching users".to_owned() } else { found.join(", ") };
                self.push_local_notice(buffer_id, text);
            }
            ParsedInput::Timer { name, interval, repeat, command } => {
                self.arm_timer(buffer_id, name, interval, repeat, command);
            }
        }
        Ok(())
    }

    /// Sends `text` as one or more `PRIVMSG` lines (split to stay within the
    /// wire limit) and echoes each chunk into the target's own buffer.
    async fn send_text(&mut self, connection_id: ConnectionId, target: &str, text: &str) -> Result<()> {
        let prefix_len = format!("PRIVMSG {target} ").len();
        for chunk in ircproto::message::split_content(text, prefix_len) {
            let message = Message::from_command(None, Command::Privmsg(target.to_owned(), chunk));
            self.send(connection_id, message.clone()).await?;
            if let Some(buffer_id) = self.ensure_target_buffer(connection_id, target) {
                self.push_entry(buffer_id, message, Direction::Outgoing);
            }
        }
        Ok(())
    }

    /// Sends a CTCP query/reply body to `target` as a `PRIVMSG`, echoing it
    /// into the target's own buffer.
    async fn send_ctcp(&mut self, connection_id: ConnectionId, target: &str, command: &str, args: Option<&str>) -> Result<()> {
        let body = ctcp::Ctcp::encode(command, args);
        let message = Message::from_command(None, Command::Privmsg(target.to_owned(), body));
        self.send(connection_id, message.clone()).await?;
        if let Some(buffer_id) = self.ensure_target_buffer(connection_id, target) {
            self.push_entry(buffer_id, message, Direction::Outgoing);
        }
        Ok(())
    }

    /// Finds (or lazily creates) the buffer a send target names, routing by
    /// `chantypes` the same way inbound traffic does.
    fn ensure_target_buffer(&mut self, connection_id: ConnectionId, target: &str) -> Option<BufferId> {
        let (is_channel, casemapping) = match self.model.connections.get(connection_id) {
            Some(connection) => (target.is_channel_name(&connection.chantypes), connection.casemapping),
            None => return None,
        };
        if is_channel {
            self.ensure_channel_buffer(connection_id, target, casemapping)
        } else {
            self.ensure_user_buffer(connection_id, target)
        }
    }

    /// Adds or removes an `/IGNORE`/`/UNIGNORE` entry, masked to every event
    /// kind (spec.md §4.3/§4.7).
    fn set_ignore(&mut self, connection_id: ConnectionId, buffer_id: BufferId, nick: &str, ignore: bool) {
        let server_key = match self.model.connections.get(connection_id) {
            Some(connection) => connection.server.name.clone(),
            None => return,
        };
        let mask = format!("{nick}!*@*");
        if ignore {
            self.model.persisted.ignores.push(IgnoreEntry {
                server_key,
                user_mask: mask,
                kinds: IgnoreKinds { privmsg: true, notice: true, ctcp: true, invite: true },
            });
            self.push_local_notice(buffer_id, format!("now ignoring {nick}"));
        } else {
            self.model.persisted.ignores.retain(|entry| !(entry.server_key == server_key && entry.user_mask == mask));
            self.push_local_notice(buffer_id, format!("no longer ignoring {nick}"));
        }
    }

    /// Opens a local `/CHAT` entry for an outbound DCC CHAT offer. Mirrors
    /// [`Engine::accept_dcc_offer`]'s model-only bookkeeping: neither opens a
    /// real socket, leaving that to the embedding host's DCC negotiation.
    fn open_dcc_chat(&mut self, connection_id: ConnectionId, nick: &str) {
        let connection = match self.model.connections.get(connection_id) {
            Some(connection) => connection,
            None => return,
        };
        let local = User::new(&connection.nickname, "", "", connection.casemapping);
        let remote = User::new(nick, "", "", connection.casemapping);
        let id = self.model.next_dcc_id();
        let dcc = DccChat::new(id, nick.to_owned(), local, remote, self.transport_config.message_deque_capacity);
        self.model.dcc_chats.insert(id, dcc);
    }

    /// Collects every channel member on `connection_id` whose nickname
    /// matches `pattern` (`/FINDUSER`), deduplicated across channels.
    fn find_users(&self, connection_id: ConnectionId, pattern: &str) -> Vec<String> {
        let casemapping = self.model.connections.get(connection_id).map(|c| c.casemapping).unwrap_or_default();
        let mut found = Vec::new();
        for buffer_id in self.channel_buffer_ids(connection_id) {
            if let Some(AnyBuffer::Channel(chan)) = self.model.buffer(buffer_id) {
                for member in chan.members.values() {
                    let nick = member.user.nickname();
                    if mask_matches(pattern, nick, casemapping) && !found.iter().any(|n| n == nick) {
                        found.push(nick.to_owned());
                    }
                }
            }
        }
        found
    }

    /// Queues a `/TIMER`'s command for its next firing, and re-arms itself
    /// (as a fresh `/TIMER ...` line due at the same delay) while more
    /// repeats remain. A bare `/DELAY` has no `repeat` and fires once.
    fn arm_timer(&mut self, buffer_id: BufferId, name: String, interval: Duration, repeat: Option<u32>, command: String) {
        let buffer = match self.model.buffer_mut(buffer_id) {
            Some(buffer) => buffer.base_mut(),
            None => return,
        };
        buffer.delay_command(command.clone(), interval);
        if let Some(remaining) = repeat {
            if remaining > 1 {
                let rearm = format!("/timer name={name} interval={} repeat={} {command}", interval.as_millis(), remaining - 1);
                buffer.delay_command(rearm, interval);
            }
        }
    }

    /// Pushes a synthetic, locally-generated notice into a buffer without
    /// sending anything over the wire (`/ECHO`, `/XYZZY`, and local
    /// confirmations for `/IGNORE`-family commands).
    fn push_local_notice(&mut self, buffer_id: BufferId, text: String) {
        let message = Message::from_command(None, Command::Notice("*".to_owned(), text));
        self.push_entry(buffer_id, message, Direction::Incoming);
    }

    fn push_entry(&mut self, buffer_id: BufferId, message: Message, direction: Direction) {
        let id = self.model.next_message_id().0;
        if let Some(buffer) = self.model.buffer_mut(buffer_id) {
            buffer.base_mut().push(Entry {
                id,
                timestamp: chrono::Local::now(),
                direction,
                message,
                from_log: false,
                buffer_required: true,
            });
        }
    }
}

/// Splits a `/CTCP target REST` line's remainder into the CTCP verb and its
/// optional argument text.
fn split_ctcp_command(rest: &str) -> (String, Option<String>) {
    match rest.split_once(char::is_whitespace) {
        Some((command, args)) => {
            let args = args.trim();
            (command.to_ascii_uppercase(), if args.is_empty() { None } else { Some(args.to_owned()) })
        }
        None => (rest.to_ascii_uppercase(), None),
    }
}

fn sender_nickname(message: &Message) -> Option<&str> {
    message.prefix.as_ref().and_then(Prefix::nickname)
}

fn is_our_nick(connection_id: &ConnectionId, model: &Model, nick: Option<&str>) -> bool {
    let nick = match nick {
        Some(nick) => nick,
        None => return false,
    };
    match model.connections.get(*connection_id) {
        Some(connection) => connection.casemapping.eq(&connection.nickname, nick),
        None => false,
    }
}

fn apply_channel_mode_change(chan: &mut ChannelBuffer, change: ircproto::Mode<ircproto::ChannelMode>) {
    use ircproto::{ChannelMode, Mode};
    match change {
        Mode::Plus(ChannelMode::Prefix(letter), Some(nick)) => {
            if let Some(member) = chan.member_mut(&nick) {
                member.add_mode(letter);
            }
        }
        Mode::Minus(ChannelMode::Prefix(letter), Some(nick)) => {
            if let Some(member) = chan.member_mut(&nick) {
                member.remove_mode(letter);
            }
        }
        _ => {}
    }
}
