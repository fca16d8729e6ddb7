//! Numeric server replies (RFC 1459/2812 and the common IRCv3/Modern set).

#![allow(non_camel_case_types)]

macro_rules! make_response {
    ($($(#[$attr:meta])+ $variant:ident = $value:expr),+ $(,)?) => {
        /// A 3-digit numeric reply, folded to a fixed enum. Unknown numerics
        /// do not construct a `Response` at all — callers fall back to
        /// `Command::Raw`/`RPL_UNKNOWN` handling at the message layer, per
        /// spec.md §4.1.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Response {
            $($(#[$attr])+ $variant = $value),+
        }

        impl Response {
            /// Builds a `Response` from its numeric code, or `None` if unrecognized.
            pub fn from_u16(val: u16) -> Option<Response> {
                match val {
                    $($value => Some(Response::$variant),)+
                    _ => None,
                }
            }

            /// The numeric code for this response.
            pub fn code(self) -> u16 {
                self as u16
            }
        }
    }
}

make_response! {
    /// `001 Welcome to the Internet Relay Network <nick>!<user>@<host>`
    RPL_WELCOME = 1,
    /// `002 Your host is <servername>, running version <ver>`
    RPL_YOURHOST = 2,
    /// `003 This server was created <date>`
    RPL_CREATED = 3,
    /// `004 <servername> <version> <usermodes> <chanmodes>`
    RPL_MYINFO = 4,
    /// `005 <servername> *(<feature>(=<value>)) :are supported by this server`
    RPL_ISUPPORT = 5,
    /// `010 Try server <server name>, port <port number>`
    RPL_BOUNCE = 10,
    /// `301 <nick> :<away message>`
    RPL_AWAY = 301,
    /// `302 :*1<reply> *( " " <reply> )`
    RPL_USERHOST = 302,
    /// `303 :*1<nick> *( " " <nick> )`
    RPL_ISON = 303,
    /// `305 :You are no longer marked as being away`
    RPL_UNAWAY = 305,
    /// `306 :You have been marked as being away`
    RPL_NOWAWAY = 306,
    /// `311 <nick> <user> <host> * :<real name>`
    RPL_WHOISUSER = 311,
    /// `312 <nick> <server> :<server info>`
    RPL_WHOISSERVER = 312,
    /// `313 <nick> :is an IRC operator`
    RPL_WHOISOPERATOR = 313,
    /// `314 <nick> <user> <host> * :<real name>`
    RPL_WHOWASUSER = 314,
    /// `315 <name> :End of WHO list`
    RPL_ENDOFWHO = 315,
    /// `317 <nick> <integer> :seconds idle`
    RPL_WHOISIDLE = 317,
    /// `318 <nick> :End of WHOIS list`
    RPL_ENDOFWHOIS = 318,
    /// `319 <nick> :*( ( "@" / "+" ) <channel> " " )`
    RPL_WHOISCHANNELS = 319,
    /// `322 <channel> <# visible> :<topic>`
    RPL_LIST = 322,
    /// `323 :End of LIST`
    RPL_LISTEND = 323,
    /// `324 <channel> <mode> <mode params>`
    RPL_CHANNELMODEIS = 324,
    /// `329 <channel> <creation time>`
    RPL_CREATIONTIME = 329,
    /// `331 <channel> :No topic is set`
    RPL_NOTOPIC = 331,
    /// `332 <channel> :<topic>`
    RPL_TOPIC = 332,
    /// `333 <channel> <nick> <setat>`
    RPL_TOPICWHOTIME = 333,
    /// `341 <channel> <nick>`
    RPL_INVITING = 341,
    /// `352 <channel> <user> <host> <server> <nick> <H|G>[*][@|+] :<hopcount> <real name>`
    RPL_WHOREPLY = 352,
    /// `353 <"=" | "*" | "@"> <channel> :[prefix]<nick>{ [prefix]<nick>}`
    RPL_NAMREPLY = 353,
    /// `366 <channel> :End of NAMES list`
    RPL_ENDOFNAMES = 366,
    /// `367 <channel> <banmask> [<who> <set-ts>]`
    RPL_BANLIST = 367,
    /// `368 <channel> :End of channel ban list`
    RPL_ENDOFBANLIST = 368,
    /// `346 <channel> <invitemask> [<who> <set-ts>]`
    RPL_INVITELIST = 346,
    /// `347 <channel> :End of channel invite list`
    RPL_ENDOFINVITELIST = 347,
    /// `348 <channel> <exceptionmask> [<who> <set-ts>]`
    RPL_EXCEPTLIST = 348,
    /// `349 <channel> :End of channel exception list`
    RPL_ENDOFEXCEPTLIST = 349,
    /// `371 :<string>`
    RPL_INFO = 371,
    /// `372 :- <text>`
    RPL_MOTD = 372,
    /// `374 :End of INFO list`
    RPL_ENDOFINFO = 374,
    /// `375 :- <server> Message of the day -`
    RPL_MOTDSTART = 375,
    /// `376 :End of MOTD command`
    RPL_ENDOFMOTD = 376,
    /// `381 :You are now an IRC operator`
    RPL_YOUREOPER = 381,
    /// `391 <server> :<string showing server's local time>`
    RPL_TIME = 391,

    /// `400 <client> <command>{ <subcommand>} :<info>`
    ERR_UNKNOWNERROR = 400,
    /// `401 <nickname> :No such nick/channel`
    ERR_NOSUCHNICK = 401,
    /// `402 <server name> :No such server`
    ERR_NOSUCHSERVER = 402,
    /// `403 <channel name> :No such channel`
    ERR_NOSUCHCHANNEL = 403,
    /// `404 <channel name> :Cannot send to channel`
    ERR_CANNOTSENDTOCHAN = 404,
    /// `405 <channel name> :You have joined too many channels`
    ERR_TOOMANYCHANNELS = 405,
    /// `411 :No recipient given (<command>)`
    ERR_NORECIPIENT = 411,
    /// `412 :No text to send`
    ERR_NOTEXTTOSEND = 412,
    /// `421 <command> :Unknown command`
    ERR_UNKNOWNCOMMAND = 421,
    /// `422 :MOTD File is missing`
    ERR_NOMOTD = 422,
    /// `431 :No nickname given`
    ERR_NONICKNAMEGIVEN = 431,
    /// `432 <nick> :Erroneous nickname`
    ERR_ERRONEUSNICKNAME = 432,
    /// `433 <nick> :Nickname is already in use`
    ERR_NICKNAMEINUSE = 433,
    /// `436 <nick> :Nickname collision KILL from <user>@<host>`
    ERR_NICKCOLLISION = 436,
    /// `437 <nick/channel> :Nick/channel is temporarily unavailable`
    ERR_UNAVAILRESOURCE = 437,
    /// `441 <nick> <channel> :They aren't on that channel`
    ERR_USERNOTINCHANNEL = 441,
    /// `442 <channel> :You're not on that channel`
    ERR_NOTONCHANNEL = 442,
    /// `443 <user> <channel> :is already on channel`
    ERR_USERONCHANNEL = 443,
    /// `451 :You have not registered`
    ERR_NOTREGISTERED = 451,
    /// `461 <command> :Not enough parameters`
    ERR_NEEDMOREPARAMS = 461,
    /// `462 :Unauthorized command (already registered)`
    ERR_ALREADYREGISTRED = 462,
    /// `464 :Password incorrect`
    ERR_PASSWDMISMATCH = 464,
    /// `465 :You are banned from this server`
    ERR_YOUREBANNEDCREEP = 465,
    /// `471 <channel> :Cannot join channel (+l)`
    ERR_CHANNELISFULL = 471,
    /// `472 <char> :is unknown mode char to me for <channel>`
    ERR_UNKNOWNMODE = 472,
    /// `473 <channel> :Cannot join channel (+i)`
    ERR_INVITEONLYCHAN = 473,
    /// `474 <channel> :Cannot join channel (+b)`
    ERR_BANNEDFROMCHAN = 474,
    /// `475 <channel> :Cannot join channel (+k)`
    ERR_BADCHANNELKEY = 475,
    /// `476 <channel> :Bad Channel Mask`
    ERR_BADCHANMASK = 476,
    /// `482 <channel> :You're not channel operator`
    ERR_CHANOPRIVSNEEDED = 482,
    /// `501 :Unknown MODE flag`
    ERR_UMODEUNKNOWNFLAG = 501,
    /// `502 :Cannot change mode for other users`
    ERR_USERSDONTMATCH = 502,
}

impl Response {
    /// RFC 2812's rough rule of thumb: codes at or above 400 are errors.
    /// Simplistic (some IRCv3 extensions reuse the 7xx/9xx ranges for both),
    /// but matches the convention every IRCd in the wild follows for the
    /// ranges this crate models.
    pub fn is_error(self) -> bool {
        self.code() >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::Response;

    #[test]
    fn decodes_known_numeric() {
        assert_eq!(Response::from_u16(1), Some(Response::RPL_WELCOME));
        assert_eq!(Response::from_u16(433), Some(Response::ERR_NICKNAMEINUSE));
    }

    #[test]
    fn unknown_numeric_is_none() {
        assert_eq!(Response::from_u16(999), None);
    }

    #[test]
    fn is_error_follows_400_boundary() {
        assert!(!Response::RPL_NAMREPLY.is_error());
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
    }
}
