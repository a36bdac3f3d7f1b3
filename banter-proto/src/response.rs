//! Enumeration of the server response numerics the client core understands.
#![allow(non_camel_case_types)]
use std::str::FromStr;

/// The broad classification of a numeric, as used by the request matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseCategory {
    /// An ordinary informational reply.
    Reply,
    /// An error reply.
    Error,
    /// A reply that terminates a multi-line listing.
    EndMarker,
    /// A capability-negotiation or SASL-related numeric.
    CapSasl,
}

/// Server response numerics from RFC 1459/2812 and the IRCv3 extensions this
/// client negotiates. Documented with their conventional parameter forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Response {
    /// 001 `<nick> :Welcome to the network`
    RPL_WELCOME = 1,
    /// 002 `<nick> :Your host is ...`
    RPL_YOURHOST = 2,
    /// 003 `<nick> :This server was created ...`
    RPL_CREATED = 3,
    /// 004 `<nick> <servername> <version> <umodes> <chanmodes>`
    RPL_MYINFO = 4,
    /// 005 `<nick> *( <token> ) :are supported by this server`
    RPL_ISUPPORT = 5,
    /// 221 `<nick> <umodes>`
    RPL_UMODEIS = 221,
    /// 263 `<nick> <command> :Please wait a while and try again.`
    RPL_TRYAGAIN = 263,
    /// 301 `<nick> <target> :<away message>`
    RPL_AWAY = 301,
    /// 302 `<nick> :*1<reply> *( " " <reply> )`
    RPL_USERHOST = 302,
    /// 303 `<nick> :*1<nick> *( " " <nick> )`
    RPL_ISON = 303,
    /// 305 `<nick> :You are no longer marked as being away`
    RPL_UNAWAY = 305,
    /// 306 `<nick> :You have been marked as being away`
    RPL_NOWAWAY = 306,
    /// 307 `<nick> <target> :has identified for this nick`
    RPL_WHOISREGNICK = 307,
    /// 311 `<nick> <target> <user> <host> * :<real name>`
    RPL_WHOISUSER = 311,
    /// 312 `<nick> <target> <server> :<server info>`
    RPL_WHOISSERVER = 312,
    /// 313 `<nick> <target> :is an IRC operator`
    RPL_WHOISOPERATOR = 313,
    /// 314 `<nick> <target> <user> <host> * :<real name>`
    RPL_WHOWASUSER = 314,
    /// 315 `<nick> <mask> :End of WHO list`
    RPL_ENDOFWHO = 315,
    /// 317 `<nick> <target> <seconds> [<signon>] :seconds idle`
    RPL_WHOISIDLE = 317,
    /// 318 `<nick> <target> :End of WHOIS list`
    RPL_ENDOFWHOIS = 318,
    /// 319 `<nick> <target> :*( ( "@" / "+" ) <channel> " " )`
    RPL_WHOISCHANNELS = 319,
    /// 321 `<nick> Channel :Users Name`
    RPL_LISTSTART = 321,
    /// 322 `<nick> <channel> <# visible> :<topic>`
    RPL_LIST = 322,
    /// 323 `<nick> :End of LIST`
    RPL_LISTEND = 323,
    /// 324 `<nick> <channel> <modes> <mode params>`
    RPL_CHANNELMODEIS = 324,
    /// 329 `<nick> <channel> <creation time>`
    RPL_CREATIONTIME = 329,
    /// 330 `<nick> <target> <account> :is logged in as`
    RPL_WHOISACCOUNT = 330,
    /// 331 `<nick> <channel> :No topic is set`
    RPL_NOTOPIC = 331,
    /// 332 `<nick> <channel> :<topic>`
    RPL_TOPIC = 332,
    /// 333 `<nick> <channel> <setter> <set at>`
    RPL_TOPICWHOTIME = 333,
    /// 338 `<nick> <target> <host/ip> :actually using host`
    RPL_WHOISACTUALLY = 338,
    /// 341 `<nick> <channel> <target>`
    RPL_INVITING = 341,
    /// 346 `<nick> <channel> <invitemask>`
    RPL_INVITELIST = 346,
    /// 347 `<nick> <channel> :End of channel invite list`
    RPL_ENDOFINVITELIST = 347,
    /// 348 `<nick> <channel> <exceptionmask>`
    RPL_EXCEPTLIST = 348,
    /// 349 `<nick> <channel> :End of channel exception list`
    RPL_ENDOFEXCEPTLIST = 349,
    /// 352 `<nick> <channel> <user> <host> <server> <target> <flags> :<hops> <real name>`
    RPL_WHOREPLY = 352,
    /// 353 `<nick> ( "=" / "*" / "@" ) <channel> :<prefixed nicks>`
    RPL_NAMREPLY = 353,
    /// 354 `<nick> *( <field> )`, a WHOX reply with caller-selected fields
    RPL_WHOSPCRPL = 354,
    /// 366 `<nick> <channel> :End of /NAMES list`
    RPL_ENDOFNAMES = 366,
    /// 367 `<nick> <channel> <banmask> [<setter> <set at>]`
    RPL_BANLIST = 367,
    /// 368 `<nick> <channel> :End of channel ban list`
    RPL_ENDOFBANLIST = 368,
    /// 369 `<nick> <target> :End of WHOWAS`
    RPL_ENDOFWHOWAS = 369,
    /// 372 `<nick> :- <text>`
    RPL_MOTD = 372,
    /// 375 `<nick> :- <server> Message of the day -`
    RPL_MOTDSTART = 375,
    /// 376 `<nick> :End of /MOTD command`
    RPL_ENDOFMOTD = 376,
    /// 396 `<nick> <host> :is now your displayed host`
    RPL_HOSTHIDDEN = 396,
    /// 401 `<nick> <target> :No such nick/channel`
    ERR_NOSUCHNICK = 401,
    /// 402 `<nick> <server> :No such server`
    ERR_NOSUCHSERVER = 402,
    /// 403 `<nick> <channel> :No such channel`
    ERR_NOSUCHCHANNEL = 403,
    /// 404 `<nick> <channel> :Cannot send to channel`
    ERR_CANNOTSENDTOCHAN = 404,
    /// 405 `<nick> <channel> :You have joined too many channels`
    ERR_TOOMANYCHANNELS = 405,
    /// 421 `<nick> <command> :Unknown command`
    ERR_UNKNOWNCOMMAND = 421,
    /// 422 `<nick> :MOTD File is missing`
    ERR_NOMOTD = 422,
    /// 432 `<nick> <bad nick> :Erroneous nickname`
    ERR_ERRONEOUSNICKNAME = 432,
    /// 433 `<nick> <bad nick> :Nickname is already in use`
    ERR_NICKNAMEINUSE = 433,
    /// 441 `<nick> <target> <channel> :They aren't on that channel`
    ERR_USERNOTINCHANNEL = 441,
    /// 442 `<nick> <channel> :You're not on that channel`
    ERR_NOTONCHANNEL = 442,
    /// 443 `<nick> <target> <channel> :is already on channel`
    ERR_USERONCHANNEL = 443,
    /// 451 `<nick> :You have not registered`
    ERR_NOTREGISTERED = 451,
    /// 461 `<nick> <command> :Not enough parameters`
    ERR_NEEDMOREPARAMS = 461,
    /// 464 `<nick> :Password incorrect`
    ERR_PASSWDMISMATCH = 464,
    /// 471 `<nick> <channel> :Cannot join channel (+l)`
    ERR_CHANNELISFULL = 471,
    /// 473 `<nick> <channel> :Cannot join channel (+i)`
    ERR_INVITEONLYCHAN = 473,
    /// 474 `<nick> <channel> :Cannot join channel (+b)`
    ERR_BANNEDFROMCHAN = 474,
    /// 475 `<nick> <channel> :Cannot join channel (+k)`
    ERR_BADCHANNELKEY = 475,
    /// 479 `<nick> <channel> :Illegal channel name`
    ERR_BADCHANNAME = 479,
    /// 482 `<nick> <channel> :You're not channel operator`
    ERR_CHANOPRIVSNEEDED = 482,
    /// 600 `<nick> <target> <user> <host> <signon> :logged online`
    RPL_LOGON = 600,
    /// 601 `<nick> <target> <user> <host> <signoff> :logged offline`
    RPL_LOGOFF = 601,
    /// 602 `<nick> <target> <user> <host> <at> :stopped watching`
    RPL_WATCHOFF = 602,
    /// 603 `<nick> :You have N and are on M WATCH entries`
    RPL_WATCHSTAT = 603,
    /// 604 `<nick> <target> <user> <host> <at> :is online`
    RPL_NOWON = 604,
    /// 605 `<nick> <target> <user> <host> <at> :is offline`
    RPL_NOWOFF = 605,
    /// 606 `<nick> :<targets>`
    RPL_WATCHLIST = 606,
    /// 607 `<nick> :End of WATCH list`
    RPL_ENDOFWATCHLIST = 607,
    /// 671 `<nick> <target> :is using a secure connection`
    RPL_WHOISSECURE = 671,
    /// 730 `<nick> :target[!user@host][,target[!user@host]]*`, now online
    RPL_MONONLINE = 730,
    /// 731 `<nick> :target[,target]*`, now offline
    RPL_MONOFFLINE = 731,
    /// 732 `<nick> :target[,target]*`, monitored targets
    RPL_MONLIST = 732,
    /// 733 `<nick> :End of MONITOR list`
    RPL_ENDOFMONLIST = 733,
    /// 734 `<nick> <limit> <targets> :Monitor list is full`
    ERR_MONLISTFULL = 734,
    /// 900 `<nick> <prefix> <account> :You are now logged in as ...`
    RPL_LOGGEDIN = 900,
    /// 901 `<nick> <prefix> :You are now logged out`
    RPL_LOGGEDOUT = 901,
    /// 902 `<nick> :You must use a nick assigned to you`
    ERR_NICKLOCKED = 902,
    /// 903 `<nick> :SASL authentication successful`
    RPL_SASLSUCCESS = 903,
    /// 904 `<nick> :SASL authentication failed`
    ERR_SASLFAIL = 904,
    /// 905 `<nick> :SASL message too long`
    ERR_SASLTOOLONG = 905,
    /// 906 `<nick> :SASL authentication aborted`
    ERR_SASLABORTED = 906,
    /// 907 `<nick> :You have already authenticated`
    ERR_SASLALREADY = 907,
    /// 908 `<nick> <mechanisms> :are available SASL mechanisms`
    RPL_SASLMECHS = 908,
}

impl Response {
    /// Gets the three-digit code for this response.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Looks up the response for a numeric code.
    pub fn from_code(code: u16) -> Option<Response> {
        use self::Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            2 => RPL_YOURHOST,
            3 => RPL_CREATED,
            4 => RPL_MYINFO,
            5 => RPL_ISUPPORT,
            221 => RPL_UMODEIS,
            263 => RPL_TRYAGAIN,
            301 => RPL_AWAY,
            302 => RPL_USERHOST,
            303 => RPL_ISON,
            305 => RPL_UNAWAY,
            306 => RPL_NOWAWAY,
            307 => RPL_WHOISREGNICK,
            311 => RPL_WHOISUSER,
            312 => RPL_WHOISSERVER,
            313 => RPL_WHOISOPERATOR,
            314 => RPL_WHOWASUSER,
            315 => RPL_ENDOFWHO,
            317 => RPL_WHOISIDLE,
            318 => RPL_ENDOFWHOIS,
            319 => RPL_WHOISCHANNELS,
            321 => RPL_LISTSTART,
            322 => RPL_LIST,
            323 => RPL_LISTEND,
            324 => RPL_CHANNELMODEIS,
            329 => RPL_CREATIONTIME,
            330 => RPL_WHOISACCOUNT,
            331 => RPL_NOTOPIC,
            332 => RPL_TOPIC,
            333 => RPL_TOPICWHOTIME,
            338 => RPL_WHOISACTUALLY,
            341 => RPL_INVITING,
            346 => RPL_INVITELIST,
            347 => RPL_ENDOFINVITELIST,
            348 => RPL_EXCEPTLIST,
            349 => RPL_ENDOFEXCEPTLIST,
            352 => RPL_WHOREPLY,
            353 => RPL_NAMREPLY,
            354 => RPL_WHOSPCRPL,
            366 => RPL_ENDOFNAMES,
            367 => RPL_BANLIST,
            368 => RPL_ENDOFBANLIST,
            369 => RPL_ENDOFWHOWAS,
            372 => RPL_MOTD,
            375 => RPL_MOTDSTART,
            376 => RPL_ENDOFMOTD,
            396 => RPL_HOSTHIDDEN,
            401 => ERR_NOSUCHNICK,
            402 => ERR_NOSUCHSERVER,
            403 => ERR_NOSUCHCHANNEL,
            404 => ERR_CANNOTSENDTOCHAN,
            405 => ERR_TOOMANYCHANNELS,
            421 => ERR_UNKNOWNCOMMAND,
            422 => ERR_NOMOTD,
            432 => ERR_ERRONEOUSNICKNAME,
            433 => ERR_NICKNAMEINUSE,
            441 => ERR_USERNOTINCHANNEL,
            442 => ERR_NOTONCHANNEL,
            443 => ERR_USERONCHANNEL,
            451 => ERR_NOTREGISTERED,
            461 => ERR_NEEDMOREPARAMS,
            464 => ERR_PASSWDMISMATCH,
            471 => ERR_CHANNELISFULL,
            473 => ERR_INVITEONLYCHAN,
            474 => ERR_BANNEDFROMCHAN,
            475 => ERR_BADCHANNELKEY,
            479 => ERR_BADCHANNAME,
            482 => ERR_CHANOPRIVSNEEDED,
            600 => RPL_LOGON,
            601 => RPL_LOGOFF,
            602 => RPL_WATCHOFF,
            603 => RPL_WATCHSTAT,
            604 => RPL_NOWON,
            605 => RPL_NOWOFF,
            606 => RPL_WATCHLIST,
            607 => RPL_ENDOFWATCHLIST,
            671 => RPL_WHOISSECURE,
            730 => RPL_MONONLINE,
            731 => RPL_MONOFFLINE,
            732 => RPL_MONLIST,
            733 => RPL_ENDOFMONLIST,
            734 => ERR_MONLISTFULL,
            900 => RPL_LOGGEDIN,
            901 => RPL_LOGGEDOUT,
            902 => ERR_NICKLOCKED,
            903 => RPL_SASLSUCCESS,
            904 => ERR_SASLFAIL,
            905 => ERR_SASLTOOLONG,
            906 => ERR_SASLABORTED,
            907 => ERR_SASLALREADY,
            908 => RPL_SASLMECHS,
            _ => return None,
        })
    }

    /// Determines whether this response is an error reply.
    ///
    /// RPL_TRYAGAIN counts: it is numbered as a reply but is sent in place
    /// of one when the server refuses to process a command.
    pub fn is_error(self) -> bool {
        use self::Response::*;
        matches!(self.code(), 400..=599)
            || matches!(self, RPL_TRYAGAIN | ERR_MONLISTFULL | ERR_NICKLOCKED)
            || matches!(self.code(), 904..=907)
    }

    /// Determines whether this response terminates a multi-line listing.
    pub fn is_end_marker(self) -> bool {
        use self::Response::*;
        matches!(
            self,
            RPL_ENDOFWHO
                | RPL_ENDOFWHOIS
                | RPL_LISTEND
                | RPL_ENDOFINVITELIST
                | RPL_ENDOFEXCEPTLIST
                | RPL_ENDOFNAMES
                | RPL_ENDOFBANLIST
                | RPL_ENDOFWHOWAS
                | RPL_ENDOFMOTD
                | RPL_ENDOFWATCHLIST
                | RPL_ENDOFMONLIST
        )
    }

    /// Classifies the response for matching purposes.
    pub fn category(self) -> ResponseCategory {
        if matches!(self.code(), 900..=908) {
            ResponseCategory::CapSasl
        } else if self.is_error() {
            ResponseCategory::Error
        } else if self.is_end_marker() {
            ResponseCategory::EndMarker
        } else {
            ResponseCategory::Reply
        }
    }
}

impl FromStr for Response {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 {
            return Err("responses are three-digit numerics");
        }
        s.parse::<u16>()
            .ok()
            .and_then(Response::from_code)
            .ok_or("unknown response code")
    }
}

#[cfg(test)]
mod test {
    use super::{Response, ResponseCategory};

    #[test]
    fn from_code_round_trips() {
        for code in 0..1000 {
            if let Some(resp) = Response::from_code(code) {
                assert_eq!(resp.code(), code);
            }
        }
    }

    #[test]
    fn parses_wire_form() {
        assert_eq!("001".parse::<Response>().unwrap(), Response::RPL_WELCOME);
        assert_eq!("376".parse::<Response>().unwrap(), Response::RPL_ENDOFMOTD);
        assert!("1".parse::<Response>().is_err());
        assert!("999".parse::<Response>().is_err());
    }

    #[test]
    fn classification() {
        assert_eq!(Response::RPL_WELCOME.category(), ResponseCategory::Reply);
        assert_eq!(Response::ERR_NOSUCHNICK.category(), ResponseCategory::Error);
        assert_eq!(Response::RPL_TRYAGAIN.category(), ResponseCategory::Error);
        assert_eq!(
            Response::RPL_ENDOFNAMES.category(),
            ResponseCategory::EndMarker
        );
        assert_eq!(
            Response::RPL_SASLSUCCESS.category(),
            ResponseCategory::CapSasl
        );
        assert!(Response::ERR_MONLISTFULL.is_error());
        assert!(!Response::RPL_MONONLINE.is_error());
        assert!(Response::RPL_ENDOFMONLIST.is_end_marker());
    }
}
