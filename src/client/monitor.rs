//! Wire-level plumbing for the presence list: MONITOR and WATCH speak
//! different dialects, but both get batched under the 510-byte line cap.
//! The ISUPPORT target cap, when advertised, additionally bounds each batch.
use crate::error::{Error, Result};
use crate::proto::Message;

/// Which presence protocol the network speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PresenceProtocol {
    Monitor,
    Watch,
}

/// Maximum serialized command length, excluding CRLF.
const MAX_COMMAND_BYTES: usize = 510;

/// Rejects nicknames the wire form cannot carry.
pub(crate) fn validate_nickname(nick: &str) -> Result<()> {
    if nick.is_empty() {
        return Err(Error::InvalidArgument {
            argument: nick.to_owned(),
            reason: "nicknames cannot be empty",
        });
    }
    if nick.contains([' ', ',', '\r', '\n']) {
        return Err(Error::InvalidArgument {
            argument: nick.to_owned(),
            reason: "nicknames cannot contain spaces, commas, or line breaks",
        });
    }
    Ok(())
}

/// Builds the batched wire commands for adding or removing targets.
///
/// `cap` is the advisory batch bound from ISUPPORT (`0` means unbounded);
/// the line-length cap is authoritative either way.
pub(crate) fn batch_commands(
    protocol: PresenceProtocol,
    add: bool,
    nicks: &[String],
    cap: Option<u32>,
) -> Vec<Message> {
    let per_batch = match cap {
        Some(n) if n > 0 => n as usize,
        _ => usize::MAX,
    };
    let op = if add { '+' } else { '-' };
    let base_len = match protocol {
        // "MONITOR + " / "MONITOR - "
        PresenceProtocol::Monitor => 10,
        // "WATCH"
        PresenceProtocol::Watch => 5,
    };

    let mut commands = Vec::new();
    let mut batch: Vec<&str> = Vec::new();
    let mut line_len = base_len;

    for nick in nicks {
        let cost = |first: bool| match protocol {
            PresenceProtocol::Monitor => nick.len() + if first { 0 } else { 1 },
            PresenceProtocol::Watch => nick.len() + 2,
        };
        if !batch.is_empty()
            && (batch.len() >= per_batch || line_len + cost(false) > MAX_COMMAND_BYTES)
        {
            commands.push(build_command(protocol, op, &batch));
            batch.clear();
            line_len = base_len;
        }
        line_len += cost(batch.is_empty());
        batch.push(nick);
    }
    if !batch.is_empty() {
        commands.push(build_command(protocol, op, &batch));
    }
    commands
}

/// Builds the command that clears the entire presence list.
pub(crate) fn clear_command(protocol: PresenceProtocol) -> Message {
    match protocol {
        PresenceProtocol::Monitor => Message::new(None, "MONITOR", vec!["C"]),
        PresenceProtocol::Watch => Message::new(None, "WATCH", vec!["C"]),
    }
}

/// Builds the command that queries online status of the whole list.
pub(crate) fn status_command(protocol: PresenceProtocol) -> Option<Message> {
    match protocol {
        PresenceProtocol::Monitor => Some(Message::new(None, "MONITOR", vec!["L"])),
        // WATCH has no listing form with a clean terminator; callers get
        // NotSupported instead.
        PresenceProtocol::Watch => None,
    }
}

fn build_command(protocol: PresenceProtocol, op: char, batch: &[&str]) -> Message {
    match protocol {
        PresenceProtocol::Monitor => {
            let targets = batch.join(",");
            Message::new(None, "MONITOR", vec![&op.to_string(), &targets])
        }
        PresenceProtocol::Watch => {
            let params: Vec<String> = batch.iter().map(|n| format!("{}{}", op, n)).collect();
            let refs: Vec<&str> = params.iter().map(|p| &p[..]).collect();
            Message::new(None, "WATCH", refs)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{batch_commands, validate_nickname, PresenceProtocol};

    fn nicks(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn monitor_batches_by_advertised_cap() {
        let commands = batch_commands(
            PresenceProtocol::Monitor,
            true,
            &nicks(&["a", "b", "c", "d"]),
            Some(3),
        );
        let lines: Vec<String> = commands.iter().map(|m| m.to_string()).collect();
        assert_eq!(lines, vec!["MONITOR + a,b,c\r\n", "MONITOR + d\r\n"]);
    }

    #[test]
    fn monitor_batches_by_line_length() {
        let many = vec!["someusualnickname".to_string(); 40];
        let commands = batch_commands(PresenceProtocol::Monitor, true, &many, Some(0));
        assert!(commands.len() > 1);
        for command in &commands {
            // Serialized form includes CRLF.
            assert!(command.to_string().len() <= 512);
        }
    }

    #[test]
    fn watch_uses_signed_parameters() {
        let commands = batch_commands(PresenceProtocol::Watch, false, &nicks(&["a", "b"]), None);
        assert_eq!(commands[0].to_string(), "WATCH -a -b\r\n");
    }

    #[test]
    fn rejects_unsendable_nicknames() {
        assert!(validate_nickname("ok_nick").is_ok());
        assert!(validate_nickname("").is_err());
        assert!(validate_nickname("a b").is_err());
        assert!(validate_nickname("a,b").is_err());
        assert!(validate_nickname("a\rb").is_err());
        assert!(validate_nickname("a\nb").is_err());
    }
}
