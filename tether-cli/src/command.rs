use tether_core::PeerId;

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Call(PeerId),
    Hangup(PeerId),
    Accept(PeerId),
    Peers,
    Help,
    Quit,
    Say(String),
    Empty,
    Invalid(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatCommand::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ChatCommand::Say(line.to_owned());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(PeerId::from);

        match (name, arg) {
            ("call", Some(peer)) => ChatCommand::Call(peer),
            ("hangup", Some(peer)) => ChatCommand::Hangup(peer),
            ("accept", Some(peer)) => ChatCommand::Accept(peer),
            ("peers", _) => ChatCommand::Peers,
            ("help", _) => ChatCommand::Help,
            ("quit" | "exit", _) => ChatCommand::Quit,
            ("call" | "hangup" | "accept", None) => {
                ChatCommand::Invalid(format!("/{} needs a peer id", name))
            }
            _ => ChatCommand::Invalid(format!("unknown command /{}", name)),
        }
    }
}

pub const HELP: &str = "\
/call <peer>    start a call to a peer
/hangup <peer>  close the link to a peer
/accept <peer>  let a waiting peer join
/peers          list connected peers
/quit           leave the room
anything else   broadcast to every open data channel";
