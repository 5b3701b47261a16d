//! Command Dispatch
//!
//! Resolves the first token of a request to a [`Command`], checks its
//! argument count, runs it against the [`StorageEngine`] and builds the reply.
//!
//! ## Supported Commands
//!
//! - `PING` - Reply `PONG`
//! - `ECHO message` - Reply with `message`
//! - `SET key value [PX milliseconds | EX seconds]` - Store a string
//! - `GET key` - Read a string
//! - `RPUSH key value [value ...]` - Append to a list
//! - `LPUSH key value [value ...]` - Prepend to a list
//! - `LRANGE key start stop` - Read an inclusive slice of a list
//! - `LLEN key` - Length of a list
//!
//! Every failure (unknown command, bad arity, bad argument, wrong type)
//! becomes an error reply. Nothing here closes the connection.

use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// The commands this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Echo,
    Set,
    Get,
    RPush,
    LPush,
    LRange,
    LLen,
    Unknown,
}

impl Command {
    /// Resolves a command name, ignoring ASCII case.
    pub fn identify(name: &[u8]) -> Self {
        const TABLE: [(&[u8], Command); 8] = [
            (b"PING", Command::Ping),
            (b"ECHO", Command::Echo),
            (b"SET", Command::Set),
            (b"GET", Command::Get),
            (b"RPUSH", Command::RPush),
            (b"LPUSH", Command::LPush),
            (b"LRANGE", Command::LRange),
            (b"LLEN", Command::LLen),
        ];

        TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|&(_, cmd)| cmd)
            .unwrap_or(Command::Unknown)
    }

    /// Lowercase name, as used in error replies.
    pub fn name(self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Echo => "echo",
            Command::Set => "set",
            Command::Get => "get",
            Command::RPush => "rpush",
            Command::LPush => "lpush",
            Command::LRange => "lrange",
            Command::LLen => "llen",
            Command::Unknown => "unknown",
        }
    }

    /// Accepted token counts, command name included: `(min, max)`.
    /// `None` means no upper bound.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Command::Ping => (1, None),
            Command::Echo => (2, Some(2)),
            Command::Set => (3, Some(5)),
            Command::Get => (2, Some(2)),
            Command::RPush | Command::LPush => (3, None),
            Command::LRange => (4, Some(4)),
            Command::LLen => (2, Some(2)),
            Command::Unknown => (0, None),
        }
    }

    fn accepts(self, argc: usize) -> bool {
        let (min, max) = self.arity();
        argc >= min && max.map_or(true, |max| argc <= max)
    }
}

/// Executes requests against the shared storage engine.
///
/// Cheap to clone; each connection holds its own handle.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a decoded request and returns the reply.
    ///
    /// `tokens[0]` is the command name; the rest are its arguments.
    pub fn execute(&self, tokens: &[Bytes]) -> RespValue {
        let Some(name) = tokens.first() else {
            return RespValue::error("ERR empty command");
        };

        let cmd = Command::identify(name);
        if cmd == Command::Unknown {
            return RespValue::error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(name)
            ));
        }

        if !cmd.accepts(tokens.len()) {
            return RespValue::error(format!(
                "ERR wrong number of arguments for '{}' command",
                cmd.name()
            ));
        }

        trace!(command = cmd.name(), args = tokens.len() - 1, "Executing command");
        self.dispatch(cmd, &tokens[1..])
    }

    /// Runs a command whose arity has already been checked.
    fn dispatch(&self, cmd: Command, args: &[Bytes]) -> RespValue {
        match cmd {
            Command::Ping => RespValue::pong(),
            Command::Echo => RespValue::bulk_string(args[0].clone()),
            Command::Set => self.cmd_set(args),
            Command::Get => self.cmd_get(args),
            Command::RPush => self.cmd_push(args, Command::RPush),
            Command::LPush => self.cmd_push(args, Command::LPush),
            Command::LRange => self.cmd_lrange(args),
            Command::LLen => RespValue::integer(self.storage.length(&args[0]) as i64),
            Command::Unknown => RespValue::error("ERR unknown command"),
        }
    }

    /// SET key value [PX milliseconds | EX seconds]
    fn cmd_set(&self, args: &[Bytes]) -> RespValue {
        let ttl = match &args[2..] {
            [] => None,
            [option, amount] => {
                let to_duration: fn(u64) -> Duration = if option.eq_ignore_ascii_case(b"PX") {
                    Duration::from_millis
                } else if option.eq_ignore_ascii_case(b"EX") {
                    Duration::from_secs
                } else {
                    return RespValue::error("ERR syntax error");
                };
                let Some(amount) = parse_integer(amount) else {
                    return not_an_integer();
                };
                // Non-positive TTLs store the key without expiry.
                Some(to_duration(u64::try_from(amount).unwrap_or(0)))
            }
            _ => return RespValue::error("ERR syntax error"),
        };

        self.storage.set(args[0].clone(), args[1].clone(), ttl);
        RespValue::ok()
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> RespValue {
        match self.storage.get(&args[0]) {
            Ok(Some(value)) => RespValue::bulk_string(value),
            Ok(None) => RespValue::null(),
            Err(e) => RespValue::error(e.to_string()),
        }
    }

    /// RPUSH / LPUSH key value [value ...]
    fn cmd_push(&self, args: &[Bytes], cmd: Command) -> RespValue {
        let key = args[0].clone();
        let values = args[1..].to_vec();

        let result = if cmd == Command::LPush {
            self.storage.push_front(key, values)
        } else {
            self.storage.push_back(key, values)
        };

        match result {
            Ok(len) => RespValue::integer(len as i64),
            Err(e) => RespValue::error(e.to_string()),
        }
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[Bytes]) -> RespValue {
        let (Some(start), Some(stop)) = (parse_integer(&args[1]), parse_integer(&args[2])) else {
            return not_an_integer();
        };

        match self.storage.range(&args[0], start, stop) {
            Ok(items) => RespValue::array(items.into_iter().map(RespValue::bulk_string).collect()),
            Err(e) => RespValue::error(e.to_string()),
        }
    }
}

fn parse_integer(arg: &[u8]) -> Option<i64> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

fn not_an_integer() -> RespValue {
    RespValue::error("ERR value is not an integer or out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(StorageEngine::new()))
    }

    fn run(handler: &CommandHandler, args: &[&str]) -> RespValue {
        let tokens: Vec<Bytes> = args.iter().map(|s| Bytes::from(s.to_string())).collect();
        handler.execute(&tokens)
    }

    fn bulk_array(items: &[&str]) -> RespValue {
        RespValue::array(
            items
                .iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

    #[test]
    fn test_identify_is_case_insensitive() {
        assert_eq!(Command::identify(b"ping"), Command::Ping);
        assert_eq!(Command::identify(b"PiNg"), Command::Ping);
        assert_eq!(Command::identify(b"lrange"), Command::LRange);
        assert_eq!(Command::identify(b"LLEN"), Command::LLen);
        assert_eq!(Command::identify(b"DEL"), Command::Unknown);
        assert_eq!(Command::identify(b""), Command::Unknown);
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["PING"]), RespValue::pong());
        assert_eq!(run(&handler, &["ping"]), RespValue::pong());
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["ECHO", "hello"]),
            RespValue::bulk_string(Bytes::from("hello"))
        );
        assert_eq!(
            run(&handler, &["ECHO"]),
            RespValue::error("ERR wrong number of arguments for 'echo' command")
        );
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "key", "value"]), RespValue::ok());
        assert_eq!(
            run(&handler, &["GET", "key"]),
            RespValue::bulk_string(Bytes::from("value"))
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["GET", "missing"]), RespValue::null());
    }

    #[test]
    fn test_set_px_expires() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "k", "v", "PX", "50"]), RespValue::ok());
        assert_eq!(
            run(&handler, &["GET", "k"]),
            RespValue::bulk_string(Bytes::from("v"))
        );

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(run(&handler, &["GET", "k"]), RespValue::null());
    }

    #[test]
    fn test_set_options() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "k", "v", "px", "1000"]), RespValue::ok());
        assert_eq!(run(&handler, &["SET", "k", "v", "EX", "10"]), RespValue::ok());
        assert_eq!(run(&handler, &["SET", "k", "v", "PX", "0"]), RespValue::ok());
        assert_eq!(
            run(&handler, &["SET", "k", "v", "PX", "soon"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&handler, &["SET", "k", "v", "NX"]),
            RespValue::error("ERR syntax error")
        );
        assert_eq!(
            run(&handler, &["SET", "k", "v", "KEEP", "1"]),
            RespValue::error("ERR syntax error")
        );
        assert_eq!(
            run(&handler, &["SET", "k"]),
            RespValue::error("ERR wrong number of arguments for 'set' command")
        );
    }

    #[test]
    fn test_set_huge_ex_keeps_key() {
        let handler = create_handler();

        // Seconds whose millisecond count overflows u64
        assert_eq!(
            run(&handler, &["SET", "k", "v", "EX", "18446744073709552"]),
            RespValue::ok()
        );
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(
            run(&handler, &["GET", "k"]),
            RespValue::bulk_string(Bytes::from("v"))
        );
    }

    #[test]
    fn test_negative_px_means_no_expiry() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["SET", "k", "v", "PX", "-5"]), RespValue::ok());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(
            run(&handler, &["GET", "k"]),
            RespValue::bulk_string(Bytes::from("v"))
        );
    }

    #[test]
    fn test_rpush_lpush_order() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["RPUSH", "k", "a", "b"]), RespValue::integer(2));
        assert_eq!(run(&handler, &["RPUSH", "k", "c"]), RespValue::integer(3));
        assert_eq!(
            run(&handler, &["LRANGE", "k", "0", "-1"]),
            bulk_array(&["a", "b", "c"])
        );

        assert_eq!(run(&handler, &["LPUSH", "k", "z"]), RespValue::integer(4));
        assert_eq!(
            run(&handler, &["LRANGE", "k", "0", "-1"]),
            bulk_array(&["z", "a", "b", "c"])
        );
    }

    #[test]
    fn test_lpush_many() {
        let handler = create_handler();

        run(&handler, &["RPUSH", "k", "a", "b", "c"]);
        assert_eq!(run(&handler, &["LPUSH", "k", "y", "z"]), RespValue::integer(5));
        assert_eq!(
            run(&handler, &["LRANGE", "k", "0", "-1"]),
            bulk_array(&["z", "y", "a", "b", "c"])
        );
    }

    #[test]
    fn test_lrange() {
        let handler = create_handler();

        run(&handler, &["RPUSH", "k", "a", "b", "c", "d"]);

        assert_eq!(
            run(&handler, &["LRANGE", "k", "0", "-1"]),
            bulk_array(&["a", "b", "c", "d"])
        );
        assert_eq!(run(&handler, &["LRANGE", "k", "1", "2"]), bulk_array(&["b", "c"]));
        assert_eq!(
            run(&handler, &["LRANGE", "k", "-2", "-1"]),
            bulk_array(&["c", "d"])
        );
        assert_eq!(run(&handler, &["LRANGE", "k", "5", "10"]), RespValue::array(vec![]));
        assert_eq!(
            run(&handler, &["LRANGE", "missing", "0", "-1"]),
            RespValue::array(vec![])
        );
        assert_eq!(
            run(&handler, &["LRANGE", "k", "zero", "-1"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&handler, &["LRANGE", "k", "0"]),
            RespValue::error("ERR wrong number of arguments for 'lrange' command")
        );
    }

    #[test]
    fn test_llen() {
        let handler = create_handler();

        assert_eq!(run(&handler, &["LLEN", "k"]), RespValue::integer(0));
        run(&handler, &["RPUSH", "k", "a", "b"]);
        assert_eq!(run(&handler, &["LLEN", "k"]), RespValue::integer(2));
        assert_eq!(
            run(&handler, &["LLEN"]),
            RespValue::error("ERR wrong number of arguments for 'llen' command")
        );
    }

    #[test]
    fn test_type_errors() {
        let handler = create_handler();

        run(&handler, &["SET", "k", "v"]);
        assert_eq!(run(&handler, &["RPUSH", "k", "x"]), RespValue::error(WRONGTYPE));
        assert_eq!(run(&handler, &["LPUSH", "k", "x"]), RespValue::error(WRONGTYPE));
        assert_eq!(
            run(&handler, &["LRANGE", "k", "0", "-1"]),
            RespValue::error(WRONGTYPE)
        );
        assert_eq!(
            run(&handler, &["GET", "k"]),
            RespValue::bulk_string(Bytes::from("v"))
        );

        run(&handler, &["RPUSH", "list", "a"]);
        assert_eq!(run(&handler, &["GET", "list"]), RespValue::error(WRONGTYPE));
    }

    #[test]
    fn test_empty_command() {
        let handler = create_handler();
        assert_eq!(handler.execute(&[]), RespValue::error("ERR empty command"));
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        assert_eq!(
            run(&handler, &["FLUSHALL"]),
            RespValue::error("ERR unknown command 'FLUSHALL'")
        );
        // The handler stays usable afterwards
        assert_eq!(run(&handler, &["PING"]), RespValue::pong());
    }

    #[test]
    fn test_unknown_command_reply_is_one_frame() {
        let handler = create_handler();

        let reply = handler.execute(&[Bytes::from_static(b"FOO\r\n:1")]).serialize();
        assert_eq!(reply, b"-ERR unknown command 'FOO  :1'\r\n");
        assert_eq!(reply.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
