//! Parsing of user input lines.
//!
//! Lines starting with `/` are commands, anything else is sent as a chat message.

use tsudoi_server::domain::Metadata;

use crate::error::ClientError;

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    /// `/join <room> [name]`
    Join {
        room_id: String,
        participant_name: Option<String>,
    },
    /// `/leave`
    Leave,
    /// `/cursor <line> <column> [file]`
    Cursor {
        line: u32,
        column: u32,
        file_id: Option<String>,
    },
    /// `/code <file> <content...>`
    Code { file_id: String, content: String },
    /// `/state <json object>`
    State(Metadata),
    /// `/who`
    Who,
    /// `/ping`
    Ping,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    Chat(String),
}

pub const HELP: &str = "\
Commands:
  /join <room> [name]        join (or create) a room
  /leave                     leave the current room
  /cursor <line> <col> [file] share the cursor position
  /code <file> <content>     share file content
  /state <json>              update the shared room state
  /who                       list participants
  /ping                      ping the server
  /quit                      disconnect and exit
Anything else is sent as a chat message.";

/// Parse one trimmed, non-empty input line
pub fn parse_input(line: &str) -> Result<InputCommand, ClientError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(InputCommand::Chat(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "join" => {
            let mut parts = args.splitn(2, char::is_whitespace);
            let room_id = parts
                .next()
                .filter(|room| !room.is_empty())
                .ok_or_else(|| ClientError::InvalidCommand("usage: /join <room> [name]".into()))?;
            let participant_name = parts
                .next()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            Ok(InputCommand::Join {
                room_id: room_id.to_string(),
                participant_name,
            })
        }
        "leave" => Ok(InputCommand::Leave),
        "cursor" => {
            let parts: Vec<&str> = args.split_whitespace().collect();
            let usage = || ClientError::InvalidCommand("usage: /cursor <line> <col> [file]".into());
            match parts.as_slice() {
                [line, column, rest @ ..] if rest.len() <= 1 => Ok(InputCommand::Cursor {
                    line: line.parse().map_err(|_| usage())?,
                    column: column.parse().map_err(|_| usage())?,
                    file_id: rest.first().map(|file| file.to_string()),
                }),
                _ => Err(usage()),
            }
        }
        "code" => match args.split_once(char::is_whitespace) {
            Some((file_id, content)) => Ok(InputCommand::Code {
                file_id: file_id.to_string(),
                content: content.to_string(),
            }),
            None => Err(ClientError::InvalidCommand(
                "usage: /code <file> <content>".into(),
            )),
        },
        "state" => {
            let value: serde_json::Value = serde_json::from_str(args)?;
            match value {
                serde_json::Value::Object(state) => Ok(InputCommand::State(state)),
                _ => Err(ClientError::InvalidCommand(
                    "state must be a JSON object".into(),
                )),
            }
        }
        "who" => Ok(InputCommand::Who),
        "ping" => Ok(InputCommand::Ping),
        "help" => Ok(InputCommand::Help),
        "quit" | "exit" => Ok(InputCommand::Quit),
        other => Err(ClientError::InvalidCommand(format!(
            "unknown command '/{}', try /help",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        // テスト項目: スラッシュで始まらない行はチャットとして扱われる
        // given (前提条件):
        let line = "hello everyone";

        // when (操作):
        let command = parse_input(line).unwrap();

        // then (期待する結果):
        assert_eq!(command, InputCommand::Chat("hello everyone".to_string()));
    }

    #[test]
    fn test_join_with_and_without_name() {
        // テスト項目: /join はルーム ID と任意の参加者名を受け取る
        // given (前提条件):
        // when (操作):
        let with_name = parse_input("/join demo Alice Smith").unwrap();
        let without_name = parse_input("/join demo").unwrap();

        // then (期待する結果):
        assert_eq!(
            with_name,
            InputCommand::Join {
                room_id: "demo".to_string(),
                participant_name: Some("Alice Smith".to_string()),
            }
        );
        assert_eq!(
            without_name,
            InputCommand::Join {
                room_id: "demo".to_string(),
                participant_name: None,
            }
        );
    }

    #[test]
    fn test_join_requires_room() {
        // テスト項目: ルーム ID のない /join はエラーになる
        // given (前提条件):
        // when (操作):
        let result = parse_input("/join");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidCommand(_))));
    }

    #[test]
    fn test_cursor_parses_numbers() {
        // テスト項目: /cursor は行と列を数値として解釈し、ファイル ID は任意
        // given (前提条件):
        // when (操作):
        let command = parse_input("/cursor 3 14 main.rs").unwrap();
        let invalid = parse_input("/cursor three 14");

        // then (期待する結果):
        assert_eq!(
            command,
            InputCommand::Cursor {
                line: 3,
                column: 14,
                file_id: Some("main.rs".to_string()),
            }
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn test_state_requires_json_object() {
        // テスト項目: /state は JSON オブジェクトのみ受け付ける
        // given (前提条件):
        // when (操作):
        let object = parse_input(r#"/state {"theme":"dark"}"#).unwrap();
        let array = parse_input("/state [1,2]");
        let broken = parse_input("/state {");

        // then (期待する結果):
        match object {
            InputCommand::State(state) => assert_eq!(state["theme"], "dark"),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(matches!(array, Err(ClientError::InvalidCommand(_))));
        assert!(matches!(broken, Err(ClientError::Serialization(_))));
    }

    #[test]
    fn test_code_keeps_content_whitespace() {
        // テスト項目: /code の内容は空白を含めてそのまま送られる
        // given (前提条件):
        // when (操作):
        let command = parse_input("/code main.rs fn main() {  }").unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            InputCommand::Code {
                file_id: "main.rs".to_string(),
                content: "fn main() {  }".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        // テスト項目: 未知のコマンドはエラーになる
        // given (前提条件):
        // when (操作):
        let result = parse_input("/dance");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidCommand(_))));
        assert_eq!(parse_input("/quit").unwrap(), InputCommand::Quit);
    }
}
