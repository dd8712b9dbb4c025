//! WebSocket client session management.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use irori_shared::time::{get_jst_timestamp, timestamp_to_jst_rfc3339};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::error::ClientError;

use super::{
    domain::{
        ServerFrame, UserInput, classify_frame, close_to_error, identity_frame, outgoing_frame,
        parse_input,
    },
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

fn connection_error(e: impl std::fmt::Display) -> ClientError {
    ClientError::ConnectionError(e.to_string())
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connection that has announced its username
pub struct Connection {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    username: String,
}

/// Connect to the server and send the identity frame
///
/// # Arguments
///
/// * `url` - WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
/// * `username` - Name to announce to the server
pub async fn connect_session(url: &str, username: &str) -> Result<Connection, ClientError> {
    let (ws_stream, _response) = connect_async(url).await.map_err(connection_error)?;
    tracing::info!("Connected to chat server!");

    let (mut write, read) = ws_stream.split();

    write
        .send(Message::Text(identity_frame(username)?.into()))
        .await
        .map_err(connection_error)?;

    Ok(Connection {
        write,
        read,
        username: username.to_string(),
    })
}

/// Run one WebSocket client session
///
/// Equivalent to `connect_session` followed by `Connection::run`.
pub async fn run_session(
    url: &str,
    username: &str,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    connect_session(url, username).await?.run(input).await
}

impl Connection {
    /// Print frames from the server and send lines from `input` until the user
    /// quits (`Ok`) or the connection ends (`Err`).
    ///
    /// A closed `input` channel means quit.
    pub async fn run(
        self,
        input: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<(), ClientError> {
        let Connection {
            mut write,
            mut read,
            username,
        } = self;
        let username = username.as_str();

        print!("{}", MessageFormatter::format_welcome(username));
        redisplay_prompt(username);

        loop {
            tokio::select! {
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let formatted = match classify_frame(text.as_str()) {
                            ServerFrame::History(entry) => {
                                MessageFormatter::format_history_entry(&entry, username)
                            }
                            ServerFrame::Chat(content) => {
                                MessageFormatter::format_chat_message(
                                    &content,
                                    get_jst_timestamp(),
                                )
                            }
                        };
                        print!("{}", formatted);
                        redisplay_prompt(username);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        print!("{}", MessageFormatter::format_binary_message(data.len()));
                        redisplay_prompt(username);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("Server closed the connection");
                        return Err(match frame {
                            Some(frame) => close_to_error(
                                u16::from(frame.code),
                                frame.reason.as_str(),
                                username,
                            ),
                            None => connection_error("Server closed the connection"),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        return Err(connection_error(e));
                    }
                    None => return Err(connection_error("Connection lost")),
                },
                line = input.recv() => {
                    // 入力スレッドの終了（Ctrl+C / Ctrl+D）は /quit と同じ扱い
                    let user_input = match line {
                        Some(line) => match parse_input(&line) {
                            Some(user_input) => user_input,
                            None => continue,
                        },
                        None => UserInput::Quit,
                    };

                    let sent_at = get_jst_timestamp();
                    match outgoing_frame(&user_input, &timestamp_to_jst_rfc3339(sent_at))? {
                        Some(frame) => {
                            write
                                .send(Message::Text(frame.into()))
                                .await
                                .map_err(connection_error)?;
                            if matches!(user_input, UserInput::Message(_)) {
                                print!("{}", MessageFormatter::format_sent_confirmation(sent_at));
                            }
                            redisplay_prompt(username);
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            tracing::info!("Leaving the chat");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
