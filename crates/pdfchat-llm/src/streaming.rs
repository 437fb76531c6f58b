use anyhow::Result;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;

use crate::traits::EventStream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl ChatStreamChunk {
    fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.first() {
            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Message {
                        content: content.clone(),
                    });
                }
            }

            if let Some(finish_reason) = &choice.finish_reason {
                events.push(StreamEvent::Done {
                    finish_reason: Some(finish_reason.clone()),
                });
            }
        }

        events
    }
}

enum SseLine {
    Skip,
    Done,
    Chunk(Result<Vec<StreamEvent>>),
}

fn parse_sse_line(line_bytes: &[u8]) -> SseLine {
    let Ok(line_str) = std::str::from_utf8(line_bytes) else {
        return SseLine::Skip;
    };
    let Some(data) = line_str.trim().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    SseLine::Chunk(
        serde_json::from_str::<ChatStreamChunk>(data)
            .map(|chunk| chunk.to_stream_events())
            .map_err(|e| anyhow::anyhow!("Failed to parse chat chunk: {}", e)),
    )
}

/// Parse an OpenAI-style `text/event-stream` body into [`StreamEvent`]s.
///
/// Lines are buffered across byte chunks; `data: [DONE]` ends the stream.
/// A final line without a trailing newline is still parsed when the body
/// ends.
pub fn parse_chat_sse_stream<S, B, E>(byte_stream: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(byte_stream);
        let mut buffer: VecDeque<u8> = VecDeque::with_capacity(8192);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref().iter().copied());

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        match parse_sse_line(&line_bytes) {
                            SseLine::Skip => {}
                            SseLine::Done => {
                                yield Ok(StreamEvent::Done { finish_reason: None });
                                return;
                            }
                            SseLine::Chunk(Ok(events)) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            SseLine::Chunk(Err(e)) => yield Err(e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    return;
                }
            }
        }

        // Unterminated last line
        let rest: Vec<u8> = buffer.drain(..).collect();
        match parse_sse_line(&rest) {
            SseLine::Skip => {}
            SseLine::Done => yield Ok(StreamEvent::Done { finish_reason: None }),
            SseLine::Chunk(Ok(events)) => {
                for event in events {
                    yield Ok(event);
                }
            }
            SseLine::Chunk(Err(e)) => yield Err(e),
        }
    })
}
