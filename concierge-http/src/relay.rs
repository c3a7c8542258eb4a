use futures::stream::{BoxStream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error};

use crate::agent::{Fragment, FragmentStream};
use crate::envelope::Envelope;
use crate::error::{AgentError, ChatError};
use crate::session::ChatSession;

/// Envelopes produced for one turn, always terminated by `end_of_turn`
pub type TurnStream = BoxStream<'static, Envelope>;

/// Tuning for a single relayed turn
#[derive(Clone, Debug)]
pub struct RelayOptions {
    /// Upper bound on the wait for the stream to open and for each fragment
    pub fragment_timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            fragment_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Relay one user message to the remote agent.
///
/// Returns `Err(ChatError::Relay)` when the streaming query cannot be started.
/// Once started, fragments are pulled one at a time and every part with
/// non-empty text becomes an `answer` envelope, in arrival order. An error
/// while streaming becomes an `error` envelope. Either way the stream ends
/// with exactly one `end_of_turn`.
pub async fn relay(
    session: &ChatSession,
    text: &str,
    options: &RelayOptions,
) -> Result<TurnStream, ChatError> {
    debug!("[{}] Relaying message ({} chars)", session.id(), text.len());

    let opened = match options.fragment_timeout {
        Some(limit) => tokio::time::timeout(limit, session.stream_query(text))
            .await
            .unwrap_or(Err(AgentError::Timeout(limit))),
        None => session.stream_query(text).await,
    };

    let fragments = opened.map_err(|e| {
        error!("[{}] Streaming query failed to start: {}", session.id(), e);
        ChatError::Relay(e.to_string())
    })?;

    Ok(turn_stream(fragments, session.id().to_string(), options.fragment_timeout))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Streaming,
    Finishing,
    Done,
}

/// Wait for the next fragment, bounded by `limit`
async fn next_fragment(
    fragments: &mut FragmentStream,
    limit: Option<Duration>,
) -> Result<Option<Fragment>, AgentError> {
    let next = match limit {
        Some(limit) => tokio::time::timeout(limit, fragments.next())
            .await
            .map_err(|_| AgentError::Timeout(limit))?,
        None => fragments.next().await,
    };
    next.transpose()
}

/// Turn a fragment stream into envelopes, appending the end-of-turn marker
fn turn_stream(fragments: FragmentStream, session_id: String, limit: Option<Duration>) -> TurnStream {
    futures::stream::unfold(
        (fragments, VecDeque::new(), TurnState::Streaming),
        move |state| {
            let session_id = session_id.clone();
            async move {
                let (mut fragments, mut pending, mut turn) = state;

                loop {
                    if let Some(envelope) = pending.pop_front() {
                        return Some((envelope, (fragments, pending, turn)));
                    }

                    match turn {
                        TurnState::Done => return None,
                        TurnState::Finishing => {
                            return Some((Envelope::end_of_turn(), (fragments, pending, TurnState::Done)));
                        }
                        TurnState::Streaming => match next_fragment(&mut fragments, limit).await {
                            Ok(Some(fragment)) => {
                                pending.extend(fragment.into_answer_parts().into_iter().map(Envelope::answer));
                            }
                            Ok(None) => turn = TurnState::Finishing,
                            Err(e) => {
                                error!("[{}] Remote stream failed: {}", session_id, e);
                                pending.push_back(Envelope::from(&ChatError::Relay(e.to_string())));
                                turn = TurnState::Finishing;
                            }
                        },
                    }
                }
            }
        },
    )
    .boxed()
}
