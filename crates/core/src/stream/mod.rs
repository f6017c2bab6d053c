//! Per-connection pose loops.
//!
//! Each loop runs at the configured frame rate and yields between frames; that
//! sleep is the only rate limiting. A peer going away ends the loop quietly.

mod message;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};

pub use message::{
    CompletionNotice, ControlMessage, PoseFrame, ServerMessage, SessionRequest, StyleChange,
    SyncRequest, GET_POSE,
};

use crate::{
    config::StreamConfig,
    pose::FullSkeletonPose,
    synth::{NoiseSource, PoseSynthesizer, RandomNoise},
    timeline::Timeline,
    transport::{
        ChannelViewer, TransportController, TransportEvent, TransportPhase, TransportState,
    },
    Result,
};

/// Message-oriented, bidirectional link to one viewer.
#[async_trait]
pub trait ViewerConnection: Send {
    /// Sends one message. An error means the peer is gone.
    async fn send(&mut self, message: &ServerMessage) -> Result<()>;

    /// Next text message from the peer, `None` once it has disconnected.
    /// Must be cancel safe: the streaming loop drops it on timeout.
    async fn recv_text(&mut self) -> Option<String>;

    async fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The configured duration elapsed and the completion notice went out.
    Completed { frames_sent: u64 },
    Disconnected { frames_sent: u64 },
}

impl SessionOutcome {
    pub fn frames_sent(&self) -> u64 {
        match self {
            Self::Completed { frames_sent } | Self::Disconnected { frames_sent } => *frames_sent,
        }
    }
}

/// Wall-clock driven streamer: poses come straight from the synthesizer.
#[derive(Debug)]
pub struct LiveStreamer<N = RandomNoise> {
    config: StreamConfig,
    synth: PoseSynthesizer<N>,
}

impl LiveStreamer<RandomNoise> {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_synthesizer(config, PoseSynthesizer::new())
    }
}

impl<N: NoiseSource> LiveStreamer<N> {
    pub fn with_synthesizer(config: StreamConfig, synth: PoseSynthesizer<N>) -> Self {
        Self { config, synth }
    }

    /// Bounded session. Reads `{style, duration?}`, streams numbered poses
    /// until the duration elapses, then sends the completion notice and
    /// closes.
    pub async fn run_session<C>(&mut self, conn: &mut C) -> Result<SessionOutcome>
    where
        C: ViewerConnection + ?Sized,
    {
        let Some(first) = conn.recv_text().await else {
            return Ok(SessionOutcome::Disconnected { frames_sent: 0 });
        };
        let request = SessionRequest::parse(&first);
        let style = request
            .style
            .unwrap_or_else(|| self.config.default_style.clone());
        let duration = request
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(self.config.default_session_seconds);

        tracing::info!(%style, duration, "dance session started");

        let interval = self.config.frame_interval();
        let start = Instant::now();
        let mut frames_sent = 0_u64;

        loop {
            let elapsed = start.elapsed().as_secs_f32();
            if elapsed >= duration {
                break;
            }

            let pose = self.synth.synthesize(&style, elapsed, 1.0);
            if conn
                .send(&ServerMessage::pose(pose, Some(frames_sent)))
                .await
                .is_err()
            {
                tracing::debug!(frames_sent, "session viewer disconnected");
                return Ok(SessionOutcome::Disconnected { frames_sent });
            }
            frames_sent += 1;
            time::sleep(interval).await;
        }

        if conn
            .send(&ServerMessage::complete(frames_sent, duration))
            .await
            .is_err()
        {
            return Ok(SessionOutcome::Disconnected { frames_sent });
        }
        conn.close().await;

        tracing::info!(frames_sent, "dance session complete");
        Ok(SessionOutcome::Completed { frames_sent })
    }

    /// Unbounded stream. Before each frame the loop waits up to the poll
    /// timeout for a `{style}` message; silence or garbage keeps the current
    /// style.
    pub async fn run_stream<C>(&mut self, conn: &mut C) -> Result<SessionOutcome>
    where
        C: ViewerConnection + ?Sized,
    {
        let mut style = self.config.default_style.clone();
        let interval = self.config.frame_interval();
        let poll = self.config.poll_timeout();
        let start = Instant::now();
        let mut frames_sent = 0_u64;

        loop {
            match time::timeout(poll, conn.recv_text()).await {
                Ok(Some(text)) => {
                    if let Some(change) = StyleChange::parse(&text) {
                        tracing::info!(from = %style, to = %change.style, "style changed");
                        style = change.style;
                    }
                }
                Ok(None) => {
                    tracing::debug!(frames_sent, "stream viewer disconnected");
                    return Ok(SessionOutcome::Disconnected { frames_sent });
                }
                Err(_) => {}
            }

            let elapsed = start.elapsed().as_secs_f32();
            let pose = self.synth.synthesize(&style, elapsed, 1.0);
            if conn.send(&ServerMessage::pose(pose, None)).await.is_err() {
                tracing::debug!(frames_sent, "stream viewer disconnected");
                return Ok(SessionOutcome::Disconnected { frames_sent });
            }
            frames_sent += 1;
            time::sleep(interval).await;
        }
    }
}

/// Shared-clock viewer loop.
///
/// Registers the connection with the transport, forwards every transport
/// event, and while the transport is playing pushes the timeline pose at the
/// shared playhead once per frame. The viewer may also pull the current pose
/// with [`GET_POSE`]. The registration is removed when the loop ends.
pub async fn run_synced<C>(
    conn: &mut C,
    transport: &TransportController,
    timeline: &Timeline,
    config: &StreamConfig,
) -> Result<SessionOutcome>
where
    C: ViewerConnection + ?Sized,
{
    let registry = transport.viewers();
    let id = registry.next_id();
    let (viewer, mut events) = ChannelViewer::pair(id);
    registry.register(Arc::new(viewer))?;

    let outcome = synced_loop(conn, transport, timeline, config, &mut events).await;

    registry.unregister(id)?;
    outcome
}

async fn synced_loop<C>(
    conn: &mut C,
    transport: &TransportController,
    timeline: &Timeline,
    config: &StreamConfig,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
) -> Result<SessionOutcome>
where
    C: ViewerConnection + ?Sized,
{
    let mut frames_sent = 0_u64;

    let hello = ServerMessage::Control(ControlMessage::Connected {
        message: "connected to dance transport".to_string(),
    });
    if conn.send(&hello).await.is_err() {
        return Ok(SessionOutcome::Disconnected { frames_sent });
    }

    let mut ticker = time::interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let state = transport.state()?;
                if state.is_playing {
                    let pose = playhead_pose(timeline, &state);
                    if conn.send(&ServerMessage::pose(pose, None)).await.is_err() {
                        return Ok(SessionOutcome::Disconnected { frames_sent });
                    }
                    frames_sent += 1;
                }
            }
            Some(event) = events.recv() => {
                if conn.send(&ServerMessage::Transport(event)).await.is_err() {
                    return Ok(SessionOutcome::Disconnected { frames_sent });
                }
            }
            inbound = conn.recv_text() => {
                let Some(text) = inbound else {
                    tracing::debug!(frames_sent, "synced viewer disconnected");
                    return Ok(SessionOutcome::Disconnected { frames_sent });
                };
                let reply = match SyncRequest::parse(&text) {
                    Some(SyncRequest::GetPose) => {
                        let state = transport.state()?;
                        frames_sent += 1;
                        ServerMessage::pose(playhead_pose(timeline, &state), None)
                    }
                    Some(SyncRequest::Ping) => ServerMessage::Control(ControlMessage::Pong),
                    None => continue,
                };
                if conn.send(&reply).await.is_err() {
                    return Ok(SessionOutcome::Disconnected { frames_sent });
                }
            }
        }
    }
}

/// Timeline pose at the shared playhead, stamped with the playhead time so
/// timestamps keep rising across timeline loops. An idle transport shows the
/// idle pose.
fn playhead_pose(timeline: &Timeline, state: &TransportState) -> FullSkeletonPose {
    let now = state.current_time();
    if state.phase() == TransportPhase::Idle {
        return FullSkeletonPose::idle(now);
    }
    let mut pose = timeline.pose_at(now);
    pose.timestamp = now;
    pose
}
